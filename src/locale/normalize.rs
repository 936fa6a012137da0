// SPDX-License-Identifier: PMPL-1.0-or-later

//! Value normalization used to detect duplicate translations.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Trim, case-fold, collapse whitespace runs and map typographic quotes to
/// their ASCII forms.
pub fn normalize_value(value: &str) -> String {
    let quoted: String = value
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => '"',
            other => other,
        })
        .collect();
    let folded = quoted.trim().to_lowercase();
    WHITESPACE.replace_all(&folded, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_case_space_and_quotes() {
        assert_eq!(normalize_value("  Don\u{2019}t   Save\n"), "don't save");
        assert_eq!(normalize_value("\u{201C}Hi\u{201D}"), "\"hi\"");
        assert_eq!(normalize_value("Save"), normalize_value("save "));
    }

    #[test]
    fn blank_values_normalize_to_empty() {
        assert_eq!(normalize_value(" \t "), "");
    }
}
