// SPDX-License-Identifier: PMPL-1.0-or-later

//! Edit lists
//!
//! A batch of span edits against one immutable original text, applied in a
//! single forward pass. Offsets always refer to the original, so no edit
//! shifts another. Overlapping spans are rejected.

use crate::error::NsError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Remove,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    /// Text the original must hold at `start..end`
    pub expected: String,
    pub replacement: String,
}

impl Edit {
    pub fn kind(&self) -> EditKind {
        if self.start == self.end {
            EditKind::Insert
        } else if self.replacement.is_empty() {
            EditKind::Remove
        } else {
            EditKind::Replace
        }
    }
}

/// An edit dropped because the original no longer matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEdit {
    pub offset: usize,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    pub skipped: Vec<SkippedEdit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Inserts at one offset keep their push order.
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push(Edit {
            start: at,
            end: at,
            expected: String::new(),
            replacement: text.into(),
        });
    }

    pub fn remove(&mut self, start: usize, end: usize, expected: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            expected: expected.into(),
            replacement: String::new(),
        });
    }

    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        expected: impl Into<String>,
        replacement: impl Into<String>,
    ) {
        self.edits.push(Edit {
            start,
            end,
            expected: expected.into(),
            replacement: replacement.into(),
        });
    }

    /// Apply every edit to `original`.
    ///
    /// An edit whose expected text is not found at its span is skipped and
    /// reported; the others still apply. Overlapping spans fail the whole
    /// batch. An insert may sit exactly at either end of a span.
    pub fn apply(&self, original: &str) -> Result<Applied, NsError> {
        let mut skipped = Vec::new();
        let mut valid: Vec<&Edit> = Vec::with_capacity(self.edits.len());
        for edit in &self.edits {
            let matches = edit.start <= edit.end
                && original.get(edit.start..edit.end) == Some(edit.expected.as_str());
            if matches {
                valid.push(edit);
            } else {
                warn!(
                    offset = edit.start,
                    expected = %edit.expected,
                    "edit does not match source text, skipped"
                );
                skipped.push(SkippedEdit {
                    offset: edit.start,
                    expected: edit.expected.clone(),
                });
            }
        }

        valid.sort_by_key(|e| (e.start, e.end));

        let mut cursor = 0;
        let mut previous_start = 0;
        for edit in &valid {
            if edit.start < cursor {
                return Err(NsError::OverlappingEdits {
                    first: previous_start,
                    second: edit.start,
                });
            }
            if edit.end > edit.start {
                cursor = edit.end;
                previous_start = edit.start;
            }
        }

        let mut text = String::with_capacity(original.len());
        let mut pos = 0;
        for edit in valid {
            text.push_str(&original[pos..edit.start]);
            text.push_str(&edit.replacement);
            pos = edit.end;
        }
        text.push_str(&original[pos..]);
        Ok(Applied { text, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "const t = useT(\"blog\");\nt(\"title\");\nt(\"other\");\n";

    fn batch() -> Vec<Edit> {
        let mut list = EditList::new();
        list.remove(0, 24, "const t = useT(\"blog\");\n");
        list.insert(24, "const tCommon = useT(\"common\");\n");
        list.replace(24, 34, "t(\"title\")", "tCommon(\"title\")");
        list.replace(36, 46, "t(\"other\")", "tCommon(\"other\")");
        list.edits().to_vec()
    }

    /// Reference application: one edit at a time from the highest offset.
    fn apply_descending(original: &str, edits: &[Edit]) -> String {
        let mut sorted = edits.to_vec();
        sorted.sort_by(|a, b| (b.start, b.end).cmp(&(a.start, a.end)));
        let mut text = original.to_string();
        for edit in sorted {
            text.replace_range(edit.start..edit.end, &edit.replacement);
        }
        text
    }

    #[test]
    fn applies_mixed_batch() {
        let mut list = EditList::new();
        for edit in batch() {
            list.push(edit);
        }
        let applied = list.apply(SRC).expect("no overlap");
        assert_eq!(
            applied.text,
            "const tCommon = useT(\"common\");\ntCommon(\"title\");\ntCommon(\"other\");\n"
        );
        assert!(applied.skipped.is_empty());
    }

    #[test]
    fn result_does_not_depend_on_edit_order() {
        let edits = batch();
        let expected = apply_descending(SRC, &edits);
        // every rotation and the reverse of each
        for shift in 0..edits.len() {
            let mut rotated = edits.clone();
            rotated.rotate_left(shift);
            for order in [rotated.clone(), rotated.into_iter().rev().collect()] {
                let mut list = EditList::new();
                for edit in order {
                    list.push(edit);
                }
                assert_eq!(list.apply(SRC).expect("no overlap").text, expected);
            }
        }
    }

    #[test]
    fn mismatched_edit_is_skipped_alone() {
        let mut list = EditList::new();
        list.replace(24, 34, "t(\"wrong\")", "x");
        list.replace(36, 46, "t(\"other\")", "tB(\"other\")");
        let applied = list.apply(SRC).expect("no overlap");
        assert_eq!(applied.skipped.len(), 1);
        assert_eq!(applied.skipped[0].offset, 24);
        assert!(applied.text.contains("tB(\"other\")"));
        assert!(applied.text.contains("t(\"title\")"));
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let mut list = EditList::new();
        list.remove(0, 10, &SRC[0..10]);
        list.replace(6, 7, "t", "x");
        assert!(matches!(
            list.apply(SRC),
            Err(NsError::OverlappingEdits { first: 0, second: 6 })
        ));
    }

    #[test]
    fn insert_inside_removed_span_is_rejected() {
        let mut list = EditList::new();
        list.remove(0, 10, &SRC[0..10]);
        list.insert(5, "x");
        assert!(list.apply(SRC).is_err());
    }

    #[test]
    fn kinds_follow_span_shape() {
        let edits = batch();
        assert_eq!(edits[0].kind(), EditKind::Remove);
        assert_eq!(edits[1].kind(), EditKind::Insert);
        assert_eq!(edits[2].kind(), EditKind::Replace);
    }
}
