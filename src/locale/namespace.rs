// SPDX-License-Identifier: PMPL-1.0-or-later

//! Namespace hierarchy helpers
//!
//! Namespaces form an implicit tree through underscore segments:
//! `ext_admin_users` sits under `ext_admin`, which sits under `ext`. A
//! configured fallback namespace (usually `common`) is the universal parent.

pub fn segments(namespace: &str) -> Vec<&str> {
    namespace.split('_').filter(|s| !s.is_empty()).collect()
}

/// Pick the namespace a value shared by `namespaces` should live in.
///
/// With a common root, walks from the deepest shared prefix towards the
/// root and takes the first prefix that `exists`; if none exists the deepest
/// shared prefix is used. Unrelated roots go to `fallback`.
pub fn common_ancestor<'a, I, F>(namespaces: I, exists: F, fallback: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> bool,
{
    let all: Vec<Vec<&str>> = namespaces.into_iter().map(segments).collect();
    let Some(first) = all.first() else {
        return fallback.to_string();
    };

    let mut shared = first.len();
    for parts in &all[1..] {
        shared = shared.min(
            first
                .iter()
                .zip(parts.iter())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    if shared == 0 {
        return fallback.to_string();
    }

    (1..=shared)
        .rev()
        .map(|len| first[..len].join("_"))
        .find(|candidate| exists(candidate))
        .unwrap_or_else(|| first[..shared].join("_"))
}

/// Conventional accessor name for a namespace: `ext_admin` -> `tExtAdmin`.
pub fn accessor_name(namespace: &str) -> String {
    let mut name = String::from("t");
    for part in namespace.split(['_', '-', '.']).filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_skip_empty_parts() {
        assert_eq!(segments("ext__admin_"), vec!["ext", "admin"]);
    }

    #[test]
    fn common_ancestor_prefers_existing_deepest_prefix() {
        let exists = |ns: &str| ns == "ext" || ns == "ext_admin";
        let picked = common_ancestor(
            ["ext_admin_users", "ext_admin_roles"].iter().copied(),
            exists,
            "common",
        );
        assert_eq!(picked, "ext_admin");

        let only_root = |ns: &str| ns == "ext";
        let picked = common_ancestor(
            ["ext_admin_users", "ext_admin_roles"].iter().copied(),
            only_root,
            "common",
        );
        assert_eq!(picked, "ext");
    }

    #[test]
    fn unrelated_roots_use_fallback() {
        let picked = common_ancestor(["blog", "ext_admin"].iter().copied(), |_| true, "common");
        assert_eq!(picked, "common");
    }

    #[test]
    fn accessor_names_are_pascal_cased() {
        assert_eq!(accessor_name("common"), "tCommon");
        assert_eq!(accessor_name("ext_admin"), "tExtAdmin");
    }
}
