// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory multi-locale key/value store

use super::normalize::normalize_value;
use crate::error::{ErrorKind, FileError, NsError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub type Entries = BTreeMap<String, String>;

/// One namespace of one locale.
///
/// Anything that is not a flat `key -> string` object is kept verbatim and
/// ignored by the indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Namespace {
    Flat(Entries),
    Opaque(Value),
}

impl Namespace {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if map.values().all(Value::is_string) => Namespace::Flat(
                map.into_iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Namespace::Opaque(other),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Namespace::Flat(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Namespace::Opaque(value) => value.clone(),
        }
    }

    pub fn entries(&self) -> Option<&Entries> {
        match self {
            Namespace::Flat(entries) => Some(entries),
            Namespace::Opaque(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Locale {
    pub code: String,
    pub namespaces: BTreeMap<String, Namespace>,
}

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            namespaces: BTreeMap::new(),
        }
    }

    /// Build a locale from `namespace -> key -> value` triples.
    pub fn from_entries<'a, I>(code: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut locale = Self::new(code);
        for (ns, key, value) in entries {
            locale.insert(ns, key, value);
        }
        locale
    }

    pub fn from_json(code: &str, value: Value) -> Self {
        let namespaces = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(ns, v)| (ns, Namespace::from_value(v)))
                .collect(),
            _ => BTreeMap::new(),
        };
        Self {
            code: code.to_string(),
            namespaces,
        }
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .namespaces
            .iter()
            .map(|(ns, n)| (ns.clone(), n.to_value()))
            .collect();
        Value::Object(map)
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
        self.namespaces
            .get(namespace)
            .and_then(Namespace::entries)
            .and_then(|e| e.get(key))
            .map(String::as_str)
    }

    /// Returns false if the namespace exists but is opaque.
    pub fn insert(&mut self, namespace: &str, key: &str, value: &str) -> bool {
        let ns = self
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Namespace::Flat(Entries::new()));
        match ns {
            Namespace::Flat(entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Namespace::Opaque(_) => false,
        }
    }

    pub fn remove(&mut self, namespace: &str, key: &str) -> Option<String> {
        match self.namespaces.get_mut(namespace) {
            Some(Namespace::Flat(entries)) => entries.remove(key),
            _ => None,
        }
    }

    pub fn flat_namespaces(&self) -> impl Iterator<Item = (&String, &Entries)> {
        self.namespaces
            .iter()
            .filter_map(|(name, ns)| ns.entries().map(|e| (name, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyLocation {
    pub namespace: String,
    pub key: String,
}

impl KeyLocation {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for KeyLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// key -> namespaces of the primary locale that define it
#[derive(Debug, Default)]
pub struct KeyIndex {
    by_key: HashMap<String, BTreeSet<String>>,
    namespaces: BTreeSet<String>,
}

impl KeyIndex {
    fn build(primary: &Locale) -> Self {
        let mut index = KeyIndex::default();
        for (ns, entries) in primary.flat_namespaces() {
            index.namespaces.insert(ns.clone());
            for key in entries.keys() {
                index
                    .by_key
                    .entry(key.clone())
                    .or_default()
                    .insert(ns.clone());
            }
        }
        index
    }

    pub fn namespaces_for(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.by_key.get(key)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }
}

/// normalized value -> every primary location holding it
#[derive(Debug, Default)]
pub struct ValueIndex {
    by_value: BTreeMap<String, Vec<KeyLocation>>,
}

impl ValueIndex {
    fn build(primary: &Locale) -> Self {
        let mut by_value: BTreeMap<String, Vec<KeyLocation>> = BTreeMap::new();
        for (ns, entries) in primary.flat_namespaces() {
            for (key, value) in entries {
                let normalized = normalize_value(value);
                if normalized.is_empty() {
                    continue;
                }
                by_value
                    .entry(normalized)
                    .or_default()
                    .push(KeyLocation::new(ns.as_str(), key.as_str()));
            }
        }
        Self { by_value }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<KeyLocation>)> {
        self.by_value.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanKey {
    pub locale: String,
    pub namespace: String,
    pub key: String,
}

/// Per-call outcome of [`LocaleStore::move_key`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Locales that gained the destination key
    pub created: usize,
    /// Locales that lost the source key
    pub deleted: usize,
}

/// All locales of one corpus, primary first.
#[derive(Debug)]
pub struct LocaleStore {
    dir: Option<PathBuf>,
    locales: Vec<Locale>,
    load_errors: Vec<FileError>,
    key_index: OnceLock<KeyIndex>,
    value_index: OnceLock<ValueIndex>,
}

impl LocaleStore {
    /// Load every `*.json` in `dir`. Only a missing primary file is fatal;
    /// malformed files load as empty locales and are reported.
    pub fn load(dir: &Path, primary: &str) -> Result<Self> {
        let primary_path = dir.join(format!("{}.json", primary));
        if !primary_path.is_file() {
            return Err(NsError::Config(format!(
                "primary locale file {} not found",
                primary_path.display()
            ))
            .into());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("reading locales directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| ext.eq_ignore_ascii_case("json"))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut load_errors = Vec::new();
        let mut primary_locale = None;
        let mut others = Vec::new();
        for path in paths {
            let code = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let locale = match read_locale_file(&path, &code) {
                Ok(locale) => locale,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "treating locale file as empty");
                    load_errors.push(FileError::new(&path, ErrorKind::FileRead, err.to_string()));
                    Locale::new(code.as_str())
                }
            };
            if code == primary {
                primary_locale = Some(locale);
            } else {
                others.push(locale);
            }
        }

        let primary_locale = primary_locale.unwrap_or_else(|| Locale::new(primary));
        let mut store = Self::from_locales(primary_locale, others);
        store.dir = Some(dir.to_path_buf());
        store.load_errors = load_errors;
        info!(
            locales = store.locales.len(),
            namespaces = store.namespace_count(),
            "locale store loaded"
        );
        Ok(store)
    }

    /// Build a store that is never persisted (`save` writes nothing).
    pub fn from_locales(primary: Locale, mut others: Vec<Locale>) -> Self {
        others.retain(|l| l.code != primary.code);
        others.sort_by(|a, b| a.code.cmp(&b.code));
        let mut locales = Vec::with_capacity(others.len() + 1);
        locales.push(primary);
        locales.extend(others);
        Self {
            dir: None,
            locales,
            load_errors: Vec::new(),
            key_index: OnceLock::new(),
            value_index: OnceLock::new(),
        }
    }

    pub fn primary(&self) -> &Locale {
        &self.locales[0]
    }

    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }

    pub fn locale(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.code == code)
    }

    pub fn load_errors(&self) -> &[FileError] {
        &self.load_errors
    }

    pub fn key_index(&self) -> &KeyIndex {
        self.key_index.get_or_init(|| KeyIndex::build(&self.locales[0]))
    }

    pub fn value_index(&self) -> &ValueIndex {
        self.value_index
            .get_or_init(|| ValueIndex::build(&self.locales[0]))
    }

    /// Drop cached indices. Called by every mutating operation.
    pub fn invalidate(&mut self) {
        self.key_index = OnceLock::new();
        self.value_index = OnceLock::new();
    }

    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.key_index().has_namespace(namespace)
    }

    pub fn namespace_keys(&self, namespace: &str) -> BTreeSet<&str> {
        self.primary()
            .namespaces
            .get(namespace)
            .and_then(Namespace::entries)
            .map(|e| e.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_opaque_namespace(&self, namespace: &str) -> bool {
        matches!(
            self.primary().namespaces.get(namespace),
            Some(Namespace::Opaque(_))
        )
    }

    pub fn has_key(&self, namespace: &str, key: &str) -> bool {
        self.primary().get(namespace, key).is_some()
    }

    pub fn value(&self, namespace: &str, key: &str) -> Option<&str> {
        self.primary().get(namespace, key)
    }

    /// Every primary namespace that defines `key`, sorted.
    pub fn find_namespaces_containing(&self, key: &str) -> Vec<String> {
        self.key_index()
            .namespaces_for(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn namespace_count(&self) -> usize {
        self.primary().flat_namespaces().count()
    }

    pub fn key_count(&self) -> usize {
        self.primary().flat_namespaces().map(|(_, e)| e.len()).sum()
    }

    /// Move `from` to `to` in every locale.
    ///
    /// A locale that already has a value at `to` keeps it. Otherwise it gets
    /// its own translation of `from`, falling back to the primary value. The
    /// source is then deleted everywhere.
    pub fn move_key(
        &mut self,
        from_namespace: &str,
        from_key: &str,
        to_namespace: &str,
        to_key: &str,
    ) -> MoveOutcome {
        let mut outcome = MoveOutcome::default();
        if from_namespace == to_namespace && from_key == to_key {
            return outcome;
        }

        let primary_value = self
            .primary()
            .get(from_namespace, from_key)
            .or_else(|| self.primary().get(to_namespace, to_key))
            .map(str::to_string);

        for locale in &mut self.locales {
            if locale.get(to_namespace, to_key).is_none() {
                let value = locale
                    .get(from_namespace, from_key)
                    .map(str::to_string)
                    .or_else(|| primary_value.clone());
                if let Some(value) = value {
                    if locale.insert(to_namespace, to_key, &value) {
                        outcome.created += 1;
                    } else {
                        warn!(
                            locale = %locale.code,
                            namespace = to_namespace,
                            "destination namespace is not flat, value not copied"
                        );
                        continue;
                    }
                }
            }
            if locale.remove(from_namespace, from_key).is_some() {
                outcome.deleted += 1;
            }
        }

        debug!(
            from = %format!("{}.{}", from_namespace, from_key),
            to = %format!("{}.{}", to_namespace, to_key),
            created = outcome.created,
            deleted = outcome.deleted,
            "moved key"
        );
        self.invalidate();
        outcome
    }

    /// Copy primary values into locales missing them. Returns keys added.
    pub fn sync_missing(&mut self) -> usize {
        let (primary, others) = match self.locales.split_first_mut() {
            Some(split) => split,
            None => return 0,
        };
        let mut added = 0;
        for locale in others.iter_mut() {
            for (ns, entries) in primary.flat_namespaces() {
                for (key, value) in entries {
                    if locale.get(ns, key).is_none() && locale.insert(ns, key, value) {
                        added += 1;
                    }
                }
            }
        }
        if added > 0 {
            self.invalidate();
        }
        added
    }

    /// Keys present in a secondary locale but absent from the primary.
    pub fn orphan_keys(&self) -> Vec<OrphanKey> {
        let primary = self.primary();
        let mut orphans = Vec::new();
        for locale in &self.locales[1..] {
            for (ns, entries) in locale.flat_namespaces() {
                for key in entries.keys() {
                    if primary.get(ns, key).is_none() {
                        orphans.push(OrphanKey {
                            locale: locale.code.clone(),
                            namespace: ns.clone(),
                            key: key.clone(),
                        });
                    }
                }
            }
        }
        orphans
    }

    /// Write every locale back with sorted namespaces and keys.
    pub fn save(&self) -> Result<Vec<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };
        let mut written = Vec::new();
        for locale in &self.locales {
            let path = dir.join(format!("{}.json", locale.code));
            // Unparseable files were loaded as empty; leave them untouched.
            if self.load_errors.iter().any(|e| e.path == path) {
                warn!(path = %path.display(), "skipping locale file that failed to load");
                continue;
            }
            let mut json = serde_json::to_string_pretty(&locale.to_json())
                .with_context(|| format!("serializing locale {}", locale.code))?;
            json.push('\n');
            fs::write(&path, json).map_err(|e| NsError::FileWrite {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            written.push(path);
        }
        info!(files = written.len(), "locale store saved");
        Ok(written)
    }
}

fn read_locale_file(path: &Path, code: &str) -> Result<Locale> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading locale file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing locale file {}", path.display()))?;
    Ok(Locale::from_json(code, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocaleStore {
        let en = Locale::from_entries(
            "en",
            [
                ("common", "save", "Save"),
                ("ext_admin", "save_btn", "Save"),
                ("blog", "title", "Blog"),
            ],
        );
        let de = Locale::from_entries(
            "de",
            [
                ("common", "save", "Speichern"),
                ("ext_admin", "save_btn", "Sichern"),
            ],
        );
        LocaleStore::from_locales(en, vec![de])
    }

    #[test]
    fn primary_is_always_first() {
        let en = Locale::new("en");
        let store = LocaleStore::from_locales(en, vec![Locale::new("fr"), Locale::new("de")]);
        let codes: Vec<&str> = store.locales().iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["en", "de", "fr"]);
    }

    #[test]
    fn move_key_keeps_existing_destination_values() {
        let mut store = store();
        let outcome = store.move_key("ext_admin", "save_btn", "common", "save");

        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.deleted, 2);
        assert_eq!(store.locale("de").unwrap().get("common", "save"), Some("Speichern"));
        assert!(store.locale("de").unwrap().get("ext_admin", "save_btn").is_none());
        assert!(store.find_namespaces_containing("save_btn").is_empty());
    }

    #[test]
    fn move_key_prefers_localized_source_value() {
        let mut store = store();
        store.move_key("ext_admin", "save_btn", "common", "store");
        assert_eq!(store.locale("de").unwrap().get("common", "store"), Some("Sichern"));
        assert_eq!(store.value("common", "store"), Some("Save"));
    }

    #[test]
    fn nested_namespaces_are_opaque() {
        let value = serde_json::json!({
            "menu": { "main": { "home": "Home" } },
            "common": { "ok": "OK" }
        });
        let store = LocaleStore::from_locales(Locale::from_json("en", value), vec![]);
        assert!(store.namespace_exists("common"));
        assert!(!store.namespace_exists("menu"));
        assert!(store.find_namespaces_containing("home").is_empty());
    }

    #[test]
    fn sync_missing_only_flows_from_primary() {
        let mut store = store();
        let added = store.sync_missing();
        assert_eq!(added, 1);
        assert_eq!(store.locale("de").unwrap().get("blog", "title"), Some("Blog"));
        assert!(store.orphan_keys().is_empty());
    }
}
