// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration loading for nsguard runs.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json;
use serde_yaml;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAMES: &[&str] = &["nsguard.yaml", "nsguard.yml", "nsguard.json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one `<locale>.json` per locale
    pub locales_dir: PathBuf,
    /// Locale treated as the source of truth
    pub primary_locale: String,
    pub source_roots: Vec<PathBuf>,
    /// Source file extensions to scan (without the dot)
    pub extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    /// Functions whose call binds a namespace, e.g. `useTranslations("ns")`
    pub binding_functions: Vec<String>,
    /// Used for new declarations when the scope has no binding to copy
    pub default_binding_function: String,
    pub fallback_namespace: String,
    /// Normalized values too ambiguous to consolidate across namespaces
    pub context_dependent_values: Vec<String>,
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locales_dir: PathBuf::from("messages"),
            primary_locale: "en".to_string(),
            source_roots: vec![PathBuf::from("src")],
            extensions: ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_dirs: [
                "node_modules",
                ".git",
                "dist",
                "build",
                ".next",
                "out",
                "coverage",
                "target",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            binding_functions: vec!["useTranslations".to_string(), "getTranslations".to_string()],
            default_binding_function: "useTranslations".to_string(),
            fallback_namespace: "common".to_string(),
            context_dependent_values: Vec::new(),
            parallel: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("parsing json config {}", path.display())),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("parsing yaml config {}", path.display())),
            _ => Err(anyhow!("unsupported config extension for {}", path.display())),
        }
    }

    /// Load `explicit` if given, else the first default-named file found in
    /// `dir`, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::find_default(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// First default-named config file present in `dir`.
    pub fn find_default(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn is_binding_function(&self, name: &str) -> bool {
        self.binding_functions.iter().any(|f| f == name)
    }

    pub fn wants_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }

    /// Paths in the config are relative to `base` unless absolute.
    pub fn rebase(mut self, base: &Path) -> Self {
        if self.locales_dir.is_relative() {
            self.locales_dir = base.join(&self.locales_dir);
        }
        self.source_roots = self
            .source_roots
            .into_iter()
            .map(|root| if root.is_relative() { base.join(root) } else { root })
            .collect();
        self
    }
}
