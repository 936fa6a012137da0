// SPDX-License-Identifier: PMPL-1.0-or-later

//! `doctor`: check that a configuration points at a usable corpus

use crate::config::Config;
use crate::engine::collect_source_files;
use crate::locale::LocaleStore;
use anyhow::{anyhow, Result};
use std::path::Path;

pub fn run_self_diagnostics(config: &Config, origin: &str) -> Result<()> {
    println!("nsguard self-diagnostics");

    let checks = collect_checks(config, origin);
    println!();
    for entry in &checks {
        entry.print();
    }

    if checks
        .iter()
        .any(|entry| matches!(entry.level, Level::Error))
    {
        Err(anyhow!("self-diagnostics reported issues"))
    } else {
        Ok(())
    }
}

pub fn collect_checks(config: &Config, origin: &str) -> Vec<Diagnostic> {
    let mut checks = vec![
        Diagnostic::ok("version", format!("nsguard {}", env!("CARGO_PKG_VERSION"))),
        Diagnostic::ok("config", origin.to_string()),
        check_directory("locales directory", &config.locales_dir),
    ];

    let primary_path = config
        .locales_dir
        .join(format!("{}.json", config.primary_locale));
    match LocaleStore::load(&config.locales_dir, &config.primary_locale) {
        Ok(store) => {
            checks.push(Diagnostic::ok(
                "primary locale",
                format!(
                    "{} ({} namespaces, {} keys)",
                    primary_path.display(),
                    store.namespace_count(),
                    store.key_count()
                ),
            ));
            checks.push(Diagnostic::ok(
                "locales",
                store
                    .locales()
                    .iter()
                    .map(|l| l.code.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
            for err in store.load_errors() {
                checks.push(Diagnostic::warning("locale file", err.message.clone()));
            }
            if store.namespace_exists(&config.fallback_namespace) {
                checks.push(Diagnostic::ok(
                    "fallback namespace",
                    format!("{} present", config.fallback_namespace),
                ));
            } else {
                checks.push(Diagnostic::warning(
                    "fallback namespace",
                    format!(
                        "{} missing from primary locale; duplicates with unrelated roots will create it",
                        config.fallback_namespace
                    ),
                ));
            }
            let orphans = store.orphan_keys().len();
            if orphans > 0 {
                checks.push(Diagnostic::warning(
                    "orphan keys",
                    format!("{} keys exist only in secondary locales", orphans),
                ));
            }
        }
        Err(err) => checks.push(Diagnostic::error("primary locale", err.to_string())),
    }

    for root in &config.source_roots {
        checks.push(check_directory("source root", root));
    }
    let files = collect_source_files(config).len();
    if files > 0 {
        checks.push(Diagnostic::ok("source files", format!("{} to scan", files)));
    } else {
        checks.push(Diagnostic::warning(
            "source files",
            format!("none with extensions {}", config.extensions.join(", ")),
        ));
    }

    if config.binding_functions.is_empty() {
        checks.push(Diagnostic::error(
            "binding functions",
            "none configured; no call can resolve".to_string(),
        ));
    } else if !config.is_binding_function(&config.default_binding_function) {
        checks.push(Diagnostic::warning(
            "binding functions",
            format!(
                "default {} is not in {}",
                config.default_binding_function,
                config.binding_functions.join(", ")
            ),
        ));
    } else {
        checks.push(Diagnostic::ok(
            "binding functions",
            config.binding_functions.join(", "),
        ));
    }

    checks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub label: &'static str,
    pub level: Level,
    pub detail: String,
}

impl Diagnostic {
    fn new(label: &'static str, level: Level, detail: String) -> Self {
        Self {
            label,
            level,
            detail,
        }
    }

    fn ok(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Ok, detail)
    }

    fn warning(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Warn, detail)
    }

    fn error(label: &'static str, detail: String) -> Self {
        Self::new(label, Level::Error, detail)
    }

    fn print(&self) {
        println!("  [{}] {:22} {}", self.level.tag(), self.label, self.detail);
    }
}

impl Level {
    fn tag(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERR",
        }
    }
}

fn check_directory(label: &'static str, path: &Path) -> Diagnostic {
    if path.is_dir() {
        Diagnostic::ok(label, format!("{} exists", path.display()))
    } else if path.exists() {
        Diagnostic::error(
            label,
            format!("{} exists but is not a directory", path.display()),
        )
    } else {
        Diagnostic::error(label, format!("{} missing", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_primary_locale_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("messages")).expect("mkdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        let config = Config::default().rebase(dir.path());
        let checks = collect_checks(&config, "defaults");
        assert!(checks
            .iter()
            .any(|c| c.label == "primary locale" && c.level == Level::Error));
    }

    #[test]
    fn healthy_corpus_has_no_errors() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("messages")).expect("mkdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("messages/en.json"), r#"{"common":{"save":"Save"}}"#).expect("write");
        fs::write(dir.path().join("src/a.tsx"), "").expect("write");
        let config = Config::default().rebase(dir.path());
        let checks = collect_checks(&config, "defaults");
        assert!(checks.iter().all(|c| c.level != Level::Error), "{:?}", checks);
    }
}
