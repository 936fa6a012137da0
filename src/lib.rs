// SPDX-License-Identifier: PMPL-1.0-or-later

//! nsguard: translation namespace consistency for scoped i18n accessors.
//!
//! Source files bind a namespace to a local accessor
//! (`const t = useTranslations("blog")`) and call it with bare keys
//! (`t("title")`). nsguard resolves every call to the binding that is
//! actually in scope, checks the key against the primary locale, and
//! repairs mismatches in both the locale files and the sources.
//!
//! PIPELINE:
//! 1. **locale**: loads every locale file, primary first, with lazily
//!    derived key and value indices.
//! 2. **scope**: lexes each source file into a scope tree and resolves
//!    calls to bindings by walking ancestors.
//! 3. **detect**: classifies calls into issues.
//! 4. **plan**: consolidates duplicate values and batches per-file edits.
//! 5. **rewrite**: applies edit lists in one pass and moves locale keys.

pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod locale;
pub mod plan;
pub mod report;
pub mod rewrite;
pub mod scope;
pub mod types;

pub use config::Config;
pub use engine::{ApplyOptions, Engine};
pub use error::{ErrorKind, FileError, NsError};
pub use locale::{KeyLocation, Locale, LocaleStore};
pub use types::{AnalysisResult, ApplyResult, Change, DuplicateGroup, Issue, IssueKind, Stats};
