// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy
//!
//! Only [`NsError::Config`] is fatal to an analysis run. Everything else is
//! recovered per file and surfaced as a [`FileError`] in the result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read {path}: {reason}")]
    FileRead { path: PathBuf, reason: String },

    #[error("cannot write {path}: {reason}")]
    FileWrite { path: PathBuf, reason: String },

    #[error("text mismatch in {path} at offset {offset}: expected {expected:?}")]
    TextMismatch {
        path: PathBuf,
        offset: usize,
        expected: String,
    },

    /// Two edits in one batch touch the same span. Always a planner bug.
    #[error("overlapping edits at offsets {first} and {second}")]
    OverlappingEdits { first: usize, second: usize },

    #[error("ambiguous scope for `{accessor}` at {path}:{line}")]
    UnresolvableAmbiguity {
        path: PathBuf,
        accessor: String,
        line: usize,
    },
}

impl NsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NsError::Config(_) => ErrorKind::Config,
            NsError::FileRead { .. } => ErrorKind::FileRead,
            NsError::FileWrite { .. } => ErrorKind::FileWrite,
            NsError::TextMismatch { .. } => ErrorKind::TextMismatch,
            NsError::OverlappingEdits { .. } => ErrorKind::OverlappingEdits,
            NsError::UnresolvableAmbiguity { .. } => ErrorKind::UnresolvableAmbiguity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    FileRead,
    FileWrite,
    TextMismatch,
    OverlappingEdits,
    UnresolvableAmbiguity,
}

/// A recovered, per-file failure recorded in analysis and apply results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&NsError> for FileError {
    fn from(err: &NsError) -> Self {
        let path = match err {
            NsError::FileRead { path, .. }
            | NsError::FileWrite { path, .. }
            | NsError::TextMismatch { path, .. }
            | NsError::UnresolvableAmbiguity { path, .. } => path.clone(),
            NsError::Config(_) | NsError::OverlappingEdits { .. } => PathBuf::new(),
        };
        FileError {
            path,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}
