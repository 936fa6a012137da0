// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scope resolver
//!
//! Best-effort static scope model of one source file: a tolerant lexer,
//! a brace-driven scope tree, and binding/call discovery on top. A call
//! resolves to the nearest preceding binding of the same accessor in its
//! own scope or the closest ancestor scope declaring one.

pub mod lexer;
pub mod resolver;
pub mod tree;

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::error::NsError;

pub use resolver::{is_accessor_name, Binding, CallSite, FileScan, LineIndex, LocalDecl, ResolvedCall};
pub use tree::{Scope, ScopeId, ScopeKind, ScopeTree, ROOT};

/// Source text as read from disk.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    /// False when the file was decoded from Windows-1252; such files are
    /// analysed but never rewritten.
    pub utf8: bool,
    /// BLAKE3 of the raw bytes, checked again before any write
    pub digest: String,
}

/// Read a source file: UTF-8 first, then Latin-1 fallback.
pub fn read_source(path: &Path) -> Result<SourceText> {
    let raw_bytes = fs::read(path).map_err(|e| NsError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let digest = digest_bytes(&raw_bytes);

    match String::from_utf8(raw_bytes) {
        Ok(text) => Ok(SourceText {
            text,
            utf8: true,
            digest,
        }),
        Err(err) => {
            let raw_bytes = err.into_bytes();
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&raw_bytes);
            if had_errors {
                return Err(NsError::FileRead {
                    path: path.to_path_buf(),
                    reason: "neither UTF-8 nor Latin-1".to_string(),
                }
                .into());
            }
            Ok(SourceText {
                text: cow.into_owned(),
                utf8: false,
                digest,
            })
        }
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
