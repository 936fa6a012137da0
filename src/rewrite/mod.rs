// SPDX-License-Identifier: PMPL-1.0-or-later

//! Atomic rewriter
//!
//! Applies one file's edit list in a single pass and writes the result only
//! if the file on disk is still the one that was planned against. Locale
//! moves go through the store, add-if-absent first, then delete.

pub mod edits;

pub use edits::{Applied, Edit, EditKind, EditList, SkippedEdit};

use crate::error::NsError;
use crate::locale::{KeyLocation, LocaleStore};
use crate::plan::KeyMove;
use crate::scope::{digest_bytes, SourceText};
use crate::types::Change;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// The new text differs from the old
    pub changed: bool,
    /// The new text was written to disk
    pub written: bool,
    pub skipped: Vec<SkippedEdit>,
}

/// Apply `edits` to `source` and write the result to `path`.
///
/// Non-UTF-8 sources are never rewritten. The file's bytes are hashed
/// again right before the write; if they changed since `source` was read,
/// nothing is written.
pub fn rewrite_file(
    path: &Path,
    source: &SourceText,
    edits: &EditList,
    dry_run: bool,
) -> Result<FileOutcome, NsError> {
    if edits.is_empty() {
        return Ok(FileOutcome {
            changed: false,
            written: false,
            skipped: Vec::new(),
        });
    }
    if !source.utf8 {
        return Err(NsError::FileWrite {
            path: path.to_path_buf(),
            reason: "source is not UTF-8; left untouched".to_string(),
        });
    }

    let Applied { text, skipped } = edits.apply(&source.text)?;
    let changed = text != source.text;
    if !changed || dry_run {
        return Ok(FileOutcome {
            changed,
            written: false,
            skipped,
        });
    }

    let current = fs::read(path).map_err(|e| NsError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if digest_bytes(&current) != source.digest {
        return Err(NsError::TextMismatch {
            path: path.to_path_buf(),
            offset: 0,
            expected: "contents read at planning time".to_string(),
        });
    }

    fs::write(path, text).map_err(|e| NsError::FileWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), "source rewritten");
    Ok(FileOutcome {
        changed,
        written: true,
        skipped,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSummary {
    pub keys_moved: usize,
    pub keys_deleted: usize,
    pub changes: Vec<Change>,
}

/// Apply every move to the store. With `dry_run` the store is only read.
///
/// `keys_moved` counts moves that created the destination; a move whose
/// destination already held a value only deletes its source.
pub fn apply_moves(store: &mut LocaleStore, moves: &[KeyMove], dry_run: bool) -> MoveSummary {
    let mut summary = MoveSummary::default();
    for KeyMove { from, to } in moves {
        let (created, deleted) = if dry_run {
            preview_move(store, from, to)
        } else {
            let outcome = store.move_key(&from.namespace, &from.key, &to.namespace, &to.key);
            (outcome.created > 0, outcome.deleted > 0)
        };

        if created {
            summary.keys_moved += 1;
            summary.changes.push(Change::KeyMoved {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if deleted {
            summary.keys_deleted += 1;
            if !created {
                summary.changes.push(Change::KeyDeleted {
                    location: from.clone(),
                });
            }
        }
    }
    info!(
        moved = summary.keys_moved,
        deleted = summary.keys_deleted,
        dry_run,
        "locale moves applied"
    );
    summary
}

/// What `move_key` would do, without doing it.
fn preview_move(store: &LocaleStore, from: &KeyLocation, to: &KeyLocation) -> (bool, bool) {
    let primary = store.primary();
    let has_primary_value = primary.get(&from.namespace, &from.key).is_some()
        || primary.get(&to.namespace, &to.key).is_some();
    let mut created = false;
    let mut deleted = false;
    for locale in store.locales() {
        let has_source = locale.get(&from.namespace, &from.key).is_some();
        if locale.get(&to.namespace, &to.key).is_none() && (has_source || has_primary_value) {
            created = true;
        }
        deleted |= has_source;
    }
    (created, deleted)
}
