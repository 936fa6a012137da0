// SPDX-License-Identifier: PMPL-1.0-or-later

//! Locale store
//!
//! Holds every locale of the corpus in memory with the primary locale
//! first, and derives the key and value indices the detector and planner
//! consult.

pub mod namespace;
pub mod normalize;
pub mod store;

pub use normalize::normalize_value;
pub use store::{
    Entries, KeyIndex, KeyLocation, Locale, LocaleStore, MoveOutcome, Namespace, OrphanKey,
    ValueIndex,
};
