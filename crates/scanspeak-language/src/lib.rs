//! Heuristic language identification for short transcribed utterances.
//!
//! Everything here is pure and synchronous: script-range matching, Latin
//! keyword tables, a character-frequency fallback, plus the small lookup
//! tables the acquisition engine and UI need around a language tag.

pub mod classifier;
pub mod labels;
pub mod reconcile;

pub use classifier::classify;
pub use labels::{display_label, recognition_locale};
pub use reconcile::{normalize_service_language, reconcile, Reconciliation};
