//! The journal compaction clerk
//!
//! This crate implements the compaction job orchestrator for a log-structured key-value store's
//! journal: it selects which consecutive journal files to compact by sampling and scoring them,
//! rewrites those files applying per-record retention rules driven by a pluggable reload strategy,
//! and produces a manifest delta the journal owner applies atomically.
//!
//! The file format, its hash-table index, the ledger snapshot, and the journal owner are external
//! collaborators, specified here as traits ([`journal_store::JournalFileStore`],
//! [`manifest::LedgerSnapshot`], [`manifest::JournalController`], [`codec::Codec`]) rather than
//! implemented by this crate.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod candidate;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod hashtable;
pub mod journal_store;
pub mod manifest;
pub mod planner;
pub mod rewriter;
pub mod scorer;

#[cfg(test)]
mod tests;

pub use candidate::{Candidate, JournalKey, JournalValue, LedgerKey, ReloadAction, ReloadStrategy, Tag};
pub use config::{ClerkOptions, ClerkOptionsBuilder};
pub use coordinator::{Clerk, Initiate, JobOutcome};
pub use error::ClerkError;
