//! Data model shared by every component of the clerk: candidates, journal keys/values, and the
//! per-tag reload strategy.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A classifier carried inside the ledger key, selecting which [`ReloadAction`] governs a
/// superseded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub u32);

/// The three kinds a journal record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Standard,
    Tombstone,
    KeyDeltas,
}

/// The user-facing key embedded in a journal key, carrying the [`Tag`] that selects a reload
/// strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub tag: Tag,
    pub key: Vec<u8>,
}

/// Uniquely identifies a journal record by `(sqn, kind, ledger_key)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalKey {
    pub sqn: u64,
    pub kind: RecordKind,
    pub ledger_key: LedgerKey,
}

impl JournalKey {
    pub fn tag(&self) -> Tag {
        self.ledger_key.tag
    }
}

/// Key deltas: index-side changes associated with an object write, retainable independently of
/// the object value itself.
///
/// `Bytes` rather than `Vec<u8>`: a record's deltas are read once off disk and then shared, not
/// mutated, across the filter and rewriter as the record is classified and re-emitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyDeltas(pub Bytes);

/// The on-disk value half of a journal record, prior to the trailing CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalValue {
    Standard {
        object: Bytes,
        key_deltas: KeyDeltas,
    },
    Tombstone,
    KeyDeltas(KeyDeltas),
}

/// Policy per tag governing whether, and how, a superseded record may be discarded.
///
/// A small closed sum dispatched by tagged-variant match in the filter, not string keys or
/// virtual dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadAction {
    /// Drop the object but keep the key deltas, emitted as a `KeyDeltas`-only record at the
    /// original SQN.
    Retain,
    /// Drop the entire record; deltas can be regenerated from the object on reload.
    Recalc,
    /// Drop the entire record; loss of deltas is accepted, external anti-entropy recovers them.
    Recovr,
}

/// Mapping `tag -> ReloadAction`, with a default action for tags that have no explicit entry.
///
/// Held as ordinary construction-time configuration (see [`crate::config::ClerkOptions`]), never
/// as a process-wide static, so tests stay hermetic.
#[derive(Debug, Clone)]
pub struct ReloadStrategy {
    default_action: ReloadAction,
    overrides: HashMap<Tag, ReloadAction>,
}

impl ReloadStrategy {
    /// Builds a strategy from an explicit tag map and a fallback for unmapped tags.
    pub fn new(overrides: HashMap<Tag, ReloadAction>, default_action: ReloadAction) -> Self {
        Self {
            default_action,
            overrides,
        }
    }

    /// A strategy that applies one action to every tag.
    pub fn uniform(action: ReloadAction) -> Self {
        Self {
            default_action: action,
            overrides: HashMap::new(),
        }
    }

    pub fn action_for(&self, tag: Tag) -> ReloadAction {
        self.overrides.get(&tag).copied().unwrap_or(self.default_action)
    }
}

impl Default for ReloadStrategy {
    /// The system default: `recovr` for every tag.
    ///
    /// `recovr` is the cheapest action (drops deltas outright, relies on external anti-entropy):
    /// compaction reclaims space aggressively by default unless a caller opts a tag into
    /// `retain`/`recalc`.
    fn default() -> Self {
        Self::uniform(ReloadAction::Recovr)
    }
}

/// Opaque handle to a journal file, owned by the journal controller.
///
/// No cycles, no graph walk through this — just a handle the clerk passes around and eventually
/// hands back via `delete_pending`. Blanket-implemented for any type that already satisfies the
/// bound, so a plain process id, file descriptor, or capability object qualifies without an
/// explicit `impl`.
pub trait JournalHandle: fmt::Debug + Send + Sync + 'static {}

impl<T: fmt::Debug + Send + Sync + 'static> JournalHandle for T {}

/// One journal file eligible for compaction.
///
/// `compaction_perc` starts undefined until [`crate::scorer::score`] runs; a freshly enumerated
/// candidate carries the "unscored" sentinel and is filled in during the scoring pass.
#[derive(Debug, Clone)]
pub struct Candidate<H: JournalHandle> {
    pub low_sqn: u64,
    pub filename: String,
    pub journal_handle: H,
    pub compaction_perc: f64,
}

impl<H: JournalHandle> Candidate<H> {
    pub fn new(low_sqn: u64, filename: String, journal_handle: H) -> Self {
        Self {
            low_sqn,
            filename,
            journal_handle,
            // A freshly constructed candidate has not been scored yet; 100.0 is also the correct
            // sentinel for "nothing sampled", so an unscored candidate and an empty-sample
            // candidate are indistinguishable, which is intentional: both mean "do not
            // prioritize this file".
            compaction_perc: 100.0,
        }
    }
}
