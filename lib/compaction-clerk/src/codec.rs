//! The wire codec — an external collaborator responsible for the on-disk representation of
//! journal keys and values. The filter and rewriter call through this trait rather than assuming
//! a concrete encoding.

use crate::candidate::{JournalKey, JournalValue, LedgerKey, ReloadAction};

/// Result of asking the codec to compact a value under a given strategy.
pub enum CompactedValue {
    /// The record should be dropped entirely.
    Skip,
    /// The record survives, in the given tag's strategy, as this (possibly rewritten) value.
    Keep {
        action: ReloadAction,
        value: JournalValue,
    },
}

/// Codec operations the filter and rewriter depend on.
pub trait Codec {
    /// Applies `strategy` to `value`, returning the value to keep (if any) and which action was
    /// taken. The strategy lookup itself (`tag -> action`) happens before this call, in the
    /// filter.
    fn compact_value(&self, value: &JournalValue, action: ReloadAction) -> CompactedValue;

    /// Splits a journal key into its SQN and ledger key.
    fn from_journal_key(&self, key: &JournalKey) -> (u64, LedgerKey) {
        (key.sqn, key.ledger_key.clone())
    }
}
