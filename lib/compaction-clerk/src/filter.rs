//! Per-record retention decision: what a rewrite does with one fetched record.

use crate::candidate::{JournalValue, RecordKind, ReloadAction, ReloadStrategy};
use crate::codec::{Codec, CompactedValue};
use crate::journal_store::KeyValueRecord;
use crate::manifest::LedgerSnapshot;

/// What should happen to one fetched record during a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Live: carry the record forward unchanged.
    KeepOriginal,
    /// Superseded, but the tag's reload strategy keeps a transformed value in its place.
    KeepCompacted(JournalValue),
    /// Superseded and the tag's reload strategy says to drop it outright.
    Drop,
    /// The record's trailing CRC did not validate.
    Corrupt,
}

/// Classifies one fetched record against the ledger, the SQN horizon, and the tag's reload
/// strategy: corruption first, then liveness, then the strategy's action for superseded records.
pub fn classify<C: Codec>(
    codec: &C,
    record: &KeyValueRecord,
    strategy: &ReloadStrategy,
    ledger: &dyn LedgerSnapshot,
    max_sqn: u64,
) -> Decision {
    if !record.crc_ok {
        return Decision::Corrupt;
    }

    let (sqn, ledger_key) = codec.from_journal_key(&record.key);

    // Tombstones are always considered live by this core: never reaped here.
    let key_valid = matches!(record.key.kind, RecordKind::Tombstone) || ledger.is_live(&ledger_key, sqn);

    if key_valid || sqn > max_sqn {
        return Decision::KeepOriginal;
    }

    let action = strategy.action_for(record.key.tag());
    match codec.compact_value(&record.value, action) {
        CompactedValue::Skip => Decision::Drop,
        CompactedValue::Keep { value, .. } => Decision::KeepCompacted(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{JournalKey, LedgerKey, Tag};

    struct FixedLedger {
        live_sqn: Option<u64>,
    }

    impl LedgerSnapshot for FixedLedger {
        fn is_live(&self, _ledger_key: &LedgerKey, sqn: u64) -> bool {
            self.live_sqn == Some(sqn)
        }
    }

    struct FakeCodec;

    impl Codec for FakeCodec {
        fn compact_value(&self, _value: &JournalValue, action: ReloadAction) -> CompactedValue {
            match action {
                ReloadAction::Retain => CompactedValue::Keep {
                    action,
                    value: JournalValue::KeyDeltas(Default::default()),
                },
                ReloadAction::Recalc | ReloadAction::Recovr => CompactedValue::Skip,
            }
        }
    }

    fn record(sqn: u64, kind: RecordKind, crc_ok: bool) -> KeyValueRecord {
        KeyValueRecord {
            key: JournalKey {
                sqn,
                kind,
                ledger_key: LedgerKey {
                    tag: Tag(0),
                    key: b"k".to_vec(),
                },
            },
            value: JournalValue::Standard {
                object: bytes::Bytes::from_static(b"v"),
                key_deltas: Default::default(),
            },
            crc_ok,
        }
    }

    #[test]
    fn corrupt_record_always_wins() {
        let ledger = FixedLedger { live_sqn: Some(5) };
        let decision = classify(
            &FakeCodec,
            &record(5, RecordKind::Standard, false),
            &ReloadStrategy::uniform(ReloadAction::Recovr),
            &ledger,
            100,
        );
        assert_eq!(decision, Decision::Corrupt);
    }

    #[test]
    fn live_record_kept_original() {
        let ledger = FixedLedger { live_sqn: Some(5) };
        let decision = classify(
            &FakeCodec,
            &record(5, RecordKind::Standard, true),
            &ReloadStrategy::uniform(ReloadAction::Recovr),
            &ledger,
            100,
        );
        assert_eq!(decision, Decision::KeepOriginal);
    }

    #[test]
    fn above_horizon_kept_even_if_superseded() {
        let ledger = FixedLedger { live_sqn: None };
        let decision = classify(
            &FakeCodec,
            &record(50, RecordKind::Standard, true),
            &ReloadStrategy::uniform(ReloadAction::Recovr),
            &ledger,
            10,
        );
        assert_eq!(decision, Decision::KeepOriginal);
    }

    #[test]
    fn tombstone_always_kept() {
        let ledger = FixedLedger { live_sqn: None };
        let decision = classify(
            &FakeCodec,
            &record(1, RecordKind::Tombstone, true),
            &ReloadStrategy::uniform(ReloadAction::Recovr),
            &ledger,
            100,
        );
        assert_eq!(decision, Decision::KeepOriginal);
    }

    #[test]
    fn superseded_recovr_drops() {
        let ledger = FixedLedger { live_sqn: None };
        let decision = classify(
            &FakeCodec,
            &record(1, RecordKind::Standard, true),
            &ReloadStrategy::uniform(ReloadAction::Recovr),
            &ledger,
            100,
        );
        assert_eq!(decision, Decision::Drop);
    }

    #[test]
    fn superseded_retain_keeps_key_deltas() {
        let ledger = FixedLedger { live_sqn: None };
        let decision = classify(
            &FakeCodec,
            &record(1, RecordKind::Standard, true),
            &ReloadStrategy::uniform(ReloadAction::Retain),
            &ledger,
            100,
        );
        assert_eq!(decision, Decision::KeepCompacted(JournalValue::KeyDeltas(Default::default())));
    }
}
