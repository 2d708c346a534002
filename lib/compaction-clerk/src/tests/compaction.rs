//! End-to-end coordinator tests against the in-memory fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempdir::TempDir;

use crate::candidate::{JournalKey, JournalValue, KeyDeltas, LedgerKey, ReloadAction, ReloadStrategy, RecordKind, Tag};
use crate::config::ClerkOptions;
use crate::coordinator::{run_job, Initiate, JobOutcome};
use crate::manifest::{LedgerSnapshot, ManifestEntry};

use super::fakes::{FakeController, FixedLedger, InMemoryStore, PassthroughCodec, StoredRecord};

struct FixedInitiate {
    ledger: Arc<dyn LedgerSnapshot>,
    max_sqn: u64,
}

#[async_trait]
impl Initiate for FixedInitiate {
    async fn initiate(&self) -> (Arc<dyn LedgerSnapshot>, u64) {
        (Arc::clone(&self.ledger), self.max_sqn)
    }
}

fn key(tag: u32, name: &[u8]) -> LedgerKey {
    LedgerKey {
        tag: Tag(tag),
        key: name.to_vec(),
    }
}

/// SQNs 1..8: `Key1` at 1,4,5,6,7,8, `Key2` at 2, `Key3` at 3. The ledger's current SQNs are
/// `{Key1 -> 8, Key2 -> 2, Key3 -> 3}` — the same fixture reused by the scorer and rewriter tests.
fn s3_records(corrupt_sqn: Option<u64>) -> Vec<StoredRecord> {
    (1..=8u64)
        .map(|sqn| {
            let ledger_key = match sqn {
                2 => key(0, b"Key2"),
                3 => key(0, b"Key3"),
                _ => key(0, b"Key1"),
            };
            StoredRecord {
                key: JournalKey {
                    sqn,
                    kind: RecordKind::Standard,
                    ledger_key,
                },
                value: JournalValue::Standard {
                    object: format!("Value{sqn}").into_bytes().into(),
                    key_deltas: KeyDeltas::default(),
                },
                crc_ok: corrupt_sqn != Some(sqn),
            }
        })
        .collect()
}

fn s3_ledger() -> FixedLedger {
    FixedLedger(HashMap::from([
        (b"Key1".to_vec(), 8),
        (b"Key2".to_vec(), 2),
        (b"Key3".to_vec(), 3),
    ]))
}

/// Builds a two-entry manifest: an untouched active write-tip plus the S3 source file, wires up
/// a controller and store around it, and runs one job with the given reload strategy.
async fn run_s3_job(strategy: ReloadStrategy, corrupt_sqn: Option<u64>) -> (InMemoryStore, Arc<FakeController>, JobOutcome, u32) {
    let store = InMemoryStore::new();
    let tip_handle = store.seed(
        "tip.cdb",
        vec![StoredRecord {
            key: JournalKey {
                sqn: 100,
                kind: RecordKind::Standard,
                ledger_key: key(0, b"Tip"),
            },
            value: JournalValue::Standard {
                object: bytes::Bytes::from_static(b"tip"),
                key_deltas: KeyDeltas::default(),
            },
            crc_ok: true,
        }],
    );
    let source_handle = store.seed("src.cdb", s3_records(corrupt_sqn));

    let controller = Arc::new(FakeController::new(vec![
        ManifestEntry {
            low_sqn: 100,
            filename: "tip.cdb".to_string(),
            handle: tip_handle,
        },
        ManifestEntry {
            low_sqn: 1,
            filename: "src.cdb".to_string(),
            handle: source_handle,
        },
    ]));

    let tmp = TempDir::new("compaction-clerk-test").unwrap();
    let options = ClerkOptions::from_path(tmp.path())
        .max_run_length(4)
        .reload_strategy(strategy)
        .build();

    let initiate = FixedInitiate {
        ledger: Arc::new(s3_ledger()),
        max_sqn: 9,
    };

    let outcome = run_job(&store, controller.as_ref(), &PassthroughCodec, &initiate, &options)
        .await
        .expect("job must not fail");

    (store, controller, outcome, tip_handle)
}

#[tokio::test]
async fn s4_recovr_rewrite_drops_superseded_records() {
    let (store, controller, outcome, _tip_handle) = run_s3_job(ReloadStrategy::uniform(ReloadAction::Recovr), None).await;

    let JobOutcome::Compacted { prompt_delete, .. } = outcome else {
        panic!("expected a compacted run");
    };
    assert!(prompt_delete, "no corrupt records, deletion should be permitted");

    let (slice, _consumed) = controller.last_update.lock().unwrap().clone().expect("update_manifest must be called");
    let sealed = &slice[0];
    assert_eq!(sealed.start_sqn, 2, "superseded Key1@1 dropped, Key2@2 survives first");

    let output = store.records_of(sealed.reader_handle);
    let sqns: Vec<u64> = output.iter().map(|r| r.key.sqn).collect();
    assert!(sqns.contains(&8), "Key1@8 (current) present");
    assert!(!sqns.contains(&7) && !sqns.contains(&1), "superseded Key1@7 and Key1@1 dropped entirely");

    let key2 = output.iter().find(|r| r.key.sqn == 2).expect("Key2@2 present");
    assert_eq!(key2.value, JournalValue::Standard {
        object: bytes::Bytes::from_static(b"Value2"),
        key_deltas: KeyDeltas::default(),
    });
}

#[tokio::test]
async fn s5_retain_rewrite_keeps_key_deltas_for_superseded() {
    let (store, controller, outcome, _tip_handle) = run_s3_job(ReloadStrategy::uniform(ReloadAction::Retain), None).await;

    let JobOutcome::Compacted { prompt_delete, .. } = outcome else {
        panic!("expected a compacted run");
    };
    assert!(prompt_delete);

    let (slice, _consumed) = controller.last_update.lock().unwrap().clone().unwrap();
    let sealed = &slice[0];
    assert_eq!(sealed.start_sqn, 1, "superseded Key1@1 kept as a key-deltas-only record");

    let output = store.records_of(sealed.reader_handle);
    let superseded = output.iter().find(|r| r.key.sqn == 1).expect("Key1@1 still present");
    assert!(matches!(superseded.value, JournalValue::KeyDeltas(_)), "object dropped, deltas retained");

    let key2 = output.iter().find(|r| r.key.sqn == 2).expect("Key2@2 present");
    assert_eq!(key2.value, JournalValue::Standard {
        object: bytes::Bytes::from_static(b"Value2"),
        key_deltas: KeyDeltas::default(),
    });
}

#[tokio::test]
async fn s6_corrupt_record_clears_prompt_delete_but_still_publishes() {
    let (store, controller, outcome, _tip_handle) = run_s3_job(ReloadStrategy::uniform(ReloadAction::Recovr), Some(7)).await;

    let JobOutcome::Compacted { prompt_delete, .. } = outcome else {
        panic!("expected a compacted run even with a corrupt record");
    };
    assert!(!prompt_delete, "a corrupt record must clear prompt_delete permanently");

    assert!(
        controller.last_update.lock().unwrap().is_some(),
        "manifest delta is still published despite the corrupt record"
    );
    assert!(
        store.deleted.lock().unwrap().is_empty(),
        "source file must not be scheduled for deletion when prompt_delete is false"
    );
}

#[tokio::test]
async fn rewrite_is_idempotent_against_the_same_ledger_snapshot() {
    let (store, controller, outcome, tip_handle) = run_s3_job(ReloadStrategy::uniform(ReloadAction::Recovr), None).await;
    let JobOutcome::Compacted { .. } = outcome else {
        panic!("expected the first job to compact");
    };

    let (slice, _consumed) = controller.last_update.lock().unwrap().clone().expect("first job must publish a delta");
    let produced = &slice[0];

    // Build the manifest a controller would hold after applying that delta: the untouched tip
    // plus the single freshly produced file, nothing left to compact.
    let controller = Arc::new(FakeController::new(vec![
        ManifestEntry {
            low_sqn: 100,
            filename: "tip.cdb".to_string(),
            handle: tip_handle,
        },
        ManifestEntry {
            low_sqn: produced.start_sqn,
            filename: produced.filename.clone(),
            handle: produced.reader_handle,
        },
    ]));

    let tmp = TempDir::new("compaction-clerk-test-idempotence").unwrap();
    let options = ClerkOptions::from_path(tmp.path())
        .max_run_length(4)
        .reload_strategy(ReloadStrategy::uniform(ReloadAction::Recovr))
        .build();
    let initiate = FixedInitiate {
        ledger: Arc::new(s3_ledger()),
        max_sqn: 9,
    };

    let second = run_job(&store, controller.as_ref(), &PassthroughCodec, &initiate, &options)
        .await
        .expect("second job must not fail");

    assert!(
        matches!(second, JobOutcome::Idle),
        "every surviving record is live under the same ledger snapshot, so no further work is worth doing"
    );
}
