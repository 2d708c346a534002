//! Samples a journal file and returns a liveness percentage.

use tracing::trace;

use crate::candidate::{Candidate, RecordKind};
use crate::config::{BATCHES_TO_CHECK, CRC_SIZE};
use crate::journal_store::{FetchMode, FetchedRecord, JournalFileStore, PositionQuery};
use crate::manifest::LedgerSnapshot;

/// Scores a single candidate file, mutating its `compaction_perc` in place.
///
/// Enumerates up to `sample_size` positions, fetches them in batches of `batch_size`, and
/// classifies each as live or replaced. Transient I/O on the source read is not fatal: the scorer
/// treats such a file as 100.0 (the worst candidate, i.e. least worth compacting) and lets the
/// job proceed.
#[tracing::instrument(skip(store, ledger, candidate), fields(filename = %candidate.filename))]
pub async fn score<S>(
    store: &S,
    candidate: &mut Candidate<S::Handle>,
    ledger: &dyn LedgerSnapshot,
    max_sqn: u64,
    sample_size: usize,
    batch_size: usize,
) where
    S: JournalFileStore,
{
    let positions = match store
        .get_positions(&candidate.journal_handle, PositionQuery::Sampled(sample_size))
        .await
    {
        Ok(positions) => positions,
        Err(error) => {
            trace!(%error, "transient I/O enumerating sample positions, scoring as worst candidate");
            candidate.compaction_perc = 100.0;
            return;
        }
    };

    let mut live_payload: u64 = 0;
    let mut replaced_payload: u64 = 0;

    // Stop early once BATCHES_TO_CHECK round-trips have been made, even if the sample has more
    // positions left to fetch: past this point the ranking signal isn't worth the extra I/O.
    for chunk in positions.chunks(batch_size).take(BATCHES_TO_CHECK) {
        let fetched = match store
            .direct_fetch(&candidate.journal_handle, chunk, FetchMode::KeySize)
            .await
        {
            Ok(fetched) => fetched,
            Err(error) => {
                trace!(%error, "transient I/O fetching sample batch, scoring as worst candidate");
                candidate.compaction_perc = 100.0;
                return;
            }
        };

        for record in fetched {
            let FetchedRecord::Size(key_size) = record else {
                continue;
            };
            let payload = key_size.size.saturating_sub(CRC_SIZE as u64);
            let is_tombstone = matches!(key_size.key.kind, RecordKind::Tombstone);
            let live = is_tombstone
                || key_size.key.sqn > max_sqn
                || ledger.is_live(&key_size.key.ledger_key, key_size.key.sqn);

            if live {
                live_payload += payload;
            } else {
                replaced_payload += payload;
            }
        }
    }

    let total = live_payload + replaced_payload;
    candidate.compaction_perc = if total == 0 {
        // Empty sample: nothing to reclaim, so this is the worst (least urgent) candidate. This
        // sentinel is intentional, not an inverted default.
        100.0
    } else {
        100.0 * (live_payload as f64) / (total as f64)
    };

    trace!(perc = candidate.compaction_perc, "scored candidate");
    #[cfg(feature = "metrics")]
    metrics::counter!("compaction_candidates_scored").increment(1);
}

/// Scores every candidate in `candidates`, in place.
///
/// Never fails: a file that can't be read scores as the worst candidate (see [`score`]) rather
/// than aborting the job.
pub async fn score_all<S>(
    store: &S,
    candidates: &mut [Candidate<S::Handle>],
    ledger: &dyn LedgerSnapshot,
    max_sqn: u64,
    sample_size: usize,
    batch_size: usize,
) where
    S: JournalFileStore,
{
    for candidate in candidates.iter_mut() {
        score(store, candidate, ledger, max_sqn, sample_size, batch_size).await;
    }
}
