//! Streams survivors from a chosen run through the filter into fresh destination files.

use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::candidate::{Candidate, JournalKey, JournalValue, ReloadStrategy};
use crate::codec::Codec;
use crate::config::{BATCH_SIZE, FILE_EXTENSION};
use crate::error::{FetchSnafu, RewriterError, SealSnafu, WriteSnafu};
use crate::filter::{self, Decision};
use crate::journal_store::{FetchMode, FetchedRecord, JournalFileStore, PositionQuery, WriteOutcome};
use crate::manifest::{LedgerSnapshot, ManifestSlice, ManifestSliceEntry};

/// Rewrites every source file in `run` through the filter, writing survivors into one or more
/// freshly created destination files, in source order.
///
/// Returns the manifest slice describing the destinations produced and the job-wide
/// `prompt_delete` flag (cleared permanently the first time a corrupt record is seen).
///
/// Rollover is checked once per batch rather than per record: `mput` is handed an entire batch's
/// survivors at a time, and a `Roll` outcome seals the destination before the next batch opens a
/// fresh one. A destination can therefore end up slightly over its nominal size limit by up to
/// one batch; the file store's format-imposed limit is expected to leave headroom for this.
#[tracing::instrument(skip_all, fields(run_len = run.len()))]
pub async fn rewrite<S, C>(
    store: &S,
    codec: &C,
    run: &[Candidate<S::Handle>],
    strategy: &ReloadStrategy,
    ledger: &dyn LedgerSnapshot,
    max_sqn: u64,
    file_path: &Path,
) -> Result<(ManifestSlice<S::Reader>, bool), RewriterError>
where
    S: JournalFileStore,
    C: Codec,
{
    let mut slice: ManifestSlice<S::Reader> = Vec::new();
    let mut prompt_delete = true;
    let mut active_writer: Option<S::Writer> = None;

    for candidate in run {
        let positions = store
            .get_positions(&candidate.journal_handle, PositionQuery::All)
            .await
            .context(FetchSnafu)?;

        for chunk in positions.chunks(BATCH_SIZE) {
            let fetched = store
                .direct_fetch(&candidate.journal_handle, chunk, FetchMode::KeyValueCheck)
                .await
                .context(FetchSnafu)?;

            let mut survivors: Vec<(JournalKey, JournalValue)> = Vec::new();
            for record in fetched {
                let FetchedRecord::Full(kvr) = record else {
                    continue;
                };
                match filter::classify(codec, &kvr, strategy, ledger, max_sqn) {
                    Decision::KeepOriginal => survivors.push((kvr.key, kvr.value)),
                    Decision::KeepCompacted(value) => survivors.push((kvr.key, value)),
                    Decision::Drop => {}
                    Decision::Corrupt => {
                        prompt_delete = false;
                        tracing::warn!(sqn = kvr.key.sqn, "dropping corrupt record, source retained");
                        #[cfg(feature = "metrics")]
                        metrics::counter!("compaction_records_dropped_corrupt").increment(1);
                    }
                }
            }

            if survivors.is_empty() {
                continue;
            }

            if active_writer.is_none() {
                let path = destination_path(file_path, survivors[0].0.sqn);
                active_writer = Some(store.open_writer(&path).await.context(WriteSnafu)?);
            }

            let writer = active_writer.as_mut().expect("just opened above");
            let outcome = store.mput(writer, &survivors).await.context(WriteSnafu)?;

            if outcome == WriteOutcome::Roll {
                let writer = active_writer.take().expect("checked above");
                slice.push(seal(store, writer).await?);
            }
        }
    }

    if let Some(writer) = active_writer.take() {
        slice.push(seal(store, writer).await?);
    }

    Ok((slice, prompt_delete))
}

fn destination_path(file_path: &Path, first_sqn: u64) -> PathBuf {
    file_path.join(format!("{first_sqn}-compact.{FILE_EXTENSION}"))
}

/// Flushes, reopens read-only, and reads the first key of a completed destination, producing its
/// manifest entry.
async fn seal<S>(store: &S, writer: S::Writer) -> Result<ManifestSliceEntry<S::Reader>, RewriterError>
where
    S: JournalFileStore,
{
    let path = store.complete(writer).await.context(SealSnafu)?;
    let reader = store.open_reader(&path).await.context(SealSnafu)?;
    let first_key = store.first_key(&reader).await.context(SealSnafu)?;
    Ok(ManifestSliceEntry {
        start_sqn: first_key.sqn,
        filename: path.to_string_lossy().into_owned(),
        reader_handle: reader,
    })
}
