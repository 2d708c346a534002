//! Drives a single compaction job end-to-end, and hosts the clerk's task + mailbox.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::candidate::Candidate;
use crate::codec::Codec;
use crate::config::{ClerkOptions, BATCH_SIZE, SAMPLE_SIZE};
use crate::error::{ClerkError, CoordinatorError, JobSnafu, ManifestSnafu, RewriteSnafu, UpdateManifestSnafu};
use crate::journal_store::JournalFileStore;
use crate::manifest::{into_candidate, JournalController, LedgerSnapshot, ManifestEntry};
use crate::planner;
use crate::rewriter;
use crate::scorer;

/// Supplies a ledger snapshot and its SQN horizon at the start of a job.
///
/// Typically implemented by snapshotting the ledger behind a `checker` reference the caller
/// controls; the core treats the snapshot as opaque beyond [`LedgerSnapshot::is_live`].
#[async_trait]
pub trait Initiate: Send + Sync {
    async fn initiate(&self) -> (Arc<dyn LedgerSnapshot>, u64);
}

/// Outcome of one job.
///
/// The controller learns this via its own `compaction_complete`/`update_manifest` callbacks;
/// this type exists so tests (and callers who want it) can observe the outcome directly.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// No run scored positively; nothing was rewritten.
    Idle,
    /// A run was compacted and the manifest delta published.
    Compacted { manifest_sqn: u64, prompt_delete: bool },
}

/// Runs a single compaction job to completion against the given collaborators.
#[instrument(skip_all)]
pub async fn run_job<S, J, C>(
    store: &S,
    controller: &J,
    codec: &C,
    initiate: &dyn Initiate,
    options: &ClerkOptions,
) -> Result<JobOutcome, CoordinatorError>
where
    S: JournalFileStore,
    J: JournalController<Handle = S::Handle, ReaderHandle = S::Reader>,
    C: Codec,
{
    let mut manifest = controller.get_manifest().await.context(ManifestSnafu)?;
    if manifest.is_empty() {
        controller.compaction_complete().await;
        return Ok(JobOutcome::Idle);
    }
    // The head entry is the active write-tip: never a compaction candidate.
    manifest.remove(0);

    let (ledger, max_sqn) = initiate.initiate().await;

    let mut candidates: Vec<Candidate<S::Handle>> = manifest.iter().cloned().map(into_candidate).collect();
    scorer::score_all(store, &mut candidates, ledger.as_ref(), max_sqn, SAMPLE_SIZE, BATCH_SIZE).await;

    let mut run = planner::plan(&candidates, options.max_run_length());
    if planner::score_run(&run, options.max_run_length()) <= 0.0 {
        info!("no run scored positively, idling");
        controller.compaction_complete().await;
        return Ok(JobOutcome::Idle);
    }

    // Defensive: the planner already returns a contiguous, ascending-`low_sqn` slice, but the
    // coordinator re-sorts rather than trust that invariant silently.
    run.sort_by_key(|c| c.low_sqn);

    let (slice, prompt_delete) = rewriter::rewrite(
        store,
        codec,
        &run,
        options.reload_strategy(),
        ledger.as_ref(),
        max_sqn,
        options.file_path(),
    )
    .await
    .context(RewriteSnafu)?;

    let consumed: Vec<ManifestEntry<S::Handle>> = manifest
        .into_iter()
        .filter(|entry| run.iter().any(|c| c.low_sqn == entry.low_sqn))
        .collect();

    let manifest_sqn = controller
        .update_manifest(slice, consumed.clone())
        .await
        .context(UpdateManifestSnafu)?;

    controller.compaction_complete().await;

    if prompt_delete {
        for entry in consumed {
            store.delete_pending(entry.handle, manifest_sqn).await;
        }
    } else {
        warn!("prompt_delete cleared by a corrupt record; consumed sources retained for forensics");
    }

    #[cfg(feature = "metrics")]
    metrics::counter!("compaction_jobs_completed").increment(1);

    Ok(JobOutcome::Compacted { manifest_sqn, prompt_delete })
}

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Message {
    Job(BoxedJob),
    Stop,
}

/// A long-lived compaction clerk instance: one worker task with a bounded inbox, processing
/// `compact` and `stop` messages serially and owning all mutable state.
///
/// `hashtable_calc` is deliberately not a method here — it shares no state with compaction and
/// has its own one-shot lifecycle (see [`crate::hashtable`]).
pub struct Clerk<S, J, C> {
    store: Arc<S>,
    controller: Arc<J>,
    codec: Arc<C>,
    options: Arc<ClerkOptions>,
    sender: mpsc::Sender<Message>,
}

impl<S, J, C> Clerk<S, J, C>
where
    S: JournalFileStore + Send + Sync + 'static,
    J: JournalController<Handle = S::Handle, ReaderHandle = S::Reader> + Send + Sync + 'static,
    C: Codec + Send + Sync + 'static,
{
    /// Spawns the clerk's worker task and returns a handle to it.
    pub fn new(store: S, controller: J, codec: C, options: ClerkOptions) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Message>(16);
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    Message::Job(job) => job.await,
                    Message::Stop => break,
                }
            }
        });

        Self {
            store: Arc::new(store),
            controller: Arc::new(controller),
            codec: Arc::new(codec),
            options: Arc::new(options),
            sender,
        }
    }

    /// Fire-and-forget compaction request; queues behind any job already in flight.
    ///
    /// The result is published to the controller via its own callbacks, never returned here.
    /// `timeout` is accepted but not honored today; a future revision that adds real deadline
    /// enforcement should still accept and thread this parameter through rather than drop it
    /// from the signature.
    pub async fn compact<I>(&self, initiate: Arc<I>, _timeout: Option<Duration>)
    where
        I: Initiate + 'static,
    {
        let store = Arc::clone(&self.store);
        let controller = Arc::clone(&self.controller);
        let codec = Arc::clone(&self.codec);
        let options = Arc::clone(&self.options);

        let job: BoxedJob = Box::pin(async move {
            let outcome: Result<JobOutcome, ClerkError> = run_job(
                store.as_ref(),
                controller.as_ref(),
                codec.as_ref(),
                initiate.as_ref(),
                options.as_ref(),
            )
            .await
            .context(JobSnafu);

            // No error climbs above the job boundary: `compact` is fire-and-forget, so a failed
            // job is wrapped into the crate's top-level error type purely to log it uniformly,
            // not to propagate it to a caller.
            if let Err(error) = outcome {
                error!(%error, "compaction job failed, no manifest delta published");
            }
        });

        if self.sender.send(Message::Job(job)).await.is_err() {
            warn!("clerk worker task has already exited; dropping compact request");
        }
    }

    /// Orderly shutdown: the worker drains whatever is queued ahead of this message, then exits.
    /// No in-flight job is interrupted.
    pub async fn stop(&self) {
        let _ = self.sender.send(Message::Stop).await;
    }
}
