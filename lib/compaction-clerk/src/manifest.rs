//! The journal controller and ledger oracle: the clerk's two external collaborators beyond the
//! file store and codec.

use async_trait::async_trait;
use std::io;

use crate::candidate::{Candidate, JournalHandle, LedgerKey};

/// One entry of the manifest the controller maintains: a live journal file and its starting SQN.
#[derive(Debug, Clone)]
pub struct ManifestEntry<H> {
    pub low_sqn: u64,
    pub filename: String,
    pub handle: H,
}

/// One entry of a manifest delta produced by a job: a newly created, sealed destination file.
#[derive(Debug, Clone)]
pub struct ManifestSliceEntry<R> {
    pub start_sqn: u64,
    pub filename: String,
    pub reader_handle: R,
}

/// The ordered manifest delta a job hands to the controller.
pub type ManifestSlice<R> = Vec<ManifestSliceEntry<R>>;

/// The journal controller that owns and serializes manifest updates.
#[async_trait]
pub trait JournalController {
    type Handle: JournalHandle + Clone;
    type ReaderHandle: Send + Sync + 'static;

    /// Returns the current manifest, in ascending SQN order. The first (active write-tip) entry
    /// is the controller's concern to include; the coordinator drops it before scoring.
    async fn get_manifest(&self) -> io::Result<Vec<ManifestEntry<Self::Handle>>>;

    /// Atomically swaps `consumed` source files out of the manifest for the entries in `slice`.
    async fn update_manifest(
        &self,
        slice: ManifestSlice<Self::ReaderHandle>,
        consumed: Vec<ManifestEntry<Self::Handle>>,
    ) -> io::Result<u64>;

    /// Notifies the controller that a compaction job has finished (successfully or idly).
    async fn compaction_complete(&self);
}

/// A point-in-time snapshot of the ledger, the ground truth for "is this record still live".
///
/// `initiate` produces one of these alongside `max_sqn`, the ledger snapshot horizon.
pub trait LedgerSnapshot: Send + Sync {
    /// True iff the ledger still records exactly this `(ledger_key, sqn)` pair.
    fn is_live(&self, ledger_key: &LedgerKey, sqn: u64) -> bool;
}

/// A manifest entry promoted to a scored [`Candidate`], produced by `initiate` + `score`.
pub fn into_candidate<H: JournalHandle>(entry: ManifestEntry<H>) -> Candidate<H> {
    Candidate::new(entry.low_sqn, entry.filename, entry.handle)
}
