use std::io;

use snafu::Snafu;

/// Error that occurred while rewriting a chosen compaction run.
#[derive(Debug, Snafu)]
pub enum RewriterError {
    /// Fetching a batch of records from a source file failed.
    #[snafu(display("failed to fetch batch from source: {}", source))]
    Fetch { source: io::Error },

    /// Opening or writing to a destination file failed.
    ///
    /// Per the job's failure semantics, this is fatal: no manifest delta is published and any
    /// destination files already written are orphaned for external cleanup.
    #[snafu(display("failed to write destination file: {}", source))]
    Write { source: io::Error },

    /// Sealing (flush + reopen read-only + read first key) a destination file failed.
    #[snafu(display("failed to seal destination file: {}", source))]
    Seal { source: io::Error },
}

/// Error that occurred while the job coordinator drove a job end-to-end.
#[derive(Debug, Snafu)]
pub enum CoordinatorError {
    /// Fetching the manifest from the journal controller failed.
    #[snafu(display("failed to fetch manifest: {}", source))]
    Manifest { source: io::Error },

    /// Rewriting the chosen run failed fatally.
    #[snafu(display("failed to rewrite chosen run: {}", source))]
    Rewrite { source: RewriterError },

    /// Submitting the manifest delta to the controller failed.
    #[snafu(display("failed to submit manifest update: {}", source))]
    UpdateManifest { source: io::Error },
}

/// Top-level error surfaced by the clerk's public, cast-only API.
///
/// No error climbs above the job boundary: a [`CoordinatorError`] that reaches here means
/// the job terminated without publishing a manifest delta, and the clerk logs it and returns to
/// idle rather than propagating it to a caller (there is no caller to propagate it to — `compact`
/// is fire-and-forget).
#[derive(Debug, Snafu)]
pub enum ClerkError {
    /// A job failed; see the wrapped error for the stage at which it failed.
    #[snafu(display("compaction job failed: {}", source))]
    Job { source: CoordinatorError },

    /// A synchronous call was made against a cast-only API.
    #[snafu(display("{} is not supported as a synchronous call", what))]
    NotSupported { what: &'static str },
}
