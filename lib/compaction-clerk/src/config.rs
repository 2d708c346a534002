use crate::candidate::ReloadStrategy;

/// Target score a run of length 1 must beat in order to be worth compacting.
pub const SFCT: f64 = 60.0;
/// Target score the maximum-length run is allowed, in exchange for amortizing I/O over more files.
pub const MRCT: f64 = 80.0;

/// Number of record positions sampled by the scorer per candidate file.
pub const SAMPLE_SIZE: usize = 200;
/// Number of positions fetched from the file store per round-trip, both when scoring and
/// rewriting.
pub const BATCH_SIZE: usize = 32;
/// Number of batches the scorer is willing to check per candidate before stopping early.
pub const BATCHES_TO_CHECK: usize = 8;
/// Fixed per-record CRC trailer size subtracted out of payload sizes when scoring.
pub const CRC_SIZE: usize = 4;
/// Extension used for newly created destination files.
pub const FILE_EXTENSION: &str = "cdb";
/// Default cap on the number of consecutive files a single job will compact together.
pub const DEFAULT_MAX_RUN_LENGTH: usize = 4;

/// Builder for [`ClerkOptions`].
///
/// Private fields defaulted at `build()` time rather than scattered through the constructor.
pub struct ClerkOptionsBuilder {
    max_run_length: Option<usize>,
    reload_strategy: Option<ReloadStrategy>,
    file_path: Option<std::path::PathBuf>,
}

impl ClerkOptionsBuilder {
    /// Sets the cap on contiguous files considered for a single compaction run.
    ///
    /// Defaults to [`DEFAULT_MAX_RUN_LENGTH`].
    #[must_use]
    pub fn max_run_length(mut self, amount: usize) -> Self {
        self.max_run_length = Some(amount);
        self
    }

    /// Sets the per-tag reload strategy.
    ///
    /// Defaults to the system default strategy (see [`ReloadStrategy::default`]).
    #[must_use]
    pub fn reload_strategy(mut self, strategy: ReloadStrategy) -> Self {
        self.reload_strategy = Some(strategy);
        self
    }

    /// Sets the directory new destination files are created in.
    #[must_use]
    pub fn file_path<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Consumes this builder and constructs a [`ClerkOptions`].
    #[must_use]
    pub fn build(self) -> ClerkOptions {
        ClerkOptions {
            max_run_length: self.max_run_length.unwrap_or(DEFAULT_MAX_RUN_LENGTH),
            reload_strategy: self.reload_strategy.unwrap_or_default(),
            file_path: self.file_path.unwrap_or_else(|| ".".into()),
        }
    }
}

/// Construction-time configuration for a compaction clerk.
///
/// Held for the clerk's lifetime as immutable configuration; never mutated once the clerk is
/// running.
#[derive(Debug, Clone)]
pub struct ClerkOptions {
    pub(crate) max_run_length: usize,
    pub(crate) reload_strategy: ReloadStrategy,
    pub(crate) file_path: std::path::PathBuf,
}

impl ClerkOptions {
    /// Starts building a [`ClerkOptions`] rooted at the given CDB directory.
    pub fn from_path<P: Into<std::path::PathBuf>>(path: P) -> ClerkOptionsBuilder {
        ClerkOptionsBuilder {
            max_run_length: None,
            reload_strategy: None,
            file_path: Some(path.into()),
        }
    }

    pub fn max_run_length(&self) -> usize {
        self.max_run_length
    }

    pub fn reload_strategy(&self) -> &ReloadStrategy {
        &self.reload_strategy
    }

    pub fn file_path(&self) -> &std::path::Path {
        &self.file_path
    }
}
