//! The append-only file store and its hash-table index — an external collaborator the clerk
//! depends on but does not own. This module only specifies the interface the clerk needs; the
//! concrete CDB format and its on-disk hash index live outside this crate's scope.

use async_trait::async_trait;
use std::io;

use crate::candidate::{JournalHandle, JournalKey};

/// How many positions to enumerate from a file.
#[derive(Debug, Clone, Copy)]
pub enum PositionQuery {
    /// Sample up to `n` positions, uniformly spread across the file.
    Sampled(usize),
    /// Every position in the file.
    All,
}

/// What a batched `direct_fetch` should return for each requested position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Key and on-disk record size only — enough to score a file without paying for value
    /// decoding.
    KeySize,
    /// Key, value, and whether the trailing CRC validated.
    KeyValueCheck,
}

/// A `(journal_key, record_size)` pair, as returned by a `KeySize` fetch.
#[derive(Debug, Clone)]
pub struct KeySize {
    pub key: JournalKey,
    pub size: u64,
}

/// A `(journal_key, value, crc_ok)` triple, as returned by a `KeyValueCheck` fetch.
#[derive(Debug, Clone)]
pub struct KeyValueRecord {
    pub key: JournalKey,
    pub value: crate::candidate::JournalValue,
    pub crc_ok: bool,
}

/// What a batched fetch can come back as.
#[derive(Debug, Clone)]
pub enum FetchedRecord {
    Size(KeySize),
    Full(KeyValueRecord),
}

/// Whether a write reached the destination's size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    /// The destination has reached its format-imposed size limit and must be sealed; the caller
    /// should open a fresh destination for any remaining survivors of the current batch.
    Roll,
}

/// A position within a journal file, opaque to everything except the file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position(pub u64);

/// The append-only journal file store and its hash-table index.
///
/// A handle (`H`) is an opaque per-file reference: the clerk never walks a graph through it,
/// only passes it back to this trait's methods.
#[async_trait]
pub trait JournalFileStore {
    type Handle: JournalHandle + Clone;
    type Writer: Send;
    type Reader: Send;

    /// Returns the stable path of the file behind `handle`.
    fn filename(&self, handle: &Self::Handle) -> String;

    /// Enumerates record positions per `query`.
    async fn get_positions(
        &self,
        handle: &Self::Handle,
        query: PositionQuery,
    ) -> io::Result<Vec<Position>>;

    /// Fetches records at `positions` in the given mode.
    async fn direct_fetch(
        &self,
        handle: &Self::Handle,
        positions: &[Position],
        mode: FetchMode,
    ) -> io::Result<Vec<FetchedRecord>>;

    /// Opens a new writable destination file at `path`.
    async fn open_writer(&self, path: &std::path::Path) -> io::Result<Self::Writer>;

    /// Appends records to a writer, signalling [`WriteOutcome::Roll`] if the destination is now
    /// at its format-imposed size limit.
    async fn mput(
        &self,
        writer: &mut Self::Writer,
        records: &[(JournalKey, crate::candidate::JournalValue)],
    ) -> io::Result<WriteOutcome>;

    /// Flushes and seals a writer, returning the path of the now-immutable file.
    async fn complete(&self, writer: Self::Writer) -> io::Result<std::path::PathBuf>;

    /// Opens a sealed file for read-only access.
    async fn open_reader(&self, path: &std::path::Path) -> io::Result<Self::Reader>;

    /// Reads the first key of a sealed file, used to determine a manifest entry's `start_sqn`.
    async fn first_key(&self, reader: &Self::Reader) -> io::Result<JournalKey>;

    /// Signals that `handle` may be removed once no reader references it.
    async fn delete_pending(&self, handle: Self::Handle, manifest_sqn: u64);
}
