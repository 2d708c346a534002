//! The unrelated "hashtable compute" helper task this clerk also hosts.
//!
//! Shares no state with compaction: it is a one-shot function that computes a CDB-style index
//! table for a hash tree and returns it. Unlike a compaction clerk, the task's lifecycle ends when
//! the future resolves; there is no mailbox, no `stop`, nothing to drain.

use crc32fast::Hasher;

use crate::config::BATCH_SIZE;
use crate::journal_store::{FetchMode, FetchedRecord, JournalFileStore, Position, PositionQuery};

/// One `(hash, position)` slot of a computed hash table.
#[derive(Debug, Clone, Copy)]
pub struct HashSlot {
    pub hash: u32,
    pub position: Position,
}

/// The computed index table for one journal file: one slot vector per hash-modulo bucket.
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    pub buckets: Vec<Vec<HashSlot>>,
}

/// Computes the hash table for `handle`, covering positions at or after `start_pos`, bucketed
/// over `bucket_count` buckets.
#[tracing::instrument(skip(store), fields(filename = %store.filename(handle)))]
pub async fn hashtable_calc<S>(
    store: &S,
    handle: &S::Handle,
    start_pos: u64,
    bucket_count: usize,
) -> std::io::Result<HashTable>
where
    S: JournalFileStore,
{
    let positions: Vec<Position> = store
        .get_positions(handle, PositionQuery::All)
        .await?
        .into_iter()
        .filter(|position| position.0 >= start_pos)
        .collect();

    let mut table = HashTable {
        buckets: vec![Vec::new(); bucket_count.max(1)],
    };

    for chunk in positions.chunks(BATCH_SIZE) {
        let fetched = store.direct_fetch(handle, chunk, FetchMode::KeySize).await?;
        for (position, record) in chunk.iter().zip(fetched) {
            let FetchedRecord::Size(key_size) = record else {
                continue;
            };
            let mut hasher = Hasher::new();
            hasher.update(&key_size.key.ledger_key.key);
            let hash = hasher.finalize();
            let bucket = (hash as usize) % table.buckets.len();
            table.buckets[bucket].push(HashSlot {
                hash,
                position: *position,
            });
        }
    }

    Ok(table)
}
