//! # Chunk Stores
//!
//! Persistence collaborator of the chunk service.
//!
//! ## Contract
//!
//! - A missing chunk is `Ok(None)`, never an error.
//! - `save_or_update` is an idempotent upsert keyed by [`ChunkId`]. Racing
//!   writers both succeed and exactly one record remains. On conflict only
//!   the resource counts are overwritten (last write wins); stored terrain is
//!   kept, so the first persisted terrain of a chunk stays authoritative. A
//!   placeholder record (no terrain) is filled in completely.
//! - Resource counters never leave `[0, ResourceCounts::LIMIT]`.

mod file;
mod memory;

use std::sync::Arc;

use crate::chunk::{ChunkId, ChunkRange, ChunkRecord, ResourceCounts, ResourceDelta};
use crate::coords::WorldRect;
use crate::error::StoreResult;
use crate::structures::Town;

pub use file::FileChunkStore;
pub use memory::MemoryChunkStore;

/// Persists chunks and the towns placed on them.
pub trait ChunkStore: Send + Sync {
    /// Fetches a chunk record.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails; absence is `Ok(None)`.
    fn get_chunk(&self, id: ChunkId) -> StoreResult<Option<ChunkRecord>>;

    /// Inserts `record`, or updates the resource counts of an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted. Nothing is
    /// written in that case.
    fn save_or_update(&self, record: ChunkRecord) -> StoreResult<()>;

    /// Lists towns whose center lies inside `rect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn towns_in_rect(&self, rect: WorldRect) -> StoreResult<Vec<Town>>;

    /// Applies a clamped delta to a chunk's resources.
    ///
    /// Returns the new counts, or `None` if the chunk does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn adjust_resources(&self, id: ChunkId, delta: ResourceDelta) -> StoreResult<Option<ResourceCounts>>;

    /// Stores a new town and returns its assigned id.
    ///
    /// The `id` field of the argument is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the town could not be persisted.
    fn add_town(&self, town: Town) -> StoreResult<i64>;

    /// Returns the extent of all stored global chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn chunk_range(&self) -> StoreResult<Option<ChunkRange>>;
}

impl<T: ChunkStore + ?Sized> ChunkStore for Arc<T> {
    fn get_chunk(&self, id: ChunkId) -> StoreResult<Option<ChunkRecord>> {
        (**self).get_chunk(id)
    }

    fn save_or_update(&self, record: ChunkRecord) -> StoreResult<()> {
        (**self).save_or_update(record)
    }

    fn towns_in_rect(&self, rect: WorldRect) -> StoreResult<Vec<Town>> {
        (**self).towns_in_rect(rect)
    }

    fn adjust_resources(&self, id: ChunkId, delta: ResourceDelta) -> StoreResult<Option<ResourceCounts>> {
        (**self).adjust_resources(id, delta)
    }

    fn add_town(&self, town: Town) -> StoreResult<i64> {
        (**self).add_town(town)
    }

    fn chunk_range(&self) -> StoreResult<Option<ChunkRange>> {
        (**self).chunk_range()
    }
}

/// Resolves an upsert conflict between a stored and an incoming record.
fn merge_record(existing: Option<&ChunkRecord>, incoming: ChunkRecord) -> ChunkRecord {
    match existing {
        Some(existing) if !existing.is_placeholder() => ChunkRecord {
            resources: incoming.resources,
            ..existing.clone()
        },
        _ => incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trees: u32, terrain: Vec<u8>) -> ChunkRecord {
        ChunkRecord {
            id: ChunkId::global(0, 0),
            width: 2,
            height: 2,
            terrain,
            resources: ResourceCounts {
                trees,
                ..ResourceCounts::default()
            },
            water_level: 0.5,
        }
    }

    #[test]
    fn test_merge_keeps_terrain_takes_resources() {
        let existing = record(42, vec![7, 7]);
        let merged = merge_record(Some(&existing), record(3, vec![1, 2, 3]));

        assert_eq!(merged.terrain, vec![7, 7]);
        assert_eq!(merged.resources.trees, 3);
    }

    #[test]
    fn test_merge_fills_placeholder() {
        let placeholder = record(42, Vec::new());
        let merged = merge_record(Some(&placeholder), record(42, vec![1, 2, 3]));

        assert_eq!(merged, record(42, vec![1, 2, 3]));
    }

    #[test]
    fn test_merge_without_existing_is_identity() {
        let incoming = record(3, vec![9]);
        assert_eq!(merge_record(None, incoming.clone()), incoming);
    }
}
