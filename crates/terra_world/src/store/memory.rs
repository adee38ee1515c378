//! In-process chunk store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{merge_record, ChunkStore};
use crate::chunk::{ChunkId, ChunkRange, ChunkRecord, ResourceCounts, ResourceDelta};
use crate::coords::WorldRect;
use crate::error::StoreResult;
use crate::structures::Town;

/// Towns plus the next id to hand out.
#[derive(Default)]
struct TownTable {
    /// Last assigned id.
    last_id: i64,
    /// All towns, in insertion order.
    towns: Vec<Town>,
}

/// A [`ChunkStore`] held entirely in memory.
///
/// Reads take a shared lock; every write holds the exclusive lock for the
/// whole read-modify-write, which makes upserts atomic.
#[derive(Default)]
pub struct MemoryChunkStore {
    /// Records by identity.
    chunks: RwLock<HashMap<ChunkId, ChunkRecord>>,
    /// Placed towns.
    towns: RwLock<TownTable>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunk records (all quadrants).
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().len()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn get_chunk(&self, id: ChunkId) -> StoreResult<Option<ChunkRecord>> {
        Ok(self.chunks.read().get(&id).cloned())
    }

    fn save_or_update(&self, record: ChunkRecord) -> StoreResult<()> {
        let mut chunks = self.chunks.write();
        let merged = merge_record(chunks.get(&record.id), record);
        chunks.insert(merged.id, merged);
        Ok(())
    }

    fn towns_in_rect(&self, rect: WorldRect) -> StoreResult<Vec<Town>> {
        Ok(self
            .towns
            .read()
            .towns
            .iter()
            .filter(|town| town.is_within(&rect))
            .cloned()
            .collect())
    }

    fn adjust_resources(&self, id: ChunkId, delta: ResourceDelta) -> StoreResult<Option<ResourceCounts>> {
        let mut chunks = self.chunks.write();
        Ok(chunks.get_mut(&id).map(|record| {
            record.resources = record.resources.apply(delta);
            record.resources
        }))
    }

    fn add_town(&self, mut town: Town) -> StoreResult<i64> {
        let mut table = self.towns.write();
        table.last_id += 1;
        town.id = table.last_id;
        table.towns.push(town);
        Ok(table.last_id)
    }

    fn chunk_range(&self) -> StoreResult<Option<ChunkRange>> {
        Ok(ChunkRange::of_global(self.chunks.read().keys().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Quadrant;

    fn record(id: ChunkId, terrain: Vec<u8>) -> ChunkRecord {
        ChunkRecord {
            id,
            width: 1,
            height: 1,
            terrain,
            resources: ResourceCounts::default(),
            water_level: 0.3,
        }
    }

    fn town(x: i64, y: i64) -> Town {
        Town {
            id: 0,
            x,
            y,
            owner_name: "someone".into(),
            population: 1,
            name: format!("town {x},{y}"),
            rotation: 0.0,
            buildings: Vec::new(),
        }
    }

    #[test]
    fn test_missing_chunk_is_none() {
        let store = MemoryChunkStore::new();
        assert_eq!(store.get_chunk(ChunkId::global(1, 1)).unwrap(), None);
    }

    #[test]
    fn test_upsert_keeps_terrain_overwrites_resources() {
        let store = MemoryChunkStore::new();
        let id = ChunkId::global(4, -2);

        store.save_or_update(record(id, vec![1])).unwrap();
        let grown = store
            .adjust_resources(id, ResourceDelta { trees: 12, ..ResourceDelta::default() })
            .unwrap();
        assert_eq!(grown.map(|r| r.trees), Some(12));

        store.save_or_update(record(id, vec![2])).unwrap();

        let stored = store.get_chunk(id).unwrap().unwrap();
        assert_eq!(stored.terrain, vec![1]);
        assert_eq!(stored.resources, ResourceCounts::default());
        assert_eq!(store.chunk_count(), 1);
    }

    #[test]
    fn test_adjust_missing_chunk_is_none() {
        let store = MemoryChunkStore::new();
        let counts = store.adjust_resources(ChunkId::global(0, 0), ResourceDelta::default()).unwrap();
        assert_eq!(counts, None);
    }

    #[test]
    fn test_towns_assigned_ids_and_filtered() {
        let store = MemoryChunkStore::new();
        let first = store.add_town(town(5, 5)).unwrap();
        let second = store.add_town(town(15, 5)).unwrap();
        assert_ne!(first, second);

        let rect = WorldRect {
            x_start: 0,
            x_end: 10,
            y_start: 0,
            y_end: 10,
        };
        let found = store.towns_in_rect(rect).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, first);
    }

    #[test]
    fn test_range_over_global_chunks() {
        let store = MemoryChunkStore::new();
        assert_eq!(store.chunk_range().unwrap(), None);

        store.save_or_update(record(ChunkId::global(-1, 2), vec![1])).unwrap();
        store.save_or_update(record(ChunkId::global(3, 0), vec![1])).unwrap();
        store
            .save_or_update(record(ChunkId::local(9, 9, Quadrant::UpperLeft), vec![1]))
            .unwrap();

        assert_eq!(
            store.chunk_range().unwrap(),
            Some(ChunkRange {
                min_x: -1,
                max_x: 3,
                min_y: 0,
                max_y: 2,
            })
        );
    }
}
