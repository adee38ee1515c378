//! # Chunk Service
//!
//! Serves terrain chunks to clients: from the store when present, freshly
//! generated and persisted otherwise.
//!
//! ## Request Flow
//!
//! ```text
//!            ┌──────────┐
//! request ──▶│ Resolve  │  position -> (x, y, quadrant)
//!            └────┬─────┘
//!            ┌────▼─────┐  store error
//!            │  Lookup  │───────────────▶ Abort (internal server error)
//!            └────┬─────┘
//!         hit     │     miss
//!      ┌──────────┴──────────┐
//! ┌────▼─────┐         ┌─────▼────┐
//! │  Decode  │         │ Generate │
//! │ + towns  │         │ Persist  │
//! └────┬─────┘         └─────┬────┘
//!      └────────▶ Respond ◀──┘
//! ```
//!
//! There are no retries. A chunk whose persistence fails is discarded and the
//! request fails.
//!
//! ## Concurrency
//!
//! The service is `Send + Sync`; share one instance per process behind an
//! `Arc`. Two requests that miss on the same chunk both generate it and both
//! upsert; the store keeps one record and both callers get a valid chunk.

use terra_procedural::{TerrainGenerator, WorldSeed};

use crate::chunk::{Chunk, ChunkId, ChunkRecord, Quadrant, ResourceCounts, ResourceDelta, WorldPosition};
use crate::codec::{decode_terrain, encode_terrain};
use crate::config::WorldConfig;
use crate::coords::ChunkCoordinateMapper;
use crate::error::{ServiceError, ServiceResult, TerrainError, TerrainResult};
use crate::store::ChunkStore;
use crate::structures::Town;

/// Identity of the requesting session, used for logging.
///
/// Authentication happens before requests reach the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    /// Opaque session identifier.
    pub session_id: String,
}

impl SessionContext {
    /// Creates a context.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// A local quadrant chunk as returned to clients.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalChunkView {
    /// Global chunk X.
    pub global_x: i64,
    /// Global chunk Y.
    pub global_y: i64,
    /// Which quadrant of the global chunk.
    pub quadrant: Quadrant,
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Samples, column-major.
    pub terrain: Vec<f32>,
}

impl From<Chunk> for LocalChunkView {
    fn from(chunk: Chunk) -> Self {
        Self {
            global_x: chunk.id.x,
            global_y: chunk.id.y,
            quadrant: chunk.id.quadrant,
            width: chunk.width,
            height: chunk.height,
            terrain: chunk.terrain,
        }
    }
}

/// A global chunk as returned to clients.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldChunkView {
    /// Global chunk X.
    pub x: i64,
    /// Global chunk Y.
    pub y: i64,
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Samples, column-major.
    pub terrain: Vec<f32>,
    /// Towns inside the chunk (only for chunks served from the store).
    pub towns: Vec<Town>,
    /// Natural resources.
    pub resources: ResourceCounts,
    /// Sea level.
    pub water_level: f32,
}

impl From<Chunk> for WorldChunkView {
    fn from(chunk: Chunk) -> Self {
        Self {
            x: chunk.id.x,
            y: chunk.id.y,
            width: chunk.width,
            height: chunk.height,
            terrain: chunk.terrain,
            towns: chunk.towns,
            resources: chunk.resources,
            water_level: chunk.water_level,
        }
    }
}

/// Cache-or-generate chunk server.
pub struct ChunkService<S> {
    /// Settings.
    config: WorldConfig,
    /// Position -> address mapping.
    mapper: ChunkCoordinateMapper,
    /// Persistence.
    store: S,
    /// Generator for global chunks.
    world_generator: TerrainGenerator,
    /// Generator for local quadrants.
    local_generator: TerrainGenerator,
}

impl<S: ChunkStore> ChunkService<S> {
    /// Creates a service over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidInput`] if the configuration is invalid.
    pub fn new(config: WorldConfig, store: S) -> TerrainResult<Self> {
        config
            .validate()
            .map_err(|e| TerrainError::InvalidInput(e.to_string()))?;

        let mapper = ChunkCoordinateMapper::new(i64::from(config.chunk_size))?;
        let world_generator = TerrainGenerator::new(config.world_generator.clone())?;
        let local_generator = TerrainGenerator::new(config.local_generator.clone())?;

        tracing::info!(
            chunk_size = config.chunk_size,
            world_seed = world_generator.seed().value(),
            local_seed = local_generator.seed().value(),
            always_regenerate = config.always_regenerate,
            "chunk service ready"
        );

        Ok(Self {
            config,
            mapper,
            store,
            world_generator,
            local_generator,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the coordinate mapper.
    #[must_use]
    pub const fn mapper(&self) -> &ChunkCoordinateMapper {
        &self.mapper
    }

    /// Returns the store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Serves the local quadrant containing `position`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails or holds
    /// undecodable terrain.
    pub fn get_local_chunk(&self, session: &SessionContext, position: WorldPosition) -> ServiceResult<LocalChunkView> {
        tracing::info!(
            session = %session.session_id,
            x = position.x,
            y = position.y,
            "GetLocalChunk"
        );

        let id = self.mapper.resolve(position);
        self.local_chunk(id)
            .map(LocalChunkView::from)
            .map_err(|e| Self::reject(session, id, e))
    }

    /// Serves global chunk `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails or holds
    /// undecodable terrain.
    pub fn get_world_chunk(&self, session: &SessionContext, x: i64, y: i64) -> ServiceResult<WorldChunkView> {
        tracing::info!(session = %session.session_id, x, y, "GetWorldChunk");

        let id = ChunkId::global(x, y);
        self.world_chunk(id)
            .map(WorldChunkView::from)
            .map_err(|e| Self::reject(session, id, e))
    }

    /// Applies a clamped resource delta to a stored chunk.
    ///
    /// Returns `None` if the chunk has never been generated.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    pub fn adjust_resources(
        &self,
        session: &SessionContext,
        id: ChunkId,
        delta: ResourceDelta,
    ) -> ServiceResult<Option<ResourceCounts>> {
        tracing::debug!(session = %session.session_id, chunk = %id, ?delta, "adjusting resources");
        self.store
            .adjust_resources(id, delta)
            .map_err(|e| Self::reject(session, id, e.into()))
    }

    /// Places a town and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    pub fn place_town(&self, session: &SessionContext, town: Town) -> ServiceResult<i64> {
        let (x, y) = (town.x, town.y);
        let id = self.store.add_town(town).map_err(|e| {
            tracing::error!(session = %session.session_id, x, y, "failed to place town: {e}");
            ServiceError::Internal
        })?;

        tracing::info!(session = %session.session_id, town = id, x, y, "town placed");
        Ok(id)
    }

    /// Lookup, then decode or generate.
    fn local_chunk(&self, id: ChunkId) -> TerrainResult<Chunk> {
        match self.store.get_chunk(id)? {
            Some(record) if !record.is_placeholder() => {
                let chunk = decode_record(record)?;
                self.log_terrain("returning stored local chunk", &chunk);
                Ok(chunk)
            }
            Some(placeholder) => self.generate_local(id, placeholder.resources),
            None => self.generate_local(id, ResourceCounts::default()),
        }
    }

    /// Lookup (unless regenerating), then decode and enrich, or generate.
    fn world_chunk(&self, id: ChunkId) -> TerrainResult<Chunk> {
        if self.config.always_regenerate {
            let generator = self.world_generator.reseeded(WorldSeed::from_time());
            tracing::info!(chunk = %id, seed = generator.seed().value(), "regenerating world chunk");
            return self.generate_world(&generator, id, ResourceCounts::default());
        }

        let record = match self.store.get_chunk(id)? {
            Some(record) if !record.is_placeholder() => record,
            Some(placeholder) => return self.generate_world(&self.world_generator, id, placeholder.resources),
            None => return self.generate_world(&self.world_generator, id, ResourceCounts::default()),
        };

        let mut chunk = decode_record(record)?;
        chunk.towns = self.store.towns_in_rect(self.mapper.world_rect(id.x, id.y))?;
        self.log_terrain("returning stored world chunk", &chunk);
        Ok(chunk)
    }

    /// Generates and persists a local quadrant.
    ///
    /// Each quadrant is a window of the local field shifted by just under
    /// half a chunk along the axes where it sits on the right or upper side.
    fn generate_local(&self, id: ChunkId, resources: ResourceCounts) -> TerrainResult<Chunk> {
        let size = self.config.chunk_size;
        let shift = f64::from(size) / 2.0 - 1.0;
        let offset_x = if id.quadrant.is_right() { shift } else { 0.0 };
        let offset_y = if id.quadrant.is_upper() { shift } else { 0.0 };

        tracing::info!(chunk = %id, offset_x, offset_y, "generating local chunk");

        let terrain = self
            .local_generator
            .generate(size as usize, size as usize, offset_x, offset_y)?;
        let mut chunk = Chunk::new(id, size, size, terrain, self.config.water_level)?;
        chunk.resources = resources;

        self.persist(&chunk)?;
        self.log_terrain("local chunk generated", &chunk);
        Ok(chunk)
    }

    /// Generates and persists a global chunk.
    fn generate_world(&self, generator: &TerrainGenerator, id: ChunkId, resources: ResourceCounts) -> TerrainResult<Chunk> {
        let size = self.config.chunk_size;
        let rect = self.mapper.world_rect(id.x, id.y);

        tracing::info!(chunk = %id, "generating world chunk");

        let terrain = generator.generate(size as usize, size as usize, rect.x_start as f64, rect.y_start as f64)?;
        let mut chunk = Chunk::new(id, size, size, terrain, self.config.water_level)?;
        chunk.resources = resources;

        self.persist(&chunk)?;
        self.log_terrain("world chunk generated", &chunk);
        Ok(chunk)
    }

    /// Encodes and upserts a chunk.
    fn persist(&self, chunk: &Chunk) -> TerrainResult<()> {
        let record = ChunkRecord {
            id: chunk.id,
            width: chunk.width,
            height: chunk.height,
            terrain: encode_terrain(&chunk.terrain)?,
            resources: chunk.resources,
            water_level: chunk.water_level,
        };
        self.store.save_or_update(record)?;
        Ok(())
    }

    /// Dumps terrain when `debug_terrain` is on.
    fn log_terrain(&self, message: &str, chunk: &Chunk) {
        if self.config.debug_terrain {
            tracing::debug!(chunk = %chunk.id, data = ?chunk.terrain, "{message}");
        }
    }

    /// Logs a failed request and converts the error for the client.
    fn reject(session: &SessionContext, id: ChunkId, err: TerrainError) -> ServiceError {
        match &err {
            TerrainError::InvalidInput(_) => {
                tracing::warn!(session = %session.session_id, chunk = %id, "rejected request: {err}");
            }
            TerrainError::Persistence(_) | TerrainError::Internal(_) => {
                tracing::error!(session = %session.session_id, chunk = %id, "request failed: {err}");
            }
        }
        err.into()
    }
}

/// Decodes a stored record into a servable chunk.
fn decode_record(record: ChunkRecord) -> TerrainResult<Chunk> {
    let terrain = decode_terrain(&record.terrain)?;
    let mut chunk = Chunk::new(record.id, record.width, record.height, terrain, record.water_level)?;
    chunk.resources = record.resources;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryChunkStore;

    fn config(chunk_size: u32) -> WorldConfig {
        let mut config = WorldConfig {
            chunk_size,
            ..WorldConfig::default()
        };
        config.world_generator.seed = Some(1);
        config.local_generator.seed = Some(2);
        config
    }

    fn session() -> SessionContext {
        SessionContext::new("unit")
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ChunkService::new(config(0), MemoryChunkStore::new());
        assert!(matches!(result, Err(TerrainError::InvalidInput(_))));
    }

    #[test]
    fn test_local_quadrant_offsets() {
        // Quadrant windows are shifted by size / 2 - 1 = 4 samples.
        let service = ChunkService::new(config(10), MemoryChunkStore::new()).unwrap();
        let local = TerrainGenerator::new(config(10).local_generator).unwrap();

        for quadrant in Quadrant::LOCAL {
            let x = if quadrant.is_right() { 6.0 } else { 1.0 };
            let y = if quadrant.is_upper() { 6.0 } else { 1.0 };
            let ox = if quadrant.is_right() { 4.0 } else { 0.0 };
            let oy = if quadrant.is_upper() { 4.0 } else { 0.0 };

            let view = service.get_local_chunk(&session(), WorldPosition::new(x, y)).unwrap();
            assert_eq!(view.quadrant, quadrant);
            assert_eq!(view.terrain, local.generate(10, 10, ox, oy).unwrap(), "{quadrant:?}");
        }

        assert_eq!(Quadrant::LOCAL.map(Quadrant::number), [1, 2, 3, 4]);
    }

    #[test]
    fn test_world_chunk_uses_chunk_offset() {
        let service = ChunkService::new(config(8), MemoryChunkStore::new()).unwrap();
        let world = TerrainGenerator::new(config(8).world_generator).unwrap();

        let view = service.get_world_chunk(&session(), -2, 3).unwrap();
        assert_eq!((view.x, view.y), (-2, 3));
        assert_eq!(view.terrain, world.generate(8, 8, -16.0, 24.0).unwrap());
        assert_eq!(view.water_level, config(8).water_level);
    }

    #[test]
    fn test_placeholder_record_regenerated_with_its_resources() {
        let store = MemoryChunkStore::new();
        let id = ChunkId::global(0, 0);
        let resources = ResourceCounts {
            trees: 30,
            ..ResourceCounts::default()
        };
        store
            .save_or_update(ChunkRecord {
                id,
                width: 0,
                height: 0,
                terrain: Vec::new(),
                resources,
                water_level: 0.0,
            })
            .unwrap();

        let service = ChunkService::new(config(4), store).unwrap();
        let view = service.get_world_chunk(&session(), 0, 0).unwrap();

        assert_eq!(view.terrain.len(), 16);
        assert_eq!(view.resources, resources);
        assert!(!service.store().get_chunk(id).unwrap().unwrap().is_placeholder());
    }

    #[test]
    fn test_local_placeholder_regenerated_with_its_resources() {
        let store = MemoryChunkStore::new();
        let id = ChunkId::local(0, 0, Quadrant::LowerLeft);
        let resources = ResourceCounts {
            trees: 30,
            plants: 5,
            ..ResourceCounts::default()
        };
        store
            .save_or_update(ChunkRecord {
                id,
                width: 0,
                height: 0,
                terrain: Vec::new(),
                resources,
                water_level: 0.0,
            })
            .unwrap();

        let service = ChunkService::new(config(4), store).unwrap();
        let view = service.get_local_chunk(&session(), WorldPosition::new(1.0, 1.0)).unwrap();
        assert_eq!(view.quadrant, Quadrant::LowerLeft);
        assert_eq!(view.terrain.len(), 16);

        let stored = service.store().get_chunk(id).unwrap().unwrap();
        assert!(!stored.is_placeholder());
        assert_eq!(stored.resources, resources);
    }
}
