//! # TERRA World
//!
//! Chunked terrain for an unbounded 2D world: addressing, storage and the
//! cache-or-generate service clients talk to.
//!
//! ## Design Principles
//!
//! 1. **Addressable**: Every world position maps to exactly one chunk quadrant
//! 2. **Generate once**: A chunk is synthesized on first request, then served
//!    from the store
//! 3. **Race-tolerant**: Concurrent misses both succeed; upserts converge
//! 4. **Opaque failures**: Clients see "internal server error", logs see why
//!
//! ## Core Components
//!
//! - `ChunkCoordinateMapper`: Position -> (chunk x, chunk y, quadrant)
//! - `codec`: Stored terrain format
//! - `ChunkStore`: Persistence trait, with `MemoryChunkStore` and
//!   `FileChunkStore`
//! - `ChunkService`: Local and world chunk requests
//!
//! ## Example
//!
//! ```rust
//! use terra_world::{ChunkService, MemoryChunkStore, SessionContext, WorldConfig, WorldPosition};
//!
//! let mut config = WorldConfig { chunk_size: 16, ..WorldConfig::default() };
//! config.world_generator.seed = Some(42);
//!
//! let service = ChunkService::new(config, MemoryChunkStore::new()).unwrap();
//! let session = SessionContext::new("docs");
//!
//! let local = service.get_local_chunk(&session, WorldPosition::new(3.0, 12.0)).unwrap();
//! assert_eq!(local.terrain.len(), 16 * 16);
//!
//! let world = service.get_world_chunk(&session, 0, 0).unwrap();
//! assert_eq!((world.width, world.height), (16, 16));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod codec;
pub mod config;
pub mod coords;
pub mod error;
pub mod service;
pub mod store;
pub mod structures;

pub use chunk::{Chunk, ChunkId, ChunkRange, ChunkRecord, Quadrant, ResourceCounts, ResourceDelta, WorldPosition};
pub use config::WorldConfig;
pub use coords::{ChunkCoordinateMapper, WorldRect};
pub use error::{ConfigError, ServiceError, ServiceResult, StoreError, StoreResult, TerrainError, TerrainResult};
pub use service::{ChunkService, LocalChunkView, SessionContext, WorldChunkView};
pub use store::{ChunkStore, FileChunkStore, MemoryChunkStore};
pub use structures::{Building, BuildingType, Town};
