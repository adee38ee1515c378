//! # TERRA Procedural Generation
//!
//! Deterministic terrain synthesis for an unbounded 2D world.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and window always produce the same samples
//! 2. **Windowed**: Any rectangle of the field can be generated on its own
//! 3. **Seamless**: Adjacent windows agree along their shared edge
//! 4. **Parallel**: Columns are synthesized concurrently
//!
//! ## Core Components
//!
//! - `NoiseField`: Capability of a seeded continuous noise source
//! - `SimplexNoise`: 2D simplex implementation of `NoiseField`
//! - `TerrainGenerator`: Multi-octave heightmaps, column-major
//!
//! ## Example
//!
//! ```rust
//! use terra_procedural::{GeneratorConfig, TerrainGenerator};
//!
//! let config = GeneratorConfig {
//!     seed: Some(12345),
//!     ..GeneratorConfig::default()
//! };
//! let generator = TerrainGenerator::new(config).unwrap();
//!
//! // A 16x16 window whose top-left corner sits at (32, 48) in grid units.
//! let terrain = generator.generate(16, 16, 32.0, 48.0).unwrap();
//! assert_eq!(terrain.len(), 256);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod generator;
pub mod noise;

pub use error::{GeneratorError, GeneratorResult};
pub use generator::{GeneratorConfig, TerrainGenerator};
pub use noise::{NoiseField, SimplexNoise, WorldSeed};
