//! # Chunk Coordinate Mapping
//!
//! Converts between continuous world positions and chunk addresses.
//!
//! ## Rules
//!
//! Positions are floored to whole world cells first. A cell at `c` belongs to
//! global chunk `floor(c / size)` at offset `c mod size` in `[0, size)`, so
//! the offset is never negative and cell `-1` sits in chunk `-1`, not chunk 0.
//!
//! With `half = size / 2` the offset picks the local quadrant:
//!
//! | offset x | offset y | quadrant |
//! |----------|----------|----------|
//! | < half   | >= half  | 1        |
//! | >= half  | >= half  | 2        |
//! | < half   | < half   | 3        |
//! | >= half  | < half   | 4        |

use crate::chunk::{ChunkId, Quadrant, WorldPosition};
use crate::error::{TerrainError, TerrainResult};

/// A half-open rectangle `[x_start, x_end) x [y_start, y_end)` in world cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldRect {
    /// First column inside.
    pub x_start: i64,
    /// First column past the end.
    pub x_end: i64,
    /// First row inside.
    pub y_start: i64,
    /// First row past the end.
    pub y_end: i64,
}

impl WorldRect {
    /// True if `(x, y)` lies inside.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x_start && x < self.x_end && y >= self.y_start && y < self.y_end
    }
}

/// Maps world positions onto a chunk grid of fixed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCoordinateMapper {
    /// Edge length of a global chunk in world cells.
    chunk_size: i64,
}

impl ChunkCoordinateMapper {
    /// Creates a mapper.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidInput`] if `chunk_size` is not positive.
    pub fn new(chunk_size: i64) -> TerrainResult<Self> {
        if chunk_size <= 0 {
            return Err(TerrainError::InvalidInput(format!(
                "chunk size must be positive, got {chunk_size}"
            )));
        }
        Ok(Self { chunk_size })
    }

    /// Returns the chunk edge length.
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> i64 {
        self.chunk_size
    }

    /// Resolves the local quadrant containing `position`.
    #[must_use]
    pub fn resolve(&self, position: WorldPosition) -> ChunkId {
        let (global_x, offset_x) = self.split(position.x);
        let (global_y, offset_y) = self.split(position.y);

        let half = self.chunk_size / 2;
        let quadrant = match (offset_x < half, offset_y >= half) {
            (true, true) => Quadrant::UpperLeft,
            (false, true) => Quadrant::UpperRight,
            (true, false) => Quadrant::LowerLeft,
            (false, false) => Quadrant::LowerRight,
        };

        ChunkId::local(global_x, global_y, quadrant)
    }

    /// Returns the world rectangle covered by global chunk `(x, y)`.
    #[must_use]
    pub const fn world_rect(&self, x: i64, y: i64) -> WorldRect {
        let x_start = x.saturating_mul(self.chunk_size);
        let y_start = y.saturating_mul(self.chunk_size);
        WorldRect {
            x_start,
            x_end: x_start.saturating_add(self.chunk_size),
            y_start,
            y_end: y_start.saturating_add(self.chunk_size),
        }
    }

    /// Splits one axis into (chunk index, offset within the chunk).
    #[inline]
    fn split(&self, coordinate: f32) -> (i64, i64) {
        let cell = f64::from(coordinate).floor() as i64;
        (cell.div_euclid(self.chunk_size), cell.rem_euclid(self.chunk_size))
    }
}
