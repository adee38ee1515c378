//! # Chunk Data Model
//!
//! The world is an unbounded grid of square global chunks. Each global chunk
//! is additionally split into four local quadrants that clients fetch at
//! higher resolution:
//!
//! ```text
//!   y ▲
//!     │ ┌─────┬─────┐
//!     │ │  1  │  2  │
//!     │ ├─────┼─────┤
//!     │ │  3  │  4  │
//!     │ └─────┴─────┘
//!     └──────────────▶ x
//! ```
//!
//! Quadrant 0 denotes the global (overview) chunk itself.
//!
//! ## Lifecycle
//!
//! A chunk is created by the generator on its first request and persisted
//! once. Afterwards only its resource counters change (and towns are placed
//! on top of it). Chunks are never deleted.

use std::fmt;

use crate::error::{TerrainError, TerrainResult};
use crate::structures::Town;

/// Which part of a global chunk a record covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Quadrant {
    /// The whole chunk, low resolution.
    Global = 0,
    /// Left half, upper half.
    UpperLeft = 1,
    /// Right half, upper half.
    UpperRight = 2,
    /// Left half, lower half.
    LowerLeft = 3,
    /// Right half, lower half.
    LowerRight = 4,
}

impl Quadrant {
    /// The four local quadrants, in number order.
    pub const LOCAL: [Self; 4] = [Self::UpperLeft, Self::UpperRight, Self::LowerLeft, Self::LowerRight];

    /// Returns the wire number (0-4).
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Parses a wire number.
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(Self::Global),
            1 => Some(Self::UpperLeft),
            2 => Some(Self::UpperRight),
            3 => Some(Self::LowerLeft),
            4 => Some(Self::LowerRight),
            _ => None,
        }
    }

    /// True for the right-hand quadrants (2 and 4).
    #[inline]
    #[must_use]
    pub const fn is_right(self) -> bool {
        matches!(self, Self::UpperRight | Self::LowerRight)
    }

    /// True for the upper quadrants (1 and 2).
    #[inline]
    #[must_use]
    pub const fn is_upper(self) -> bool {
        matches!(self, Self::UpperLeft | Self::UpperRight)
    }
}

/// Identity of a stored chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    /// Global chunk X.
    pub x: i64,
    /// Global chunk Y.
    pub y: i64,
    /// Part of the global chunk.
    pub quadrant: Quadrant,
}

impl ChunkId {
    /// Identity of a global chunk.
    #[inline]
    #[must_use]
    pub const fn global(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            quadrant: Quadrant::Global,
        }
    }

    /// Identity of a local quadrant.
    #[inline]
    #[must_use]
    pub const fn local(x: i64, y: i64, quadrant: Quadrant) -> Self {
        Self { x, y, quadrant }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})#{}", self.x, self.y, self.quadrant.number())
    }
}

/// A continuous position in world space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct WorldPosition {
    /// World X.
    pub x: f32,
    /// World Y.
    pub y: f32,
}

impl WorldPosition {
    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Signed change to a chunk's resource counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ResourceDelta {
    /// Change in trees.
    pub trees: i64,
    /// Change in stones.
    pub stones: i64,
    /// Change in animals.
    pub animals: i64,
    /// Change in plants.
    pub plants: i64,
}

/// Natural resources present in a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    /// Trees.
    pub trees: u32,
    /// Stones.
    pub stones: u32,
    /// Animals.
    pub animals: u32,
    /// Plants.
    pub plants: u32,
}

impl ResourceCounts {
    /// Upper bound of every counter.
    pub const LIMIT: u32 = 200;

    /// Applies `delta`, clamping every counter into `[0, LIMIT]`.
    #[must_use]
    pub fn apply(self, delta: ResourceDelta) -> Self {
        let step = |current: u32, change: i64| -> u32 {
            let clamped = i64::from(current).saturating_add(change).clamp(0, i64::from(Self::LIMIT));
            // In [0, 200] after the clamp.
            clamped as u32
        };

        Self {
            trees: step(self.trees, delta.trees),
            stones: step(self.stones, delta.stones),
            animals: step(self.animals, delta.animals),
            plants: step(self.plants, delta.plants),
        }
    }

    /// True if every counter is within `[0, LIMIT]`.
    #[inline]
    #[must_use]
    pub const fn within_limits(&self) -> bool {
        self.trees <= Self::LIMIT
            && self.stones <= Self::LIMIT
            && self.animals <= Self::LIMIT
            && self.plants <= Self::LIMIT
    }
}

/// A decoded chunk, ready to serve.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Identity.
    pub id: ChunkId,
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Elevation samples, column-major, `width * height` long.
    pub terrain: Vec<f32>,
    /// Natural resources.
    pub resources: ResourceCounts,
    /// Sea level in elevation units.
    pub water_level: f32,
    /// Towns inside the chunk's world rectangle.
    pub towns: Vec<Town>,
}

impl Chunk {
    /// Wraps freshly generated terrain: no resources, no towns.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::Internal`] if `terrain` does not hold exactly
    /// `width * height` samples.
    pub fn new(id: ChunkId, width: u32, height: u32, terrain: Vec<f32>, water_level: f32) -> TerrainResult<Self> {
        let expected = width as usize * height as usize;
        if terrain.len() != expected {
            return Err(TerrainError::Internal(format!(
                "chunk {id}: {} samples for a {width}x{height} grid",
                terrain.len()
            )));
        }

        Ok(Self {
            id,
            width,
            height,
            terrain,
            resources: ResourceCounts::default(),
            water_level,
            towns: Vec::new(),
        })
    }
}

/// The persisted shape of a chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    /// Identity (store key).
    pub id: ChunkId,
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Encoded terrain (see [`crate::codec`]). Empty for placeholder rows.
    pub terrain: Vec<u8>,
    /// Natural resources.
    pub resources: ResourceCounts,
    /// Sea level in elevation units.
    pub water_level: f32,
}

impl ChunkRecord {
    /// True if the record carries no terrain (a row created only to hold
    /// resource counters).
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.terrain.is_empty()
    }
}

/// Bounding box of all stored global chunks, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    /// Smallest chunk X.
    pub min_x: i64,
    /// Largest chunk X.
    pub max_x: i64,
    /// Smallest chunk Y.
    pub min_y: i64,
    /// Largest chunk Y.
    pub max_y: i64,
}

impl ChunkRange {
    /// A range covering a single chunk.
    #[must_use]
    pub const fn single(x: i64, y: i64) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    /// Grows the range to include `(x, y)`.
    #[must_use]
    pub fn including(self, x: i64, y: i64) -> Self {
        Self {
            min_x: self.min_x.min(x),
            max_x: self.max_x.max(x),
            min_y: self.min_y.min(y),
            max_y: self.max_y.max(y),
        }
    }

    /// Computes the range over the global chunks among `ids`.
    pub fn of_global<I: IntoIterator<Item = ChunkId>>(ids: I) -> Option<Self> {
        ids.into_iter()
            .filter(|id| id.quadrant == Quadrant::Global)
            .fold(None, |range: Option<Self>, id| {
                Some(range.map_or_else(|| Self::single(id.x, id.y), |r| r.including(id.x, id.y)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_numbers_round_trip() {
        for number in 0..=4u8 {
            let quadrant = Quadrant::from_number(number).unwrap();
            assert_eq!(quadrant.number(), number);
        }
        assert_eq!(Quadrant::from_number(5), None);
    }

    #[test]
    fn test_quadrant_halves() {
        assert!(Quadrant::UpperLeft.is_upper() && !Quadrant::UpperLeft.is_right());
        assert!(Quadrant::UpperRight.is_upper() && Quadrant::UpperRight.is_right());
        assert!(!Quadrant::LowerLeft.is_upper() && !Quadrant::LowerLeft.is_right());
        assert!(!Quadrant::LowerRight.is_upper() && Quadrant::LowerRight.is_right());
    }

    #[test]
    fn test_resources_clamp_to_limit() {
        let counts = ResourceCounts {
            trees: 190,
            stones: 5,
            animals: 0,
            plants: 200,
        };
        let delta = ResourceDelta {
            trees: 50,
            stones: -20,
            animals: 7,
            plants: i64::MAX,
        };

        let result = counts.apply(delta);
        assert_eq!(
            result,
            ResourceCounts {
                trees: 200,
                stones: 0,
                animals: 7,
                plants: 200,
            }
        );
        assert!(result.within_limits());
    }

    #[test]
    fn test_chunk_rejects_wrong_sample_count() {
        let id = ChunkId::global(0, 0);
        assert!(Chunk::new(id, 3, 3, vec![0.0; 9], 0.0).is_ok());
        assert!(matches!(
            Chunk::new(id, 3, 3, vec![0.0; 8], 0.0),
            Err(TerrainError::Internal(_))
        ));
    }

    #[test]
    fn test_range_ignores_local_quadrants() {
        let ids = [
            ChunkId::global(2, -1),
            ChunkId::global(-3, 4),
            ChunkId::local(50, 50, Quadrant::LowerRight),
        ];

        assert_eq!(
            ChunkRange::of_global(ids),
            Some(ChunkRange {
                min_x: -3,
                max_x: 2,
                min_y: -1,
                max_y: 4,
            })
        );
        assert_eq!(ChunkRange::of_global([ChunkId::local(0, 0, Quadrant::UpperLeft)]), None);
    }
}
