//! # Structures
//!
//! Towns and their buildings, overlaid onto served world chunks.
//!
//! Structures are owned by the economy layer; this crate only stores them and
//! finds them by location.

use serde::{Deserialize, Serialize};

use crate::coords::WorldRect;

/// Kind of a placed building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingType {
    /// Living quarters.
    House,
    /// Stone extraction.
    Quarry,
}

/// A building inside a town.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// What it is.
    pub building_type: BuildingType,
    /// World X.
    pub x: f32,
    /// World Y.
    pub y: f32,
    /// Facing, in radians.
    pub rotation: f32,
}

/// A player-owned settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Town {
    /// Store-assigned identifier.
    pub id: i64,
    /// World X of the town center.
    pub x: i64,
    /// World Y of the town center.
    pub y: i64,
    /// Name of the owning character.
    pub owner_name: String,
    /// Current population.
    pub population: u64,
    /// Display name.
    pub name: String,
    /// Facing, in radians.
    pub rotation: f32,
    /// Placed buildings.
    #[serde(default)]
    pub buildings: Vec<Building>,
}

impl Town {
    /// Returns true if the town center lies inside `rect`.
    #[inline]
    #[must_use]
    pub const fn is_within(&self, rect: &WorldRect) -> bool {
        rect.contains(self.x, self.y)
    }
}
