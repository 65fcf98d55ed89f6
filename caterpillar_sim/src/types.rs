// Core types shared across the simulation.
//
// Defines the spatial types used for actor movement (`Vec3`, `Rotation`),
// the compact branch-graph node identifier (`NodeId`), leaf identifiers
// (`LeafId`), and the `Species` enum. Everything derives `Serialize` and
// `Deserialize` so layouts and configs can be loaded from JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A world-space position in scene units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two positions.
    pub fn distance(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Step from `self` toward `target` by at most `max_step`. Never
    /// overshoots: if the target is closer than `max_step`, returns `target`.
    pub fn move_towards(self, target: Self, max_step: f32) -> Self {
        let dist = self.distance(target);
        if dist <= max_step || dist == 0.0 {
            return target;
        }
        let t = max_step / dist;
        Self {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// An orientation quaternion, as reported by the animation layer at the end
/// of a turn. The simulation never computes rotations itself; it only stores
/// the last snapshot it was handed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Compact identifier for a point on the branch graph. Doubles as the index
/// into `BranchGraph.nodes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Stable identifier of a leaf on the branch (`"A"` through `"E"` on the
/// default cage branch).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeafId(String);

impl LeafId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LeafId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Simulation enums
// ---------------------------------------------------------------------------

/// Caterpillar species kept in the cage. Purely descriptive today; the
/// feeding schedule is shared by all species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    #[default]
    PapilioXuthus,
    PapilioMachaon,
    AcherontiaLachesis,
    TheretraOldenlandiae,
    AntheraeaYamamai,
}
