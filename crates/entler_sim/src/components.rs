//! # Simulation Components
//!
//! Plain-data components stored in the [`SimSchema`](crate::SimSchema) store.
//! Every component is `Pod`, so columns can be viewed as raw bytes.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::math::IVec3;

/// Marks a solid object. At most one object occupies a scene cell.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ObjectType {
    /// Object type identifier.
    pub id: u32,
}

/// Marks a cell property (terrain feature). At most one per scene cell,
/// sharing the cell with at most one object.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PropertyType {
    /// Property type identifier.
    pub id: u32,
}

/// Grid position.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Position {
    /// Cell coordinates (`z` is unused by the scene).
    pub value: IVec3,
}

impl Position {
    /// Creates a position on the grid plane.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            value: IVec3::planar(x, y),
        }
    }
}

/// Movement state.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Body {
    /// Cells moved per step.
    pub velocity: IVec3,
    /// Accumulated displacement.
    pub momentum: IVec3,
}

impl Body {
    /// Creates a body at rest moving with `velocity`.
    #[must_use]
    pub const fn with_velocity(velocity: IVec3) -> Self {
        Self {
            velocity,
            momentum: IVec3::ZERO,
        }
    }
}

/// Display data: a two-character label and a packed RGB color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Sprite {
    /// Two ASCII characters.
    pub name: [u8; 2],
    #[serde(skip)]
    _padding: [u8; 2],
    /// `0xRRGGBB`.
    pub color: u32,
}

impl Sprite {
    /// Creates a sprite from a label and a color.
    ///
    /// Labels longer than two bytes are truncated; shorter ones are padded
    /// with NUL.
    #[must_use]
    pub fn new(label: &str, color: u32) -> Self {
        let mut name = [0; 2];
        for (slot, byte) in name.iter_mut().zip(label.bytes()) {
            *slot = byte;
        }
        Self {
            name,
            _padding: [0; 2],
            color,
        }
    }

    /// Returns the label without trailing NUL bytes.
    #[must_use]
    pub fn label(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(2);
        std::str::from_utf8(&self.name[..len]).unwrap_or("??")
    }
}

/// A rechargeable energy pool.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Energy {
    /// Current energy.
    pub value: i32,
    /// Maximum energy.
    pub capacity: i32,
    /// Energy regained per step.
    pub recharge_rate: i32,
}

impl Energy {
    /// Creates a full pool.
    #[must_use]
    pub const fn full(capacity: i32, recharge_rate: i32) -> Self {
        Self {
            value: capacity,
            capacity,
            recharge_rate,
        }
    }

    /// Adds one step of recharge, saturating at capacity.
    ///
    /// Returns `true` if the value changed.
    pub fn recharge(&mut self) -> bool {
        let next = self
            .value
            .saturating_add(self.recharge_rate)
            .min(self.capacity);
        let changed = next != self.value;
        self.value = next;
        changed
    }

    /// Checks whether the pool is at capacity.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.value >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_recharge_saturates() {
        let mut energy = Energy {
            value: 8,
            capacity: 10,
            recharge_rate: 3,
        };
        assert!(energy.recharge());
        assert_eq!(energy.value, 10);
        assert!(energy.is_full());
        assert!(!energy.recharge());
        assert_eq!(energy.value, 10);
    }

    #[test]
    fn test_sprite_label() {
        assert_eq!(Sprite::new("ag", 0xff_00_00).label(), "ag");
        assert_eq!(Sprite::new("x", 0).label(), "x");
        assert_eq!(Sprite::new("long", 0).label(), "lo");
    }

    #[test]
    fn test_components_are_pod() {
        assert_eq!(std::mem::size_of::<Sprite>(), 8);
        assert_eq!(std::mem::size_of::<Body>(), 24);
        let energy = Energy::full(5, 1);
        assert_eq!(bytemuck::bytes_of(&energy).len(), 12);
    }
}
