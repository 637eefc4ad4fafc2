use nalgebra::Vector3;
use rapier3d::prelude::*;

use crate::scene::BodyShape;

/// Smallest half extent handed to the collision backend (meters). Zero-thickness boxes
/// produce degenerate contact normals.
pub const MIN_HALF_EXTENT: f32 = 0.005;

/// Collider shapes a solid body can be built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShapeDef {
    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector3<f32> },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },
}

impl ColliderShapeDef {
    /// Shape for a body of the given kind spanning `size` (full extents).
    pub fn from_body(shape: BodyShape, size: Vector3<f32>) -> Self {
        let half = size.map(|s| (s.abs() * 0.5).max(MIN_HALF_EXTENT));
        match shape {
            BodyShape::Block => Self::Cuboid { half_extents: half },
            BodyShape::Capsule => {
                let radius = half.x.max(half.z);
                Self::CapsuleY {
                    radius,
                    half_height: (half.y - radius).max(0.0),
                }
            }
        }
    }

    pub fn builder(&self) -> ColliderBuilder {
        match *self {
            Self::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::CapsuleY {
                radius,
                half_height,
            } => ColliderBuilder::capsule_y(half_height, radius),
        }
    }
}
