use nalgebra::{UnitQuaternion, Vector3};

use crate::constants::{CHARACTER_HALF_HEIGHT, CHARACTER_MASS, CHARACTER_RADIUS, MIN_BODY_MASS};
use crate::physics::PhysicsHandle;

/// Collision shape of a solid body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BodyShape {
    /// Axis-aligned (before rotation) box spanning `size`.
    #[default]
    Block,
    /// Y-aligned capsule inscribed in `size`: radius `size.x / 2`, total height `size.y`.
    Capsule,
}

/// Physical and visual properties of a part-like node.
///
/// Fields are only writable through [`crate::World`] so that every write that affects the
/// simulation goes through the physics binding.
#[derive(Clone, Debug)]
pub struct SolidBody {
    pub(crate) position: Vector3<f32>,
    pub(crate) size: Vector3<f32>,
    /// Euler angles (radians) about the world X, Y and Z axes.
    pub(crate) rotation: Vector3<f32>,
    pub(crate) color: Vector3<f32>,
    pub(crate) transparency: f32,
    pub(crate) anchored: bool,
    pub(crate) collidable: bool,
    pub(crate) physical: bool,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) shape: BodyShape,
    pub(crate) lock_rotation: bool,
    pub(crate) custom_mass: Option<f32>,
    pub(crate) handle: Option<PhysicsHandle>,
}

impl Default for SolidBody {
    fn default() -> Self {
        Self::block()
    }
}

impl SolidBody {
    /// A plain grey 4x1x2 anchored block.
    pub fn block() -> Self {
        Self {
            position: Vector3::zeros(),
            size: Vector3::new(4.0, 1.0, 2.0),
            rotation: Vector3::zeros(),
            color: Vector3::new(0.63, 0.64, 0.63),
            transparency: 0.0,
            anchored: true,
            collidable: true,
            physical: true,
            friction: 1.0,
            restitution: 0.0,
            shape: BodyShape::Block,
            lock_rotation: false,
            custom_mass: None,
            handle: None,
        }
    }

    /// Green 12x1x12 anchored slab players spawn on.
    pub fn spawn_location() -> Self {
        Self {
            size: Vector3::new(12.0, 1.0, 12.0),
            color: Vector3::new(0.1, 0.7, 0.1),
            ..Self::block()
        }
    }

    /// Upright capsule used as the local character's physics proxy.
    pub fn character() -> Self {
        Self {
            size: Vector3::new(
                CHARACTER_RADIUS * 2.0,
                (CHARACTER_HALF_HEIGHT + CHARACTER_RADIUS) * 2.0,
                CHARACTER_RADIUS * 2.0,
            ),
            anchored: false,
            shape: BodyShape::Capsule,
            lock_rotation: true,
            custom_mass: Some(CHARACTER_MASS),
            transparency: 1.0,
            ..Self::block()
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn size(&self) -> Vector3<f32> {
        self.size
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn color(&self) -> Vector3<f32> {
        self.color
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn anchored(&self) -> bool {
        self.anchored
    }

    pub fn collidable(&self) -> bool {
        self.collidable
    }

    pub fn physical(&self) -> bool {
        self.physical
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn shape(&self) -> BodyShape {
        self.shape
    }

    pub fn lock_rotation(&self) -> bool {
        self.lock_rotation
    }

    /// Bound physics object, if any.
    pub fn handle(&self) -> Option<PhysicsHandle> {
        self.handle
    }

    /// Mass of the dynamic body: the custom mass if set, else unit density over the box
    /// volume, clamped to [`MIN_BODY_MASS`].
    pub fn mass(&self) -> f32 {
        let mass = self
            .custom_mass
            .unwrap_or(self.size.x * self.size.y * self.size.z);
        if mass.is_finite() {
            mass.max(MIN_BODY_MASS)
        } else {
            MIN_BODY_MASS
        }
    }
}
