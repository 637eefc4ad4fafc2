//! Local player movement: arcade acceleration, coyote-time jumps, facing and the walk clock.
//!
//! The controller does not touch physics itself. Each frame the caller reads the character
//! body's velocity, passes it to [`PlayerController::update`], writes the returned velocity
//! back, steps the world, then feeds the post-step velocity to
//! [`PlayerController::animate`].

mod animation;
pub mod settings;

pub use animation::{AnimState, AnimationMachine, Hold};

use nalgebra::{Vector2, Vector3};

use crate::utils::{approach, shortest_angle_delta, wrap_angle, yaw_from_xz};
use settings::{
    ACCELERATION, COYOTE_TIME, DECELERATION, GROUNDED_EPSILON, JUMP_SPEED, MOVE_SPEED,
    ROTATION_SPEED, WALK_BLEND_RATE, WALK_CYCLE_SPEED, WALK_THRESHOLD,
};

/// Input magnitude under which the stick counts as released.
const INPUT_DEADZONE: f32 = 1.0e-3;

/// Per-frame player intent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveInput {
    /// Camera-relative movement: `x` = right, `y` = forward. Length at most 1.
    pub axis: Vector2<f32>,
    pub jump: bool,
}

/// Horizontal camera axes used to turn input into a world direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
}

impl CameraBasis {
    /// Basis of an orbit camera at `yaw` radians about +Y. Yaw 0 looks down -Z.
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            forward: Vector3::new(-sin, 0.0, -cos),
            right: Vector3::new(cos, 0.0, -sin),
        }
    }

    /// World-space horizontal move direction for `axis`, or zero without input.
    pub fn move_direction(&self, axis: Vector2<f32>) -> Vector3<f32> {
        if axis.norm() < INPUT_DEADZONE {
            return Vector3::zeros();
        }
        let mut dir = self.forward * axis.y + self.right * axis.x;
        dir.y = 0.0;
        let len = dir.norm();
        if len < INPUT_DEADZONE {
            return Vector3::zeros();
        }
        // Keep analog magnitude but never exceed unit length.
        dir / len.max(1.0)
    }
}

/// Result of one [`PlayerController::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveStep {
    /// Velocity to write back to the character body.
    pub velocity: Vector3<f32>,
    pub grounded: bool,
    pub jumped: bool,
}

/// Authoritative movement state of the local player.
#[derive(Clone, Debug)]
pub struct PlayerController {
    yaw: f32,
    grounded: bool,
    coyote: f32,
    walk_speed: f32,
    walk_cycle: f32,
    anim: AnimationMachine,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self::new()
    }
}

/// Move `current` toward `target` by at most `max_delta` (vector form of `approach`).
fn approach_vec(current: Vector2<f32>, target: Vector2<f32>, max_delta: f32) -> Vector2<f32> {
    let delta = target - current;
    let dist = delta.norm();
    if dist <= max_delta || dist <= f32::EPSILON {
        target
    } else {
        current + delta * (max_delta / dist)
    }
}

impl PlayerController {
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            grounded: true,
            coyote: COYOTE_TIME,
            walk_speed: 0.0,
            walk_cycle: 0.0,
            anim: AnimationMachine::new(),
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = wrap_angle(yaw);
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn coyote(&self) -> f32 {
        self.coyote
    }

    /// Smoothed horizontal speed over [`MOVE_SPEED`].
    pub fn walk_speed(&self) -> f32 {
        self.walk_speed
    }

    pub fn walk_cycle(&self) -> f32 {
        self.walk_cycle
    }

    pub fn state(&self) -> AnimState {
        self.anim.state()
    }

    pub fn animation(&self) -> &AnimationMachine {
        &self.anim
    }

    /// Forget in-flight motion (used on respawn).
    pub fn reset(&mut self) {
        *self = Self {
            yaw: self.yaw,
            ..Self::new()
        };
    }

    /// Integrate one frame of input against the body's current `velocity`.
    pub fn update(
        &mut self,
        velocity: Vector3<f32>,
        input: &MoveInput,
        camera: &CameraBasis,
        dt: f32,
    ) -> MoveStep {
        let dt = dt.max(0.0);
        let dir = camera.move_direction(input.axis);
        let moving = dir.norm_squared() > 0.0;

        // Facing.
        if let Some(target_yaw) = yaw_from_xz(Vector2::new(dir.x, dir.z)) {
            let t = (dt * ROTATION_SPEED).min(1.0);
            self.yaw = wrap_angle(self.yaw + shortest_angle_delta(self.yaw, target_yaw) * t);
        }

        // Horizontal velocity.
        let current = Vector2::new(velocity.x, velocity.z);
        let target = Vector2::new(dir.x, dir.z) * MOVE_SPEED;
        let rate = if moving { ACCELERATION } else { DECELERATION };
        let horizontal = approach_vec(current, target, rate * dt);

        // Ground and jump.
        let mut vy = velocity.y;
        if vy.abs() < GROUNDED_EPSILON {
            self.grounded = true;
            self.coyote = COYOTE_TIME;
        } else {
            self.coyote = (self.coyote - dt).max(0.0);
            self.grounded = self.coyote > 0.0;
        }

        let jumped = input.jump && self.coyote > 0.0;
        if jumped {
            vy = JUMP_SPEED;
            self.coyote = 0.0;
            self.grounded = false;
        }

        // Walk clock.
        let ratio = horizontal.norm() / MOVE_SPEED;
        self.walk_speed = approach(self.walk_speed, ratio, dt * WALK_BLEND_RATE);
        if self.walk_speed > WALK_THRESHOLD && self.grounded {
            self.walk_cycle += dt * WALK_CYCLE_SPEED * self.walk_speed;
        } else {
            self.walk_cycle = approach(self.walk_cycle, 0.0, dt * WALK_BLEND_RATE);
        }

        MoveStep {
            velocity: Vector3::new(horizontal.x, vy, horizontal.y),
            grounded: self.grounded,
            jumped,
        }
    }

    /// Pick the animation state from the post-step vertical velocity.
    pub fn animate(&mut self, vertical_velocity: f32, dt: f32) -> AnimState {
        self.anim
            .update(vertical_velocity, self.grounded, self.walk_speed, dt)
    }
}
