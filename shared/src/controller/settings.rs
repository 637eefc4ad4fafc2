/*!
Player movement and animation tuning.

Distances are in meters, time in seconds, angles in radians. Velocity thresholds compare
against the character body's simulated linear velocity.
*/

/// Top horizontal speed (m/s).
pub const MOVE_SPEED: f32 = 16.0;

/// Horizontal acceleration toward the target velocity while there is input (m/s^2).
pub const ACCELERATION: f32 = 150.0;

/// Horizontal deceleration toward rest once input is released (m/s^2).
/// High enough that releasing the stick reads as an instant stop.
pub const DECELERATION: f32 = 120.0;

/// Vertical velocity set by a jump (m/s).
pub const JUMP_SPEED: f32 = 18.0;

/// Facing turn rate: fraction of the remaining arc covered per second.
pub const ROTATION_SPEED: f32 = 12.0;

/// Grace period after leaving the ground during which a jump is still accepted.
pub const COYOTE_TIME: f32 = 0.12;

/// Vertical speed under which the character counts as standing on something.
pub const GROUNDED_EPSILON: f32 = 0.01;

/// How far the walk-speed ratio, and the idle walk cycle, move toward their targets per second.
pub const WALK_BLEND_RATE: f32 = 8.0;

/// Walk-cycle phase advance per second at full speed (radians).
pub const WALK_CYCLE_SPEED: f32 = 12.0;

/// Walk-speed ratio above which the character counts as walking.
pub const WALK_THRESHOLD: f32 = 0.1;

/// Rising speed that switches to the jump pose.
pub const JUMP_ANIM_THRESHOLD: f32 = 2.0;

/// How long the jump pose is held once triggered.
pub const JUMP_HOLD_TIME: f32 = 0.35;

/// Falling speed that switches to the fall pose.
pub const FALL_ANIM_THRESHOLD: f32 = -6.0;

/// How long the fall pose is held once triggered.
pub const FALL_HOLD_TIME: f32 = 0.25;

/// Duration of the cosmetic crouch after landing.
pub const LANDING_TIME: f32 = 0.25;

/// Crouch depth at the start of a landing (meters, negative = down).
pub const LANDING_CROUCH: f32 = -0.4;
