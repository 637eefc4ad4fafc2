//! Cosmetic limb animation. Purely visual: nothing here feeds back into physics or the
//! replicated state.

use nalgebra::{UnitQuaternion, Vector3};
use shared::{AnimState, smoothing_factor};

/// Peak arm and leg swing while walking (radians).
pub const MAX_LIMB_ANGLE: f32 = 0.7;

/// Rate at which the displayed pose follows its target (1/s).
pub const POSE_BLEND_RATE: f32 = 15.0;

/// Forward lean at full walk speed (radians).
pub const WALK_LEAN: f32 = 0.15;

const WALK_BOUNCE: f32 = 0.15;
const WALK_SWAY: f32 = 0.1;
const SHOULDER_SWAY: f32 = 0.2;
const JUMP_ARM_ANGLE: f32 = 2.8;
const JUMP_LEG_ANGLE: f32 = 0.5;
const JUMP_LIFT: f32 = 0.2;
const FALL_ARM_ANGLE: f32 = 2.4;
const FALL_FLAIL: f32 = 0.25;
const FALL_FLAIL_RATE: f32 = 12.0;

/// Smoothed pose parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimbPose {
    pub arm_angle: f32,
    pub leg_angle: f32,
    /// Whole-body offset (bounce, sway, crouch) applied before the facing rotation.
    pub center_offset: Vector3<f32>,
}

impl LimbPose {
    /// Pose the animation state asks for.
    ///
    /// `walk_ratio` scales the swing, `anim_time` drives the fall flail and `crouch` is the
    /// landing offset (zero or negative).
    pub fn target(
        state: AnimState,
        walk_cycle: f32,
        walk_ratio: f32,
        anim_time: f32,
        crouch: f32,
    ) -> Self {
        let crouch = Vector3::new(0.0, crouch, 0.0);
        match state {
            AnimState::Idle => Self {
                center_offset: crouch,
                ..Self::default()
            },
            AnimState::Walk => {
                let swing = walk_cycle.sin() * MAX_LIMB_ANGLE * walk_ratio;
                let bounce = walk_cycle.cos().abs() * WALK_BOUNCE;
                let sway = walk_cycle.sin() * WALK_SWAY;
                Self {
                    arm_angle: swing,
                    leg_angle: swing,
                    center_offset: crouch + Vector3::new(sway, bounce, 0.0),
                }
            }
            AnimState::Jump => Self {
                arm_angle: JUMP_ARM_ANGLE,
                leg_angle: JUMP_LEG_ANGLE,
                center_offset: Vector3::new(0.0, JUMP_LIFT, 0.0),
            },
            AnimState::Fall => {
                let flail = (anim_time * FALL_FLAIL_RATE).sin() * FALL_FLAIL;
                Self {
                    arm_angle: FALL_ARM_ANGLE + flail,
                    leg_angle: flail * 0.5,
                    center_offset: crouch,
                }
            }
        }
    }

    pub fn blend_toward(&mut self, target: &LimbPose, dt: f32) {
        let t = smoothing_factor(POSE_BLEND_RATE, dt);
        self.arm_angle += (target.arm_angle - self.arm_angle) * t;
        self.leg_angle += (target.leg_angle - self.leg_angle) * t;
        self.center_offset += (target.center_offset - self.center_offset) * t;
    }
}

/// Per-limb local rotations for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbRotations {
    /// Body tilt applied on top of the facing yaw.
    pub lean: UnitQuaternion<f32>,
    pub left_arm: UnitQuaternion<f32>,
    pub right_arm: UnitQuaternion<f32>,
    pub left_leg: UnitQuaternion<f32>,
    pub right_leg: UnitQuaternion<f32>,
}

impl LimbRotations {
    pub fn new(pose: &LimbPose, state: AnimState, walk_cycle: f32, walk_ratio: f32) -> Self {
        let about_x = |angle: f32| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle);
        let about_y = |angle: f32| UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle);

        let shoulder = if state == AnimState::Walk {
            walk_cycle.sin() * SHOULDER_SWAY
        } else {
            0.0
        };
        let (left_leg, right_leg) = match state {
            AnimState::Jump => (0.4, -0.2),
            AnimState::Fall => (pose.leg_angle, -pose.leg_angle),
            AnimState::Idle | AnimState::Walk => (-pose.leg_angle, pose.leg_angle),
        };

        Self {
            lean: about_x(walk_ratio * WALK_LEAN),
            left_arm: about_x(pose.arm_angle) * about_y(shoulder),
            right_arm: about_x(-pose.arm_angle) * about_y(-shoulder),
            left_leg: about_x(left_leg),
            right_leg: about_x(right_leg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_target_is_neutral_plus_crouch() {
        let t = LimbPose::target(AnimState::Idle, 3.0, 1.0, 0.0, -0.4);
        assert_eq!(t.arm_angle, 0.0);
        assert_eq!(t.center_offset, Vector3::new(0.0, -0.4, 0.0));
    }

    #[test]
    fn walk_swing_scales_with_speed() {
        let cycle = std::f32::consts::FRAC_PI_2;
        let full = LimbPose::target(AnimState::Walk, cycle, 1.0, 0.0, 0.0);
        let half = LimbPose::target(AnimState::Walk, cycle, 0.5, 0.0, 0.0);
        assert!((full.arm_angle - MAX_LIMB_ANGLE).abs() < 1.0e-6);
        assert!((half.arm_angle - MAX_LIMB_ANGLE * 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn pose_blends_without_overshoot() {
        let target = LimbPose::target(AnimState::Jump, 0.0, 0.0, 0.0, 0.0);
        let mut pose = LimbPose::default();
        let mut last = 0.0;
        for _ in 0..120 {
            pose.blend_toward(&target, 1.0 / 60.0);
            assert!(pose.arm_angle >= last && pose.arm_angle <= JUMP_ARM_ANGLE);
            last = pose.arm_angle;
        }
        assert!((pose.arm_angle - JUMP_ARM_ANGLE).abs() < 1.0e-3);
    }

    #[test]
    fn legs_split_in_a_jump() {
        let pose = LimbPose::default();
        let r = LimbRotations::new(&pose, AnimState::Jump, 0.0, 0.0);
        assert!((r.left_leg.angle() - 0.4).abs() < 1.0e-5);
        assert!((r.right_leg.angle() - 0.2).abs() < 1.0e-5);
        assert_eq!(r.lean, UnitQuaternion::identity());
    }
}
