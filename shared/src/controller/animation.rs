use super::settings::{
    FALL_ANIM_THRESHOLD, FALL_HOLD_TIME, JUMP_ANIM_THRESHOLD, JUMP_HOLD_TIME, LANDING_CROUCH,
    LANDING_TIME, WALK_THRESHOLD,
};

/// Discrete animation state. The numeric values are part of the wire format.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimState {
    #[default]
    Idle = 0,
    Walk = 1,
    Jump = 2,
    Fall = 3,
}

impl TryFrom<u8> for AnimState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Walk),
            2 => Ok(Self::Jump),
            3 => Ok(Self::Fall),
            other => Err(other),
        }
    }
}

impl From<AnimState> for u8 {
    fn from(state: AnimState) -> Self {
        state as u8
    }
}

/// Pose lock with its remaining duration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Hold {
    #[default]
    None,
    Jump(f32),
    Fall(f32),
}

impl Hold {
    fn tick(self, dt: f32) -> Self {
        match self {
            Self::Jump(t) if t > dt => Self::Jump(t - dt),
            Self::Fall(t) if t > dt => Self::Fall(t - dt),
            _ => Self::None,
        }
    }
}

/// Hysteresis state machine choosing the animation state from vertical velocity, ground
/// contact and walk speed.
///
/// Jump and fall are held for a short time after they trigger so a single frame of
/// velocity noise cannot flicker the pose. Landing clears any hold.
#[derive(Clone, Debug, Default)]
pub struct AnimationMachine {
    state: AnimState,
    hold: Hold,
    landing: f32,
    was_grounded: bool,
}

impl AnimationMachine {
    pub fn new() -> Self {
        Self {
            was_grounded: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> AnimState {
        self.state
    }

    pub fn hold(&self) -> Hold {
        self.hold
    }

    /// Remaining landing effect time.
    pub fn landing(&self) -> f32 {
        self.landing
    }

    /// Vertical crouch offset of the body for the current landing effect.
    pub fn crouch_offset(&self) -> f32 {
        LANDING_CROUCH * (self.landing / LANDING_TIME).clamp(0.0, 1.0)
    }

    pub fn update(
        &mut self,
        vertical_velocity: f32,
        grounded: bool,
        walk_ratio: f32,
        dt: f32,
    ) -> AnimState {
        let dt = dt.max(0.0);
        self.hold = self.hold.tick(dt);
        self.landing = (self.landing - dt).max(0.0);

        if grounded && !self.was_grounded {
            self.landing = LANDING_TIME;
            self.hold = Hold::None;
        }
        self.was_grounded = grounded;

        let airborne = !grounded;
        let fall_held =
            airborne && matches!(self.hold, Hold::Fall(_)) && self.state == AnimState::Fall;
        if vertical_velocity > JUMP_ANIM_THRESHOLD {
            self.hold = Hold::Jump(JUMP_HOLD_TIME);
            self.state = AnimState::Jump;
        } else if matches!(self.hold, Hold::Jump(_)) {
            self.state = AnimState::Jump;
        } else if airborne && vertical_velocity < FALL_ANIM_THRESHOLD {
            self.hold = Hold::Fall(FALL_HOLD_TIME);
            self.state = AnimState::Fall;
        } else if fall_held {
            self.state = AnimState::Fall;
        } else if grounded && walk_ratio > WALK_THRESHOLD {
            self.state = AnimState::Walk;
        } else if grounded {
            self.state = AnimState::Idle;
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn wire_values_round_trip() {
        for state in [AnimState::Idle, AnimState::Walk, AnimState::Jump, AnimState::Fall] {
            assert_eq!(AnimState::try_from(u8::from(state)), Ok(state));
        }
        assert_eq!(AnimState::try_from(4), Err(4));
    }

    #[test]
    fn jump_is_held_through_a_dip_then_lands_idle() {
        let mut anim = AnimationMachine::new();
        assert_eq!(anim.update(0.0, true, 0.0, DT), AnimState::Idle);

        assert_eq!(anim.update(18.0, false, 0.0, DT), AnimState::Jump);
        // Velocity dips under the rise threshold: still held.
        for _ in 0..5 {
            assert_eq!(anim.update(1.0, false, 0.0, DT), AnimState::Jump);
        }

        // Settles onto the ground.
        assert_eq!(anim.update(0.0, true, 0.0, DT), AnimState::Idle);
        assert_eq!(anim.hold(), Hold::None);
        assert!(anim.landing() > 0.0);
        assert!(anim.crouch_offset() < 0.0);
    }

    #[test]
    fn jump_does_not_turn_into_fall_without_descent() {
        let mut anim = AnimationMachine::new();
        anim.update(18.0, false, 0.0, DT);

        // Hold expires while slowly sinking: pose stays Jump.
        let mut states = Vec::new();
        for _ in 0..40 {
            states.push(anim.update(-3.0, false, 0.0, DT));
        }
        assert!(states.iter().all(|&s| s == AnimState::Jump));

        // Real descent.
        assert_eq!(anim.update(-7.0, false, 0.0, DT), AnimState::Fall);
    }

    #[test]
    fn fall_hold_survives_brief_slowdown() {
        let mut anim = AnimationMachine::new();
        anim.update(-10.0, false, 0.0, DT);
        assert_eq!(anim.state(), AnimState::Fall);
        assert_eq!(anim.update(-1.0, false, 0.0, DT), AnimState::Fall);

        // Hold expires; airborne with no trigger keeps the last state.
        for _ in 0..30 {
            anim.update(-1.0, false, 0.0, DT);
        }
        assert_eq!(anim.hold(), Hold::None);
        assert_eq!(anim.state(), AnimState::Fall);

        assert_eq!(anim.update(0.0, true, 0.5, DT), AnimState::Walk);
    }

    #[test]
    fn landing_clears_a_stale_fall_hold() {
        let mut anim = AnimationMachine::new();
        anim.update(-10.0, false, 0.0, DT);
        assert!(matches!(anim.hold(), Hold::Fall(_)));

        anim.update(0.0, true, 0.0, DT);
        assert_eq!(anim.hold(), Hold::None);
        // Jumping again starts clean.
        assert_eq!(anim.update(18.0, false, 0.0, DT), AnimState::Jump);
        assert!(matches!(anim.hold(), Hold::Jump(_)));
    }

    #[test]
    fn walk_needs_ground_and_speed() {
        let mut anim = AnimationMachine::new();
        assert_eq!(anim.update(0.0, true, 0.05, DT), AnimState::Idle);
        assert_eq!(anim.update(0.0, true, 0.6, DT), AnimState::Walk);
        assert_eq!(anim.update(0.0, true, 0.0, DT), AnimState::Idle);
    }
}
