use nalgebra::Vector2;
use shared::MoveInput;

/// One frame of player intent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub movement: MoveInput,
    /// Camera orbit (yaw, pitch) in radians.
    pub look: Vector2<f32>,
    /// Camera zoom in meters, positive moves closer.
    pub zoom: f32,
}

/// Where the local player's intent comes from each frame.
pub trait InputSource {
    fn sample(&mut self, dt: f32) -> FrameInput;
}

/// Stands still.
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self, _dt: f32) -> FrameInput {
        FrameInput::default()
    }
}

/// Walks in a slow circle and hops every few seconds while the camera drifts around.
/// Handy for watching replication from a second client without a keyboard.
#[derive(Debug)]
pub struct WanderInput {
    clock: f32,
    turn_rate: f32,
    jump_every: f32,
    next_jump: f32,
}

impl WanderInput {
    pub fn new(turn_rate: f32, jump_every: f32) -> Self {
        Self {
            clock: 0.0,
            turn_rate,
            jump_every,
            next_jump: jump_every,
        }
    }
}

impl Default for WanderInput {
    fn default() -> Self {
        Self::new(0.5, 3.0)
    }
}

impl InputSource for WanderInput {
    fn sample(&mut self, dt: f32) -> FrameInput {
        let dt = dt.max(0.0);
        self.clock += dt;
        let heading = self.clock * self.turn_rate;
        let jump = self.jump_every > 0.0 && self.clock >= self.next_jump;
        if jump {
            self.next_jump += self.jump_every;
        }
        FrameInput {
            movement: MoveInput {
                axis: Vector2::new(heading.sin(), heading.cos()),
                jump,
            },
            look: Vector2::new(-0.1 * dt, 0.0),
            zoom: 0.0,
        }
    }
}
