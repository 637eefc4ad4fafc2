//! The local player: its character body, movement controller and cosmetic pose.

mod input;
mod replication;

pub use input::{IdleInput, InputSource, WanderInput};

use nalgebra::Vector3;
use shared::protocol::AvatarData;
use shared::{CameraBasis, MoveInput, NodeId, PlayerController, SceneError, World};

use crate::avatar::AvatarRig;
use crate::pose::{LimbPose, LimbRotations};
use crate::render::{AvatarView, RenderSink, draw_avatar};

/// Falling below this height respawns the character.
pub const KILL_PLANE_Y: f32 = -50.0;

/// Height above the spawn point a character appears at.
const SPAWN_DROP: f32 = 3.0;

pub struct LocalPlayer {
    character: NodeId,
    controller: PlayerController,
    username: String,
    avatar: AvatarData,
    rig: AvatarRig,
    pose: LimbPose,
    anim_time: f32,
    spawn_point: Vector3<f32>,
}

impl LocalPlayer {
    pub fn spawn(
        world: &mut World,
        spawn_point: Vector3<f32>,
        username: impl Into<String>,
        avatar: AvatarData,
    ) -> Result<Self, SceneError> {
        let character = world.spawn_character(spawn_point + Vector3::y() * SPAWN_DROP)?;
        Ok(Self {
            character,
            controller: PlayerController::new(),
            username: username.into(),
            rig: AvatarRig::build(&avatar),
            avatar,
            pose: LimbPose::default(),
            anim_time: 0.0,
            spawn_point,
        })
    }

    pub fn character(&self) -> NodeId {
        self.character
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    pub fn position(&self, world: &World) -> Vector3<f32> {
        world
            .body(self.character)
            .map(|body| body.position())
            .unwrap_or(self.spawn_point)
    }

    /// Turn input into a velocity on the character body. Runs before the physics step.
    pub fn drive(&mut self, world: &mut World, input: &MoveInput, camera: &CameraBasis, dt: f32) {
        let velocity = world.velocity(self.character).unwrap_or_default();
        let step = self.controller.update(velocity, input, camera, dt);
        if step.jumped {
            log::debug!("jump");
        }
        world.set_velocity(self.character, step.velocity);
    }

    /// Pick the animation state from the stepped body and handle the kill plane.
    pub fn after_step(&mut self, world: &mut World, dt: f32) -> Result<(), SceneError> {
        let vy = world.velocity(self.character).map_or(0.0, |v| v.y);
        let state = self.controller.animate(vy, dt);

        self.anim_time += dt.max(0.0);
        let target = LimbPose::target(
            state,
            self.controller.walk_cycle(),
            self.controller.walk_speed(),
            self.anim_time,
            self.controller.animation().crouch_offset(),
        );
        self.pose.blend_toward(&target, dt);

        if self.position(world).y < KILL_PLANE_Y {
            self.respawn(world)?;
        }
        Ok(())
    }

    pub fn respawn(&mut self, world: &mut World) -> Result<(), SceneError> {
        log::info!("{} respawning", self.username);
        world.set_position(self.character, self.spawn_point + Vector3::y() * SPAWN_DROP)?;
        self.controller.reset();
        Ok(())
    }

    pub fn draw(&self, world: &World, sink: &mut dyn RenderSink) {
        let rotations = LimbRotations::new(
            &self.pose,
            self.controller.state(),
            self.controller.walk_cycle(),
            self.controller.walk_speed(),
        );
        draw_avatar(
            sink,
            &AvatarView {
                rig: &self.rig,
                pose: &self.pose,
                rotations: &rotations,
                position: self.position(world),
                yaw: self.controller.yaw(),
            },
        );
    }
}
