//! Remote players: the latest replicated snapshot per id and the smoothed state drawn on
//! screen.

mod interpolate;
mod replication;

use std::collections::HashMap;

use nalgebra::Vector3;
use shared::AnimState;
use shared::protocol::{AvatarData, PlayerState};

use crate::avatar::AvatarRig;
use crate::pose::{LimbPose, LimbRotations};
use crate::render::{AvatarView, RenderSink, draw_avatar};

/// The continuous part of a player state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetworkTransform {
    pub position: Vector3<f32>,
    pub rotation: f32,
    pub walk_cycle: f32,
}

impl From<&PlayerState> for NetworkTransform {
    fn from(state: &PlayerState) -> Self {
        Self {
            position: state.position,
            rotation: state.rotation,
            walk_cycle: state.walk_cycle,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RemotePlayer {
    id: i32,
    username: Option<String>,
    avatar: AvatarData,
    rig: AvatarRig,
    /// Latest snapshot received.
    target: NetworkTransform,
    /// What is drawn; chases `target`.
    display: NetworkTransform,
    state: AnimState,
    pose: LimbPose,
    anim_time: f32,
}

impl RemotePlayer {
    fn new(state: &PlayerState) -> Self {
        let transform = NetworkTransform::from(state);
        Self {
            id: state.id,
            username: state.username.clone(),
            avatar: state.avatar.clone(),
            rig: AvatarRig::build(&state.avatar),
            target: transform,
            display: transform,
            state: state.state,
            pose: LimbPose::default(),
            anim_time: 0.0,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[cfg(test)]
    pub fn rig(&self) -> &AvatarRig {
        &self.rig
    }

    #[cfg(test)]
    pub fn target(&self) -> &NetworkTransform {
        &self.target
    }

    #[cfg(test)]
    pub fn display(&self) -> &NetworkTransform {
        &self.display
    }

    #[cfg(test)]
    pub fn state(&self) -> AnimState {
        self.state
    }

    pub fn draw(&self, sink: &mut dyn RenderSink) {
        let rotations = LimbRotations::new(&self.pose, self.state, self.display.walk_cycle, 1.0);
        draw_avatar(
            sink,
            &AvatarView {
                rig: &self.rig,
                pose: &self.pose,
                rotations: &rotations,
                position: self.display.position,
                yaw: self.display.rotation,
            },
        );
    }
}

/// Every remote player currently known, keyed by server id.
#[derive(Debug, Default)]
pub struct RemotePlayers {
    players: HashMap<i32, RemotePlayer>,
    local_id: Option<i32>,
}

impl RemotePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, id: i32) -> Option<&RemotePlayer> {
        self.players.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.players.values()
    }

    pub fn draw(&self, sink: &mut dyn RenderSink) {
        for player in self.players.values() {
            player.draw(sink);
        }
    }
}
