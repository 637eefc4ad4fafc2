use std::time::Instant;

use nalgebra::Vector3;
use shared::protocol::{AvatarData, PlayerState};
use shared::{PhysicsError, SceneError, World};
use thiserror::Error;

use crate::actor::RemotePlayers;
use crate::camera::OrbitCamera;
use crate::level::{Level, LevelError, load_map};
use crate::player::{InputSource, LocalPlayer};
use crate::render::{LIGHT_POSITION, RenderSink, draw_world};
use crate::transport::{NetEvent, Transport};

const ASPECT: f32 = 16.0 / 9.0;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("physics: {0}")]
    Physics(#[from] PhysicsError),

    #[error("level: {0}")]
    Level(#[from] LevelError),

    #[error("scene: {0}")]
    Scene(#[from] SceneError),
}

/// The network as seen by the frame loop.
pub trait Network {
    fn local_id(&self) -> Option<i32>;
    fn send_state(&mut self, state: PlayerState);
    fn poll(&mut self, now: Instant) -> Vec<NetEvent>;
}

impl Network for Transport {
    fn local_id(&self) -> Option<i32> {
        Transport::local_id(self)
    }

    fn send_state(&mut self, state: PlayerState) {
        Transport::send_state(self, state);
    }

    fn poll(&mut self, now: Instant) -> Vec<NetEvent> {
        Transport::poll(self, now)
    }
}

pub struct Game {
    world: World,
    level: Level,
    player: LocalPlayer,
    remotes: RemotePlayers,
    camera: OrbitCamera,
    input: Box<dyn InputSource>,
}

impl Game {
    pub fn new(
        map: &str,
        username: &str,
        avatar: AvatarData,
        input: Box<dyn InputSource>,
    ) -> Result<Self, GameError> {
        Self::with_world(World::new()?, map, username, avatar, input)
    }

    pub fn with_world(
        mut world: World,
        map: &str,
        username: &str,
        avatar: AvatarData,
        input: Box<dyn InputSource>,
    ) -> Result<Self, GameError> {
        let level = load_map(&mut world, map)?;
        let player = LocalPlayer::spawn(&mut world, level.spawn_point, username, avatar)?;
        Ok(Self {
            world,
            level,
            player,
            remotes: RemotePlayers::new(),
            camera: OrbitCamera::new(ASPECT),
            input,
        })
    }

    #[cfg(test)]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn remotes(&self) -> &RemotePlayers {
        &self.remotes
    }

    pub fn player_position(&self) -> Vector3<f32> {
        self.player.position(&self.world)
    }

    /// Run one frame: scripts, movement, physics, animation, replication, smoothing, then
    /// drawing.
    pub fn frame(
        &mut self,
        dt: f32,
        now: Instant,
        net: &mut dyn Network,
        sink: &mut dyn RenderSink,
    ) -> Result<(), GameError> {
        self.world.fire_update(dt);

        let input = self.input.sample(dt);
        self.camera.rotate(input.look.x, input.look.y);
        self.camera.zoom(input.zoom);
        let basis = self.camera.basis();
        self.player
            .drive(&mut self.world, &input.movement, &basis, dt);
        self.world.step(dt);
        self.player.after_step(&mut self.world, dt)?;

        if let Some(id) = net.local_id() {
            net.send_state(self.player.snapshot(&self.world, id));
        }
        for event in net.poll(now) {
            self.remotes.apply(&event);
        }
        self.remotes.interpolate(dt);

        let subject = self.player.position(&self.world);
        self.camera
            .update(&self.world, subject, Some(self.player.character()), dt);
        self.render(sink);
        Ok(())
    }

    fn render(&self, sink: &mut dyn RenderSink) {
        sink.begin_frame(&self.camera.view(), &self.camera.projection(), LIGHT_POSITION);
        draw_world(sink, &self.world);
        self.player.draw(&self.world, sink);
        self.remotes.draw(sink);
        sink.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use shared::PhysicsWorld;

    use super::*;
    use crate::avatar::FACE;
    use crate::player::{IdleInput, WanderInput};
    use crate::render::{HeadlessRenderer, RenderMode};

    const DT: f32 = 1.0 / 60.0;

    /// Joins immediately and plays every sent state back as a second player.
    #[derive(Default)]
    struct Mirror {
        inbox: VecDeque<NetEvent>,
        sent: usize,
        joined: bool,
    }

    impl Network for Mirror {
        fn local_id(&self) -> Option<i32> {
            self.joined.then_some(1)
        }

        fn send_state(&mut self, mut state: PlayerState) {
            self.sent += 1;
            state.id = 2;
            state.position.x += 5.0;
            self.inbox.push_back(NetEvent::PlayerState(state));
        }

        fn poll(&mut self, _now: Instant) -> Vec<NetEvent> {
            if !self.joined {
                self.joined = true;
                return vec![NetEvent::Connected { id: 1 }];
            }
            self.inbox.drain(..).collect()
        }
    }

    fn game(input: Box<dyn InputSource>) -> Game {
        let world = World::with_physics(PhysicsWorld::with_threads(1).unwrap());
        Game::with_world(world, "Baseplate", "cat", AvatarData::default(), input).unwrap()
    }

    #[test]
    fn replicated_echo_shows_up_as_a_remote_player() {
        let mut game = game(Box::new(WanderInput::default()));
        let mut net = Mirror::default();
        let mut sink = HeadlessRenderer::new();
        let t0 = Instant::now();

        for i in 0..120 {
            let now = t0 + Duration::from_secs_f32(i as f32 * DT);
            game.frame(DT, now, &mut net, &mut sink).unwrap();
        }

        // Nothing is sent before the join is acknowledged.
        assert_eq!(net.sent, 119);
        assert_eq!(game.remotes().len(), 1);
        let echo = game.remotes().get(2).unwrap();
        assert_eq!(echo.username(), Some("cat"));
        // The mirror trails the local player by a few frames of smoothing.
        let offset = echo.display().position - game.player_position();
        assert!((offset.x - 5.0).abs() < 3.0, "offset {offset:?}");

        assert_eq!(sink.frames(), 120);
        // Two avatars of six limbs each.
        assert_eq!(sink.count_mode(RenderMode::Limb), 12);
    }

    #[test]
    fn idle_player_settles_on_the_spawn() {
        let mut game = game(Box::new(IdleInput));
        let mut net = Mirror::default();
        let mut sink = HeadlessRenderer::new();
        let now = Instant::now();
        for _ in 0..120 {
            game.frame(DT, now, &mut net, &mut sink).unwrap();
        }
        let pos = game.player_position();
        assert!((pos.y - (game.level().spawn_point.y + 1.0)).abs() < 0.05, "{pos:?}");
        assert_eq!(game.player().controller().state(), shared::AnimState::Idle);
        assert_eq!(game.world().physics().dynamic_body_count(), 1);
        // Baseplate, spawn location and two faces; the character capsule is invisible.
        assert_eq!(sink.count_mode(RenderMode::Lit), 2 + 2 * FACE.len());
    }
}
