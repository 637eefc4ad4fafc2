use shared::{shortest_angle_delta, smoothing_factor, wrap_angle};

use super::{NetworkTransform, RemotePlayers};
use crate::pose::LimbPose;

/// Rate at which displayed remote state chases the latest snapshot (1/s).
pub const SMOOTHING_RATE: f32 = 10.0;

impl NetworkTransform {
    /// Move a fraction `t` of the way toward `target`; yaw along the shortest arc.
    fn approach(&mut self, target: &NetworkTransform, t: f32) {
        self.position += (target.position - self.position) * t;
        self.rotation =
            wrap_angle(self.rotation + shortest_angle_delta(self.rotation, target.rotation) * t);
        self.walk_cycle += (target.walk_cycle - self.walk_cycle) * t;
    }
}

impl RemotePlayers {
    /// Smooth every remote player toward its latest snapshot.
    ///
    /// Updates arrive far less often than frames, so the drawn transform eases toward the
    /// target instead of snapping to it.
    pub fn interpolate(&mut self, dt: f32) {
        let t = smoothing_factor(SMOOTHING_RATE, dt);
        for player in self.players.values_mut() {
            player.display.approach(&player.target, t);

            player.anim_time += dt.max(0.0);
            let target = LimbPose::target(
                player.state,
                player.display.walk_cycle,
                1.0,
                player.anim_time,
                0.0,
            );
            player.pose.blend_toward(&target, dt);
        }
    }
}
