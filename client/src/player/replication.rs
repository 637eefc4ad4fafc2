use shared::World;
use shared::protocol::PlayerState;

use super::LocalPlayer;

impl LocalPlayer {
    /// Snapshot of the local player as sent to the server every frame.
    pub fn snapshot(&self, world: &World, id: i32) -> PlayerState {
        PlayerState {
            id,
            username: Some(self.username.clone()),
            avatar: self.avatar.clone(),
            position: self.position(world),
            rotation: self.controller.yaw(),
            walk_cycle: self.controller.walk_cycle(),
            state: self.controller.state(),
        }
    }
}
