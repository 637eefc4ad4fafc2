use shared::protocol::PlayerState;

use super::{NetworkTransform, RemotePlayer, RemotePlayers};
use crate::avatar::AvatarRig;
use crate::transport::NetEvent;

impl RemotePlayers {
    /// Fold one network event into the remote player table.
    pub fn apply(&mut self, event: &NetEvent) {
        match event {
            NetEvent::Connected { id } => {
                self.local_id = Some(*id);
                // A stale copy of ourselves from before the id was known.
                self.players.remove(id);
            }
            NetEvent::PlayerState(state) => self.on_player_state(state),
            NetEvent::PlayerLeft { id } => {
                if let Some(player) = self.players.remove(id) {
                    log::info!(
                        "player {} ({}) left",
                        id,
                        player.username().unwrap_or("?")
                    );
                }
            }
            NetEvent::Disconnected => {
                log::info!("dropping {} remote player(s)", self.players.len());
                self.players.clear();
                self.local_id = None;
            }
        }
    }

    fn on_player_state(&mut self, state: &PlayerState) {
        if Some(state.id) == self.local_id {
            return;
        }

        let Some(player) = self.players.get_mut(&state.id) else {
            log::info!(
                "player {} ({}) joined",
                state.id,
                state.username.as_deref().unwrap_or("?")
            );
            self.players.insert(state.id, RemotePlayer::new(state));
            return;
        };

        player.target = NetworkTransform::from(state);
        player.state = state.state;
        if player.avatar != state.avatar {
            log::debug!("player {} changed avatar", state.id);
            player.rig = AvatarRig::build(&state.avatar);
            player.avatar = state.avatar.clone();
        }
        if player.username.is_none() {
            player.username = state.username.clone();
        }
    }
}
