//! Peer bookkeeping for the relay.
//!
//! The relay does no simulation. Clients are authoritative for their own player; the
//! server only routes their snapshots to everyone else.
//!
//! Behavior
//! - On `Join`:
//!   - Assign the next id to an unknown address and answer with `Join { id }`.
//!   - A retried `Join` from a known address gets the same id again.
//! - On `PlayerState`:
//!   - Store it as the sender's latest snapshot, stamped with the sender's id.
//!   - States from addresses that never joined are dropped, and so are states too large
//!     to share a datagram with the `WorldState` header.
//!   - Usernames are cut to `MAX_USERNAME_CHARS`.
//! - Every broadcast tick:
//!   - Send each peer the latest snapshot of every other peer, split over as many
//!     `WorldState` datagrams as needed to stay within `MAX_DATAGRAM_SIZE`. An empty one
//!     still goes out so a lone client keeps hearing from the server.
//! - On silence longer than the timeout:
//!   - Forget the peer and tell the remaining peers with `PlayerLeft`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use shared::MAX_DATAGRAM_SIZE;
use shared::protocol::{Packet, PlayerState};

/// A datagram to send.
pub type Outgoing = (SocketAddr, Packet);

/// Longest username relayed, in characters.
pub const MAX_USERNAME_CHARS: usize = 32;

/// Tag byte plus the i32 state count.
const WORLD_STATE_HEADER: usize = 1 + 4;

/// A player state with its encoded size inside a `WorldState`.
#[derive(Debug)]
struct Snapshot {
    state: PlayerState,
    len: usize,
}

#[derive(Debug)]
struct Peer {
    id: i32,
    username: Option<String>,
    last_heard: Instant,
    snapshot: Option<Snapshot>,
}

fn clip_username(name: Option<String>) -> Option<String> {
    name.map(|name| match name.char_indices().nth(MAX_USERNAME_CHARS) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name,
    })
}

fn encoded_len(state: &PlayerState) -> Option<usize> {
    // Minus the tag byte of a standalone `PlayerState` packet.
    let bytes = Packet::PlayerState(state.clone()).encode().ok()?;
    Some(bytes.len() - 1)
}

/// Pack snapshots greedily into `WorldState` packets that each fit one datagram.
fn pack_world_states<'a>(snapshots: impl Iterator<Item = &'a Snapshot>) -> Vec<Packet> {
    let mut packets = Vec::new();
    let mut batch = Vec::new();
    let mut size = WORLD_STATE_HEADER;
    for snapshot in snapshots {
        if !batch.is_empty() && size + snapshot.len > MAX_DATAGRAM_SIZE {
            packets.push(Packet::WorldState(std::mem::take(&mut batch)));
            size = WORLD_STATE_HEADER;
        }
        size += snapshot.len;
        batch.push(snapshot.state.clone());
    }
    if !batch.is_empty() || packets.is_empty() {
        packets.push(Packet::WorldState(batch));
    }
    packets
}

#[derive(Debug)]
pub struct Relay {
    peers: HashMap<SocketAddr, Peer>,
    next_id: i32,
    timeout: Duration,
}

impl Relay {
    pub fn new(timeout: Duration) -> Self {
        Self {
            peers: HashMap::new(),
            next_id: 1,
            timeout,
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn handle(&mut self, from: SocketAddr, packet: Packet, now: Instant) -> Vec<Outgoing> {
        match packet {
            Packet::Join { username, .. } => vec![(from, self.join(from, username, now))],
            Packet::PlayerState(state) => {
                let Some(peer) = self.peers.get_mut(&from) else {
                    log::debug!("state from {from} before join, dropped");
                    return Vec::new();
                };
                peer.last_heard = now;
                let state = PlayerState {
                    id: peer.id,
                    username: clip_username(state.username).or_else(|| peer.username.clone()),
                    ..state
                };
                match encoded_len(&state) {
                    Some(len) if WORLD_STATE_HEADER + len <= MAX_DATAGRAM_SIZE => {
                        peer.snapshot = Some(Snapshot { state, len });
                    }
                    _ => log::warn!("oversized state from player {}, dropped", peer.id),
                }
                Vec::new()
            }
            other => {
                log::debug!("unexpected {:?} from {from}", other.packet_type());
                Vec::new()
            }
        }
    }

    fn join(&mut self, from: SocketAddr, username: Option<String>, now: Instant) -> Packet {
        let username = clip_username(username);
        let next_id = &mut self.next_id;
        let peer = self.peers.entry(from).or_insert_with(|| {
            let id = *next_id;
            *next_id += 1;
            log::info!(
                "{} joined from {from} as player {id}",
                username.as_deref().unwrap_or("?")
            );
            Peer {
                id,
                username: username.clone(),
                last_heard: now,
                snapshot: None,
            }
        });
        peer.last_heard = now;
        Packet::Join {
            id: peer.id,
            username: peer.username.clone(),
        }
    }

    /// `WorldState` datagrams for every peer holding everyone else's latest snapshot.
    pub fn world_states(&self) -> Vec<Outgoing> {
        self.peers
            .iter()
            .flat_map(|(&addr, peer)| {
                let others = self
                    .peers
                    .values()
                    .filter(|other| other.id != peer.id)
                    .filter_map(|other| other.snapshot.as_ref());
                pack_world_states(others)
                    .into_iter()
                    .map(move |packet| (addr, packet))
            })
            .collect()
    }

    /// Drop silent peers and announce their departure to the rest.
    pub fn expire(&mut self, now: Instant) -> Vec<Outgoing> {
        let timeout = self.timeout;
        let mut gone = Vec::new();
        self.peers.retain(|addr, peer| {
            let alive = now.duration_since(peer.last_heard) <= timeout;
            if !alive {
                log::info!("player {} ({addr}) timed out", peer.id);
                gone.push(peer.id);
            }
            alive
        });

        gone.into_iter()
            .flat_map(|id| {
                self.peers
                    .keys()
                    .map(move |&addr| (addr, Packet::PlayerLeft { id }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;

    fn addr(port: u16) -> SocketAddr {
        ([127, 0, 0, 1], port).into()
    }

    fn join(name: &str) -> Packet {
        Packet::Join {
            id: shared::UNASSIGNED_ID,
            username: Some(name.to_string()),
        }
    }

    fn state_at(x: f32) -> Packet {
        Packet::PlayerState(PlayerState {
            // Whatever the client claims, the relay stamps the real id.
            id: 999,
            username: None,
            position: Vector3::new(x, 0.0, 0.0),
            ..PlayerState::default()
        })
    }

    #[test]
    fn joins_get_distinct_stable_ids() {
        let now = Instant::now();
        let mut relay = Relay::new(Duration::from_secs(5));
        let a = relay.handle(addr(1), join("a"), now);
        let b = relay.handle(addr(2), join("b"), now);
        let again = relay.handle(addr(1), join("a"), now);

        let id_of = |out: &[Outgoing]| match &out[0].1 {
            Packet::Join { id, .. } => *id,
            other => panic!("expected join, got {other:?}"),
        };
        assert_eq!(id_of(&a), 1);
        assert_eq!(id_of(&b), 2);
        assert_eq!(id_of(&again), 1);
        assert_eq!(relay.peer_count(), 2);
    }

    #[test]
    fn states_are_relayed_to_everyone_else() {
        let now = Instant::now();
        let mut relay = Relay::new(Duration::from_secs(5));
        relay.handle(addr(1), join("a"), now);
        relay.handle(addr(2), join("b"), now);
        // Unknown sender is ignored.
        relay.handle(addr(3), state_at(7.0), now);
        relay.handle(addr(1), state_at(1.0), now);

        let out: HashMap<SocketAddr, Packet> = relay.world_states().into_iter().collect();
        assert_eq!(out.len(), 2);
        // a hears about nobody yet.
        assert_eq!(out[&addr(1)], Packet::WorldState(Vec::new()));
        let Packet::WorldState(states) = &out[&addr(2)] else {
            panic!("expected world state");
        };
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].id, 1);
        assert_eq!(states[0].username.as_deref(), Some("a"));
        assert_eq!(states[0].position.x, 1.0);
    }

    #[test]
    fn silent_peers_time_out_with_a_goodbye() {
        let t0 = Instant::now();
        let mut relay = Relay::new(Duration::from_secs(5));
        relay.handle(addr(1), join("a"), t0);
        relay.handle(addr(2), join("b"), t0);

        let t1 = t0 + Duration::from_secs(4);
        relay.handle(addr(2), state_at(0.0), t1);
        assert!(relay.expire(t1).is_empty());

        let out = relay.expire(t0 + Duration::from_secs(6));
        assert_eq!(relay.peer_count(), 1);
        assert_eq!(out, vec![(addr(2), Packet::PlayerLeft { id: 1 })]);

        // Coming back is a fresh join.
        let back = relay.handle(addr(1), join("a"), t0 + Duration::from_secs(7));
        assert!(matches!(back[0].1, Packet::Join { id: 3, .. }));
    }

    #[test]
    fn long_usernames_are_clipped() {
        let mut relay = Relay::new(Duration::from_secs(5));
        let out = relay.handle(addr(1), join(&"é".repeat(100)), Instant::now());
        let Packet::Join { username, .. } = &out[0].1 else {
            panic!("expected join");
        };
        assert_eq!(username.as_deref().map(|n| n.chars().count()), Some(MAX_USERNAME_CHARS));
    }

    #[test]
    fn crowded_world_state_is_split_to_fit_datagrams() {
        let now = Instant::now();
        let mut relay = Relay::new(Duration::from_secs(5));
        for port in 1..=40 {
            relay.handle(addr(port), join("p"), now);
            let mut state = PlayerState::default();
            state.avatar.shirt = "#".repeat(1000);
            relay.handle(addr(port), Packet::PlayerState(state), now);
        }

        let out = relay.world_states();
        let to_first: Vec<&Packet> = out
            .iter()
            .filter(|(to, _)| *to == addr(1))
            .map(|(_, packet)| packet)
            .collect();
        assert!(to_first.len() > 1);
        let mut seen = 0;
        for packet in to_first {
            assert!(packet.encode().unwrap().len() <= MAX_DATAGRAM_SIZE);
            let Packet::WorldState(states) = packet else {
                panic!("expected world state");
            };
            seen += states.len();
        }
        assert_eq!(seen, 39);
    }

    #[test]
    fn oversized_state_is_not_relayed() {
        let now = Instant::now();
        let mut relay = Relay::new(Duration::from_secs(5));
        relay.handle(addr(1), join("a"), now);
        relay.handle(addr(2), join("b"), now);
        let mut state = PlayerState::default();
        state.avatar.shirt = "#".repeat(MAX_DATAGRAM_SIZE);
        relay.handle(addr(1), Packet::PlayerState(state), now);

        let out: HashMap<SocketAddr, Packet> = relay.world_states().into_iter().collect();
        assert_eq!(out[&addr(2)], Packet::WorldState(Vec::new()));
    }
}
