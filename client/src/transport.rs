//! Unreliable UDP link to the relay server.
//!
//! [`Session`] is the join handshake and liveness tracking on decoded packets; [`Transport`]
//! wraps it around a non-blocking socket that is drained once per frame.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Instant;

use shared::protocol::{Packet, PlayerState, UNASSIGNED_ID};
use shared::{CONNECTION_TIMEOUT, JOIN_RETRY_INTERVAL, MAX_DATAGRAM_SIZE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot resolve server address {0}")]
    Resolve(String),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the rest of the client needs to know about the network this frame.
#[derive(Clone, Debug, PartialEq)]
pub enum NetEvent {
    /// The server accepted our `Join` and assigned `id`.
    Connected { id: i32 },
    PlayerState(PlayerState),
    PlayerLeft { id: i32 },
    /// The server went silent. The handshake starts over.
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Link {
    Connecting { last_join: Option<Instant> },
    Joined { id: i32, last_heard: Instant },
}

/// Join handshake and server liveness, independent of any socket.
#[derive(Debug)]
pub struct Session {
    username: String,
    link: Link,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            link: Link::Connecting { last_join: None },
        }
    }

    pub fn local_id(&self) -> Option<i32> {
        match self.link {
            Link::Joined { id, .. } => Some(id),
            Link::Connecting { .. } => None,
        }
    }

    /// The `Join` to send now, if one is due.
    pub fn join_due(&mut self, now: Instant) -> Option<Packet> {
        let Link::Connecting { last_join } = &mut self.link else {
            return None;
        };
        if last_join.is_some_and(|at| now.duration_since(at) < JOIN_RETRY_INTERVAL) {
            return None;
        }
        *last_join = Some(now);
        Some(Packet::Join {
            id: UNASSIGNED_ID,
            username: Some(self.username.clone()),
        })
    }

    pub fn receive(&mut self, packet: Packet, now: Instant, events: &mut Vec<NetEvent>) {
        if let Link::Joined { last_heard, .. } = &mut self.link {
            *last_heard = now;
            match packet {
                Packet::PlayerState(state) => events.push(NetEvent::PlayerState(state)),
                Packet::WorldState(states) => {
                    events.extend(states.into_iter().map(NetEvent::PlayerState));
                }
                Packet::PlayerLeft { id } => events.push(NetEvent::PlayerLeft { id }),
                // Duplicate answers to a retried join.
                Packet::Join { .. } => {}
            }
            return;
        }

        match packet {
            Packet::Join { id, .. } if id != UNASSIGNED_ID => {
                log::info!("joined as player {id}");
                self.link = Link::Joined {
                    id,
                    last_heard: now,
                };
                events.push(NetEvent::Connected { id });
            }
            other => log::debug!("ignoring {:?} before join", other.packet_type()),
        }
    }

    /// Drop the link when the server has been silent for too long.
    pub fn check_timeout(&mut self, now: Instant) -> Option<NetEvent> {
        let Link::Joined { last_heard, .. } = self.link else {
            return None;
        };
        if now.duration_since(last_heard) <= CONNECTION_TIMEOUT {
            return None;
        }
        log::warn!("server silent for {CONNECTION_TIMEOUT:?}, reconnecting");
        self.link = Link::Connecting { last_join: None };
        Some(NetEvent::Disconnected)
    }
}

pub struct Transport {
    socket: UdpSocket,
    server: SocketAddr,
    session: Session,
    buf: Vec<u8>,
}

impl Transport {
    pub fn connect(ip: &str, port: u16, username: &str) -> Result<Self, TransportError> {
        let server = (ip, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(format!("{ip}:{port}")))?
            .next()
            .ok_or_else(|| TransportError::Resolve(format!("{ip}:{port}")))?;
        let bind: SocketAddr = if server.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        log::info!("connecting to {server} from {}", socket.local_addr()?);

        Ok(Self {
            socket,
            server,
            session: Session::new(username),
            buf: vec![0; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_id(&self) -> Option<i32> {
        self.session.local_id()
    }

    /// Send a pending join, drain every queued datagram and check liveness.
    pub fn poll(&mut self, now: Instant) -> Vec<NetEvent> {
        if let Some(join) = self.session.join_due(now) {
            self.send(&join);
        }

        let mut events = Vec::new();
        loop {
            match self.socket.recv_from(&mut self.buf) {
                Ok((len, from)) => {
                    if from != self.server {
                        log::debug!("dropping datagram from stranger {from}");
                        continue;
                    }
                    match Packet::decode(&self.buf[..len]) {
                        Ok(packet) => self.session.receive(packet, now, &mut events),
                        Err(err) => log::warn!("dropping malformed packet: {err}"),
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    // ICMP port unreachable surfaces here while the server is down.
                    log::debug!("receive failed: {err}");
                    break;
                }
            }
        }

        events.extend(self.session.check_timeout(now));
        events
    }

    /// Fire-and-forget our own state. Dropped until the server has accepted us.
    pub fn send_state(&mut self, state: PlayerState) {
        if self.session.local_id().is_some() {
            self.send(&Packet::PlayerState(state));
        }
    }

    fn send(&self, packet: &Packet) {
        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("cannot encode {:?}: {err}", packet.packet_type());
                return;
            }
        };
        match self.socket.send_to(&bytes, self.server) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                log::debug!("socket busy, dropping {:?}", packet.packet_type());
            }
            Err(err) => log::warn!("send to {} failed: {err}", self.server),
        }
    }
}
