/*!
Wire protocol between clients and the relay server.

Every datagram starts with a [`PacketType`] byte. Field order and widths are fixed:

| packet        | payload                                                    |
|---------------|------------------------------------------------------------|
| `Join`        | i32 id (`-1` from a client), string username               |
| `PlayerState` | one player state body                                      |
| `WorldState`  | i32 count, then `count` player state bodies               |
| `PlayerLeft`  | i32 id                                                     |

A player state body is: i32 id, string username, avatar (three strings, two i32), three f32
position, f32 yaw, f32 walk-cycle phase, u8 animation state.
*/

mod codec;

pub use codec::{ProtocolError, Reader, Writer};

use nalgebra::Vector3;

use crate::controller::AnimState;

/// Id a client puts in its `Join` before the server assigned one.
pub const UNASSIGNED_ID: i32 = -1;

pub const DEFAULT_SHIRT: &str = "#CC3333";
pub const DEFAULT_PANTS: &str = "#264073";
pub const DEFAULT_SKIN: &str = "#FFD9B8";

/// Smallest possible encoded player state body.
const MIN_PLAYER_STATE_LEN: usize = 4 + 2 + 3 * 2 + 2 * 4 + 5 * 4 + 1;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    Join = 0,
    PlayerState = 1,
    WorldState = 2,
    PlayerLeft = 3,
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Join),
            1 => Ok(Self::PlayerState),
            2 => Ok(Self::WorldState),
            3 => Ok(Self::PlayerLeft),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

/// Avatar appearance. Colors are `#RRGGBB` strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvatarData {
    pub shirt: String,
    pub pants: String,
    pub skin: String,
    /// 0 normal, 1 slim, 2 blocky.
    pub body_type: i32,
    /// 0 none, 1 short, 2 long, 3 spiky, 4 afro.
    pub hair_style: i32,
}

impl Default for AvatarData {
    fn default() -> Self {
        Self {
            shirt: DEFAULT_SHIRT.to_string(),
            pants: DEFAULT_PANTS.to_string(),
            skin: DEFAULT_SKIN.to_string(),
            body_type: 0,
            hair_style: 0,
        }
    }
}

impl AvatarData {
    fn write(&self, w: &mut Writer) -> Result<(), ProtocolError> {
        w.put_str(Some(&self.shirt))?;
        w.put_str(Some(&self.pants))?;
        w.put_str(Some(&self.skin))?;
        w.put_i32(self.body_type);
        w.put_i32(self.hair_style);
        Ok(())
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let defaults = Self::default();
        Ok(Self {
            shirt: r.get_str()?.unwrap_or(defaults.shirt),
            pants: r.get_str()?.unwrap_or(defaults.pants),
            skin: r.get_str()?.unwrap_or(defaults.skin),
            body_type: r.get_i32()?,
            hair_style: r.get_i32()?,
        })
    }
}

/// Replicated snapshot of one player.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerState {
    pub id: i32,
    pub username: Option<String>,
    pub avatar: AvatarData,
    pub position: Vector3<f32>,
    /// Facing yaw in radians.
    pub rotation: f32,
    pub walk_cycle: f32,
    pub state: AnimState,
}

impl PlayerState {
    fn write(&self, w: &mut Writer) -> Result<(), ProtocolError> {
        w.put_i32(self.id);
        w.put_str(self.username.as_deref())?;
        self.avatar.write(w)?;
        w.put_f32(self.position.x);
        w.put_f32(self.position.y);
        w.put_f32(self.position.z);
        w.put_f32(self.rotation);
        w.put_f32(self.walk_cycle);
        w.put_u8(self.state.into());
        Ok(())
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let id = r.get_i32()?;
        let username = r.get_str()?;
        let avatar = AvatarData::read(r)?;
        let position = Vector3::new(r.get_f32()?, r.get_f32()?, r.get_f32()?);
        let rotation = r.get_f32()?;
        let walk_cycle = r.get_f32()?;
        let state = AnimState::try_from(r.get_u8()?).map_err(ProtocolError::InvalidAnimState)?;
        Ok(Self {
            id,
            username,
            avatar,
            position,
            rotation,
            walk_cycle,
            state,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Join { id: i32, username: Option<String> },
    PlayerState(PlayerState),
    WorldState(Vec<PlayerState>),
    PlayerLeft { id: i32 },
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Join { .. } => PacketType::Join,
            Self::PlayerState(_) => PacketType::PlayerState,
            Self::WorldState(_) => PacketType::WorldState,
            Self::PlayerLeft { .. } => PacketType::PlayerLeft,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = Writer::new();
        w.put_u8(self.packet_type() as u8);
        match self {
            Self::Join { id, username } => {
                w.put_i32(*id);
                w.put_str(username.as_deref())?;
            }
            Self::PlayerState(state) => state.write(&mut w)?,
            Self::WorldState(states) => {
                let count = i32::try_from(states.len())
                    .map_err(|_| ProtocolError::InvalidCount(i32::MAX))?;
                w.put_i32(count);
                for state in states {
                    state.write(&mut w)?;
                }
            }
            Self::PlayerLeft { id } => w.put_i32(*id),
        }
        Ok(w.into_bytes())
    }

    /// Decode one datagram. The whole buffer must be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, _) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        let mut r = Reader::new(bytes);
        r.get_u8()?;

        let packet = match PacketType::try_from(tag)? {
            PacketType::Join => Self::Join {
                id: r.get_i32()?,
                username: r.get_str()?,
            },
            PacketType::PlayerState => Self::PlayerState(PlayerState::read(&mut r)?),
            PacketType::WorldState => {
                let count = r.get_i32()?;
                let Ok(n) = usize::try_from(count) else {
                    return Err(ProtocolError::InvalidCount(count));
                };
                if n > r.remaining() / MIN_PLAYER_STATE_LEN {
                    return Err(ProtocolError::InvalidCount(count));
                }
                let mut states = Vec::with_capacity(n);
                for _ in 0..n {
                    states.push(PlayerState::read(&mut r)?);
                }
                Self::WorldState(states)
            }
            PacketType::PlayerLeft => Self::PlayerLeft { id: r.get_i32()? },
        };

        r.finish()?;
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: i32) -> PlayerState {
        PlayerState {
            id,
            username: Some("cat".to_string()),
            avatar: AvatarData {
                shirt: "#112233".to_string(),
                pants: "#445566".to_string(),
                skin: "#778899".to_string(),
                body_type: 2,
                hair_style: 3,
            },
            position: Vector3::new(1.25, -3.5, 1.0e-7),
            rotation: -2.75,
            walk_cycle: 123.456,
            state: AnimState::Fall,
        }
    }

    #[test]
    fn player_state_round_trips_exactly() {
        let packet = Packet::PlayerState(sample(7));
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes[0], PacketType::PlayerState as u8);
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn player_state_layout_is_fixed() {
        let mut state = sample(1);
        state.username = None;
        let bytes = Packet::PlayerState(state).encode().unwrap();
        // tag, id, empty name, 3 * (prefix + 7 bytes), 2 * i32, 5 * f32, state
        assert_eq!(bytes.len(), 1 + 4 + 2 + 3 * 9 + 8 + 20 + 1);
        assert_eq!(&bytes[1..5], &1i32.to_le_bytes());
        assert_eq!(&bytes[5..7], &[0, 0]);
        assert_eq!(&bytes[7..9], &8u16.to_le_bytes());
        assert_eq!(*bytes.last().unwrap(), AnimState::Fall as u8);
    }

    #[test]
    fn world_state_and_control_packets_round_trip() {
        for packet in [
            Packet::WorldState(vec![sample(1), sample(2), sample(3)]),
            Packet::WorldState(Vec::new()),
            Packet::Join {
                id: UNASSIGNED_ID,
                username: Some("newbie".to_string()),
            },
            Packet::PlayerLeft { id: 42 },
        ] {
            let bytes = packet.encode().unwrap();
            assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn malformed_packets_are_rejected() {
        assert_eq!(Packet::decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(
            Packet::decode(&[9, 0, 0, 0, 0]),
            Err(ProtocolError::UnknownPacketType(9))
        );

        let bytes = Packet::PlayerState(sample(5)).encode().unwrap();
        for cut in 1..bytes.len() {
            assert!(Packet::decode(&bytes[..cut]).is_err(), "cut at {cut}");
        }

        let mut bad_state = bytes.clone();
        *bad_state.last_mut().unwrap() = 7;
        assert_eq!(
            Packet::decode(&bad_state),
            Err(ProtocolError::InvalidAnimState(7))
        );

        let mut trailing = bytes;
        trailing.push(0);
        assert_eq!(Packet::decode(&trailing), Err(ProtocolError::TrailingBytes(1)));
    }

    #[test]
    fn world_state_count_is_validated() {
        let mut negative = vec![PacketType::WorldState as u8];
        negative.extend_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(Packet::decode(&negative), Err(ProtocolError::InvalidCount(-1)));

        let mut huge = vec![PacketType::WorldState as u8];
        huge.extend_from_slice(&1_000_000i32.to_le_bytes());
        assert_eq!(
            Packet::decode(&huge),
            Err(ProtocolError::InvalidCount(1_000_000))
        );
    }

    #[test]
    fn missing_avatar_strings_fall_back_to_defaults() {
        let mut w = Writer::new();
        w.put_u8(PacketType::PlayerState as u8);
        w.put_i32(3);
        w.put_str(None).unwrap();
        for _ in 0..3 {
            w.put_str(None).unwrap();
        }
        w.put_i32(0);
        w.put_i32(0);
        for _ in 0..5 {
            w.put_f32(0.0);
        }
        w.put_u8(0);

        let Packet::PlayerState(state) = Packet::decode(&w.into_bytes()).unwrap() else {
            panic!("expected player state");
        };
        assert_eq!(state.avatar, AvatarData::default());
        assert_eq!(state.username, None);
    }
}
