pub mod binding;
pub mod constants;
pub mod contact;
pub mod controller;
pub mod physics;
pub mod protocol;
pub mod scene;
pub mod script;
pub mod utils;
pub mod world;

pub use constants::{
    BODY_ACTIVITY_THRESHOLD, CONNECTION_TIMEOUT, DEFAULT_PORT, GRAVITY_MPS2, JOIN_RETRY_INTERVAL,
    MAX_DATAGRAM_SIZE, MAX_PHYSICS_DT, MIN_BODY_MASS,
};
pub use controller::{
    AnimState, AnimationMachine, CameraBasis, MoveInput, MoveStep, PlayerController,
};
pub use physics::{ContactRecord, Material, PhysicsError, PhysicsHandle, PhysicsWorld, RayHit};
pub use protocol::{AvatarData, Packet, PacketType, PlayerState, ProtocolError, UNASSIGNED_ID};
pub use scene::{BodyShape, NodeClass, NodeId, SceneError, SceneGraph, SolidBody};
pub use script::{ScriptError, TouchedCallback, UpdateCallback};
pub use utils::{approach, shortest_angle_delta, smoothing_factor, wrap_angle, yaw_from_xz};
pub use world::World;
