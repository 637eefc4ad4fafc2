use std::time::Duration;

/// World gravity along -Y in meters per second squared (positive value).
///
/// This is intentionally stronger than earth gravity; blocky avatars with an 18 m/s jump
/// feel floaty at 9.81.
pub const GRAVITY_MPS2: f32 = 30.0;

/// Upper bound for a single physics step in seconds.
///
/// Frame hitches longer than this are not sub-stepped: simulated time simply runs slower
/// than wall time until the frame rate recovers.
pub const MAX_PHYSICS_DT: f32 = 0.033;

/// Minimum mass (kg) for a dynamic block. Blocks with a tiny volume would otherwise get a
/// degenerate inertia tensor.
pub const MIN_BODY_MASS: f32 = 1.0;

/// Normalized linear velocity under which a dynamic body may fall asleep.
pub const BODY_ACTIVITY_THRESHOLD: f32 = 0.01;

/// Mass of the character capsule (kg).
pub const CHARACTER_MASS: f32 = 80.0;

/// Character capsule radius (meters).
pub const CHARACTER_RADIUS: f32 = 0.5;

/// Half length of the cylindrical section of the character capsule (meters).
///
/// Total capsule height is `2 * CHARACTER_HALF_HEIGHT + 2 * CHARACTER_RADIUS`.
pub const CHARACTER_HALF_HEIGHT: f32 = 0.5;

/// Default UDP port of the relay server.
pub const DEFAULT_PORT: u16 = 9050;

/// How often an unanswered `Join` is resent while connecting.
pub const JOIN_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Silence after which a peer (or the server, from the client's point of view) is
/// considered gone.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest datagram we are willing to receive.
pub const MAX_DATAGRAM_SIZE: usize = 16 * 1024;
