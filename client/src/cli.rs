use clap::Parser;
use shared::DEFAULT_PORT;
use shared::protocol::{AvatarData, DEFAULT_PANTS, DEFAULT_SHIRT, DEFAULT_SKIN};

/// Block-world multiplayer client.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// Relay server address.
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Relay server UDP port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Map to load (Baseplate, Crossroads or Tower).
    #[arg(long, default_value = "Crossroads")]
    pub map: String,

    #[arg(long, default_value = "Player")]
    pub username: String,

    /// Shirt color as `#RRGGBB`.
    #[arg(long, default_value = DEFAULT_SHIRT)]
    pub shirt: String,

    /// Pants color as `#RRGGBB`.
    #[arg(long, default_value = DEFAULT_PANTS)]
    pub pants: String,

    /// Skin color as `#RRGGBB`.
    #[arg(long, default_value = DEFAULT_SKIN)]
    pub skin: String,

    /// Body type: 0 normal, 1 slim, 2 blocky.
    #[arg(long, default_value_t = 0)]
    pub body: i32,

    /// Hair style: 0 none, 1 short, 2 long, 3 spiky, 4 afro.
    #[arg(long, default_value_t = 0)]
    pub hair: i32,

    /// Stop after this many frames. Runs until interrupted when absent.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Walk the character around in circles instead of standing still.
    #[arg(long)]
    pub wander: bool,

    /// Target frame rate of the main loop.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,
}

impl Cli {
    pub fn avatar(&self) -> AvatarData {
        AvatarData {
            shirt: self.shirt.clone(),
            pants: self.pants.clone(),
            skin: self.skin.clone(),
            body_type: self.body,
            hair_style: self.hair,
        }
    }
}
