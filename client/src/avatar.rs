//! Blocky avatar rig built from [`AvatarData`].
//!
//! Offsets are relative to the character position (the capsule center); limbs rotate
//! about their joint, which sits at `offset`, with the mesh center at `offset + pivot`.

use nalgebra::Vector3;
use shared::protocol::AvatarData;

/// Color used when a hex string cannot be parsed.
const FALLBACK_COLOR: Vector3<f32> = Vector3::new(1.0, 1.0, 1.0);

pub const FACE_COLOR: Vector3<f32> = Vector3::new(0.1, 0.1, 0.1);
pub const HAIR_COLOR: Vector3<f32> = Vector3::new(0.2, 0.1, 0.05);

/// Parse `#RRGGBB` (leading `#` optional) into RGB in `0..=1`. Anything else is white.
pub fn parse_hex_color(hex: &str) -> Vector3<f32> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return FALLBACK_COLOR;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => {
            Vector3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0
        }
        _ => FALLBACK_COLOR,
    }
}

/// Horizontal `(width, depth)` scale for a body type. Unknown types are normal.
pub fn body_scale(body_type: i32) -> (f32, f32) {
    match body_type {
        1 => (0.8, 0.8),
        2 => (1.2, 1.1),
        _ => (1.0, 1.0),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limb {
    Torso,
    Head,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbPart {
    pub limb: Limb,
    pub offset: Vector3<f32>,
    pub size: Vector3<f32>,
    pub color: Vector3<f32>,
    pub pivot: Vector3<f32>,
}

/// A cube glued to the head, offset from the head center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accessory {
    pub offset: Vector3<f32>,
    pub size: Vector3<f32>,
    pub color: Vector3<f32>,
}

impl Accessory {
    const fn new(offset: Vector3<f32>, size: Vector3<f32>, color: Vector3<f32>) -> Self {
        Self {
            offset,
            size,
            color,
        }
    }
}

/// Eyes and smile.
pub const FACE: [Accessory; 3] = [
    Accessory::new(
        Vector3::new(0.2, 0.2, 0.51),
        Vector3::new(0.15, 0.15, 0.05),
        FACE_COLOR,
    ),
    Accessory::new(
        Vector3::new(-0.2, 0.2, 0.51),
        Vector3::new(0.15, 0.15, 0.05),
        FACE_COLOR,
    ),
    Accessory::new(
        Vector3::new(0.0, -0.15, 0.51),
        Vector3::new(0.5, 0.1, 0.05),
        FACE_COLOR,
    ),
];

fn hair(style: i32) -> Vec<Accessory> {
    let cap = Accessory::new(
        Vector3::new(0.0, 0.51, 0.0),
        Vector3::new(1.1, 0.2, 1.1),
        HAIR_COLOR,
    );
    match style {
        1 => vec![cap],
        2 => vec![
            cap,
            Accessory::new(
                Vector3::new(0.0, -0.2, -0.55),
                Vector3::new(1.1, 1.2, 0.15),
                HAIR_COLOR,
            ),
        ],
        3 => {
            let mut parts = vec![cap];
            parts.extend((0..3).map(|i| {
                Accessory::new(
                    Vector3::new((i as f32 - 1.0) * 0.3, 0.7, 0.0),
                    Vector3::new(0.2, 0.4, 0.2),
                    HAIR_COLOR,
                )
            }));
            parts
        }
        4 => vec![Accessory::new(
            Vector3::new(0.0, 0.2, 0.0),
            Vector3::new(1.4, 1.4, 1.4),
            HAIR_COLOR,
        )],
        _ => Vec::new(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AvatarRig {
    parts: [LimbPart; 6],
    hair: Vec<Accessory>,
}

impl AvatarRig {
    pub fn build(avatar: &AvatarData) -> Self {
        let skin = parse_hex_color(&avatar.skin);
        let shirt = parse_hex_color(&avatar.shirt);
        let pants = parse_hex_color(&avatar.pants);
        let (w, d) = body_scale(avatar.body_type);

        let limb_size = Vector3::new(w, 2.0, d);
        let hang = Vector3::new(0.0, -1.0, 0.0);
        let part = |limb, offset, size, color, pivot| LimbPart {
            limb,
            offset,
            size,
            color,
            pivot,
        };

        Self {
            parts: [
                part(
                    Limb::Torso,
                    Vector3::new(0.0, 2.0, 0.0),
                    Vector3::new(2.0 * w, 2.0, d),
                    shirt,
                    Vector3::zeros(),
                ),
                part(
                    Limb::Head,
                    Vector3::new(0.0, 3.0, 0.0),
                    Vector3::repeat(1.0),
                    skin,
                    Vector3::new(0.0, 0.5, 0.0),
                ),
                part(
                    Limb::LeftArm,
                    Vector3::new(-1.5 * w, 3.0, 0.0),
                    limb_size,
                    skin,
                    hang,
                ),
                part(
                    Limb::RightArm,
                    Vector3::new(1.5 * w, 3.0, 0.0),
                    limb_size,
                    skin,
                    hang,
                ),
                part(
                    Limb::LeftLeg,
                    Vector3::new(-0.5 * w, 1.0, 0.0),
                    limb_size,
                    pants,
                    hang,
                ),
                part(
                    Limb::RightLeg,
                    Vector3::new(0.5 * w, 1.0, 0.0),
                    limb_size,
                    pants,
                    hang,
                ),
            ],
            hair: hair(avatar.hair_style),
        }
    }

    pub fn part(&self, limb: Limb) -> &LimbPart {
        // Parts are stored in `Limb` declaration order.
        &self.parts[limb as usize]
    }

    pub fn hair(&self) -> &[Accessory] {
        &self.hair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        let c = parse_hex_color("#FF8000");
        assert!((c - Vector3::new(1.0, 128.0 / 255.0, 0.0)).norm() < 1.0e-6);
        assert_eq!(parse_hex_color("ff8000"), c);
    }

    #[test]
    fn bad_hex_falls_back_to_white() {
        for bad in ["", "#FFF", "#GGGGGG", "#1234567", "#ééé"] {
            assert_eq!(parse_hex_color(bad), FALLBACK_COLOR, "{bad}");
        }
    }

    #[test]
    fn body_type_scales_width_and_depth() {
        let slim = AvatarRig::build(&AvatarData {
            body_type: 1,
            ..AvatarData::default()
        });
        let torso = slim.part(Limb::Torso);
        assert!((torso.size.x - 1.6).abs() < 1.0e-6);
        assert!((torso.size.z - 0.8).abs() < 1.0e-6);
        assert!((slim.part(Limb::RightArm).offset.x - 1.2).abs() < 1.0e-6);

        let normal = AvatarRig::build(&AvatarData::default());
        assert_eq!(normal.part(Limb::Head).size, Vector3::repeat(1.0));
        assert_eq!(normal.part(Limb::LeftLeg).limb, Limb::LeftLeg);
        assert_eq!(normal.part(Limb::LeftLeg).color, parse_hex_color("#264073"));
    }

    #[test]
    fn hair_styles() {
        let count = |style| {
            AvatarRig::build(&AvatarData {
                hair_style: style,
                ..AvatarData::default()
            })
            .hair()
            .len()
        };
        assert_eq!(
            [0, 1, 2, 3, 4, 99].map(count),
            [0, 1, 2, 4, 1, 0]
        );
    }
}
