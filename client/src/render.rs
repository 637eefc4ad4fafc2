/*!
Boundary to the renderer.

The engine core does not compile shaders or submit draw calls. Each frame it hands the
[`RenderSink`] a camera, a light and a list of colored cubes; a windowed backend turns
those into draw calls, the [`HeadlessRenderer`] just counts them.
*/

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use shared::World;

use crate::avatar::{AvatarRig, FACE, Limb};
use crate::pose::{LimbPose, LimbRotations};

/// Sun position used for lighting and shadows.
pub const LIGHT_POSITION: Vector3<f32> = Vector3::new(50.0, 150.0, 50.0);

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Lit, opaque world geometry.
    #[default]
    Lit = 0,
    /// Unlit overlay (UI).
    Unlit = 1,
    /// Lit with the smooth shading used for avatar limbs.
    Limb = 2,
    /// Unlit wireframe (selection highlight).
    Wireframe = 3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCube {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub color: Vector3<f32>,
    /// 1 opaque, 0 invisible.
    pub alpha: f32,
    pub mode: RenderMode,
}

pub trait RenderSink {
    fn begin_frame(
        &mut self,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
        light_position: Vector3<f32>,
    );
    fn draw(&mut self, cube: DrawCube);
    fn end_frame(&mut self);
}

/// Sink that records what would have been drawn.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    total_cubes: u64,
    frame: Vec<DrawCube>,
    last_frame: Vec<DrawCube>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_cubes(&self) -> u64 {
        self.total_cubes
    }

    /// Cubes submitted during the last completed frame.
    #[cfg(test)]
    pub fn last_frame(&self) -> &[DrawCube] {
        &self.last_frame
    }

    #[cfg(test)]
    pub fn count_mode(&self, mode: RenderMode) -> usize {
        self.last_frame.iter().filter(|c| c.mode == mode).count()
    }
}

impl RenderSink for HeadlessRenderer {
    fn begin_frame(&mut self, _: &Matrix4<f32>, _: &Matrix4<f32>, _: Vector3<f32>) {
        self.frame.clear();
    }

    fn draw(&mut self, cube: DrawCube) {
        self.frame.push(cube);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.total_cubes += self.frame.len() as u64;
        std::mem::swap(&mut self.frame, &mut self.last_frame);
        log::trace!("frame {} drew {} cubes", self.frames, self.last_frame.len());
    }
}

/// Draw every visible solid body under the workspace.
pub fn draw_world(sink: &mut dyn RenderSink, world: &World) {
    let scene = world.scene();
    for id in scene.descendants(world.workspace()) {
        let Some(body) = scene.body(id) else {
            continue;
        };
        let alpha = 1.0 - body.transparency();
        if alpha <= 0.0 {
            continue;
        }
        sink.draw(DrawCube {
            position: body.position(),
            scale: body.size(),
            rotation: body.orientation(),
            color: body.color(),
            alpha,
            mode: RenderMode::Lit,
        });
    }
}

/// Everything needed to draw one avatar.
pub struct AvatarView<'a> {
    pub rig: &'a AvatarRig,
    pub pose: &'a LimbPose,
    pub rotations: &'a LimbRotations,
    pub position: Vector3<f32>,
    pub yaw: f32,
}

/// Draw the limbs, face and hair of one avatar.
pub fn draw_avatar(sink: &mut dyn RenderSink, view: &AvatarView<'_>) {
    let facing = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), view.yaw);
    let base = facing * view.rotations.lean;
    let offset = view.pose.center_offset;

    let limb_cube = |limb: Limb, local: UnitQuaternion<f32>| {
        let part = view.rig.part(limb);
        let center = part.offset + offset + local * part.pivot;
        DrawCube {
            position: view.position + base * center,
            scale: part.size,
            rotation: base * local,
            color: part.color,
            alpha: 1.0,
            mode: RenderMode::Limb,
        }
    };

    let identity = UnitQuaternion::identity();
    let head = limb_cube(Limb::Head, identity);
    for cube in [
        limb_cube(Limb::Torso, identity),
        head,
        limb_cube(Limb::LeftArm, view.rotations.left_arm),
        limb_cube(Limb::RightArm, view.rotations.right_arm),
        limb_cube(Limb::LeftLeg, view.rotations.left_leg),
        limb_cube(Limb::RightLeg, view.rotations.right_leg),
    ] {
        sink.draw(cube);
    }

    for accessory in FACE.iter().chain(view.rig.hair()) {
        sink.draw(DrawCube {
            position: head.position + base * accessory.offset,
            scale: accessory.size,
            rotation: base,
            color: accessory.color,
            alpha: 1.0,
            mode: RenderMode::Lit,
        });
    }
}
