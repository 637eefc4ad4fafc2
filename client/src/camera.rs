use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use shared::{CameraBasis, NodeId, World, approach, smoothing_factor};

const TARGET_HEIGHT: f32 = 1.5;
const DEFAULT_PITCH_DEG: f32 = 20.0;
const MIN_PITCH_DEG: f32 = -30.0;
const MAX_PITCH_DEG: f32 = 60.0;
const DEFAULT_DISTANCE: f32 = 8.0;
const MIN_DISTANCE: f32 = 3.0;
const MAX_DISTANCE: f32 = 20.0;
const ZOOM_DECAY_RATE: f32 = 8.0;
/// Closest the camera may be pulled in by an obstruction.
const MIN_OBSTRUCTED_DISTANCE: f32 = 0.8;
/// Gap kept between the camera and whatever blocks it.
const OBSTRUCTION_CUSHION: f32 = 0.4;
const FOV_DEG: f32 = 60.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

/// Third-person orbit camera around the local character.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    target_distance: f32,
    aspect: f32,
    eye: Vector3<f32>,
    target: Vector3<f32>,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: DEFAULT_PITCH_DEG.to_radians(),
            distance: DEFAULT_DISTANCE,
            target_distance: DEFAULT_DISTANCE,
            aspect,
            eye: Vector3::new(0.0, 0.0, DEFAULT_DISTANCE),
            target: Vector3::zeros(),
        }
    }

    #[cfg(test)]
    pub fn eye(&self) -> Vector3<f32> {
        self.eye
    }

    /// Orbit by the given angles (radians). Pitch is clamped.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(
            MIN_PITCH_DEG.to_radians(),
            MAX_PITCH_DEG.to_radians(),
        );
    }

    pub fn zoom(&mut self, delta: f32) {
        self.target_distance = (self.target_distance - delta).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn basis(&self) -> CameraBasis {
        CameraBasis::from_yaw(self.yaw)
    }

    /// Follow `subject`, pulling in when a solid body blocks the view. The subject's own
    /// body (`ignore`) never blocks.
    pub fn update(
        &mut self,
        world: &World,
        subject: Vector3<f32>,
        ignore: Option<NodeId>,
        dt: f32,
    ) {
        // Zoom eases exponentially; `approach` snaps the last millimeter.
        let eased = self.distance
            + (self.target_distance - self.distance) * smoothing_factor(ZOOM_DECAY_RATE, dt);
        self.distance = approach(eased, self.target_distance, 1.0e-3);

        self.target = subject + Vector3::new(0.0, TARGET_HEIGHT, 0.0);
        let horizontal = self.distance * self.pitch.cos();
        let offset = Vector3::new(
            horizontal * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            horizontal * self.yaw.cos(),
        );

        let dir = offset.normalize();
        self.eye = match world.raycast(self.target, dir, self.distance, ignore) {
            Some((_, hit)) => {
                let pulled = (hit.distance - OBSTRUCTION_CUSHION).max(MIN_OBSTRUCTED_DISTANCE);
                self.target + dir * pulled
            }
            None => self.target + offset,
        };
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            &Point3::from(self.eye),
            &Point3::from(self.target),
            &Vector3::y(),
        )
    }

    pub fn projection(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect, FOV_DEG.to_radians(), Z_NEAR, Z_FAR).to_homogeneous()
    }
}

#[cfg(test)]
mod tests {
    use shared::PhysicsWorld;

    use super::*;

    fn world() -> World {
        World::with_physics(PhysicsWorld::with_threads(1).unwrap())
    }

    #[test]
    fn orbit_sits_behind_at_yaw_zero() {
        let world = world();
        let mut cam = OrbitCamera::new(16.0 / 9.0);
        cam.update(&world, Vector3::zeros(), None, 1.0 / 60.0);
        let eye = cam.eye();
        assert!(eye.z > 7.0 && eye.y > 1.5);
        assert!(eye.x.abs() < 1.0e-5);
        // Forward points away from the camera.
        assert!(cam.basis().forward.z < 0.0);
    }

    #[test]
    fn wall_pulls_the_camera_in() {
        let mut world = world();
        let wall = world.create_in("Part", world.workspace()).unwrap();
        world.set_size(wall, Vector3::new(20.0, 20.0, 1.0)).unwrap();
        world.set_position(wall, Vector3::new(0.0, 0.0, 4.0)).unwrap();
        // Raycasts see the broad phase as of the last step.
        world.step(1.0 / 60.0);

        let mut cam = OrbitCamera::new(1.0);
        cam.update(&world, Vector3::zeros(), None, 1.0 / 60.0);
        let dist = (cam.eye() - Vector3::new(0.0, TARGET_HEIGHT, 0.0)).norm();
        assert!(dist < 4.0, "camera at {dist}");
        assert!(dist >= MIN_OBSTRUCTED_DISTANCE);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut cam = OrbitCamera::new(1.0);
        cam.rotate(0.0, 10.0);
        assert!((cam.pitch - MAX_PITCH_DEG.to_radians()).abs() < 1.0e-6);
        cam.zoom(100.0);
        assert_eq!(cam.target_distance, MIN_DISTANCE);
    }
}
