/*!
Synchronization between solid-body nodes and the physics world.

This is the only code that writes node state into physics or copies simulated state back
into nodes:

- push: hierarchy changes attach or release handles; property writes teleport, rotate or
  reconfigure the bound object.
- pull: after each step, every dynamically bound node receives its simulated pose.

A solid body is bound iff it is a descendant of the physics root and `physical`.
*/

use nalgebra::{Isometry3, Translation3};

use crate::constants::BODY_ACTIVITY_THRESHOLD;
use crate::physics::{
    ColliderShapeDef, DynamicBodyDesc, Material, PhysicsHandle, PhysicsWorld, StaticDesc,
};
use crate::scene::{NodeId, SceneGraph, SolidBody};

#[derive(Clone, Copy, Debug)]
pub struct PhysicsBinding {
    root: NodeId,
}

impl PhysicsBinding {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Should `id` currently own a physics handle?
    pub fn should_bind(&self, scene: &SceneGraph, id: NodeId) -> bool {
        scene.body(id).is_some_and(SolidBody::physical) && scene.is_descendant_of(id, self.root)
    }

    /// Attach or release the handle of `id` so it matches [`Self::should_bind`].
    pub fn sync_node(&self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        let bound = scene.body(id).and_then(SolidBody::handle).is_some();
        match (self.should_bind(scene, id), bound) {
            (true, false) => self.attach(scene, physics, id),
            (false, true) => self.detach(scene, physics, id),
            _ => {}
        }
    }

    /// Sync `id` and every descendant. Called after each reparent.
    pub fn sync_subtree(&self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        for node in scene.descendants(id) {
            self.sync_node(scene, physics, node);
        }
    }

    fn attach(&self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        let Some(body) = scene.body_mut(id) else {
            return;
        };

        let shape = ColliderShapeDef::from_body(body.shape(), body.size());
        let pose = Isometry3::from_parts(Translation3::from(body.position()), body.orientation());
        let material = Material {
            friction: body.friction(),
            restitution: body.restitution(),
        };

        let handle = if body.anchored() {
            physics.add_static(
                id,
                &StaticDesc {
                    shape,
                    pose,
                    material,
                    collidable: body.collidable(),
                },
            )
        } else {
            physics.add_dynamic_body(
                id,
                &DynamicBodyDesc {
                    shape,
                    pose,
                    mass: body.mass(),
                    activity_threshold: BODY_ACTIVITY_THRESHOLD,
                    material,
                    collidable: body.collidable(),
                    lock_rotations: body.lock_rotation(),
                },
            )
        };

        log::trace!("attached {id:?} as {handle:?}");
        body.handle = Some(handle);
    }

    fn detach(&self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        let Some(handle) = scene.body_mut(id).and_then(|body| body.handle.take()) else {
            return;
        };
        if !physics.remove(handle) {
            log::warn!("{id:?} was bound to {handle:?}, which no longer exists");
        }
        log::trace!("detached {id:?} from {handle:?}");
    }

    /// Release and recreate the handle of `id`. Used when the shape or mobility changes.
    pub fn rebuild(&self, scene: &mut SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        self.detach(scene, physics, id);
        self.sync_node(scene, physics, id);
    }

    fn handle(scene: &SceneGraph, id: NodeId) -> Option<PhysicsHandle> {
        scene.body(id).and_then(SolidBody::handle)
    }

    /// Teleport the bound object to the node position. Dynamic bodies stop moving.
    pub fn push_position(&self, scene: &SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        if let (Some(handle), Some(body)) = (Self::handle(scene, id), scene.body(id)) {
            physics.teleport(handle, body.position());
        }
    }

    pub fn push_rotation(&self, scene: &SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        if let (Some(handle), Some(body)) = (Self::handle(scene, id), scene.body(id)) {
            physics.set_rotation(handle, body.orientation());
        }
    }

    pub fn push_material(&self, scene: &SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        if let (Some(handle), Some(body)) = (Self::handle(scene, id), scene.body(id)) {
            physics.set_material(
                handle,
                Material {
                    friction: body.friction(),
                    restitution: body.restitution(),
                },
            );
        }
    }

    pub fn push_collidable(&self, scene: &SceneGraph, physics: &mut PhysicsWorld, id: NodeId) {
        if let (Some(handle), Some(body)) = (Self::handle(scene, id), scene.body(id)) {
            physics.set_collidable(handle, body.collidable());
        }
    }

    /// Copy simulated poses of dynamic bodies into their nodes.
    pub fn pull_poses(&self, scene: &mut SceneGraph, physics: &PhysicsWorld) {
        for (handle, owner) in physics.dynamic_owners() {
            let (Some(pose), Some(body)) = (physics.body_pose(handle), scene.body_mut(owner))
            else {
                log::debug!("skipping pose pull for {owner:?}: stale binding");
                continue;
            };
            body.position = pose.translation.vector;
            let (x, y, z) = pose.rotation.euler_angles();
            body.rotation.x = x;
            body.rotation.y = y;
            body.rotation.z = z;
        }
    }
}
