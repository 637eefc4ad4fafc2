/*!
The world: scene graph, physics and the binding between them behind one owner.

Every operation that can affect the simulation (reparenting, destroying, writing a solid
body property) goes through `World`, which forwards the change to [`PhysicsBinding`]. There
is no ambient "current world"; callers hold the `World` they act on.
*/

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::binding::PhysicsBinding;
use crate::contact;
use crate::physics::{PhysicsError, PhysicsWorld, RayHit};
use crate::scene::{BodyShape, NodeClass, NodeId, SceneError, SceneGraph, SolidBody};
use crate::script::{TouchedCallback, UpdateCallback};

pub struct World {
    scene: SceneGraph,
    physics: PhysicsWorld,
    binding: PhysicsBinding,
    game: NodeId,
    workspace: NodeId,
    lighting: NodeId,
    core_gui: NodeId,
    touched: HashMap<NodeId, Vec<TouchedCallback>>,
    updates: Vec<UpdateCallback>,
}

impl World {
    pub fn new() -> Result<Self, PhysicsError> {
        Ok(Self::with_physics(PhysicsWorld::new()?))
    }

    /// Build the data model (`Game` with `Workspace`, `Lighting` and `CoreGui`) around an
    /// existing physics world.
    pub fn with_physics(physics: PhysicsWorld) -> Self {
        let mut scene = SceneGraph::new();
        let game = scene.insert(NodeClass::Game);
        let workspace = scene.insert(NodeClass::Workspace);
        let lighting = scene.insert(NodeClass::Lighting);
        let core_gui = scene.insert(NodeClass::CoreGui);
        for service in [workspace, lighting, core_gui] {
            // Fresh nodes under a fresh root cannot fail to parent.
            let _ = scene.set_parent(service, Some(game));
        }

        Self {
            scene,
            physics,
            binding: PhysicsBinding::new(workspace),
            game,
            workspace,
            lighting,
            core_gui,
            touched: HashMap::new(),
            updates: Vec::new(),
        }
    }

    pub fn game(&self) -> NodeId {
        self.game
    }

    pub fn workspace(&self) -> NodeId {
        self.workspace
    }

    pub fn lighting(&self) -> NodeId {
        self.lighting
    }

    pub fn core_gui(&self) -> NodeId {
        self.core_gui
    }

    /// Look up a service (direct child of `Game`) by name.
    pub fn service(&self, name: &str) -> Option<NodeId> {
        self.scene.find_first_child(self.game, name)
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn binding(&self) -> &PhysicsBinding {
        &self.binding
    }

    fn is_protected(&self, id: NodeId) -> bool {
        [self.game, self.workspace, self.lighting, self.core_gui].contains(&id)
    }

    /// Create a detached node by class name.
    pub fn create(&mut self, class_name: &str) -> Option<NodeId> {
        self.scene.create(class_name)
    }

    /// Create a node by class name directly under `parent`.
    pub fn create_in(&mut self, class_name: &str, parent: NodeId) -> Option<NodeId> {
        let id = self.scene.create(class_name)?;
        match self.set_parent(id, Some(parent)) {
            Ok(()) => Some(id),
            Err(err) => {
                log::warn!("cannot create {class_name} under {parent:?}: {err}");
                self.scene.remove_subtree(id);
                None
            }
        }
    }

    /// Create the capsule-shaped `Character` part for a player at `position` in the
    /// workspace.
    pub fn spawn_character(&mut self, position: Vector3<f32>) -> Result<NodeId, SceneError> {
        let id = self.scene.insert(NodeClass::Part);
        self.scene.set_name(id, "Character")?;
        *self.body_mut(id)? = SolidBody {
            position,
            ..SolidBody::character()
        };
        self.set_parent(id, Some(self.workspace))?;
        Ok(id)
    }

    /// Move `id` under `parent` and attach or release physics for the whole subtree.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if self.is_protected(id) {
            return Err(SceneError::Protected(id));
        }
        if self.scene.set_parent(id, parent)? {
            self.binding
                .sync_subtree(&mut self.scene, &mut self.physics, id);
        }
        Ok(())
    }

    /// Destroy `id` and every descendant, releasing their physics handles and callbacks.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        if self.is_protected(id) {
            return Err(SceneError::Protected(id));
        }
        if !self.scene.contains(id) {
            return Err(SceneError::UnknownNode(id));
        }

        self.set_parent(id, None)?;
        for (node, removed) in self.scene.remove_subtree(id) {
            self.touched.remove(&node);
            if let Some(handle) = removed.body().and_then(SolidBody::handle) {
                self.physics.remove(handle);
            }
        }
        Ok(())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.scene.set_name(id, name)
    }

    pub fn body(&self, id: NodeId) -> Option<&SolidBody> {
        self.scene.body(id)
    }

    fn body_mut(&mut self, id: NodeId) -> Result<&mut SolidBody, SceneError> {
        if !self.scene.contains(id) {
            return Err(SceneError::UnknownNode(id));
        }
        self.scene.body_mut(id).ok_or(SceneError::NotASolidBody(id))
    }

    /// Move the node; a bound body is teleported and loses its linear velocity.
    pub fn set_position(&mut self, id: NodeId, position: Vector3<f32>) -> Result<(), SceneError> {
        self.body_mut(id)?.position = position;
        self.binding
            .push_position(&self.scene, &mut self.physics, id);
        Ok(())
    }

    /// Euler angles in radians about the world axes.
    pub fn set_rotation(&mut self, id: NodeId, rotation: Vector3<f32>) -> Result<(), SceneError> {
        self.body_mut(id)?.rotation = rotation;
        self.binding
            .push_rotation(&self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_size(&mut self, id: NodeId, size: Vector3<f32>) -> Result<(), SceneError> {
        let body = self.body_mut(id)?;
        if body.size == size {
            return Ok(());
        }
        body.size = size;
        self.binding.rebuild(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_anchored(&mut self, id: NodeId, anchored: bool) -> Result<(), SceneError> {
        let body = self.body_mut(id)?;
        if body.anchored == anchored {
            return Ok(());
        }
        body.anchored = anchored;
        self.binding.rebuild(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_shape(&mut self, id: NodeId, shape: BodyShape) -> Result<(), SceneError> {
        let body = self.body_mut(id)?;
        if body.shape == shape {
            return Ok(());
        }
        body.shape = shape;
        self.binding.rebuild(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    /// Override the dynamic mass (`None` falls back to the box volume).
    pub fn set_mass(&mut self, id: NodeId, mass: Option<f32>) -> Result<(), SceneError> {
        self.body_mut(id)?.custom_mass = mass;
        self.binding.rebuild(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_lock_rotation(&mut self, id: NodeId, locked: bool) -> Result<(), SceneError> {
        self.body_mut(id)?.lock_rotation = locked;
        self.binding.rebuild(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_physical(&mut self, id: NodeId, physical: bool) -> Result<(), SceneError> {
        self.body_mut(id)?.physical = physical;
        self.binding.sync_node(&mut self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_collidable(&mut self, id: NodeId, collidable: bool) -> Result<(), SceneError> {
        self.body_mut(id)?.collidable = collidable;
        self.binding
            .push_collidable(&self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_friction(&mut self, id: NodeId, friction: f32) -> Result<(), SceneError> {
        self.body_mut(id)?.friction = friction.max(0.0);
        self.binding
            .push_material(&self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_restitution(&mut self, id: NodeId, restitution: f32) -> Result<(), SceneError> {
        self.body_mut(id)?.restitution = restitution.clamp(0.0, 1.0);
        self.binding
            .push_material(&self.scene, &mut self.physics, id);
        Ok(())
    }

    pub fn set_color(&mut self, id: NodeId, color: Vector3<f32>) -> Result<(), SceneError> {
        self.body_mut(id)?.color = color.map(|c| c.clamp(0.0, 1.0));
        Ok(())
    }

    pub fn set_transparency(&mut self, id: NodeId, transparency: f32) -> Result<(), SceneError> {
        self.body_mut(id)?.transparency = transparency.clamp(0.0, 1.0);
        Ok(())
    }

    /// Linear velocity of a dynamically bound node.
    pub fn velocity(&self, id: NodeId) -> Option<Vector3<f32>> {
        let handle = self.scene.body(id)?.handle()?;
        self.physics.linear_velocity(handle)
    }

    /// Drive a dynamically bound node. Ignored for anything else.
    pub fn set_velocity(&mut self, id: NodeId, velocity: Vector3<f32>) {
        if let Some(handle) = self.scene.body(id).and_then(SolidBody::handle) {
            self.physics.set_linear_velocity(handle, velocity);
        }
    }

    /// Nearest solid body hit by the ray, optionally ignoring one node.
    pub fn raycast(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        ignore: Option<NodeId>,
    ) -> Option<(NodeId, RayHit)> {
        let excluded = ignore
            .and_then(|id| self.scene.body(id))
            .and_then(SolidBody::handle);
        let hit = match excluded {
            Some(handle) => {
                self.physics
                    .raycast_excluding(origin, direction, max_distance, handle)
            }
            None => self.physics.raycast(origin, direction, max_distance),
        }?;
        Some((self.physics.owner_of(hit.handle)?, hit))
    }

    /// Run `callback` on every step `id` is in contact with another solid body.
    pub fn connect_touched(&mut self, id: NodeId, callback: TouchedCallback) {
        if self.scene.contains(id) {
            self.touched.entry(id).or_default().push(callback);
        }
    }

    /// Run `callback` every frame with the elapsed time.
    pub fn bind_to_update(&mut self, callback: UpdateCallback) {
        self.updates.push(callback);
    }

    pub(crate) fn fire_touched(&mut self, node: NodeId, other: NodeId) {
        let Some(mut callbacks) = self.touched.remove(&node) else {
            return;
        };

        for callback in callbacks.iter_mut() {
            if !self.scene.contains(node) {
                break;
            }
            if let Err(err) = callback(self, node, other) {
                log::error!(
                    "touched callback of '{}' failed: {err}",
                    self.scene.name(node).unwrap_or("<destroyed>")
                );
            }
        }

        // Keep callbacks connected while they ran, unless the node is gone.
        if self.scene.contains(node) {
            let added = self.touched.remove(&node).unwrap_or_default();
            callbacks.extend(added);
            self.touched.insert(node, callbacks);
        }
    }

    /// Invoke every update callback with `dt`. Failures are logged and skipped.
    pub fn fire_update(&mut self, dt: f32) {
        let mut callbacks = std::mem::take(&mut self.updates);
        for callback in callbacks.iter_mut() {
            if let Err(err) = callback(self, dt) {
                log::error!("update callback failed: {err}");
            }
        }
        callbacks.append(&mut self.updates);
        self.updates = callbacks;
    }

    /// Advance physics, copy poses back into nodes, then dispatch contacts.
    pub fn step(&mut self, dt: f32) {
        self.physics.step(dt);
        self.binding.pull_poses(&mut self.scene, &self.physics);
        contact::dispatch(self);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::script::ScriptError;

    fn world() -> World {
        World::with_physics(PhysicsWorld::with_threads(1).unwrap())
    }

    /// Every solid body is bound iff it sits under the workspace and is physical, and the
    /// registries hold exactly the bound handles.
    fn assert_binding_consistent(world: &World) {
        let scene = world.scene();
        let mut bound = 0;
        for id in scene.ids() {
            let Some(body) = scene.body(id) else {
                continue;
            };
            let expected = body.physical() && scene.is_descendant_of(id, world.workspace());
            assert_eq!(body.handle().is_some(), expected, "node {id:?}");
            if let Some(handle) = body.handle() {
                bound += 1;
                assert_eq!(world.physics().owner_of(handle), Some(id));
                assert!(world.physics().contains(handle));
            }
        }
        let physics = world.physics();
        assert_eq!(physics.dynamic_body_count() + physics.static_count(), bound);
    }

    #[test]
    fn data_model_has_services() {
        let world = world();
        assert_eq!(world.service("Workspace"), Some(world.workspace()));
        assert_eq!(world.service("Lighting"), Some(world.lighting()));
        assert_eq!(world.service("CoreGui"), Some(world.core_gui()));
        assert_eq!(world.service("Nope"), None);
    }

    #[test]
    fn services_cannot_be_moved_or_destroyed() {
        let mut world = world();
        let ws = world.workspace();
        assert_eq!(world.destroy(ws), Err(SceneError::Protected(ws)));
        assert_eq!(world.set_parent(ws, None), Err(SceneError::Protected(ws)));
        assert_eq!(world.scene().parent(ws), Some(world.game()));
    }

    #[test]
    fn reparenting_keeps_handles_in_sync() {
        let mut world = world();
        let ws = world.workspace();
        let folder = world.create("Folder").unwrap();
        let model = world.create("Model").unwrap();
        let parts: Vec<NodeId> = (0..4).map(|_| world.create("Part").unwrap()).collect();
        world.set_anchored(parts[1], false).unwrap();
        world.set_physical(parts[3], false).unwrap();

        // Deterministic pseudo-random reparent sequence.
        let nodes = [folder, model, parts[0], parts[1], parts[2], parts[3]];
        let parents = [Some(ws), Some(folder), Some(model), None, Some(world.lighting())];
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let node = nodes[(seed >> 8) as usize % nodes.len()];
            let parent = parents[(seed >> 20) as usize % parents.len()];
            // Cycles are rejected; the invariant must hold either way.
            let _ = world.set_parent(node, parent);
            assert_binding_consistent(&world);
        }
    }

    #[test]
    fn nested_subtree_attaches_and_detaches_as_a_unit() {
        let mut world = world();
        let model = world.create("Model").unwrap();
        let part = world.create_in("Part", model).unwrap();
        assert!(world.body(part).unwrap().handle().is_none());

        world.set_parent(model, Some(world.workspace())).unwrap();
        assert!(world.body(part).unwrap().handle().is_some());

        world.set_parent(model, None).unwrap();
        assert!(world.body(part).unwrap().handle().is_none());
        assert_binding_consistent(&world);
    }

    #[test]
    fn destroy_releases_descendant_handles() {
        let mut world = world();
        let model = world.create_in("Model", world.workspace()).unwrap();
        let a = world.create_in("Part", model).unwrap();
        let b = world.create_in("Part", model).unwrap();
        world.set_anchored(b, false).unwrap();
        world.connect_touched(a, Box::new(|_, _, _| Ok(())));
        assert_eq!(world.physics().static_count(), 1);
        assert_eq!(world.physics().dynamic_body_count(), 1);

        world.destroy(model).unwrap();
        assert!(!world.scene().contains(a));
        assert!(!world.scene().contains(b));
        assert_eq!(world.physics().static_count(), 0);
        assert_eq!(world.physics().dynamic_body_count(), 0);
        assert!(world.touched.is_empty());
        assert_eq!(world.destroy(model), Err(SceneError::UnknownNode(model)));
    }

    #[test]
    fn shape_affecting_writes_recreate_the_handle() {
        let mut world = world();
        let part = world.create_in("Part", world.workspace()).unwrap();
        let first = world.body(part).unwrap().handle().unwrap();
        assert!(matches!(first, crate::PhysicsHandle::Static(_)));

        world.set_anchored(part, false).unwrap();
        let second = world.body(part).unwrap().handle().unwrap();
        assert!(matches!(second, crate::PhysicsHandle::Dynamic(_)));

        world.set_size(part, Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let third = world.body(part).unwrap().handle().unwrap();
        assert_ne!(second, third);
        assert!(!world.physics().contains(second));

        world.set_physical(part, false).unwrap();
        assert!(world.body(part).unwrap().handle().is_none());
        assert_binding_consistent(&world);
    }

    #[test]
    fn position_write_teleports_and_stops_the_body() {
        let mut world = world();
        let part = world.create_in("Part", world.workspace()).unwrap();
        world.set_anchored(part, false).unwrap();
        world.set_position(part, Vector3::new(0.0, 50.0, 0.0)).unwrap();
        world.set_velocity(part, Vector3::new(4.0, 0.0, 0.0));
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert!(world.velocity(part).unwrap().norm() > 1.0);
        // Pulled back from the simulation.
        assert!(world.body(part).unwrap().position().y < 50.0);

        world.set_position(part, Vector3::new(3.0, 40.0, 3.0)).unwrap();
        assert_eq!(world.velocity(part), Some(Vector3::zeros()));
    }

    #[test]
    fn non_solid_nodes_reject_body_writes() {
        let mut world = world();
        let folder = world.create("Folder").unwrap();
        assert_eq!(
            world.set_position(folder, Vector3::zeros()),
            Err(SceneError::NotASolidBody(folder))
        );
    }

    fn drop_crate(world: &mut World, collidable: bool) -> (NodeId, NodeId) {
        let floor = world.create_in("Part", world.workspace()).unwrap();
        world.set_size(floor, Vector3::new(20.0, 1.0, 20.0)).unwrap();
        world.set_position(floor, Vector3::new(0.0, -0.5, 0.0)).unwrap();

        let block = world.create("Part").unwrap();
        world.set_anchored(block, false).unwrap();
        world.set_size(block, Vector3::new(1.0, 1.0, 1.0)).unwrap();
        world.set_position(block, Vector3::new(0.0, 1.0, 0.0)).unwrap();
        world.set_collidable(block, collidable).unwrap();
        world.set_parent(block, Some(world.workspace())).unwrap();
        (floor, block)
    }

    #[test]
    fn touched_fires_on_both_sides() {
        let mut world = world();
        let (floor, block) = drop_crate(&mut world, true);

        let log: Rc<RefCell<Vec<(NodeId, NodeId)>>> = Rc::default();
        for node in [floor, block] {
            let log = log.clone();
            world.connect_touched(
                node,
                Box::new(move |_, this, other| {
                    log.borrow_mut().push((this, other));
                    Ok(())
                }),
            );
        }

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        let log = log.borrow();
        assert!(log.contains(&(floor, block)));
        assert!(log.contains(&(block, floor)));
    }

    #[test]
    fn resting_block_keeps_touching() {
        let mut world = world();
        let (floor, _) = drop_crate(&mut world, true);
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        world.connect_touched(
            floor,
            Box::new(move |_, _, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );

        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        assert!(*hits.borrow() > 60, "touched {} times", hits.borrow());
    }

    #[test]
    fn non_collidable_block_never_touches() {
        let mut world = world();
        let (floor, _) = drop_crate(&mut world, false);
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        world.connect_touched(
            floor,
            Box::new(move |_, _, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn callback_errors_do_not_abort_the_frame() {
        let mut world = world();
        let (floor, block) = drop_crate(&mut world, true);
        let ran = Rc::new(RefCell::new(Vec::new()));

        world.connect_touched(
            floor,
            Box::new(|_, _, _| Err(ScriptError::runtime("boom"))),
        );
        let seen = ran.clone();
        world.connect_touched(
            floor,
            Box::new(move |_, _, other| {
                seen.borrow_mut().push(other);
                Ok(())
            }),
        );
        world.bind_to_update(Box::new(|_, _| Err(ScriptError::runtime("update boom"))));
        let ticks = Rc::new(RefCell::new(0.0));
        let acc = ticks.clone();
        world.bind_to_update(Box::new(move |_, dt| {
            *acc.borrow_mut() += dt;
            Ok(())
        }));

        for _ in 0..60 {
            world.fire_update(1.0 / 60.0);
            world.step(1.0 / 60.0);
        }
        assert!(ran.borrow().contains(&block));
        assert!((*ticks.borrow() - 1.0).abs() < 1.0e-3);
    }

    #[test]
    fn callback_may_destroy_the_other_node() {
        let mut world = world();
        let (floor, block) = drop_crate(&mut world, true);
        world.connect_touched(
            floor,
            Box::new(|world, _, other| {
                world.destroy(other)?;
                Ok(())
            }),
        );

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert!(!world.scene().contains(block));
        assert_eq!(world.physics().dynamic_body_count(), 0);
        assert_binding_consistent(&world);
    }

    #[test]
    fn raycast_reports_owner_and_skips_ignored_node() {
        let mut world = world();
        let (floor, block) = drop_crate(&mut world, true);
        world.step(1.0 / 60.0);

        let down = Vector3::new(0.0, -1.0, 0.0);
        let origin = Vector3::new(0.0, 10.0, 0.0);
        let (hit, _) = world.raycast(origin, down, 50.0, None).unwrap();
        assert_eq!(hit, block);
        let (hit, ray) = world.raycast(origin, down, 50.0, Some(block)).unwrap();
        assert_eq!(hit, floor);
        assert!((ray.distance - 10.0).abs() < 1.0e-3);
    }

    #[test]
    fn character_stands_upright_on_the_floor() {
        let mut world = world();
        let (_, block) = drop_crate(&mut world, true);
        world.destroy(block).unwrap();

        let character = world.spawn_character(Vector3::new(0.0, 3.0, 0.0)).unwrap();
        assert_eq!(world.scene().name(character), Some("Character"));
        assert_eq!(world.physics().dynamic_body_count(), 1);

        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let body = world.body(character).unwrap();
        // Capsule center rests one unit above the floor top.
        assert!((body.position().y - 1.0).abs() < 0.05, "y = {}", body.position().y);
        assert!(body.rotation().norm() < 1.0e-3);

        world.set_velocity(character, Vector3::new(5.0, 0.0, 0.0));
        world.step(1.0 / 60.0);
        assert!(world.velocity(character).unwrap().x > 4.0);
    }
}
