/*!
Rigid-body simulation owned by a [`crate::World`].

`PhysicsWorld` wraps the rapier sets and pipeline, a rayon worker pool the step fans out
on, and the handle registries that map physics objects back to scene nodes.

Conventions
- Dynamic bodies are rapier rigid bodies with one attached collider; the registered handle
  is the [`RigidBodyHandle`].
- Statics are parentless colliders; the registered handle is the [`ColliderHandle`].
- A handle is present in a registry iff the object exists in the simulation. Both sides
  are updated inside the same method.
- Contacts are collected on worker threads into a channel and drained on the caller's
  thread once `step` has returned. A pair is reported on every step it stays in contact.
*/

mod events;
pub mod shape;
pub mod tag;

pub use events::ContactRecord;
pub use shape::ColliderShapeDef;

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use crossbeam_channel::{Receiver, unbounded};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use thiserror::Error;

use crate::constants::{GRAVITY_MPS2, MAX_PHYSICS_DT};
use crate::scene::NodeId;
use events::{ContactFilter, handle_of_collider};
use tag::{pack_tag, with_collidable};

/// Smallest ray direction length accepted by [`PhysicsWorld::raycast`].
const RAY_DIR_EPS: f32 = 1.0e-6;

/// A bound physics object: either a dynamic body or a static collider, never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicsHandle {
    Dynamic(RigidBodyHandle),
    Static(ColliderHandle),
}

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("failed to build physics worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Surface coefficients of a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 1.0,
            restitution: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DynamicBodyDesc {
    pub shape: ColliderShapeDef,
    pub pose: Isometry3<f32>,
    pub mass: f32,
    /// Normalized linear velocity under which the body may sleep.
    pub activity_threshold: f32,
    pub material: Material,
    pub collidable: bool,
    pub lock_rotations: bool,
}

#[derive(Clone, Debug)]
pub struct StaticDesc {
    pub shape: ColliderShapeDef,
    pub pose: Isometry3<f32>,
    pub material: Material,
    pub collidable: bool,
}

/// Nearest ray intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub handle: PhysicsHandle,
    /// Distance from the ray origin in meters.
    pub distance: f32,
    pub normal: Vector3<f32>,
}

pub struct PhysicsWorld {
    gravity: Vector3<f32>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    pool: rayon::ThreadPool,
    hooks: ContactFilter,
    contacts: Receiver<ContactRecord>,
    body_owners: HashMap<RigidBodyHandle, NodeId>,
    static_owners: HashMap<ColliderHandle, NodeId>,
}

impl PhysicsWorld {
    /// Create an empty world with one worker per available core.
    pub fn new() -> Result<Self, PhysicsError> {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::with_threads(threads)
    }

    pub fn with_threads(threads: usize) -> Result<Self, PhysicsError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("physics-{i}"))
            .build()?;
        let (tx, rx) = unbounded();

        log::debug!("physics world created with {} worker(s)", pool.current_num_threads());

        Ok(Self {
            gravity: Vector3::new(0.0, -GRAVITY_MPS2, 0.0),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            pool,
            hooks: ContactFilter::new(tx),
            contacts: rx,
            body_owners: HashMap::new(),
            static_owners: HashMap::new(),
        })
    }

    /// Advance the simulation by `dt` seconds, clamped to [`MAX_PHYSICS_DT`].
    ///
    /// Longer frames are not sub-stepped. Returns once every worker has finished.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.params.dt = dt.min(MAX_PHYSICS_DT);

        let Self {
            gravity,
            params,
            pipeline,
            islands,
            broad_phase,
            narrow_phase,
            bodies,
            colliders,
            impulse_joints,
            multibody_joints,
            ccd_solver,
            pool,
            hooks,
            ..
        } = self;

        pool.install(|| {
            pipeline.step(
                &*gravity,
                &*params,
                islands,
                broad_phase,
                narrow_phase,
                bodies,
                colliders,
                impulse_joints,
                multibody_joints,
                ccd_solver,
                &*hooks,
                &(),
            )
        });
    }

    fn collider_builder(
        shape: &ColliderShapeDef,
        owner: NodeId,
        collidable: bool,
        material: Material,
    ) -> ColliderBuilder {
        shape
            .builder()
            .friction(material.friction)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .restitution(material.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::MODIFY_SOLVER_CONTACTS)
            .user_data(pack_tag(owner, collidable))
    }

    pub fn add_dynamic_body(&mut self, owner: NodeId, desc: &DynamicBodyDesc) -> PhysicsHandle {
        let mut builder = RigidBodyBuilder::dynamic().pose(desc.pose);
        if desc.lock_rotations {
            builder = builder.lock_rotations();
        }
        let mut body = builder.build();
        body.activation_mut().normalized_linear_threshold = desc.activity_threshold;
        let body_handle = self.bodies.insert(body);

        let collider = Self::collider_builder(&desc.shape, owner, desc.collidable, desc.material)
            .mass(desc.mass)
            .build();
        self.colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.body_owners.insert(body_handle, owner);
        PhysicsHandle::Dynamic(body_handle)
    }

    pub fn remove_dynamic_body(&mut self, handle: RigidBodyHandle) -> bool {
        let removed = self
            .bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        self.body_owners.remove(&handle);
        removed
    }

    pub fn add_static(&mut self, owner: NodeId, desc: &StaticDesc) -> PhysicsHandle {
        let mut collider =
            Self::collider_builder(&desc.shape, owner, desc.collidable, desc.material).build();
        collider.set_position(desc.pose);
        let handle = self.colliders.insert(collider);

        self.static_owners.insert(handle, owner);
        PhysicsHandle::Static(handle)
    }

    pub fn remove_static(&mut self, handle: ColliderHandle) -> bool {
        let removed = self
            .colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some();
        self.static_owners.remove(&handle);
        removed
    }

    /// Remove whichever kind of object `handle` names.
    pub fn remove(&mut self, handle: PhysicsHandle) -> bool {
        match handle {
            PhysicsHandle::Dynamic(h) => self.remove_dynamic_body(h),
            PhysicsHandle::Static(h) => self.remove_static(h),
        }
    }

    /// Node that owns `handle`, if it is registered.
    pub fn owner_of(&self, handle: PhysicsHandle) -> Option<NodeId> {
        match handle {
            PhysicsHandle::Dynamic(h) => self.body_owners.get(&h).copied(),
            PhysicsHandle::Static(h) => self.static_owners.get(&h).copied(),
        }
    }

    pub fn contains(&self, handle: PhysicsHandle) -> bool {
        match handle {
            PhysicsHandle::Dynamic(h) => {
                self.body_owners.contains_key(&h) && self.bodies.contains(h)
            }
            PhysicsHandle::Static(h) => {
                self.static_owners.contains_key(&h) && self.colliders.contains(h)
            }
        }
    }

    /// Registered dynamic bodies and their owners.
    pub fn dynamic_owners(&self) -> impl Iterator<Item = (PhysicsHandle, NodeId)> + '_ {
        self.body_owners
            .iter()
            .map(|(&handle, &owner)| (PhysicsHandle::Dynamic(handle), owner))
    }

    pub fn dynamic_body_count(&self) -> usize {
        self.body_owners.len()
    }

    pub fn static_count(&self) -> usize {
        self.static_owners.len()
    }

    /// Move the object to `position`. Dynamic bodies also lose all linear velocity.
    pub fn teleport(&mut self, handle: PhysicsHandle, position: Vector3<f32>) {
        match handle {
            PhysicsHandle::Dynamic(h) => {
                if let Some(body) = self.bodies.get_mut(h) {
                    body.set_translation(position, true);
                    body.set_linvel(Vector3::zeros(), true);
                }
            }
            PhysicsHandle::Static(h) => {
                if let Some(collider) = self.colliders.get_mut(h) {
                    collider.set_translation(position);
                }
            }
        }
    }

    pub fn set_rotation(&mut self, handle: PhysicsHandle, rotation: UnitQuaternion<f32>) {
        match handle {
            PhysicsHandle::Dynamic(h) => {
                if let Some(body) = self.bodies.get_mut(h) {
                    body.set_rotation(rotation, true);
                }
            }
            PhysicsHandle::Static(h) => {
                if let Some(collider) = self.colliders.get_mut(h) {
                    collider.set_rotation(rotation);
                }
            }
        }
    }

    /// Current world pose of the object.
    pub fn body_pose(&self, handle: PhysicsHandle) -> Option<Isometry3<f32>> {
        let (translation, rotation) = match handle {
            PhysicsHandle::Dynamic(h) => {
                let body = self.bodies.get(h)?;
                (*body.translation(), *body.rotation())
            }
            PhysicsHandle::Static(h) => {
                let collider = self.colliders.get(h)?;
                (*collider.translation(), *collider.rotation())
            }
        };
        Some(Isometry3::from_parts(
            Translation3::from(translation),
            rotation,
        ))
    }

    /// Linear velocity of a dynamic body. Statics report `None`.
    pub fn linear_velocity(&self, handle: PhysicsHandle) -> Option<Vector3<f32>> {
        match handle {
            PhysicsHandle::Dynamic(h) => self.bodies.get(h).map(|b| *b.linvel()),
            PhysicsHandle::Static(_) => None,
        }
    }

    pub fn set_linear_velocity(&mut self, handle: PhysicsHandle, velocity: Vector3<f32>) {
        if let PhysicsHandle::Dynamic(h) = handle
            && let Some(body) = self.bodies.get_mut(h)
        {
            body.set_linvel(velocity, true);
        }
    }

    fn colliders_of(&self, handle: PhysicsHandle) -> Vec<ColliderHandle> {
        match handle {
            PhysicsHandle::Dynamic(h) => self
                .bodies
                .get(h)
                .map(|b| b.colliders().to_vec())
                .unwrap_or_default(),
            PhysicsHandle::Static(h) => vec![h],
        }
    }

    /// Replace the surface coefficients; the combined pair values are recomputed by the
    /// solver on the next step.
    pub fn set_material(&mut self, handle: PhysicsHandle, material: Material) {
        for h in self.colliders_of(handle) {
            if let Some(collider) = self.colliders.get_mut(h) {
                collider.set_friction(material.friction);
                collider.set_restitution(material.restitution);
            }
        }
    }

    pub fn set_collidable(&mut self, handle: PhysicsHandle, collidable: bool) {
        for h in self.colliders_of(handle) {
            if let Some(collider) = self.colliders.get_mut(h) {
                collider.user_data = with_collidable(collider.user_data, collidable);
            }
        }
        if let PhysicsHandle::Dynamic(h) = handle
            && let Some(body) = self.bodies.get_mut(h)
        {
            body.wake_up(true);
        }
    }

    /// Take every contact record produced since the last drain, one per touching pair.
    pub fn drain_contacts(&self) -> Vec<ContactRecord> {
        let mut seen = HashSet::new();
        self.contacts
            .try_iter()
            .filter(|record| seen.insert(*record))
            .collect()
    }

    /// Nearest hit along `direction` within `max_distance`.
    ///
    /// Queries run against the acceleration structure as of the last [`Self::step`]; objects
    /// added since then are not visible yet.
    pub fn raycast(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        self.cast(origin, direction, max_distance, QueryFilter::default())
    }

    /// Like [`Self::raycast`], ignoring `exclude`.
    pub fn raycast_excluding(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude: PhysicsHandle,
    ) -> Option<RayHit> {
        let filter = match exclude {
            PhysicsHandle::Dynamic(h) => QueryFilter::default().exclude_rigid_body(h),
            PhysicsHandle::Static(h) => QueryFilter::default().exclude_collider(h),
        };
        self.cast(origin, direction, max_distance, filter)
    }

    fn cast(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        filter: QueryFilter<'_>,
    ) -> Option<RayHit> {
        let len = direction.norm();
        if !len.is_finite() || len <= RAY_DIR_EPS || max_distance.is_nan() || max_distance <= 0.0 {
            return None;
        }

        let ray = Ray::new(Point3::from(origin), direction / len);
        let query_pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let (collider, hit) = query_pipeline.cast_ray_and_get_normal(&ray, max_distance, true)?;
        Some(RayHit {
            handle: handle_of_collider(&self.colliders, collider)?,
            distance: hit.time_of_impact,
            normal: hit.normal,
        })
    }
}
