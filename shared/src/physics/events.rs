//! Hooks invoked by rapier from inside the (possibly parallel) narrow phase.
//!
//! The hooks only read collider data and push into a channel, so they are safe to call
//! from any worker thread.

use crossbeam_channel::Sender;
use rapier3d::prelude::*;

use super::PhysicsHandle;
use super::tag::{tag_collidable, tag_owner};

/// Two participants in contact during the last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactRecord {
    pub a: PhysicsHandle,
    pub b: PhysicsHandle,
}

/// Resolve a collider to the handle the binding registered: its parent body for dynamic
/// bodies, the collider itself for statics.
pub(crate) fn handle_of_collider(
    colliders: &ColliderSet,
    collider: ColliderHandle,
) -> Option<PhysicsHandle> {
    let co = colliders.get(collider)?;
    Some(match co.parent() {
        Some(body) => PhysicsHandle::Dynamic(body),
        None => PhysicsHandle::Static(collider),
    })
}

/// Narrow-phase hooks: the pair filter, and the contact queue's producer side.
///
/// Only pairs with a dynamic side whose colliders are both collidable may generate
/// contacts. Every pair that ends up with solver contacts is queued once per manifold on
/// every step it stays in contact, so resting contacts keep reporting.
pub(crate) struct ContactFilter {
    tx: Sender<ContactRecord>,
}

impl ContactFilter {
    pub fn new(tx: Sender<ContactRecord>) -> Self {
        Self { tx }
    }
}

impl PhysicsHooks for ContactFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if context.rigid_body1.is_none() && context.rigid_body2.is_none() {
            return None;
        }

        let tag1 = context.colliders.get(context.collider1)?.user_data;
        let tag2 = context.colliders.get(context.collider2)?.user_data;
        if !tag_collidable(tag1) || !tag_collidable(tag2) {
            log::trace!(
                "dropping contact between {:?} and {:?}: non-collidable",
                tag_owner(tag1),
                tag_owner(tag2)
            );
            return None;
        }

        Some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        if context.solver_contacts.is_empty() {
            return;
        }

        let (Some(a), Some(b)) = (
            handle_of_collider(context.colliders, context.collider1),
            handle_of_collider(context.colliders, context.collider2),
        ) else {
            return;
        };

        // The receiver lives as long as the world; a failed send only happens during drop.
        let _ = self.tx.send(ContactRecord { a, b });
    }
}
