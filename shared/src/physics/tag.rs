//! Packed collider `user_data`.
//!
//! Every collider we insert carries a [`ColliderTag`] so that code running inside the
//! physics step (contact filtering on worker threads) can make decisions without touching
//! the scene graph.
//!
//! # Bit layout
//! Least-significant bit = bit 0:
//!
//! - bits 0..=63   : owning [`NodeId`] in slotmap FFI form
//! - bit 64        : non-collidable flag (set = contacts involving this collider are dropped)
//! - bits 65..=127 : reserved (zero)
//!
//! The tag is a plain key, never a reference. The registries on
//! [`super::PhysicsWorld`] stay the source of truth for handle to node resolution.

use slotmap::{Key, KeyData};

use crate::scene::NodeId;

pub type ColliderTag = u128;

const NON_COLLIDABLE_BIT: u32 = u64::BITS;
const OWNER_MASK: u128 = u64::MAX as u128;
const RESERVED_MASK: u128 = !0u128 << (NON_COLLIDABLE_BIT + 1);

/// Pack an owner key and its collidable flag.
pub fn pack_tag(owner: NodeId, collidable: bool) -> ColliderTag {
    let owner = owner.data().as_ffi() as u128;
    if collidable {
        owner
    } else {
        owner | (1u128 << NON_COLLIDABLE_BIT)
    }
}

/// Owner stored in the tag, or `None` for the null key.
pub fn tag_owner(tag: ColliderTag) -> Option<NodeId> {
    let id = NodeId::from(KeyData::from_ffi((tag & OWNER_MASK) as u64));
    (!id.is_null()).then_some(id)
}

pub fn tag_collidable(tag: ColliderTag) -> bool {
    tag & (1u128 << NON_COLLIDABLE_BIT) == 0
}

/// Same owner, new collidable flag.
pub fn with_collidable(tag: ColliderTag, collidable: bool) -> ColliderTag {
    let cleared = tag & !(1u128 << NON_COLLIDABLE_BIT);
    if collidable {
        cleared
    } else {
        cleared | (1u128 << NON_COLLIDABLE_BIT)
    }
}

pub fn is_valid_tag(tag: ColliderTag) -> bool {
    tag & RESERVED_MASK == 0
}
