//! Routes contact records from the physics queue to touched callbacks.

use crate::physics::{ContactRecord, PhysicsWorld};
use crate::scene::{NodeId, SceneGraph};
use crate::world::World;

/// Resolve both sides of a record to live solid-body nodes.
pub fn resolve(
    scene: &SceneGraph,
    physics: &PhysicsWorld,
    record: &ContactRecord,
) -> Option<(NodeId, NodeId)> {
    let a = physics.owner_of(record.a)?;
    let b = physics.owner_of(record.b)?;
    (scene.body(a).is_some() && scene.body(b).is_some()).then_some((a, b))
}

/// Drain the queue and fire `touched` on both participants of every contact.
///
/// Returns the number of records that resolved.
pub fn dispatch(world: &mut World) -> usize {
    let records = world.physics().drain_contacts();
    let mut delivered = 0;

    for record in &records {
        // A callback earlier in this batch may have destroyed either side.
        let Some((a, b)) = resolve(world.scene(), world.physics(), record) else {
            log::debug!("skipping unresolvable contact {record:?}");
            continue;
        };
        delivered += 1;

        world.fire_touched(a, b);
        if world.scene().contains(b) && world.scene().contains(a) {
            world.fire_touched(b, a);
        }
    }

    delivered
}
