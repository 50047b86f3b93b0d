//! # Dirty-Flag Reconciler
//!
//! Both directions of transform authority for bodies.
//!
//! ```text
//! controller ── set_position ──> dirty ── flush (updateTransform) ──> clean
//!                                  │                                    │
//!                         WORLD report ignored              WORLD report applied
//! ```
//!
//! Position and rotation are arbitrated independently. Velocities always
//! come from the worker.

use crate::body::Body;
use crate::registry::Registry;
use crate::report::ItemReader;
use physbridge_shared::command::TransformUpdate;
use physbridge_shared::WorldItem;
use tracing::trace;

/// Outcome of applying one WORLD report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldSummary {
    /// Items whose body was registered.
    pub applied: usize,
    /// Items naming an unknown body.
    pub stale: usize,
    /// Positions discarded because the controller owns them.
    pub kept_positions: usize,
    /// Rotations discarded because the controller owns them.
    pub kept_rotations: usize,
}

/// Applies one WORLD item to a body.
///
/// Returns `(position_imported, rotation_imported)`.
pub fn apply_world_item(body: &mut Body, item: &WorldItem) -> (bool, bool) {
    let position = body.import_position(item.position);
    let rotation = body.import_rotation(item.rotation);
    body.import_velocities(item.linear_velocity, item.angular_velocity);
    (position, rotation)
}

/// Applies a WORLD report to every registered body it mentions.
pub fn apply_world_report(bodies: &mut Registry<Body>, items: ItemReader<'_, WorldItem>) -> WorldSummary {
    let mut summary = WorldSummary::default();

    for item in items.iter() {
        let Some(body) = item.body().and_then(|id| bodies.get_mut(id)) else {
            trace!(id = item.id, "WORLD item for unknown body skipped");
            summary.stale += 1;
            continue;
        };
        let (position, rotation) = apply_world_item(body, &item);
        summary.applied += 1;
        summary.kept_positions += usize::from(!position);
        summary.kept_rotations += usize::from(!rotation);
    }

    summary
}

/// Takes the pending transform update of every dirty body, in id order.
///
/// Each body's flags are cleared as its update is yielded, so the iterator
/// must be consumed into the outbound queue.
pub fn take_dirty_updates(bodies: &mut Registry<Body>) -> impl Iterator<Item = TransformUpdate> + '_ {
    bodies.iter_mut().filter_map(|(_, body)| body.take_transform_update())
}
