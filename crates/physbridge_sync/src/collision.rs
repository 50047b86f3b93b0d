//! # Collision Tracker
//!
//! Turns per-tick COLLISION reports into contact-begin notifications.
//!
//! ## Per tick
//!
//! ```text
//! report pairs ──> ContactTable (neighbors + oriented normals)
//!                        │
//!        for every body: diff neighbors against touch set
//!                        │
//!            new neighbor ──> ContactBegin
//! ```
//!
//! A pair is announced once when it first appears and again only after it
//! has been missing from at least one report. Contact ends are tracked but
//! not announced.
//!
//! The normal in a report is relative to the first body of the pair; the
//! second body sees it negated.

use crate::body::Body;
use crate::registry::Registry;
use crate::report::ItemReader;
use physbridge_shared::{CollisionItem, EntityId, Vec3};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// A new contact between two bodies, from `body`'s point of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactBegin {
    /// Body receiving the notification.
    pub body: EntityId,
    /// Body it started touching.
    pub other: EntityId,
    /// `body` linear velocity minus `other` linear velocity.
    pub relative_linear_velocity: Vec3,
    /// `body` angular velocity minus `other` angular velocity.
    pub relative_angular_velocity: Vec3,
    /// Contact normal oriented for `body`.
    pub normal: Vec3,
}

/// Adjacency built from one COLLISION report.
#[derive(Debug, Default)]
pub struct ContactTable {
    neighbors: BTreeMap<EntityId, Vec<EntityId>>,
    normals: HashMap<(EntityId, EntityId), Vec3>,
}

impl ContactTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the table with the pairs in `items`.
    ///
    /// Pairs naming a body that is not registered are dropped.
    pub fn rebuild(&mut self, items: ItemReader<'_, CollisionItem>, bodies: &Registry<Body>) {
        self.neighbors.clear();
        self.normals.clear();

        for item in items.iter() {
            let Some((a, b)) = item.pair() else {
                trace!(id_a = item.id_a, id_b = item.id_b, "invalid ids in contact pair");
                continue;
            };
            if a == b || !bodies.contains(a) || !bodies.contains(b) {
                trace!(%a, %b, "contact pair with unknown body skipped");
                continue;
            }
            self.link(a, b);
            self.link(b, a);
            self.normals.insert((a, b), item.normal);
            self.normals.insert((b, a), -item.normal);
        }
    }

    fn link(&mut self, from: EntityId, to: EntityId) {
        let list = self.neighbors.entry(from).or_default();
        if !list.contains(&to) {
            list.push(to);
        }
    }

    /// Bodies in contact with `id` this tick.
    #[must_use]
    pub fn neighbors(&self, id: EntityId) -> &[EntityId] {
        self.neighbors.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Contact normal between `body` and `other`, oriented for `body`.
    #[must_use]
    pub fn normal(&self, body: EntityId, other: EntityId) -> Option<Vec3> {
        self.normals.get(&(body, other)).copied()
    }

    /// Number of distinct bodies in contact with anything.
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns true if the report had no usable pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Diffs each tick's contacts against every body's touch set.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    table: ContactTable,
    begun: Vec<(EntityId, EntityId)>,
}

impl CollisionTracker {
    /// Creates a tracker with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one COLLISION report.
    ///
    /// Updates every registered body's touch set and appends one
    /// [`ContactBegin`] per new contact to `out`. Returns how many were
    /// appended.
    pub fn process(
        &mut self,
        items: ItemReader<'_, CollisionItem>,
        bodies: &mut Registry<Body>,
        out: &mut Vec<ContactBegin>,
    ) -> usize {
        self.table.rebuild(items, bodies);
        self.begun.clear();

        for (&id, body) in bodies.iter_mut() {
            let neighbors = self.table.neighbors(id);
            let touches = body.touches_mut();
            if neighbors.is_empty() {
                touches.clear();
                continue;
            }
            touches.retain(|other| neighbors.contains(other));
            for &other in neighbors {
                if touches.insert(other) {
                    self.begun.push((id, other));
                }
            }
        }

        let before = out.len();
        for &(id, other) in &self.begun {
            let (Some(body), Some(peer)) = (bodies.get(id), bodies.get(other)) else {
                continue;
            };
            out.push(ContactBegin {
                body: id,
                other,
                relative_linear_velocity: body.linear_velocity() - peer.linear_velocity(),
                relative_angular_velocity: body.angular_velocity() - peer.angular_velocity(),
                normal: self.table.normal(id, other).unwrap_or(Vec3::ZERO),
            });
        }
        out.len() - before
    }

    /// Table built from the last report.
    #[must_use]
    pub fn table(&self) -> &ContactTable {
        &self.table
    }
}
