//! Report protocol types shared between controller and worker.
//!
//! A report is a flat run of `f32` scalars. The scalar at offset 0 is the
//! report tag; what follows is a fixed header and then fixed-size item
//! records:
//!
//! ```text
//! WORLD       [0, count, item * count]   item = 14 scalars
//! COLLISION   [1, count, item * count]   item =  5 scalars
//! VEHICLE     [2, item * n]              item =  9 scalars, n from length
//! CONSTRAINT  [3, item * n]              item =  6 scalars, n from length
//! ```
//!
//! Item records are `Pod` so they can be read straight out of the buffer.

use crate::ids::EntityId;
use crate::math::{Quat, Vec3};
use bytemuck::{Pod, Zeroable};

/// Report type tag (first scalar of every report).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Body transforms and velocities.
    World = 0,
    /// Contact pairs with normals.
    Collision = 1,
    /// Vehicle wheel transforms.
    Vehicle = 2,
    /// Constraint anchors and impulses.
    Constraint = 3,
}

impl ReportKind {
    /// Decodes a tag scalar.
    #[must_use]
    pub fn from_scalar(tag: f32) -> Option<Self> {
        match tag {
            t if t == 0.0 => Some(Self::World),
            t if t == 1.0 => Some(Self::Collision),
            t if t == 2.0 => Some(Self::Vehicle),
            t if t == 3.0 => Some(Self::Constraint),
            _ => None,
        }
    }

    /// Encodes the tag as a scalar.
    #[must_use]
    pub fn to_scalar(self) -> f32 {
        f32::from(self as u8)
    }

    /// Number of scalars before the first item.
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            Self::World | Self::Collision => 2,
            Self::Vehicle | Self::Constraint => 1,
        }
    }

    /// Whether the header carries an explicit item count at offset 1.
    #[must_use]
    pub const fn has_count(self) -> bool {
        matches!(self, Self::World | Self::Collision)
    }

    /// Number of scalars per item.
    #[must_use]
    pub const fn item_size(self) -> usize {
        match self {
            Self::World => WORLD_ITEM_SIZE,
            Self::Collision => COLLISION_ITEM_SIZE,
            Self::Vehicle => VEHICLE_ITEM_SIZE,
            Self::Constraint => CONSTRAINT_ITEM_SIZE,
        }
    }
}

/// Scalars per WORLD item.
pub const WORLD_ITEM_SIZE: usize = 14;
/// Scalars per COLLISION item.
pub const COLLISION_ITEM_SIZE: usize = 5;
/// Scalars per VEHICLE item.
pub const VEHICLE_ITEM_SIZE: usize = 9;
/// Scalars per CONSTRAINT item.
pub const CONSTRAINT_ITEM_SIZE: usize = 6;

/// Size in bytes of one report scalar.
pub const SCALAR_SIZE: usize = std::mem::size_of::<f32>();

/// A fixed-size record inside a report.
pub trait ReportItem: Pod {
    /// The report this record belongs to.
    const KIND: ReportKind;
}

/// One body in a WORLD report.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WorldItem {
    /// Body id
    pub id: f32,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Linear velocity
    pub linear_velocity: Vec3,
    /// Angular velocity
    pub angular_velocity: Vec3,
}

impl WorldItem {
    /// Body this record describes.
    #[must_use]
    pub fn body(&self) -> Option<EntityId> {
        EntityId::from_scalar(self.id)
    }
}

impl ReportItem for WorldItem {
    const KIND: ReportKind = ReportKind::World;
}

/// One contact pair in a COLLISION report.
///
/// The normal is expressed relative to `id_a`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CollisionItem {
    /// First body of the pair
    pub id_a: f32,
    /// Second body of the pair
    pub id_b: f32,
    /// Contact normal, relative to the first body
    pub normal: Vec3,
}

impl CollisionItem {
    /// Both bodies of the pair, if both scalars are valid ids.
    #[must_use]
    pub fn pair(&self) -> Option<(EntityId, EntityId)> {
        Some((EntityId::from_scalar(self.id_a)?, EntityId::from_scalar(self.id_b)?))
    }
}

impl ReportItem for CollisionItem {
    const KIND: ReportKind = ReportKind::Collision;
}

/// One wheel in a VEHICLE report.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VehicleItem {
    /// Vehicle id
    pub vehicle: f32,
    /// Wheel index on that vehicle
    pub wheel: f32,
    /// Wheel world position
    pub position: Vec3,
    /// Wheel world rotation
    pub rotation: Quat,
}

impl VehicleItem {
    /// Vehicle this record describes.
    #[must_use]
    pub fn vehicle(&self) -> Option<EntityId> {
        EntityId::from_scalar(self.vehicle)
    }

    /// Wheel index, if the scalar is a valid index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn wheel_index(&self) -> Option<usize> {
        EntityId::from_scalar(self.wheel).map(|w| w.raw() as usize)
    }
}

impl ReportItem for VehicleItem {
    const KIND: ReportKind = ReportKind::Vehicle;
}

/// One constraint in a CONSTRAINT report.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ConstraintItem {
    /// Constraint id
    pub constraint: f32,
    /// Body the offset is expressed in
    pub body: f32,
    /// Anchor offset in the body's frame
    pub offset: Vec3,
    /// Impulse applied by the solver this step
    pub applied_impulse: f32,
}

impl ConstraintItem {
    /// Constraint this record describes.
    #[must_use]
    pub fn constraint(&self) -> Option<EntityId> {
        EntityId::from_scalar(self.constraint)
    }

    /// Body the offset is relative to.
    #[must_use]
    pub fn body(&self) -> Option<EntityId> {
        EntityId::from_scalar(self.body)
    }
}

impl ReportItem for ConstraintItem {
    const KIND: ReportKind = ReportKind::Constraint;
}
