//! Descriptors carried by `add*` commands.
//!
//! Shapes and materials are opaque to the synchronization layer: they are
//! described once, forwarded to the worker, and never interpreted again
//! beyond the default-mass and scaling rules below.

use crate::ids::EntityId;
use crate::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Collision shape of a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeDescriptor {
    /// Infinite static plane.
    Plane {
        /// Plane normal
        normal: Vec3,
        /// Extent along X, used for the default mass
        width: f32,
        /// Extent along Y, used for the default mass
        height: f32,
    },
    /// Axis-aligned box.
    Box {
        /// Extent along X
        width: f32,
        /// Extent along Y
        height: f32,
        /// Extent along Z
        depth: f32,
    },
    /// Sphere.
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Cylinder aligned with Y.
    Cylinder {
        /// Extent along X
        width: f32,
        /// Extent along Y
        height: f32,
        /// Extent along Z
        depth: f32,
    },
    /// Capsule aligned with Y.
    Capsule {
        /// Cap radius
        radius: f32,
        /// Total height
        height: f32,
    },
    /// Cone aligned with Y.
    Cone {
        /// Base radius
        radius: f32,
        /// Height
        height: f32,
    },
    /// Triangle soup.
    Concave {
        /// Triangles as vertex triples
        triangles: Vec<[Vec3; 3]>,
    },
    /// Convex hull of a point cloud.
    Convex {
        /// Hull points
        points: Vec<Vec3>,
    },
    /// Regular height grid.
    Heightfield {
        /// Extent along X
        xsize: f32,
        /// Extent along Y
        ysize: f32,
        /// Sample count along X
        xpts: u32,
        /// Sample count along Y
        ypts: u32,
        /// Largest absolute sample height
        abs_max_height: f32,
        /// Row-major samples
        points: Vec<f32>,
    },
}

impl ShapeDescriptor {
    /// Mass used when the caller does not supply one.
    #[must_use]
    pub fn default_mass(&self) -> f32 {
        match self {
            Self::Plane { width, height, .. } => width * height,
            Self::Box { width, height, depth } | Self::Cylinder { width, height, depth } => {
                width * height * depth
            }
            Self::Sphere { radius } => (4.0 / 3.0) * std::f32::consts::PI * radius.powi(3),
            Self::Capsule { radius, height } => (2.0 * radius) * height * (2.0 * radius),
            Self::Cone { radius, height } => (2.0 * radius) * height,
            Self::Concave { triangles } => bounding_volume(triangles.iter().flatten().copied()),
            Self::Convex { points } => bounding_volume(points.iter().copied()),
            Self::Heightfield { .. } => 0.0,
        }
    }

    /// Applies a node scale to the dimension fields.
    ///
    /// Only width, height and depth are scaled. Radii and point data are
    /// left as authored.
    pub fn apply_scale(&mut self, scale: Vec3) {
        match self {
            Self::Box { width, height, depth } | Self::Cylinder { width, height, depth } => {
                *width *= scale.x;
                *height *= scale.y;
                *depth *= scale.z;
            }
            Self::Capsule { height, .. } | Self::Cone { height, .. } => {
                *height *= scale.y;
            }
            Self::Plane { .. }
            | Self::Sphere { .. }
            | Self::Concave { .. }
            | Self::Convex { .. }
            | Self::Heightfield { .. } => {}
        }
    }
}

fn bounding_volume(points: impl Iterator<Item = Vec3>) -> f32 {
    let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut any = false;

    for p in points {
        any = true;
        min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }

    if !any {
        return 0.0;
    }
    let extent = max - min;
    extent.x * extent.y * extent.z
}

/// Shape attached to a parent body as part of a compound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildShape {
    /// Child collision shape, inlined with its `type` tag
    #[serde(flatten)]
    pub shape: ShapeDescriptor,
    /// Offset from the parent origin
    pub position_offset: Vec3,
    /// Rotation relative to the parent
    pub rotation: Quat,
}

/// Surface properties shared by any number of bodies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    /// Material id, unique per material
    pub id: u32,
    /// Friction coefficient
    pub friction: f32,
    /// Restitution (bounciness)
    pub restitution: f32,
}

impl MaterialDescriptor {
    /// Default friction.
    pub const DEFAULT_FRICTION: f32 = 0.8;
    /// Default restitution.
    pub const DEFAULT_RESTITUTION: f32 = 0.2;

    /// Material with default friction and restitution.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            friction: Self::DEFAULT_FRICTION,
            restitution: Self::DEFAULT_RESTITUTION,
        }
    }

    /// Overrides friction.
    #[must_use]
    pub const fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Overrides restitution.
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Everything the worker needs to create a rigid body.
///
/// Serializes flat: the shape's `type` tag and dimensions sit next to
/// `id`, `mass` and the pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    /// Body id
    pub id: EntityId,
    /// Collision shape (already scaled)
    #[serde(flatten)]
    pub shape: ShapeDescriptor,
    /// Mass, 0 for static bodies
    pub mass: f32,
    /// Initial position
    pub position: Vec3,
    /// Initial rotation
    pub rotation: Quat,
    /// Registered material, if any
    #[serde(rename = "materialId", default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<u32>,
    /// Compound children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildShape>,
}

/// Suspension and tyre tuning for a raycast vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleTuning {
    /// Suspension spring stiffness
    pub suspension_stiffness: f32,
    /// Damping while compressing
    pub suspension_compression: f32,
    /// Damping while relaxing
    pub suspension_damping: f32,
    /// Maximum travel in centimetres
    pub max_suspension_travel: f32,
    /// Tyre friction
    pub friction_slip: f32,
    /// Maximum suspension force
    pub max_suspension_force: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            suspension_stiffness: 5.88,
            suspension_compression: 0.83,
            suspension_damping: 0.88,
            max_suspension_travel: 500.0,
            friction_slip: 10.5,
            max_suspension_force: 6000.0,
        }
    }
}

/// Everything the worker needs to create a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    /// Vehicle id
    pub id: EntityId,
    /// Chassis body
    #[serde(rename = "rigidBody")]
    pub rigid_body: EntityId,
    /// Tuning, inlined into the descriptor on the wire
    #[serde(flatten)]
    pub tuning: VehicleTuning,
}

/// Geometry and tuning of one wheel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelParams {
    /// Attachment point in chassis space
    pub connection_point: Vec3,
    /// Suspension direction
    pub wheel_direction: Vec3,
    /// Axle direction
    pub wheel_axle: Vec3,
    /// Suspension rest length in centimetres
    pub suspension_rest_length: f32,
    /// Wheel radius
    pub wheel_radius: f32,
    /// Whether the wheel steers
    pub is_front_wheel: bool,
    /// Per-wheel tuning override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<VehicleTuning>,
}

impl WheelParams {
    /// Where the wheel sits before the first report arrives.
    #[must_use]
    pub fn rest_position(&self) -> Vec3 {
        self.connection_point + self.wheel_direction * (self.suspension_rest_length / 100.0)
    }
}

/// Constraint type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Ball-socket
    Point,
    /// Single rotational axis
    Hinge,
    /// Single translational axis
    Slider,
    /// Cone with twist limits
    ConeTwist,
    /// Six degrees of freedom
    Dof,
}

impl ConstraintType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Hinge => "hinge",
            Self::Slider => "slider",
            Self::ConeTwist => "conetwist",
            Self::Dof => "dof",
        }
    }
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable constraint configuration sent with `addConstraint`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDefinition {
    /// Constraint type
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    /// Constraint id
    pub id: EntityId,
    /// First body
    #[serde(rename = "objecta")]
    pub body_a: EntityId,
    /// Second body, absent for world-anchored constraints
    #[serde(rename = "objectb", default, skip_serializing_if = "Option::is_none")]
    pub body_b: Option<EntityId>,
    /// Anchor in the first body's frame
    #[serde(rename = "positiona")]
    pub anchor_a: Vec3,
    /// Anchor in the second body's frame
    #[serde(rename = "positionb", default, skip_serializing_if = "Option::is_none")]
    pub anchor_b: Option<Vec3>,
    /// Hinge or slider axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Vec3>,
    /// First body's Euler rotation (cone-twist, 6-DOF)
    #[serde(rename = "axisa", default, skip_serializing_if = "Option::is_none")]
    pub axis_a: Option<Vec3>,
    /// Second body's Euler rotation (cone-twist, 6-DOF)
    #[serde(rename = "axisb", default, skip_serializing_if = "Option::is_none")]
    pub axis_b: Option<Vec3>,
}
