//! # Body Shadow State
//!
//! The controller's copy of one simulated body.
//!
//! Position and rotation each carry a dirty flag. A set flag means the
//! controller authored the value and it must reach the worker before the
//! worker's report may overwrite it again. Flags are cleared in exactly one
//! place, [`Body::take_transform_update`], which hands back the command
//! payload that carries the value.

use physbridge_shared::command::TransformUpdate;
use physbridge_shared::{
    BodyDescriptor, ChildShape, EntityId, MaterialDescriptor, Quat, ShapeDescriptor, Vec3,
};
use std::collections::BTreeSet;

/// Shadow state of a simulated body.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    id: EntityId,
    mass: f32,
    position: Vec3,
    rotation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    dirty_position: bool,
    dirty_rotation: bool,
    touches: BTreeSet<EntityId>,
    material: Option<u32>,
    ready: bool,
}

impl Body {
    /// Creates a body at rest. Both flags start clean: the initial
    /// transform travels with `addObject`.
    #[must_use]
    pub fn new(id: EntityId, mass: f32, position: Vec3, rotation: Quat) -> Self {
        Self {
            id,
            mass,
            position,
            rotation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            dirty_position: false,
            dirty_rotation: false,
            touches: BTreeSet::new(),
            material: None,
            ready: false,
        }
    }

    /// Body id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Mass, 0 for static bodies.
    #[inline]
    #[must_use]
    pub const fn mass(&self) -> f32 {
        self.mass
    }

    /// Last known position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Last known rotation.
    #[inline]
    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Last reported linear velocity.
    #[inline]
    #[must_use]
    pub const fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Last reported angular velocity.
    #[inline]
    #[must_use]
    pub const fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Whether the controller owns the position this tick.
    #[inline]
    #[must_use]
    pub const fn dirty_position(&self) -> bool {
        self.dirty_position
    }

    /// Whether the controller owns the rotation this tick.
    #[inline]
    #[must_use]
    pub const fn dirty_rotation(&self) -> bool {
        self.dirty_rotation
    }

    /// Registered material, if any.
    #[must_use]
    pub const fn material(&self) -> Option<u32> {
        self.material
    }

    /// Whether the worker acknowledged the body with `objectReady`.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Bodies currently in contact with this one, in id order.
    pub fn touches(&self) -> impl ExactSizeIterator<Item = EntityId> + '_ {
        self.touches.iter().copied()
    }

    /// Returns true if this body is in contact with `other`.
    #[must_use]
    pub fn is_touching(&self, other: EntityId) -> bool {
        self.touches.contains(&other)
    }

    /// Authors a new position and marks it dirty.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty_position = true;
    }

    /// Authors a new rotation and marks it dirty.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.dirty_rotation = true;
    }

    /// Takes the pending transform update, clearing the flags it covers.
    ///
    /// Returns `None` when neither field is dirty. The returned payload
    /// must be sent; the flags are already cleared.
    #[must_use = "the dirty flags are cleared; the update must be sent"]
    pub fn take_transform_update(&mut self) -> Option<TransformUpdate> {
        if !self.dirty_position && !self.dirty_rotation {
            return None;
        }
        let update = TransformUpdate {
            id: self.id,
            pos: self.dirty_position.then_some(self.position),
            quat: self.dirty_rotation.then_some(self.rotation),
        };
        self.dirty_position = false;
        self.dirty_rotation = false;
        Some(update)
    }

    pub(crate) fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }

    pub(crate) fn set_material(&mut self, material: Option<u32>) {
        self.material = material;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Position from the worker. Ignored while the controller owns it.
    pub(crate) fn import_position(&mut self, position: Vec3) -> bool {
        if self.dirty_position {
            return false;
        }
        self.position = position;
        true
    }

    /// Rotation from the worker. Ignored while the controller owns it.
    pub(crate) fn import_rotation(&mut self, rotation: Quat) -> bool {
        if self.dirty_rotation {
            return false;
        }
        self.rotation = rotation;
        true
    }

    pub(crate) fn import_velocities(&mut self, linear: Vec3, angular: Vec3) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    pub(crate) fn touches_mut(&mut self) -> &mut BTreeSet<EntityId> {
        &mut self.touches
    }
}

/// Description of a body to add to a scene.
///
/// ```ignore
/// let id = scene.add_body(
///     BodyBuilder::new(ShapeDescriptor::Sphere { radius: 0.5 })
///         .with_position(Vec3::new(0.0, 10.0, 0.0))
///         .with_material(MaterialDescriptor::new(1).with_restitution(0.6)),
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BodyBuilder {
    shape: ShapeDescriptor,
    mass: Option<f32>,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    material: Option<MaterialDescriptor>,
    children: Vec<ChildShape>,
}

impl BodyBuilder {
    /// Starts from a shape, at the origin, unscaled, with default mass.
    #[must_use]
    pub fn new(shape: ShapeDescriptor) -> Self {
        Self {
            shape,
            mass: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            material: None,
            children: Vec::new(),
        }
    }

    /// Explicit mass. 0 makes the body static.
    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Initial position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Initial rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Node scale, applied to the shape dimensions.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Surface material.
    #[must_use]
    pub fn with_material(mut self, material: MaterialDescriptor) -> Self {
        self.material = Some(material);
        self
    }

    /// Adds a compound child shape.
    #[must_use]
    pub fn with_child(mut self, child: ChildShape) -> Self {
        self.children.push(child);
        self
    }

    /// Material, if one was set.
    #[must_use]
    pub const fn material(&self) -> Option<MaterialDescriptor> {
        self.material
    }

    /// Resolves scale and default mass into the descriptor and shadow state
    /// for body `id`.
    #[must_use]
    pub fn build(self, id: EntityId) -> (BodyDescriptor, Body) {
        let mut shape = self.shape;
        if self.scale != Vec3::ONE {
            shape.apply_scale(self.scale);
        }
        let mass = self.mass.unwrap_or_else(|| shape.default_mass());
        let material_id = self.material.map(|m| m.id);

        let mut body = Body::new(id, mass, self.position, self.rotation);
        body.set_material(material_id);

        let descriptor = BodyDescriptor {
            id,
            shape,
            mass,
            position: self.position,
            rotation: self.rotation,
            material_id,
            children: self.children,
        };
        (descriptor, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> Body {
        Body::new(EntityId::from_raw(1), 1.0, Vec3::ZERO, Quat::IDENTITY)
    }

    #[test]
    fn test_clean_body_has_no_update() {
        assert!(body().take_transform_update().is_none());
    }

    #[test]
    fn test_update_carries_only_dirty_fields() {
        let mut body = body();
        body.set_rotation(Quat::from_axis_angle(Vec3::Y, 1.0));

        let update = body.take_transform_update().unwrap();
        assert_eq!(update.pos, None);
        assert!(update.quat.is_some());
        assert!(!body.dirty_rotation());
        assert!(body.take_transform_update().is_none());
    }

    #[test]
    fn test_import_respects_flags_independently() {
        let mut body = body();
        body.set_position(Vec3::new(5.0, 5.0, 5.0));

        assert!(!body.import_position(Vec3::ONE));
        assert!(body.import_rotation(Quat::from_axis_angle(Vec3::X, 0.5)));
        assert_eq!(body.position(), Vec3::new(5.0, 5.0, 5.0));
        assert!(body.rotation().approx_eq(Quat::from_axis_angle(Vec3::X, 0.5), 1e-6));
    }

    #[test]
    fn test_builder_scales_and_derives_mass() {
        let (descriptor, body) = BodyBuilder::new(ShapeDescriptor::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        })
        .with_scale(Vec3::new(2.0, 3.0, 4.0))
        .build(EntityId::from_raw(8));

        assert_eq!(descriptor.mass, 24.0);
        assert_eq!(body.mass(), 24.0);
        assert_eq!(
            descriptor.shape,
            ShapeDescriptor::Box { width: 2.0, height: 3.0, depth: 4.0 }
        );
    }

    #[test]
    fn test_builder_explicit_mass_and_material() {
        let (descriptor, body) = BodyBuilder::new(ShapeDescriptor::Sphere { radius: 1.0 })
            .with_mass(0.0)
            .with_material(MaterialDescriptor::new(3))
            .build(EntityId::from_raw(9));

        assert_eq!(descriptor.mass, 0.0);
        assert_eq!(descriptor.material_id, Some(3));
        assert_eq!(body.material(), Some(3));
    }
}
