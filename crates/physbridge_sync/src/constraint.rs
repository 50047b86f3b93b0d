//! # Constraint Definitions
//!
//! Value objects for the five constraint types. A constraint captures its
//! anchor in each body's local frame once, at construction, from a world
//! space pick point. After that its geometry is fixed; only the reported
//! world anchor and applied impulse change.
//!
//! Runtime configuration (limits, motors, targets) is produced here as
//! [`Command`] values and queued by the scene. Each configuration method
//! checks the constraint type first.

use crate::body::Body;
use crate::error::{SyncError, SyncResult};
use physbridge_shared::command::{
    ConstraintRef, ConstraintVector, DofMotorConfig, DofMotorRef, HingeLimits, MaxMotorImpulse,
    MotorParams, MotorTarget, SliderLimits, SliderRestitution,
};
use physbridge_shared::math::{local_to_world, world_to_local};
use physbridge_shared::{
    Command, ConstraintDefinition, ConstraintItem, ConstraintType, EntityId, Quat, Vec3,
};

/// Orientation accepted by [`Constraint::cone_twist_set_motor_target`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetOrientation {
    /// XYZ Euler angles, radians.
    Euler(Vec3),
    /// Unit quaternion.
    Quaternion(Quat),
}

impl TargetOrientation {
    /// Converts to a quaternion.
    #[must_use]
    pub fn to_quat(self) -> Quat {
        match self {
            Self::Euler(angles) => Quat::from_euler_xyz(angles),
            Self::Quaternion(q) => q,
        }
    }
}

impl From<Quat> for TargetOrientation {
    fn from(q: Quat) -> Self {
        Self::Quaternion(q)
    }
}

/// A joint between one body and the world, or between two bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    id: EntityId,
    kind: ConstraintType,
    body_a: EntityId,
    body_b: Option<EntityId>,
    anchor_a: Vec3,
    anchor_b: Option<Vec3>,
    axis: Option<Vec3>,
    axis_a: Option<Vec3>,
    axis_b: Option<Vec3>,
    world_anchor: Vec3,
    applied_impulse: f32,
}

impl Constraint {
    /// Builds a constraint of any type.
    ///
    /// `anchor` is in world space. `axis` is required for hinges and
    /// sliders and ignored otherwise.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MissingSecondBody`] for a cone-twist without `body_b`
    /// - [`SyncError::MissingAxis`] for a hinge or slider without `axis`
    pub fn new(
        id: EntityId,
        kind: ConstraintType,
        body_a: &Body,
        body_b: Option<&Body>,
        anchor: Vec3,
        axis: Option<Vec3>,
    ) -> SyncResult<Self> {
        if kind == ConstraintType::ConeTwist && body_b.is_none() {
            return Err(SyncError::MissingSecondBody { kind });
        }

        let axis = match kind {
            ConstraintType::Hinge | ConstraintType::Slider => {
                Some(axis.ok_or(SyncError::MissingAxis { kind })?)
            }
            ConstraintType::Point | ConstraintType::ConeTwist | ConstraintType::Dof => None,
        };

        let frame_axes = matches!(kind, ConstraintType::ConeTwist | ConstraintType::Dof);
        let local = |body: &Body| world_to_local(anchor, body.position(), body.rotation());

        Ok(Self {
            id,
            kind,
            body_a: body_a.id(),
            body_b: body_b.map(Body::id),
            anchor_a: local(body_a),
            anchor_b: body_b.map(local),
            axis,
            axis_a: frame_axes.then(|| body_a.rotation().to_euler_xyz()),
            axis_b: body_b.filter(|_| frame_axes).map(|b| b.rotation().to_euler_xyz()),
            world_anchor: anchor,
            applied_impulse: 0.0,
        })
    }

    /// Ball-socket joint.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for symmetry with the other types.
    pub fn point(id: EntityId, a: &Body, b: Option<&Body>, anchor: Vec3) -> SyncResult<Self> {
        Self::new(id, ConstraintType::Point, a, b, anchor, None)
    }

    /// Hinge around `axis`.
    ///
    /// # Errors
    ///
    /// Never fails when an axis is given.
    pub fn hinge(
        id: EntityId,
        a: &Body,
        b: Option<&Body>,
        anchor: Vec3,
        axis: Vec3,
    ) -> SyncResult<Self> {
        Self::new(id, ConstraintType::Hinge, a, b, anchor, Some(axis))
    }

    /// Slider along `axis`.
    ///
    /// # Errors
    ///
    /// Never fails when an axis is given.
    pub fn slider(
        id: EntityId,
        a: &Body,
        b: Option<&Body>,
        anchor: Vec3,
        axis: Vec3,
    ) -> SyncResult<Self> {
        Self::new(id, ConstraintType::Slider, a, b, anchor, Some(axis))
    }

    /// Cone-twist joint. Both bodies are required.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingSecondBody`] if `b` is `None`.
    pub fn cone_twist(id: EntityId, a: &Body, b: Option<&Body>, anchor: Vec3) -> SyncResult<Self> {
        Self::new(id, ConstraintType::ConeTwist, a, b, anchor, None)
    }

    /// Six degree of freedom joint.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for symmetry with the other types.
    pub fn dof(id: EntityId, a: &Body, b: Option<&Body>, anchor: Vec3) -> SyncResult<Self> {
        Self::new(id, ConstraintType::Dof, a, b, anchor, None)
    }

    /// Constraint id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Constraint type.
    #[must_use]
    pub const fn kind(&self) -> ConstraintType {
        self.kind
    }

    /// First body.
    #[must_use]
    pub const fn body_a(&self) -> EntityId {
        self.body_a
    }

    /// Second body, if any.
    #[must_use]
    pub const fn body_b(&self) -> Option<EntityId> {
        self.body_b
    }

    /// Anchor in the first body's frame.
    #[must_use]
    pub const fn anchor_a(&self) -> Vec3 {
        self.anchor_a
    }

    /// Anchor in the second body's frame.
    #[must_use]
    pub const fn anchor_b(&self) -> Option<Vec3> {
        self.anchor_b
    }

    /// Hinge or slider axis.
    #[must_use]
    pub const fn axis(&self) -> Option<Vec3> {
        self.axis
    }

    /// World anchor as of the last CONSTRAINT report, or the construction
    /// point before any report.
    #[must_use]
    pub const fn world_anchor(&self) -> Vec3 {
        self.world_anchor
    }

    /// Impulse applied by the solver in the last reported step.
    #[must_use]
    pub const fn applied_impulse(&self) -> f32 {
        self.applied_impulse
    }

    /// Returns true if `body` is one of the constrained bodies.
    #[must_use]
    pub fn involves(&self, body: EntityId) -> bool {
        self.body_a == body || self.body_b == Some(body)
    }

    /// Payload of the `addConstraint` command.
    #[must_use]
    pub fn definition(&self) -> ConstraintDefinition {
        ConstraintDefinition {
            kind: self.kind,
            id: self.id,
            body_a: self.body_a,
            body_b: self.body_b,
            anchor_a: self.anchor_a,
            anchor_b: self.anchor_b,
            axis: self.axis,
            axis_a: self.axis_a,
            axis_b: self.axis_b,
        }
    }

    /// Applies one CONSTRAINT report item. `body` is the body the item's
    /// offset is relative to.
    pub(crate) fn apply_report(&mut self, body: &Body, item: &ConstraintItem) {
        self.world_anchor = local_to_world(item.offset, body.position(), body.rotation());
        self.applied_impulse = item.applied_impulse;
    }

    fn require(&self, expected: ConstraintType) -> SyncResult<ConstraintRef> {
        if self.kind == expected {
            Ok(ConstraintRef { constraint: self.id })
        } else {
            Err(SyncError::ConstraintKindMismatch { id: self.id, expected, actual: self.kind })
        }
    }

    fn motor(&self, expected: ConstraintType, velocity: f32, acceleration: f32) -> SyncResult<MotorParams> {
        let target = self.require(expected)?;
        Ok(MotorParams { constraint: target.constraint, velocity, acceleration })
    }

    fn vector(&self, expected: ConstraintType, value: Vec3) -> SyncResult<ConstraintVector> {
        let target = self.require(expected)?;
        Ok(ConstraintVector { constraint: target.constraint, value })
    }

    // =========================================================================
    // Hinge
    // =========================================================================

    /// Angular limits, radians. `relaxation_factor` 0 means no bounce.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a hinge.
    pub fn hinge_set_limits(
        &self,
        low: f32,
        high: f32,
        bias_factor: f32,
        relaxation_factor: f32,
    ) -> SyncResult<Command> {
        let target = self.require(ConstraintType::Hinge)?;
        Ok(Command::HingeSetLimits(HingeLimits {
            constraint: target.constraint,
            low,
            high,
            bias_factor,
            relaxation_factor,
        }))
    }

    /// Turns the hinge motor on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a hinge.
    pub fn hinge_enable_angular_motor(&self, velocity: f32, acceleration: f32) -> SyncResult<Command> {
        self.motor(ConstraintType::Hinge, velocity, acceleration)
            .map(Command::HingeEnableAngularMotor)
    }

    /// Turns the hinge motor off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a hinge.
    pub fn hinge_disable_motor(&self) -> SyncResult<Command> {
        self.require(ConstraintType::Hinge).map(Command::HingeDisableMotor)
    }

    // =========================================================================
    // Slider
    // =========================================================================

    /// Linear and angular travel limits.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_set_limits(
        &self,
        lin_lower: f32,
        lin_upper: f32,
        ang_lower: f32,
        ang_upper: f32,
    ) -> SyncResult<Command> {
        let target = self.require(ConstraintType::Slider)?;
        Ok(Command::SliderSetLimits(SliderLimits {
            constraint: target.constraint,
            lin_lower,
            lin_upper,
            ang_lower,
            ang_upper,
        }))
    }

    /// Restitution at the limits.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_set_restitution(&self, linear: f32, angular: f32) -> SyncResult<Command> {
        let target = self.require(ConstraintType::Slider)?;
        Ok(Command::SliderSetRestitution(SliderRestitution {
            constraint: target.constraint,
            linear,
            angular,
        }))
    }

    /// Turns the linear motor on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_enable_linear_motor(&self, velocity: f32, acceleration: f32) -> SyncResult<Command> {
        self.motor(ConstraintType::Slider, velocity, acceleration)
            .map(Command::SliderEnableLinearMotor)
    }

    /// Turns the linear motor off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_disable_linear_motor(&self) -> SyncResult<Command> {
        self.require(ConstraintType::Slider).map(Command::SliderDisableLinearMotor)
    }

    /// Turns the angular motor on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_enable_angular_motor(&self, velocity: f32, acceleration: f32) -> SyncResult<Command> {
        self.motor(ConstraintType::Slider, velocity, acceleration)
            .map(Command::SliderEnableAngularMotor)
    }

    /// Turns the angular motor off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a slider.
    pub fn slider_disable_angular_motor(&self) -> SyncResult<Command> {
        self.require(ConstraintType::Slider).map(Command::SliderDisableAngularMotor)
    }

    // =========================================================================
    // Cone-twist
    // =========================================================================

    /// Swing and twist limits, radians, per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a cone-twist.
    pub fn cone_twist_set_limit(&self, limit: Vec3) -> SyncResult<Command> {
        self.vector(ConstraintType::ConeTwist, limit).map(Command::ConeTwistSetLimit)
    }

    /// Turns the motor on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a cone-twist.
    pub fn cone_twist_enable_motor(&self) -> SyncResult<Command> {
        self.require(ConstraintType::ConeTwist).map(Command::ConeTwistEnableMotor)
    }

    /// Caps the motor impulse.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a cone-twist.
    pub fn cone_twist_set_max_motor_impulse(&self, max_impulse: f32) -> SyncResult<Command> {
        let target = self.require(ConstraintType::ConeTwist)?;
        Ok(Command::ConeTwistSetMaxMotorImpulse(MaxMotorImpulse {
            constraint: target.constraint,
            max_impulse,
        }))
    }

    /// Orientation the motor drives toward. Euler input is converted to a
    /// quaternion before sending.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a cone-twist.
    pub fn cone_twist_set_motor_target(
        &self,
        target: impl Into<TargetOrientation>,
    ) -> SyncResult<Command> {
        let constraint = self.require(ConstraintType::ConeTwist)?.constraint;
        Ok(Command::ConeTwistSetMotorTarget(MotorTarget {
            constraint,
            target: target.into().to_quat(),
        }))
    }

    /// Turns the motor off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a cone-twist.
    pub fn cone_twist_disable_motor(&self) -> SyncResult<Command> {
        self.require(ConstraintType::ConeTwist).map(Command::ConeTwistDisableMotor)
    }

    // =========================================================================
    // 6-DOF
    // =========================================================================

    /// Lower linear limit per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_set_linear_lower_limit(&self, limit: Vec3) -> SyncResult<Command> {
        self.vector(ConstraintType::Dof, limit).map(Command::DofSetLinearLowerLimit)
    }

    /// Upper linear limit per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_set_linear_upper_limit(&self, limit: Vec3) -> SyncResult<Command> {
        self.vector(ConstraintType::Dof, limit).map(Command::DofSetLinearUpperLimit)
    }

    /// Lower angular limit per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_set_angular_lower_limit(&self, limit: Vec3) -> SyncResult<Command> {
        self.vector(ConstraintType::Dof, limit).map(Command::DofSetAngularLowerLimit)
    }

    /// Upper angular limit per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_set_angular_upper_limit(&self, limit: Vec3) -> SyncResult<Command> {
        self.vector(ConstraintType::Dof, limit).map(Command::DofSetAngularUpperLimit)
    }

    /// Turns angular motor `which` (0..3) on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_enable_angular_motor(&self, which: u8) -> SyncResult<Command> {
        let constraint = self.require(ConstraintType::Dof)?.constraint;
        Ok(Command::DofEnableAngularMotor(DofMotorRef { constraint, which }))
    }

    /// Configures angular motor `which` (0..3).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_configure_angular_motor(
        &self,
        which: u8,
        low_angle: f32,
        high_angle: f32,
        velocity: f32,
        max_force: f32,
    ) -> SyncResult<Command> {
        let constraint = self.require(ConstraintType::Dof)?.constraint;
        Ok(Command::DofConfigureAngularMotor(DofMotorConfig {
            constraint,
            which,
            low_angle,
            high_angle,
            velocity,
            max_force,
        }))
    }

    /// Turns angular motor `which` (0..3) off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ConstraintKindMismatch`] unless this is a 6-DOF.
    pub fn dof_disable_angular_motor(&self, which: u8) -> SyncResult<Command> {
        let constraint = self.require(ConstraintType::Dof)?.constraint;
        Ok(Command::DofDisableAngularMotor(DofMotorRef { constraint, which }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn body_at(raw: u32, position: Vec3, rotation: Quat) -> Body {
        Body::new(EntityId::from_raw(raw), 1.0, position, rotation)
    }

    #[test]
    fn test_anchor_is_body_local() {
        let a = body_at(1, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        let b = body_at(2, Vec3::ZERO, Quat::from_axis_angle(Vec3::Y, FRAC_PI_2));

        let c = Constraint::point(EntityId::from_raw(3), &a, Some(&b), Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(c.anchor_a(), Vec3::ZERO);
        // World +X seen from a body turned 90° about Y is local +Z.
        assert!(c.anchor_b().unwrap().approx_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn test_anchor_fixed_after_construction() {
        let mut a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let c = Constraint::point(EntityId::from_raw(3), &a, None, Vec3::new(0.0, 2.0, 0.0)).unwrap();

        a.set_position(Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(c.anchor_a(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_cone_twist_requires_second_body() {
        let a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let err = Constraint::cone_twist(EntityId::from_raw(3), &a, None, Vec3::ZERO).unwrap_err();
        assert_eq!(err, SyncError::MissingSecondBody { kind: ConstraintType::ConeTwist });
    }

    #[test]
    fn test_hinge_requires_axis() {
        let a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let err = Constraint::new(EntityId::from_raw(3), ConstraintType::Hinge, &a, None, Vec3::ZERO, None)
            .unwrap_err();
        assert_eq!(err, SyncError::MissingAxis { kind: ConstraintType::Hinge });
    }

    #[test]
    fn test_cone_twist_definition_carries_euler_axes() {
        let a = body_at(1, Vec3::ZERO, Quat::from_euler_xyz(Vec3::new(0.1, 0.2, 0.3)));
        let b = body_at(2, Vec3::ONE, Quat::IDENTITY);
        let c = Constraint::cone_twist(EntityId::from_raw(3), &a, Some(&b), Vec3::ZERO).unwrap();

        let definition = c.definition();
        assert_eq!(definition.kind, ConstraintType::ConeTwist);
        assert!(definition.axis_a.unwrap().approx_eq(Vec3::new(0.1, 0.2, 0.3), 1e-5));
        assert_eq!(definition.axis_b, Some(Vec3::ZERO));
        assert_eq!(definition.axis, None);
    }

    #[test]
    fn test_configuration_checks_type() {
        let a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let hinge = Constraint::hinge(EntityId::from_raw(3), &a, None, Vec3::ZERO, Vec3::Y).unwrap();

        assert!(matches!(
            hinge.hinge_set_limits(-1.0, 1.0, 0.3, 0.0),
            Ok(Command::HingeSetLimits(HingeLimits { low, .. })) if low == -1.0
        ));
        assert_eq!(
            hinge.slider_disable_linear_motor().unwrap_err(),
            SyncError::ConstraintKindMismatch {
                id: EntityId::from_raw(3),
                expected: ConstraintType::Slider,
                actual: ConstraintType::Hinge,
            }
        );
    }

    #[test]
    fn test_motor_target_from_euler() {
        let a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let b = body_at(2, Vec3::ZERO, Quat::IDENTITY);
        let c = Constraint::cone_twist(EntityId::from_raw(3), &a, Some(&b), Vec3::ZERO).unwrap();

        let euler = Vec3::new(0.0, FRAC_PI_2, 0.0);
        let Command::ConeTwistSetMotorTarget(target) =
            c.cone_twist_set_motor_target(TargetOrientation::Euler(euler)).unwrap()
        else {
            panic!("expected motor target command");
        };
        assert!(target.target.approx_eq(Quat::from_axis_angle(Vec3::Y, FRAC_PI_2), 1e-6));
    }

    #[test]
    fn test_report_moves_world_anchor() {
        let a = body_at(1, Vec3::ZERO, Quat::IDENTITY);
        let mut c = Constraint::point(EntityId::from_raw(3), &a, None, Vec3::ZERO).unwrap();
        let moved = body_at(1, Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);

        c.apply_report(
            &moved,
            &ConstraintItem {
                constraint: 3.0,
                body: 1.0,
                offset: Vec3::new(1.0, 0.0, 0.0),
                applied_impulse: 0.75,
            },
        );
        assert_eq!(c.world_anchor(), Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(c.applied_impulse(), 0.75);
    }
}
