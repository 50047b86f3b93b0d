//! # Command Vocabulary
//!
//! Every message the controller can send to the simulation worker. The
//! enum is the single source of truth for the wire names: serialization
//! and deserialization both go through the derived, exhaustive match, so a
//! new command is a new variant and never a new string literal.
//!
//! ## Wire form
//!
//! ```text
//! { "cmd": "<name>", "params": { ... } }
//! ```

use crate::descriptor::{
    BodyDescriptor, ConstraintDefinition, MaterialDescriptor, VehicleDescriptor, WheelParams,
};
use crate::ids::EntityId;
use crate::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World setup sent once, before anything else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitParams {
    /// Fixed internal step of the solver, seconds
    pub fixed_time_step: f32,
    /// Whether the worker rate-limits its own stepping
    pub rate_limit: bool,
    /// Script or module the worker loads its engine from
    pub engine_script: String,
    /// Initial gravity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Vec3>,
}

/// Names a single entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdParams {
    /// Target entity
    pub id: EntityId,
}

/// Authored transform fields flushed for a dirty body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformUpdate {
    /// Target body
    pub id: EntityId,
    /// New position, present when the position was dirty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec3>,
    /// New rotation, present when the rotation was dirty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quat: Option<Quat>,
}

/// New mass for a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassParams {
    /// Target body
    pub id: EntityId,
    /// Mass, 0 for static
    pub mass: f32,
}

/// A vector applied to a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorParams {
    /// Target body
    pub id: EntityId,
    /// The vector
    #[serde(flatten)]
    pub value: Vec3,
}

/// Impulse applied at a point.
///
/// The impulse travels as `impulse_x/y/z`; the bare `x/y/z` keys carry the
/// offset from the centre of mass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpulseParams {
    /// Target body
    pub id: EntityId,
    /// Impulse X
    pub impulse_x: f32,
    /// Impulse Y
    pub impulse_y: f32,
    /// Impulse Z
    pub impulse_z: f32,
    /// Application point relative to the body
    #[serde(flatten)]
    pub offset: Vec3,
}

impl ImpulseParams {
    /// Packs an impulse and its offset.
    #[must_use]
    pub const fn new(id: EntityId, impulse: Vec3, offset: Vec3) -> Self {
        Self {
            id,
            impulse_x: impulse.x,
            impulse_y: impulse.y,
            impulse_z: impulse.z,
            offset,
        }
    }

    /// The impulse as a vector.
    #[must_use]
    pub const fn impulse(&self) -> Vec3 {
        Vec3::new(self.impulse_x, self.impulse_y, self.impulse_z)
    }
}

/// Force applied at a point. Same layout as [`ImpulseParams`] with
/// `force_x/y/z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceParams {
    /// Target body
    pub id: EntityId,
    /// Force X
    pub force_x: f32,
    /// Force Y
    pub force_y: f32,
    /// Force Z
    pub force_z: f32,
    /// Application point relative to the body
    #[serde(flatten)]
    pub offset: Vec3,
}

impl ForceParams {
    /// Packs a force and its offset.
    #[must_use]
    pub const fn new(id: EntityId, force: Vec3, offset: Vec3) -> Self {
        Self {
            id,
            force_x: force.x,
            force_y: force.y,
            force_z: force.z,
            offset,
        }
    }

    /// The force as a vector.
    #[must_use]
    pub const fn force(&self) -> Vec3 {
        Vec3::new(self.force_x, self.force_y, self.force_z)
    }
}

/// Torque on a body, keyed `torque_x/y/z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TorqueParams {
    /// Target body
    pub id: EntityId,
    /// Torque X
    pub torque_x: f32,
    /// Torque Y
    pub torque_y: f32,
    /// Torque Z
    pub torque_z: f32,
}

impl TorqueParams {
    /// Packs a torque.
    #[must_use]
    pub const fn new(id: EntityId, torque: Vec3) -> Self {
        Self {
            id,
            torque_x: torque.x,
            torque_y: torque.y,
            torque_z: torque.z,
        }
    }

    /// The torque as a vector.
    #[must_use]
    pub const fn torque(&self) -> Vec3 {
        Vec3::new(self.torque_x, self.torque_y, self.torque_z)
    }
}

/// Linear and angular damping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DampingParams {
    /// Target body
    pub id: EntityId,
    /// Linear damping
    pub linear: f32,
    /// Angular damping
    pub angular: f32,
}

/// CCD motion threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CcdThresholdParams {
    /// Target body
    pub id: EntityId,
    /// Velocity above which CCD is used
    pub threshold: f32,
}

/// CCD swept sphere radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CcdRadiusParams {
    /// Target body
    pub id: EntityId,
    /// Swept sphere radius
    pub radius: f32,
}

/// Wheel to add to a vehicle. The geometry is inlined next to `id`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddWheelParams {
    /// Vehicle id
    pub id: EntityId,
    /// Wheel geometry
    #[serde(flatten)]
    pub wheel: WheelParams,
}

/// Steering angle for one wheel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteeringParams {
    /// Vehicle id
    pub id: EntityId,
    /// Wheel index
    pub wheel: usize,
    /// Steering angle, radians
    pub steering: f32,
}

/// Brake force for one wheel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrakeParams {
    /// Vehicle id
    pub id: EntityId,
    /// Wheel index
    pub wheel: usize,
    /// Brake force
    pub brake: f32,
}

/// Engine force for one wheel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineForceParams {
    /// Vehicle id
    pub id: EntityId,
    /// Wheel index
    pub wheel: usize,
    /// Engine force
    pub force: f32,
}

/// Names a constraint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRef {
    /// Target constraint
    pub constraint: EntityId,
}

/// Hinge angular limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HingeLimits {
    /// Target constraint
    pub constraint: EntityId,
    /// Minimum angle, radians
    pub low: f32,
    /// Maximum angle, radians
    pub high: f32,
    /// Factor applied to the constraint error
    pub bias_factor: f32,
    /// Bounce control, 0 for none
    pub relaxation_factor: f32,
}

/// Motor target velocity and acceleration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorParams {
    /// Target constraint
    pub constraint: EntityId,
    /// Target velocity
    pub velocity: f32,
    /// Maximum acceleration
    pub acceleration: f32,
}

/// Slider linear and angular limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderLimits {
    /// Target constraint
    pub constraint: EntityId,
    /// Lower linear limit
    pub lin_lower: f32,
    /// Upper linear limit
    pub lin_upper: f32,
    /// Lower angular limit
    pub ang_lower: f32,
    /// Upper angular limit
    pub ang_upper: f32,
}

/// Slider restitution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderRestitution {
    /// Target constraint
    pub constraint: EntityId,
    /// Linear restitution
    pub linear: f32,
    /// Angular restitution
    pub angular: f32,
}

/// A vector setting on a constraint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintVector {
    /// Target constraint
    pub constraint: EntityId,
    /// The vector
    #[serde(flatten)]
    pub value: Vec3,
}

/// Cone-twist motor impulse cap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxMotorImpulse {
    /// Target constraint
    pub constraint: EntityId,
    /// Impulse cap
    pub max_impulse: f32,
}

/// Cone-twist motor target orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorTarget {
    /// Target constraint
    pub constraint: EntityId,
    /// Target orientation
    #[serde(flatten)]
    pub target: Quat,
}

/// Names one angular motor of a 6-DOF constraint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DofMotorRef {
    /// Target constraint
    pub constraint: EntityId,
    /// Motor axis index (0..3)
    pub which: u8,
}

/// Full configuration of one 6-DOF angular motor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DofMotorConfig {
    /// Target constraint
    pub constraint: EntityId,
    /// Motor axis index (0..3)
    pub which: u8,
    /// Lower angle limit
    pub low_angle: f32,
    /// Upper angle limit
    pub high_angle: f32,
    /// Target velocity
    pub velocity: f32,
    /// Maximum motor force
    pub max_force: f32,
}

/// Step request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulateParams {
    /// Elapsed time to simulate, seconds. Worker measures it when absent.
    #[serde(rename = "timeStep", default, skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f32>,
    /// Cap on internal sub-steps.
    #[serde(rename = "maxSubSteps", default, skip_serializing_if = "Option::is_none")]
    pub max_sub_steps: Option<u32>,
}

/// A command from controller to worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Create the physics world.
    #[serde(rename = "init")]
    Init(InitParams),
    /// Create a rigid body.
    #[serde(rename = "addObject")]
    AddObject(BodyDescriptor),
    /// Destroy a rigid body.
    #[serde(rename = "removeObject")]
    RemoveObject(IdParams),
    /// Overwrite authored transform fields.
    #[serde(rename = "updateTransform")]
    UpdateTransform(TransformUpdate),
    /// Change a body's mass.
    #[serde(rename = "updateMass")]
    UpdateMass(MassParams),
    /// Impulse through the centre of mass.
    #[serde(rename = "applyCentralImpulse")]
    ApplyCentralImpulse(VectorParams),
    /// Impulse at an offset.
    #[serde(rename = "applyImpulse")]
    ApplyImpulse(ImpulseParams),
    /// Torque.
    #[serde(rename = "applyTorque")]
    ApplyTorque(TorqueParams),
    /// Force through the centre of mass.
    #[serde(rename = "applyCentralForce")]
    ApplyCentralForce(VectorParams),
    /// Force at an offset.
    #[serde(rename = "applyForce")]
    ApplyForce(ForceParams),
    /// Overwrite linear velocity.
    #[serde(rename = "setLinearVelocity")]
    SetLinearVelocity(VectorParams),
    /// Overwrite angular velocity.
    #[serde(rename = "setAngularVelocity")]
    SetAngularVelocity(VectorParams),
    /// Per-axis linear motion factor.
    #[serde(rename = "setLinearFactor")]
    SetLinearFactor(VectorParams),
    /// Per-axis angular motion factor.
    #[serde(rename = "setAngularFactor")]
    SetAngularFactor(VectorParams),
    /// Linear and angular damping.
    #[serde(rename = "setDamping")]
    SetDamping(DampingParams),
    /// Velocity above which continuous collision detection kicks in.
    #[serde(rename = "setCcdMotionThreshold")]
    SetCcdMotionThreshold(CcdThresholdParams),
    /// Radius of the CCD swept sphere.
    #[serde(rename = "setCcdSweptSphereRadius")]
    SetCcdSweptSphereRadius(CcdRadiusParams),
    /// Create a raycast vehicle.
    #[serde(rename = "addVehicle")]
    AddVehicle(VehicleDescriptor),
    /// Destroy a vehicle.
    #[serde(rename = "removeVehicle")]
    RemoveVehicle(IdParams),
    /// Attach a wheel.
    #[serde(rename = "addWheel")]
    AddWheel(AddWheelParams),
    /// Steering angle for one wheel.
    #[serde(rename = "setSteering")]
    SetSteering(SteeringParams),
    /// Brake force for one wheel.
    #[serde(rename = "setBrake")]
    SetBrake(BrakeParams),
    /// Engine force for one wheel.
    #[serde(rename = "applyEngineForce")]
    ApplyEngineForce(EngineForceParams),
    /// Create a constraint.
    #[serde(rename = "addConstraint")]
    AddConstraint(ConstraintDefinition),
    /// Destroy a constraint.
    #[serde(rename = "removeConstraint")]
    RemoveConstraint(IdParams),
    /// Hinge angular limits.
    #[serde(rename = "hinge_setLimits")]
    HingeSetLimits(HingeLimits),
    /// Hinge motor on.
    #[serde(rename = "hinge_enableAngularMotor")]
    HingeEnableAngularMotor(MotorParams),
    /// Hinge motor off.
    #[serde(rename = "hinge_disableMotor")]
    HingeDisableMotor(ConstraintRef),
    /// Slider limits.
    #[serde(rename = "slider_setLimits")]
    SliderSetLimits(SliderLimits),
    /// Slider restitution.
    #[serde(rename = "slider_setRestitution")]
    SliderSetRestitution(SliderRestitution),
    /// Slider linear motor on.
    #[serde(rename = "slider_enableLinearMotor")]
    SliderEnableLinearMotor(MotorParams),
    /// Slider linear motor off.
    #[serde(rename = "slider_disableLinearMotor")]
    SliderDisableLinearMotor(ConstraintRef),
    /// Slider angular motor on.
    #[serde(rename = "slider_enableAngularMotor")]
    SliderEnableAngularMotor(MotorParams),
    /// Slider angular motor off.
    #[serde(rename = "slider_disableAngularMotor")]
    SliderDisableAngularMotor(ConstraintRef),
    /// Cone-twist swing and twist limits.
    #[serde(rename = "conetwist_setLimit")]
    ConeTwistSetLimit(ConstraintVector),
    /// Cone-twist motor on.
    #[serde(rename = "conetwist_enableMotor")]
    ConeTwistEnableMotor(ConstraintRef),
    /// Cone-twist motor impulse cap.
    #[serde(rename = "conetwist_setMaxMotorImpulse")]
    ConeTwistSetMaxMotorImpulse(MaxMotorImpulse),
    /// Cone-twist motor target.
    #[serde(rename = "conetwist_setMotorTarget")]
    ConeTwistSetMotorTarget(MotorTarget),
    /// Cone-twist motor off.
    #[serde(rename = "conetwist_disableMotor")]
    ConeTwistDisableMotor(ConstraintRef),
    /// 6-DOF lower linear limit.
    #[serde(rename = "dof_setLinearLowerLimit")]
    DofSetLinearLowerLimit(ConstraintVector),
    /// 6-DOF upper linear limit.
    #[serde(rename = "dof_setLinearUpperLimit")]
    DofSetLinearUpperLimit(ConstraintVector),
    /// 6-DOF lower angular limit.
    #[serde(rename = "dof_setAngularLowerLimit")]
    DofSetAngularLowerLimit(ConstraintVector),
    /// 6-DOF upper angular limit.
    #[serde(rename = "dof_setAngularUpperLimit")]
    DofSetAngularUpperLimit(ConstraintVector),
    /// 6-DOF angular motor on.
    #[serde(rename = "dof_enableAngularMotor")]
    DofEnableAngularMotor(DofMotorRef),
    /// 6-DOF angular motor configuration.
    #[serde(rename = "dof_configureAngularMotor")]
    DofConfigureAngularMotor(DofMotorConfig),
    /// 6-DOF angular motor off.
    #[serde(rename = "dof_disableAngularMotor")]
    DofDisableAngularMotor(DofMotorRef),
    /// Make a material known to the worker.
    #[serde(rename = "registerMaterial")]
    RegisterMaterial(MaterialDescriptor),
    /// Forget a material.
    #[serde(rename = "unRegisterMaterial")]
    UnRegisterMaterial(MaterialDescriptor),
    /// Change the solver's fixed step.
    #[serde(rename = "setFixedTimeStep")]
    SetFixedTimeStep(f32),
    /// Change gravity.
    #[serde(rename = "setGravity")]
    SetGravity(Vec3),
    /// Advance the simulation one step.
    #[serde(rename = "simulate")]
    Simulate(SimulateParams),
    /// Resume after a pause without a time jump.
    #[serde(rename = "onSimulationResume")]
    OnSimulationResume,
}

impl Command {
    /// Wire name, as it appears in the `cmd` field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::AddObject(_) => "addObject",
            Self::RemoveObject(_) => "removeObject",
            Self::UpdateTransform(_) => "updateTransform",
            Self::UpdateMass(_) => "updateMass",
            Self::ApplyCentralImpulse(_) => "applyCentralImpulse",
            Self::ApplyImpulse(_) => "applyImpulse",
            Self::ApplyTorque(_) => "applyTorque",
            Self::ApplyCentralForce(_) => "applyCentralForce",
            Self::ApplyForce(_) => "applyForce",
            Self::SetLinearVelocity(_) => "setLinearVelocity",
            Self::SetAngularVelocity(_) => "setAngularVelocity",
            Self::SetLinearFactor(_) => "setLinearFactor",
            Self::SetAngularFactor(_) => "setAngularFactor",
            Self::SetDamping(_) => "setDamping",
            Self::SetCcdMotionThreshold(_) => "setCcdMotionThreshold",
            Self::SetCcdSweptSphereRadius(_) => "setCcdSweptSphereRadius",
            Self::AddVehicle(_) => "addVehicle",
            Self::RemoveVehicle(_) => "removeVehicle",
            Self::AddWheel(_) => "addWheel",
            Self::SetSteering(_) => "setSteering",
            Self::SetBrake(_) => "setBrake",
            Self::ApplyEngineForce(_) => "applyEngineForce",
            Self::AddConstraint(_) => "addConstraint",
            Self::RemoveConstraint(_) => "removeConstraint",
            Self::HingeSetLimits(_) => "hinge_setLimits",
            Self::HingeEnableAngularMotor(_) => "hinge_enableAngularMotor",
            Self::HingeDisableMotor(_) => "hinge_disableMotor",
            Self::SliderSetLimits(_) => "slider_setLimits",
            Self::SliderSetRestitution(_) => "slider_setRestitution",
            Self::SliderEnableLinearMotor(_) => "slider_enableLinearMotor",
            Self::SliderDisableLinearMotor(_) => "slider_disableLinearMotor",
            Self::SliderEnableAngularMotor(_) => "slider_enableAngularMotor",
            Self::SliderDisableAngularMotor(_) => "slider_disableAngularMotor",
            Self::ConeTwistSetLimit(_) => "conetwist_setLimit",
            Self::ConeTwistEnableMotor(_) => "conetwist_enableMotor",
            Self::ConeTwistSetMaxMotorImpulse(_) => "conetwist_setMaxMotorImpulse",
            Self::ConeTwistSetMotorTarget(_) => "conetwist_setMotorTarget",
            Self::ConeTwistDisableMotor(_) => "conetwist_disableMotor",
            Self::DofSetLinearLowerLimit(_) => "dof_setLinearLowerLimit",
            Self::DofSetLinearUpperLimit(_) => "dof_setLinearUpperLimit",
            Self::DofSetAngularLowerLimit(_) => "dof_setAngularLowerLimit",
            Self::DofSetAngularUpperLimit(_) => "dof_setAngularUpperLimit",
            Self::DofEnableAngularMotor(_) => "dof_enableAngularMotor",
            Self::DofConfigureAngularMotor(_) => "dof_configureAngularMotor",
            Self::DofDisableAngularMotor(_) => "dof_disableAngularMotor",
            Self::RegisterMaterial(_) => "registerMaterial",
            Self::UnRegisterMaterial(_) => "unRegisterMaterial",
            Self::SetFixedTimeStep(_) => "setFixedTimeStep",
            Self::SetGravity(_) => "setGravity",
            Self::Simulate(_) => "simulate",
            Self::OnSimulationResume => "onSimulationResume",
        }
    }
}
