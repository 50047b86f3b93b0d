//! Raycast vehicle mirror.
//!
//! A vehicle is a chassis body plus an ordered list of wheels. Wheel
//! indices are positions in that list and are what VEHICLE reports use.

use physbridge_shared::{
    EntityId, Quat, Vec3, VehicleDescriptor, VehicleItem, VehicleTuning, WheelParams,
};
use std::ops::Range;

/// One wheel's geometry and last known transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wheel {
    params: WheelParams,
    position: Vec3,
    rotation: Quat,
}

impl Wheel {
    /// Geometry the wheel was added with.
    #[must_use]
    pub const fn params(&self) -> &WheelParams {
        &self.params
    }

    /// World position from the last report, or the rest position before one.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// World rotation from the last report.
    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }
}

/// Controller-side state of a vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    id: EntityId,
    chassis: EntityId,
    tuning: VehicleTuning,
    wheels: Vec<Wheel>,
}

impl Vehicle {
    /// Creates a vehicle with no wheels.
    #[must_use]
    pub fn new(id: EntityId, chassis: EntityId, tuning: VehicleTuning) -> Self {
        Self { id, chassis, tuning, wheels: Vec::new() }
    }

    /// Vehicle id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Chassis body id.
    #[must_use]
    pub const fn chassis(&self) -> EntityId {
        self.chassis
    }

    /// Tuning the vehicle was created with.
    #[must_use]
    pub const fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Wheels in index order.
    #[must_use]
    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    /// Wheel at `index`.
    #[must_use]
    pub fn wheel(&self, index: usize) -> Option<&Wheel> {
        self.wheels.get(index)
    }

    /// Payload of the `addVehicle` command.
    #[must_use]
    pub const fn descriptor(&self) -> VehicleDescriptor {
        VehicleDescriptor { id: self.id, rigid_body: self.chassis, tuning: self.tuning }
    }

    /// Wheels a control input applies to: the one named, if it exists,
    /// otherwise all of them.
    #[must_use]
    pub fn wheel_targets(&self, wheel: Option<usize>) -> Range<usize> {
        match wheel {
            Some(index) if index < self.wheels.len() => index..index + 1,
            _ => 0..self.wheels.len(),
        }
    }

    /// Appends a wheel at its rest position. Returns its index.
    pub(crate) fn push_wheel(&mut self, params: WheelParams) -> usize {
        self.wheels.push(Wheel {
            params,
            position: params.rest_position(),
            rotation: Quat::IDENTITY,
        });
        self.wheels.len() - 1
    }

    /// Applies one VEHICLE report item. Returns false for an unknown wheel.
    pub(crate) fn apply_report(&mut self, item: &VehicleItem) -> bool {
        let Some(wheel) = item.wheel_index().and_then(|i| self.wheels.get_mut(i)) else {
            return false;
        };
        wheel.position = item.position;
        wheel.rotation = item.rotation;
        true
    }
}
