//! # PHYSBRIDGE Shared
//!
//! Wire vocabulary spoken by the controller and the simulation worker.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a renderer or scene graph
//! - a physics engine
//! - a transport
//!
//! Both execution contexts link it. If a type needs any of the above, it
//! belongs in `physbridge_sync`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod command;
pub mod control;
pub mod descriptor;
pub mod ids;
pub mod math;
pub mod protocol;

pub use buffer::TransferBuffer;
pub use command::Command;
pub use control::ControlMessage;
pub use descriptor::{
    BodyDescriptor, ChildShape, ConstraintDefinition, ConstraintType, MaterialDescriptor,
    ShapeDescriptor, VehicleDescriptor, VehicleTuning, WheelParams,
};
pub use ids::EntityId;
pub use math::{Quat, Vec3};
pub use protocol::{
    CollisionItem, ConstraintItem, ReportItem, ReportKind, VehicleItem, WorldItem,
};
