//! # PHYSBRIDGE Sync
//!
//! Controller-side mirror of a physics world that runs in a separate
//! execution context.
//!
//! ## Architecture Rules
//!
//! 1. **One step in flight** - `simulate` is refused until the WORLD report
//!    for the previous step has been applied
//! 2. **Authored state wins once** - a position or rotation set locally
//!    overrides reports until the next step carries it to the worker
//! 3. **Buffers move, never share** - report memory belongs to exactly one
//!    side at a time
//!
//! ## Example
//!
//! ```rust,ignore
//! use physbridge_sync::{BodyBuilder, ChannelTransport, Scene, SceneConfig};
//! use physbridge_shared::{ShapeDescriptor, Vec3};
//!
//! let (transport, worker) = ChannelTransport::pair(true);
//! let mut scene = Scene::new(SceneConfig::default(), transport)?;
//! let ball = scene.add_body(
//!     BodyBuilder::new(ShapeDescriptor::Sphere { radius: 0.5 })
//!         .with_position(Vec3::new(0.0, 10.0, 0.0)),
//! );
//!
//! // once per frame
//! scene.pump();
//! scene.simulate(None, None);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod body;
pub mod channel;
pub mod collision;
pub mod config;
pub mod constraint;
pub mod error;
pub mod events;
pub mod node;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod scene;
pub mod transport;
pub mod vehicle;

pub use body::{Body, BodyBuilder};
pub use collision::{CollisionTracker, ContactBegin};
pub use config::SceneConfig;
pub use constraint::{Constraint, TargetOrientation};
pub use error::{SyncError, SyncResult};
pub use events::SceneEvent;
pub use node::{NodeTransform, PhysicsHandle, SceneNode};
pub use report::{ReportError, Report};
pub use scene::Scene;
pub use transport::{ChannelTransport, InboundMessage, TransferOutcome, Transport, WorkerEndpoint};
pub use vehicle::{Vehicle, Wheel};
