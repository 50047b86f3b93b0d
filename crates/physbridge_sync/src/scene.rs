//! # Synchronization Engine
//!
//! [`Scene`] owns one simulated world's mirror: the registries, the
//! outbound command queue and the per-tick state machine.
//!
//! ## Tick
//!
//! ```text
//!          simulate() ── true ──┐
//!   ┌──────┐                    ▼                ┌──────────┐
//!   │ idle │              flush dirty transforms │ stepping │
//!   └──────┘              queue `simulate`       └──────────┘
//!       ▲                 flush queue                 │
//!       │                                             │ simulate() ── false
//!       └──────────── WORLD report / Update ──────────┘
//! ```
//!
//! All other reports (collision, vehicle, constraint) are applied whenever
//! they arrive and never change the step state.

use crate::body::{Body, BodyBuilder};
use crate::channel::CommandChannel;
use crate::collision::{CollisionTracker, ContactBegin};
use crate::config::SceneConfig;
use crate::constraint::Constraint;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, SceneEvent};
use crate::node::{PhysicsHandle, SceneNode};
use crate::reconcile;
use crate::registry::{MaterialRegistry, Registry};
use crate::report::{self, ItemReader, Report};
use crate::transport::{InboundMessage, TransferOutcome, Transport};
use crate::vehicle::Vehicle;
use crossbeam_channel::Receiver;
use physbridge_shared::command::{
    AddWheelParams, BrakeParams, CcdRadiusParams, CcdThresholdParams, DampingParams,
    EngineForceParams, ForceParams, IdParams, ImpulseParams, MassParams, SimulateParams,
    SteeringParams, TorqueParams, VectorParams,
};
use physbridge_shared::{
    Command, ConstraintItem, ConstraintType, ControlMessage, EntityId, Quat, TransferBuffer,
    Vec3, VehicleItem, VehicleTuning, WheelParams,
};
use tracing::{debug, info, trace, warn};

/// Controller-side mirror of one physics world.
pub struct Scene<T: Transport> {
    config: SceneConfig,
    channel: CommandChannel<T>,
    bodies: Registry<Body>,
    vehicles: Registry<Vehicle>,
    constraints: Registry<Constraint>,
    materials: MaterialRegistry,
    collisions: CollisionTracker,
    contacts: Vec<ContactBegin>,
    events: EventBus,
    stepping: bool,
    zero_copy: bool,
    world_ready: bool,
}

impl<T: Transport> Scene<T> {
    /// Connects to a worker and initializes its world.
    ///
    /// Sends the transfer probe (unless `zero_copy` is off), then `init`
    /// and `setGravity` when configured, immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if `config` fails validation.
    pub fn new(config: SceneConfig, mut transport: T) -> SyncResult<Self> {
        config.validate()?;

        let zero_copy = config.zero_copy && transport.transfer(TransferBuffer::probe()).is_moved();
        let mut channel = CommandChannel::new(transport);
        channel.execute(Command::Init(config.init_params()));
        if let Some(gravity) = config.gravity {
            channel.execute(Command::SetGravity(gravity));
        }
        channel.flush();

        info!(
            zero_copy,
            fixed_time_step = config.fixed_time_step,
            engine = %config.engine_script,
            "scene initialized"
        );

        Ok(Self {
            events: EventBus::new(config.event_backlog_warning),
            config,
            channel,
            bodies: Registry::new(),
            vehicles: Registry::new(),
            constraints: Registry::new(),
            materials: MaterialRegistry::new(),
            collisions: CollisionTracker::new(),
            contacts: Vec::new(),
            stepping: false,
            zero_copy,
            world_ready: false,
        })
    }

    /// Configuration the scene was created with.
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Whether a step is in flight.
    #[must_use]
    pub const fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Whether the worker reported `worldReady`.
    #[must_use]
    pub const fn is_world_ready(&self) -> bool {
        self.world_ready
    }

    /// Whether report buffers are moved back to the worker after decoding.
    #[must_use]
    pub const fn supports_zero_copy(&self) -> bool {
        self.zero_copy
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Starts one physics step.
    ///
    /// Returns `false` without doing anything while the previous step is
    /// still in flight. Otherwise flushes every dirty transform, queues
    /// `simulate`, sends the whole queue and returns `true`.
    pub fn simulate(&mut self, time_step: Option<f32>, max_sub_steps: Option<u32>) -> bool {
        if self.stepping {
            return false;
        }
        self.stepping = true;

        let before = self.channel.pending_len();
        self.channel.extend(reconcile::take_dirty_updates(&mut self.bodies).map(Command::UpdateTransform));
        let transforms = self.channel.pending_len() - before;

        self.channel.execute(Command::Simulate(SimulateParams { time_step, max_sub_steps }));
        let posted = self.channel.flush();
        debug!(transforms, posted, "step started");
        true
    }

    /// Sends queued commands without starting a step.
    pub fn flush(&mut self) -> usize {
        self.channel.flush()
    }

    /// Commands queued for the next flush.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.channel.pending_len()
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Handles every message the worker has sent so far.
    ///
    /// Malformed messages are logged and dropped. Returns how many
    /// messages were taken off the transport.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.channel.transport_mut().try_recv() {
            handled += 1;
            if let Err(e) = self.handle_message(message) {
                warn!(error = %e, "dropped inbound message");
            }
        }
        handled
    }

    /// Handles one message from the worker.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MalformedReport`] if a report fails to decode
    /// - [`SyncError::Encode`] if a control message is not valid JSON
    pub fn handle_message(&mut self, message: InboundMessage) -> SyncResult<()> {
        match message {
            InboundMessage::Report(buffer) => self.handle_report(buffer),
            InboundMessage::Control(json) => self.handle_control(&json),
        }
    }

    /// Decodes and applies one report, then hands the buffer back to the
    /// worker when the transport moves memory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MalformedReport`] if the buffer does not decode.
    pub fn handle_report(&mut self, buffer: TransferBuffer) -> SyncResult<()> {
        if buffer.is_probe() {
            trace!("transfer probe echo ignored");
            return Ok(());
        }

        let result = match report::decode(buffer.as_bytes()) {
            Ok(report) => {
                self.apply_report(report);
                Ok(())
            }
            Err(e) => Err(SyncError::from(e)),
        };
        self.recycle(buffer);
        result
    }

    /// Parses and applies one control notification.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Encode`] if `json` is not a control message.
    pub fn handle_control(&mut self, json: &str) -> SyncResult<()> {
        match serde_json::from_str::<ControlMessage>(json)? {
            ControlMessage::ObjectReady(id) => {
                if let Some(body) = self.bodies.get_mut(id) {
                    body.mark_ready();
                    self.events.publish(SceneEvent::ObjectReady(id));
                } else {
                    trace!(%id, "objectReady for unknown body");
                }
            }
            ControlMessage::WorldReady => {
                info!("worker world ready");
                self.world_ready = true;
                self.events.publish(SceneEvent::Ready);
            }
            ControlMessage::Unknown => {
                warn!(message = json, "unhandled control message");
            }
        }
        Ok(())
    }

    fn apply_report(&mut self, report: Report<'_>) {
        match report {
            Report::World(items) => {
                let summary = reconcile::apply_world_report(&mut self.bodies, items);
                self.stepping = false;
                self.events.publish(SceneEvent::Update);
                debug!(
                    applied = summary.applied,
                    stale = summary.stale,
                    kept_positions = summary.kept_positions,
                    kept_rotations = summary.kept_rotations,
                    "WORLD report applied"
                );
            }
            Report::Collision(items) => {
                self.contacts.clear();
                let begun = self.collisions.process(items, &mut self.bodies, &mut self.contacts);
                for contact in self.contacts.drain(..) {
                    self.events.publish(SceneEvent::Collision(contact));
                }
                if begun > 0 {
                    debug!(pairs = items.len(), begun, "COLLISION report applied");
                }
            }
            Report::Vehicle(items) => self.apply_vehicle_report(items),
            Report::Constraint(items) => self.apply_constraint_report(items),
        }
    }

    fn apply_vehicle_report(&mut self, items: ItemReader<'_, VehicleItem>) {
        for item in items.iter() {
            let applied = item
                .vehicle()
                .and_then(|id| self.vehicles.get_mut(id))
                .is_some_and(|vehicle| vehicle.apply_report(&item));
            if !applied {
                trace!(vehicle = item.vehicle, wheel = item.wheel, "stale VEHICLE item skipped");
            }
        }
    }

    fn apply_constraint_report(&mut self, items: ItemReader<'_, ConstraintItem>) {
        for item in items.iter() {
            let body = item.body().and_then(|id| self.bodies.get(id));
            let constraint = item.constraint().and_then(|id| self.constraints.get_mut(id));
            match (constraint, body) {
                (Some(constraint), Some(body)) => constraint.apply_report(body, &item),
                _ => trace!(
                    constraint = item.constraint,
                    body = item.body,
                    "stale CONSTRAINT item skipped"
                ),
            }
        }
    }

    fn recycle(&mut self, buffer: TransferBuffer) {
        if !self.zero_copy {
            return;
        }
        match self.channel.transport_mut().transfer(buffer) {
            TransferOutcome::Moved => {}
            TransferOutcome::Copied(original) => {
                trace!(
                    bytes = original.as_bytes().len(),
                    "transport copied a recycled buffer; original dropped"
                );
            }
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Takes every pending event.
    #[must_use]
    pub fn drain_events(&self) -> Vec<SceneEvent> {
        self.events.drain()
    }

    /// Receiver for observers on other threads.
    #[must_use]
    pub fn event_receiver(&self) -> Receiver<SceneEvent> {
        self.events.receiver()
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Adds a body. `addObject` is sent with the next flush.
    pub fn add_body(&mut self, builder: BodyBuilder) -> EntityId {
        let id = allocate_id();
        if let Some(material) = builder.material() {
            if self.materials.acquire(material) {
                self.channel.execute(Command::RegisterMaterial(material));
            }
        }
        let (descriptor, body) = builder.build(id);
        self.bodies.insert(id, body);
        self.channel.execute(Command::AddObject(descriptor));
        debug!(%id, "body added");
        id
    }

    /// Adds a body and wraps `node` with a handle to it.
    pub fn spawn<N>(&mut self, node: N, builder: BodyBuilder) -> SceneNode<N> {
        let id = self.add_body(builder);
        SceneNode::with_physics(node, PhysicsHandle::new(id))
    }

    /// Removes a body. Reports still naming it are ignored from now on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn remove_body(&mut self, id: EntityId) -> SyncResult<()> {
        let body = self.bodies.remove(id).ok_or(SyncError::UnknownEntity(id))?;
        self.channel.execute(Command::RemoveObject(IdParams { id }));
        if let Some(material) = body.material().and_then(|m| self.materials.release(m)) {
            self.channel.execute(Command::UnRegisterMaterial(material));
        }
        debug!(%id, "body removed");
        Ok(())
    }

    /// Shadow state of body `id`.
    #[must_use]
    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// All bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().map(|(_, body)| body)
    }

    /// Number of registered bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Authors a position. It wins over reports until the next step sends it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> SyncResult<()> {
        self.body_mut(id)?.set_position(position);
        Ok(())
    }

    /// Authors a rotation. It wins over reports until the next step sends it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_rotation(&mut self, id: EntityId, rotation: Quat) -> SyncResult<()> {
        self.body_mut(id)?.set_rotation(rotation);
        Ok(())
    }

    /// Changes a body's mass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_mass(&mut self, id: EntityId, mass: f32) -> SyncResult<()> {
        self.body_mut(id)?.set_mass(mass);
        self.channel.execute(Command::UpdateMass(MassParams { id, mass }));
        Ok(())
    }

    /// Impulse through the centre of mass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn apply_central_impulse(&mut self, id: EntityId, impulse: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::ApplyCentralImpulse(VectorParams { id, value: impulse }))
    }

    /// Impulse at `offset` from the centre of mass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3, offset: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::ApplyImpulse(ImpulseParams::new(id, impulse, offset)))
    }

    /// Torque.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn apply_torque(&mut self, id: EntityId, torque: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::ApplyTorque(TorqueParams::new(id, torque)))
    }

    /// Force through the centre of mass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn apply_central_force(&mut self, id: EntityId, force: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::ApplyCentralForce(VectorParams { id, value: force }))
    }

    /// Force at `offset` from the centre of mass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn apply_force(&mut self, id: EntityId, force: Vec3, offset: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::ApplyForce(ForceParams::new(id, force, offset)))
    }

    /// Overwrites linear velocity in the worker. The local value follows
    /// with the next WORLD report.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_linear_velocity(&mut self, id: EntityId, velocity: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::SetLinearVelocity(VectorParams { id, value: velocity }))
    }

    /// Overwrites angular velocity in the worker.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_angular_velocity(&mut self, id: EntityId, velocity: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::SetAngularVelocity(VectorParams { id, value: velocity }))
    }

    /// Per-axis linear motion factor; 0 locks an axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_linear_factor(&mut self, id: EntityId, factor: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::SetLinearFactor(VectorParams { id, value: factor }))
    }

    /// Per-axis angular motion factor; 0 locks an axis.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_angular_factor(&mut self, id: EntityId, factor: Vec3) -> SyncResult<()> {
        self.body_command(id, Command::SetAngularFactor(VectorParams { id, value: factor }))
    }

    /// Linear and angular damping.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_damping(&mut self, id: EntityId, linear: f32, angular: f32) -> SyncResult<()> {
        self.body_command(id, Command::SetDamping(DampingParams { id, linear, angular }))
    }

    /// Velocity above which continuous collision detection is used.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_ccd_motion_threshold(&mut self, id: EntityId, threshold: f32) -> SyncResult<()> {
        self.body_command(id, Command::SetCcdMotionThreshold(CcdThresholdParams { id, threshold }))
    }

    /// Radius of the sphere swept for continuous collision detection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not registered.
    pub fn set_ccd_swept_sphere_radius(&mut self, id: EntityId, radius: f32) -> SyncResult<()> {
        self.body_command(id, Command::SetCcdSweptSphereRadius(CcdRadiusParams { id, radius }))
    }

    fn body_mut(&mut self, id: EntityId) -> SyncResult<&mut Body> {
        self.bodies.get_mut(id).ok_or(SyncError::UnknownEntity(id))
    }

    fn body_command(&mut self, id: EntityId, command: Command) -> SyncResult<()> {
        if !self.bodies.contains(id) {
            return Err(SyncError::UnknownEntity(id));
        }
        self.channel.execute(command);
        Ok(())
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    /// Adds a chassis body and a vehicle driving it. Returns the vehicle id.
    pub fn add_vehicle(&mut self, chassis: BodyBuilder, tuning: VehicleTuning) -> EntityId {
        let chassis = self.add_body(chassis);
        let vehicle = Vehicle::new(allocate_id(), chassis, tuning);
        let id = vehicle.id();
        self.channel.execute(Command::AddVehicle(vehicle.descriptor()));
        self.vehicles.insert(id, vehicle);
        debug!(%id, %chassis, "vehicle added");
        id
    }

    /// Removes a vehicle and its chassis body.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not a vehicle.
    pub fn remove_vehicle(&mut self, id: EntityId) -> SyncResult<()> {
        let vehicle = self.vehicles.remove(id).ok_or(SyncError::UnknownEntity(id))?;
        self.channel.execute(Command::RemoveVehicle(IdParams { id }));
        if self.bodies.contains(vehicle.chassis()) {
            self.remove_body(vehicle.chassis())?;
        }
        Ok(())
    }

    /// Attaches a wheel. Returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `vehicle` is not registered.
    pub fn add_wheel(&mut self, vehicle: EntityId, wheel: WheelParams) -> SyncResult<usize> {
        let index = self
            .vehicles
            .get_mut(vehicle)
            .ok_or(SyncError::UnknownEntity(vehicle))?
            .push_wheel(wheel);
        self.channel.execute(Command::AddWheel(AddWheelParams { id: vehicle, wheel }));
        Ok(index)
    }

    /// Steering angle for `wheel`, or for every wheel when `wheel` is
    /// `None` or out of range.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `vehicle` is not registered.
    pub fn set_steering(&mut self, vehicle: EntityId, steering: f32, wheel: Option<usize>) -> SyncResult<()> {
        self.wheel_control(vehicle, steering, wheel, |id, wheel, steering| {
            Command::SetSteering(SteeringParams { id, wheel, steering })
        })
    }

    /// Brake force for `wheel`, or for every wheel.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `vehicle` is not registered.
    pub fn set_brake(&mut self, vehicle: EntityId, brake: f32, wheel: Option<usize>) -> SyncResult<()> {
        self.wheel_control(vehicle, brake, wheel, |id, wheel, brake| {
            Command::SetBrake(BrakeParams { id, wheel, brake })
        })
    }

    /// Engine force for `wheel`, or for every wheel.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `vehicle` is not registered.
    pub fn apply_engine_force(&mut self, vehicle: EntityId, force: f32, wheel: Option<usize>) -> SyncResult<()> {
        self.wheel_control(vehicle, force, wheel, |id, wheel, force| {
            Command::ApplyEngineForce(EngineForceParams { id, wheel, force })
        })
    }

    fn wheel_control(
        &mut self,
        id: EntityId,
        value: f32,
        wheel: Option<usize>,
        command: fn(EntityId, usize, f32) -> Command,
    ) -> SyncResult<()> {
        let targets = self
            .vehicles
            .get(id)
            .ok_or(SyncError::UnknownEntity(id))?
            .wheel_targets(wheel);
        self.channel.extend(targets.map(|wheel| command(id, wheel, value)));
        Ok(())
    }

    /// Vehicle `id`.
    #[must_use]
    pub fn vehicle(&self, id: EntityId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Creates a constraint anchored at world point `anchor`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::UnknownEntity`] if either body is not registered
    /// - [`SyncError::MissingSecondBody`] for a cone-twist without `body_b`
    /// - [`SyncError::MissingAxis`] for a hinge or slider without `axis`
    pub fn add_constraint(
        &mut self,
        kind: ConstraintType,
        body_a: EntityId,
        body_b: Option<EntityId>,
        anchor: Vec3,
        axis: Option<Vec3>,
    ) -> SyncResult<EntityId> {
        let a = self.bodies.get(body_a).ok_or(SyncError::UnknownEntity(body_a))?;
        let b = match body_b {
            Some(id) => Some(self.bodies.get(id).ok_or(SyncError::UnknownEntity(id))?),
            None => None,
        };
        let constraint = Constraint::new(allocate_id(), kind, a, b, anchor, axis)?;
        let id = constraint.id();
        self.channel.execute(Command::AddConstraint(constraint.definition()));
        self.constraints.insert(id, constraint);
        debug!(%id, %kind, "constraint added");
        Ok(id)
    }

    /// Removes a constraint. Reports still naming it are ignored from now on.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not a constraint.
    pub fn remove_constraint(&mut self, id: EntityId) -> SyncResult<()> {
        self.constraints.remove(id).ok_or(SyncError::UnknownEntity(id))?;
        self.channel.execute(Command::RemoveConstraint(IdParams { id }));
        Ok(())
    }

    /// Constraint `id`.
    #[must_use]
    pub fn constraint(&self, id: EntityId) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Queues a runtime configuration command built from constraint `id`.
    ///
    /// ```ignore
    /// scene.configure_constraint(hinge, |c| c.hinge_enable_angular_motor(1.5, 20.0))?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownEntity`] if `id` is not a constraint, or
    /// whatever `configure` returns.
    pub fn configure_constraint<F>(&mut self, id: EntityId, configure: F) -> SyncResult<()>
    where
        F: FnOnce(&Constraint) -> SyncResult<Command>,
    {
        let constraint = self.constraints.get(id).ok_or(SyncError::UnknownEntity(id))?;
        let command = configure(constraint)?;
        self.channel.execute(command);
        Ok(())
    }

    // =========================================================================
    // World
    // =========================================================================

    /// Changes gravity.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.channel.execute(Command::SetGravity(gravity));
    }

    /// Changes the solver's fixed step. Non-positive values are ignored.
    pub fn set_fixed_time_step(&mut self, fixed_time_step: f32) {
        if fixed_time_step.is_finite() && fixed_time_step > 0.0 {
            self.channel.execute(Command::SetFixedTimeStep(fixed_time_step));
        } else {
            warn!(fixed_time_step, "ignored invalid fixed time step");
        }
    }

    /// Tells the worker the simulation resumed after a pause.
    pub fn on_simulation_resume(&mut self) {
        self.channel.execute(Command::OnSimulationResume);
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Scene<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("bodies", &self.bodies.len())
            .field("vehicles", &self.vehicles.len())
            .field("constraints", &self.constraints.len())
            .field("stepping", &self.stepping)
            .field("zero_copy", &self.zero_copy)
            .field("transport", self.channel.transport())
            .finish_non_exhaustive()
    }
}

fn allocate_id() -> EntityId {
    let id = EntityId::allocate();
    if !id.is_wire_exact() {
        warn!(%id, "entity id space exhausted; reports cannot name this entity");
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::encode;
    use crate::transport::{ChannelTransport, WorkerEndpoint};
    use physbridge_shared::{CollisionItem, MaterialDescriptor, ShapeDescriptor, WorldItem};

    fn connect(config: SceneConfig) -> (Scene<ChannelTransport>, WorkerEndpoint) {
        let (transport, worker) = ChannelTransport::pair(true);
        let scene = Scene::new(config, transport).unwrap();
        (scene, worker)
    }

    fn sphere() -> BodyBuilder {
        BodyBuilder::new(ShapeDescriptor::Sphere { radius: 0.5 })
    }

    fn world(items: &[WorldItem]) -> TransferBuffer {
        encode(items, TransferBuffer::new())
    }

    fn world_item(id: EntityId, position: Vec3) -> WorldItem {
        WorldItem { id: id.to_scalar(), position, rotation: Quat::IDENTITY, ..WorldItem::default() }
    }

    fn names(worker: &WorkerEndpoint) -> Vec<&'static str> {
        worker.drain_commands().unwrap().iter().map(Command::name).collect()
    }

    #[test]
    fn test_new_sends_init_then_gravity() {
        let config = SceneConfig { gravity: Some(Vec3::new(0.0, -9.8, 0.0)), ..SceneConfig::default() };
        let (scene, worker) = connect(config);
        assert!(scene.supports_zero_copy());
        assert_eq!(names(&worker), vec!["init", "setGravity"]);
    }

    #[test]
    fn test_zero_copy_disabled_skips_probe() {
        let config = SceneConfig { zero_copy: false, ..SceneConfig::default() };
        let (scene, worker) = connect(config);
        assert!(!scene.supports_zero_copy());
        assert!(worker.reclaim_buffer().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (transport, _worker) = ChannelTransport::pair(true);
        let config = SceneConfig { fixed_time_step: 0.0, ..SceneConfig::default() };
        assert!(matches!(Scene::new(config, transport), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_one_step_in_flight() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let _ = worker.drain_commands();

        assert!(scene.simulate(None, None));
        assert!(scene.is_stepping());
        assert!(!scene.simulate(None, None));
        assert_eq!(names(&worker), vec!["simulate"]);

        scene.handle_report(world(&[])).unwrap();
        assert!(!scene.is_stepping());
        assert!(scene.simulate(Some(1.0 / 30.0), Some(4)));
        match worker.drain_commands().unwrap().as_slice() {
            [Command::Simulate(params)] => {
                assert_eq!(params.time_step, Some(1.0 / 30.0));
                assert_eq!(params.max_sub_steps, Some(4));
            }
            other => panic!("expected one simulate, got {other:?}"),
        }
    }

    #[test]
    fn test_dirty_transforms_precede_simulate() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let a = scene.add_body(sphere());
        let b = scene.add_body(sphere());
        scene.flush();
        let _ = worker.drain_commands();

        scene.set_position(a, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        scene.set_rotation(b, Quat::from_axis_angle(Vec3::Y, 1.0)).unwrap();
        assert!(scene.simulate(None, None));

        let commands = worker.drain_commands().unwrap();
        assert_eq!(commands.len(), 3);
        match (&commands[0], &commands[1]) {
            (Command::UpdateTransform(first), Command::UpdateTransform(second)) => {
                assert_eq!(first.id, a);
                assert_eq!(first.pos, Some(Vec3::new(1.0, 2.0, 3.0)));
                assert_eq!(first.quat, None);
                assert_eq!(second.id, b);
                assert_eq!(second.pos, None);
                assert!(second.quat.is_some());
            }
            other => panic!("expected two transform updates, got {other:?}"),
        }
        assert_eq!(commands[2].name(), "simulate");

        let body = scene.body(a).unwrap();
        assert!(!body.dirty_position());
    }

    #[test]
    fn test_authored_position_survives_report_until_sent() {
        let (mut scene, _worker) = connect(SceneConfig::default());
        let id = scene.add_body(sphere());
        scene.set_position(id, Vec3::new(5.0, 0.0, 0.0)).unwrap();

        scene.handle_report(world(&[world_item(id, Vec3::new(0.0, 9.0, 0.0))])).unwrap();
        assert_eq!(scene.body(id).unwrap().position(), Vec3::new(5.0, 0.0, 0.0));

        assert!(scene.simulate(None, None));
        scene.handle_report(world(&[world_item(id, Vec3::new(5.0, -0.1, 0.0))])).unwrap();
        assert_eq!(scene.body(id).unwrap().position(), Vec3::new(5.0, -0.1, 0.0));
    }

    #[test]
    fn test_material_registered_once_and_released_with_last_user() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let _ = worker.drain_commands();
        let material = MaterialDescriptor::new(9).with_friction(0.4);

        let a = scene.add_body(sphere().with_material(material));
        let b = scene.add_body(sphere().with_material(material));
        scene.flush();
        assert_eq!(names(&worker), vec!["registerMaterial", "addObject", "addObject"]);

        scene.remove_body(a).unwrap();
        scene.flush();
        assert_eq!(names(&worker), vec!["removeObject"]);

        scene.remove_body(b).unwrap();
        scene.flush();
        assert_eq!(names(&worker), vec!["removeObject", "unRegisterMaterial"]);
    }

    #[test]
    fn test_body_commands_require_registered_body() {
        let (mut scene, _worker) = connect(SceneConfig::default());
        let ghost = EntityId::from_raw(EntityId::MAX_WIRE);
        assert_eq!(scene.apply_central_impulse(ghost, Vec3::Y), Err(SyncError::UnknownEntity(ghost)));
        assert_eq!(scene.set_damping(ghost, 0.1, 0.1), Err(SyncError::UnknownEntity(ghost)));
        assert_eq!(scene.remove_body(ghost), Err(SyncError::UnknownEntity(ghost)));
        assert_eq!(scene.pending_commands(), 0);
    }

    #[test]
    fn test_body_commands_are_queued_in_order() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let id = scene.add_body(sphere());
        scene.set_mass(id, 4.0).unwrap();
        scene.apply_impulse(id, Vec3::Y, Vec3::X).unwrap();
        scene.set_linear_velocity(id, Vec3::Z).unwrap();
        scene.set_ccd_motion_threshold(id, 0.5).unwrap();
        scene.flush();

        let _init = worker.try_recv_command().unwrap();
        assert_eq!(
            names(&worker),
            vec!["addObject", "updateMass", "applyImpulse", "setLinearVelocity", "setCcdMotionThreshold"]
        );
        assert_eq!(scene.body(id).unwrap().mass(), 4.0);
    }

    #[test]
    fn test_removed_body_ignored_by_reports() {
        let (mut scene, _worker) = connect(SceneConfig::default());
        let kept = scene.add_body(sphere());
        let gone = scene.add_body(sphere());
        scene.remove_body(gone).unwrap();

        scene
            .handle_report(world(&[
                world_item(gone, Vec3::new(1.0, 1.0, 1.0)),
                world_item(kept, Vec3::new(2.0, 2.0, 2.0)),
            ]))
            .unwrap();
        assert!(scene.body(gone).is_none());
        assert_eq!(scene.body(kept).unwrap().position(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(scene.drain_events(), vec![SceneEvent::Update]);
    }

    #[test]
    fn test_collision_events_once_per_episode() {
        let (mut scene, _worker) = connect(SceneConfig::default());
        let a = scene.add_body(sphere());
        let b = scene.add_body(sphere());
        let contact = CollisionItem { id_a: a.to_scalar(), id_b: b.to_scalar(), normal: Vec3::Y };

        scene.handle_report(encode(&[contact], TransferBuffer::new())).unwrap();
        scene.handle_report(encode(&[contact], TransferBuffer::new())).unwrap();

        let events = scene.drain_events();
        assert_eq!(events.len(), 2);
        assert!(scene.body(a).unwrap().is_touching(b));
        assert!(scene.body(b).unwrap().is_touching(a));

        scene.handle_report(encode::<CollisionItem>(&[], TransferBuffer::new())).unwrap();
        assert!(!scene.body(a).unwrap().is_touching(b));
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_control_messages() {
        let (mut scene, _worker) = connect(SceneConfig::default());
        let id = scene.add_body(sphere());

        scene.handle_control(&format!(r#"{{"cmd":"objectReady","params":{}}}"#, id.raw())).unwrap();
        scene.handle_control(r#"{"cmd":"objectReady","params":99999}"#).unwrap();
        scene.handle_control(r#"{"cmd":"worldReady"}"#).unwrap();
        scene.handle_control(r#"{"cmd":"somethingElse"}"#).unwrap();

        assert!(scene.body(id).unwrap().is_ready());
        assert!(scene.is_world_ready());
        assert_eq!(scene.drain_events(), vec![SceneEvent::ObjectReady(id), SceneEvent::Ready]);
        assert!(matches!(scene.handle_control("not json"), Err(SyncError::Encode(_))));
    }

    #[test]
    fn test_control_params_do_not_break_dispatch() {
        let (mut scene, _worker) = connect(SceneConfig::default());

        scene.handle_control(r#"{"cmd":"vehicle","params":{"id":3}}"#).unwrap();
        scene.handle_control(r#"{"cmd":"worldReady","params":{}}"#).unwrap();

        assert!(scene.is_world_ready());
        assert_eq!(scene.drain_events(), vec![SceneEvent::Ready]);
    }

    #[test]
    fn test_collision_begins_past_backlog_threshold_are_kept() {
        let config = SceneConfig::default();
        assert!(config.event_backlog_warning < 1200);
        let (mut scene, _worker) = connect(config);
        let ids: Vec<EntityId> = (0..1200).map(|_| scene.add_body(sphere())).collect();
        let pairs: Vec<CollisionItem> = ids
            .chunks_exact(2)
            .map(|pair| CollisionItem {
                id_a: pair[0].to_scalar(),
                id_b: pair[1].to_scalar(),
                normal: Vec3::Y,
            })
            .collect();
        assert_eq!(pairs.len(), 600);

        scene.handle_report(encode(&pairs, TransferBuffer::new())).unwrap();
        let events = scene.drain_events();
        assert_eq!(events.len(), 1200);
        assert!(events.iter().all(|e| matches!(e, SceneEvent::Collision(_))));

        scene.handle_report(encode(&pairs, TransferBuffer::new())).unwrap();
        assert!(scene.drain_events().is_empty());
    }

    /// Moves the handshake buffer, then copies everything after it.
    #[derive(Debug)]
    struct CopyAfterHandshake {
        inner: ChannelTransport,
        copies: usize,
    }

    impl Transport for CopyAfterHandshake {
        fn post(&mut self, message: String) -> bool {
            self.inner.post(message)
        }

        fn transfer(&mut self, buffer: TransferBuffer) -> TransferOutcome {
            if buffer.is_probe() {
                return TransferOutcome::Moved;
            }
            self.copies += 1;
            self.inner.transfer(buffer)
        }

        fn try_recv(&mut self) -> Option<InboundMessage> {
            self.inner.try_recv()
        }
    }

    #[test]
    fn test_copied_recycle_is_dropped() {
        let (inner, worker) = ChannelTransport::pair(false);
        let mut scene =
            Scene::new(SceneConfig::default(), CopyAfterHandshake { inner, copies: 0 }).unwrap();
        assert!(scene.supports_zero_copy());

        let id = scene.add_body(sphere());
        assert!(scene.simulate(None, None));
        scene.handle_report(world(&[world_item(id, Vec3::Y)])).unwrap();
        assert_eq!(scene.transport().copies, 1);
        assert!(!scene.is_stepping());
        assert!(worker.reclaim_buffer().is_some());

        assert!(scene.handle_report(TransferBuffer::from_scalars(&[7.0])).is_err());
        assert_eq!(scene.transport().copies, 2);
        assert!(scene.simulate(None, None));
    }

    #[test]
    fn test_malformed_report_is_recycled() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let bad = TransferBuffer::from_scalars(&[7.0, 0.0]);
        assert!(matches!(scene.handle_report(bad), Err(SyncError::MalformedReport(_))));
        assert!(worker.reclaim_buffer().is_some());
    }

    #[test]
    fn test_pump_handles_probe_echo_and_reports() {
        let (mut scene, worker) = connect(SceneConfig::default());
        assert!(worker.reclaim_buffer().is_none());
        assert!(worker.send_report(world(&[])));
        assert!(worker.send_report(TransferBuffer::from_scalars(&[9.0])));
        assert_eq!(scene.pump(), 3);
        assert_eq!(scene.drain_events(), vec![SceneEvent::Update]);
    }

    #[test]
    fn test_vehicle_wheel_targets() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let car = scene.add_vehicle(
            BodyBuilder::new(ShapeDescriptor::Box { width: 2.0, height: 1.0, depth: 4.0 }),
            VehicleTuning::default(),
        );
        let wheel = WheelParams {
            connection_point: Vec3::ZERO,
            wheel_direction: Vec3::new(0.0, -1.0, 0.0),
            wheel_axle: Vec3::X,
            suspension_rest_length: 50.0,
            wheel_radius: 0.4,
            is_front_wheel: true,
            tuning: None,
        };
        assert_eq!(scene.add_wheel(car, wheel).unwrap(), 0);
        assert_eq!(scene.add_wheel(car, wheel).unwrap(), 1);
        scene.flush();
        let _ = worker.drain_commands();

        scene.set_steering(car, 0.3, Some(1)).unwrap();
        scene.set_brake(car, 10.0, None).unwrap();
        scene.apply_engine_force(car, 50.0, Some(7)).unwrap();
        scene.flush();
        let commands = worker.drain_commands().unwrap();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0], Command::SetSteering(SteeringParams { id: car, wheel: 1, steering: 0.3 }));

        let chassis = scene.vehicle(car).unwrap().chassis();
        scene.remove_vehicle(car).unwrap();
        scene.flush();
        assert_eq!(names(&worker), vec!["removeVehicle", "removeObject"]);
        assert!(scene.body(chassis).is_none());
    }

    #[test]
    fn test_constraint_validation_and_configuration() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let a = scene.add_body(sphere());
        let b = scene.add_body(sphere().with_position(Vec3::new(0.0, 2.0, 0.0)));

        let missing = scene.add_constraint(ConstraintType::ConeTwist, a, None, Vec3::ZERO, None);
        assert!(matches!(missing, Err(SyncError::MissingSecondBody { .. })));
        let no_axis = scene.add_constraint(ConstraintType::Hinge, a, Some(b), Vec3::ZERO, None);
        assert!(matches!(no_axis, Err(SyncError::MissingAxis { .. })));

        let hinge = scene
            .add_constraint(ConstraintType::Hinge, a, Some(b), Vec3::new(0.0, 1.0, 0.0), Some(Vec3::X))
            .unwrap();
        scene.configure_constraint(hinge, |c| c.hinge_enable_angular_motor(1.5, 20.0)).unwrap();
        let wrong = scene.configure_constraint(hinge, |c| c.slider_disable_linear_motor());
        assert!(matches!(wrong, Err(SyncError::ConstraintKindMismatch { .. })));

        scene.flush();
        let tail: Vec<_> = names(&worker).into_iter().rev().take(2).collect();
        assert_eq!(tail, vec!["hinge_enableAngularMotor", "addConstraint"]);

        scene.remove_constraint(hinge).unwrap();
        assert!(scene.constraint(hinge).is_none());
        assert_eq!(scene.remove_constraint(hinge), Err(SyncError::UnknownEntity(hinge)));
    }

    #[test]
    fn test_world_settings() {
        let (mut scene, worker) = connect(SceneConfig::default());
        let _ = worker.drain_commands();
        scene.set_fixed_time_step(0.0);
        scene.set_fixed_time_step(1.0 / 120.0);
        scene.set_gravity(Vec3::ZERO);
        scene.on_simulation_resume();
        scene.flush();
        assert_eq!(names(&worker), vec!["setFixedTimeStep", "setGravity", "onSimulationResume"]);
    }
}
