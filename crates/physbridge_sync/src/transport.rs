//! # Worker Transport
//!
//! The only path between the controller and the simulation worker.
//!
//! ```text
//!   controller                                   worker
//! ┌─────────────┐   commands (JSON, FIFO)    ┌──────────────┐
//! │             │ ─────────────────────────> │              │
//! │ Transport   │   returned buffers (move)  │ WorkerEndpoint│
//! │             │ ─────────────────────────> │              │
//! │             │ <───────────────────────── │              │
//! └─────────────┘   reports + control        └──────────────┘
//! ```
//!
//! Nothing here blocks the controller. Sends never wait for the worker and
//! receives are polled.

use crate::error::SyncResult;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use physbridge_shared::{Command, ControlMessage, TransferBuffer};
use std::time::Duration;
use tracing::warn;

/// A message arriving from the worker.
#[derive(Debug)]
pub enum InboundMessage {
    /// A binary report, or the echoed transfer probe.
    Report(TransferBuffer),
    /// A JSON control notification.
    Control(String),
}

/// What happened to a buffer handed to [`Transport::transfer`].
#[derive(Debug, PartialEq)]
#[must_use]
pub enum TransferOutcome {
    /// Ownership moved to the worker. The sender has nothing left.
    Moved,
    /// The transport sent a copy; the original comes back to the sender.
    Copied(TransferBuffer),
}

impl TransferOutcome {
    /// Returns true if the buffer was moved rather than copied.
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        matches!(self, Self::Moved)
    }
}

/// Controller side of the worker link.
pub trait Transport {
    /// Posts one serialized command. Returns `false` if the worker is gone.
    fn post(&mut self, message: String) -> bool;

    /// Hands a buffer to the worker, moving it when the transport can.
    fn transfer(&mut self, buffer: TransferBuffer) -> TransferOutcome;

    /// Takes the next inbound message, if one is waiting.
    fn try_recv(&mut self) -> Option<InboundMessage>;
}

/// In-process transport over crossbeam channels.
///
/// Channels are unbounded so that posting never blocks or drops; the
/// single-step-in-flight rule is what keeps them short.
#[derive(Debug)]
pub struct ChannelTransport {
    commands: Sender<String>,
    buffers: Sender<TransferBuffer>,
    inbound: Receiver<InboundMessage>,
    zero_copy: bool,
}

impl ChannelTransport {
    /// Creates a connected controller/worker pair.
    ///
    /// With `zero_copy` off, [`Transport::transfer`] sends a copy and hands
    /// the original back, the way a transport without transferable memory
    /// behaves.
    #[must_use]
    pub fn pair(zero_copy: bool) -> (Self, WorkerEndpoint) {
        let (command_tx, command_rx) = unbounded();
        let (buffer_tx, buffer_rx) = unbounded();
        let (inbound_tx, inbound_rx) = unbounded();

        let controller = Self {
            commands: command_tx,
            buffers: buffer_tx,
            inbound: inbound_rx,
            zero_copy,
        };
        let worker = WorkerEndpoint {
            commands: command_rx,
            buffers: buffer_rx,
            outbound: inbound_tx,
        };
        (controller, worker)
    }
}

impl Transport for ChannelTransport {
    fn post(&mut self, message: String) -> bool {
        self.commands.send(message).is_ok()
    }

    fn transfer(&mut self, buffer: TransferBuffer) -> TransferOutcome {
        if self.zero_copy {
            if self.buffers.send(buffer).is_err() {
                warn!("worker disconnected, transferred buffer dropped");
            }
            TransferOutcome::Moved
        } else {
            if self.buffers.send(buffer.duplicate()).is_err() {
                warn!("worker disconnected, buffer copy dropped");
            }
            TransferOutcome::Copied(buffer)
        }
    }

    fn try_recv(&mut self) -> Option<InboundMessage> {
        match self.inbound.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// Worker side of a [`ChannelTransport`] pair.
#[derive(Debug)]
pub struct WorkerEndpoint {
    commands: Receiver<String>,
    buffers: Receiver<TransferBuffer>,
    outbound: Sender<InboundMessage>,
}

impl WorkerEndpoint {
    /// Takes the next command without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Encode`] if the message is not a command.
    pub fn try_recv_command(&self) -> SyncResult<Option<Command>> {
        match self.commands.try_recv() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }

    /// Waits up to `timeout` for the next command.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Encode`] if the message is not a command.
    pub fn recv_command_timeout(&self, timeout: Duration) -> SyncResult<Option<Command>> {
        match self.commands.recv_timeout(timeout) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// Takes every command currently queued.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Encode`] on the first undecodable message.
    pub fn drain_commands(&self) -> SyncResult<Vec<Command>> {
        let mut commands = Vec::new();
        while let Some(command) = self.try_recv_command()? {
            commands.push(command);
        }
        Ok(commands)
    }

    /// Takes back a buffer the controller returned, for reuse.
    ///
    /// A probe buffer is echoed straight back to the controller and never
    /// returned from here.
    #[must_use]
    pub fn reclaim_buffer(&self) -> Option<TransferBuffer> {
        while let Ok(buffer) = self.buffers.try_recv() {
            if buffer.is_probe() {
                let _ = self.outbound.send(InboundMessage::Report(buffer));
                continue;
            }
            return Some(buffer);
        }
        None
    }

    /// Sends a report. Returns `false` if the controller is gone.
    pub fn send_report(&self, buffer: TransferBuffer) -> bool {
        self.outbound.send(InboundMessage::Report(buffer)).is_ok()
    }

    /// Sends a control notification. Returns `Ok(false)` if the controller
    /// is gone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Encode`] if the message fails to serialize.
    pub fn send_control(&self, message: ControlMessage) -> SyncResult<bool> {
        let json = serde_json::to_string(&message)?;
        Ok(self.outbound.send(InboundMessage::Control(json)).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physbridge_shared::EntityId;

    #[test]
    fn test_zero_copy_moves_buffer() {
        let (mut controller, worker) = ChannelTransport::pair(true);
        let outcome = controller.transfer(TransferBuffer::from_scalars(&[0.0, 0.0]));
        assert!(outcome.is_moved());
        assert_eq!(worker.reclaim_buffer().map(|b| b.scalar_len()), Some(2));
    }

    #[test]
    fn test_copying_transport_returns_original() {
        let (mut controller, worker) = ChannelTransport::pair(false);
        let outcome = controller.transfer(TransferBuffer::from_scalars(&[5.0]));
        let TransferOutcome::Copied(original) = outcome else {
            panic!("expected a copy");
        };
        assert_eq!(original.scalar(0), Some(5.0));
        assert_eq!(worker.reclaim_buffer().and_then(|b| b.scalar(0)), Some(5.0));
    }

    #[test]
    fn test_probe_is_echoed() {
        let (mut controller, worker) = ChannelTransport::pair(true);
        let _ = controller.transfer(TransferBuffer::probe());
        assert!(worker.reclaim_buffer().is_none());

        match controller.try_recv() {
            Some(InboundMessage::Report(buffer)) => assert!(buffer.is_probe()),
            other => panic!("expected probe echo, got {other:?}"),
        }
    }

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut controller, worker) = ChannelTransport::pair(true);
        assert!(controller.post(String::from(r#"{"cmd":"onSimulationResume"}"#)));
        assert!(controller.post(String::from(r#"{"cmd":"simulate","params":{}}"#)));
        let commands = worker.drain_commands().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], Command::OnSimulationResume);
        assert!(matches!(commands[1], Command::Simulate(_)));
    }

    #[test]
    fn test_control_roundtrip() {
        let (mut controller, worker) = ChannelTransport::pair(true);
        assert!(worker.send_control(ControlMessage::ObjectReady(EntityId::from_raw(2))).unwrap());
        match controller.try_recv() {
            Some(InboundMessage::Control(json)) => {
                let message: ControlMessage = serde_json::from_str(&json).unwrap();
                assert_eq!(message, ControlMessage::ObjectReady(EntityId::from_raw(2)));
            }
            other => panic!("expected control message, got {other:?}"),
        }
    }

    #[test]
    fn test_post_after_worker_dropped() {
        let (mut controller, worker) = ChannelTransport::pair(true);
        drop(worker);
        assert!(!controller.post(String::from("{}")));
        assert!(controller.try_recv().is_none());
    }
}
