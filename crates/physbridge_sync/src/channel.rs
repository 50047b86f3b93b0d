//! # Command Channel
//!
//! Outbound intent queue. Scene operations record commands here; nothing
//! reaches the worker until [`CommandChannel::flush`], which the scene runs
//! once per tick. Delivery order is enqueue order.

use crate::transport::Transport;
use physbridge_shared::Command;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// FIFO queue of commands bound for the worker.
#[derive(Debug)]
pub struct CommandChannel<T> {
    transport: T,
    pending: VecDeque<Command>,
    sent: u64,
    dropped: u64,
}

impl<T: Transport> CommandChannel<T> {
    /// Wraps a transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: VecDeque::with_capacity(64),
            sent: 0,
            dropped: 0,
        }
    }

    /// Enqueues a command. Never blocks.
    #[inline]
    pub fn execute(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Commands waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &Command> {
        self.pending.iter()
    }

    /// Number of commands waiting for the next flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Sends every queued command in order. Returns how many were posted.
    ///
    /// Commands that fail to serialize, or that the transport refuses,
    /// are logged and dropped. There is no retry.
    pub fn flush(&mut self) -> usize {
        let mut posted = 0;
        while let Some(command) = self.pending.pop_front() {
            let json = match serde_json::to_string(&command) {
                Ok(json) => json,
                Err(e) => {
                    warn!(cmd = command.name(), error = %e, "failed to encode command");
                    self.dropped += 1;
                    continue;
                }
            };
            if self.transport.post(json) {
                posted += 1;
            } else {
                warn!(cmd = command.name(), "worker disconnected, command dropped");
                self.dropped += 1;
            }
        }
        self.sent += posted as u64;
        if posted > 0 {
            debug!(posted, "flushed commands");
        }
        posted
    }

    /// Total commands posted since creation.
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    /// Total commands dropped since creation.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Extend<Command> for CommandChannel<T> {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.pending.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use physbridge_shared::command::{IdParams, SimulateParams};
    use physbridge_shared::EntityId;

    #[test]
    fn test_nothing_sent_before_flush() {
        let (transport, worker) = ChannelTransport::pair(true);
        let mut channel = CommandChannel::new(transport);

        channel.execute(Command::OnSimulationResume);
        assert_eq!(channel.pending_len(), 1);
        assert!(worker.try_recv_command().unwrap().is_none());

        assert_eq!(channel.flush(), 1);
        assert_eq!(channel.pending_len(), 0);
        assert_eq!(worker.try_recv_command().unwrap(), Some(Command::OnSimulationResume));
    }

    #[test]
    fn test_flush_preserves_order() {
        let (transport, worker) = ChannelTransport::pair(true);
        let mut channel = CommandChannel::new(transport);

        let expected: Vec<Command> = (1..=5)
            .map(|raw| Command::RemoveObject(IdParams { id: EntityId::from_raw(raw) }))
            .chain(std::iter::once(Command::Simulate(SimulateParams::default())))
            .collect();
        channel.extend(expected.clone());
        assert_eq!(channel.flush(), expected.len());
        assert_eq!(channel.sent(), expected.len() as u64);

        assert_eq!(worker.drain_commands().unwrap(), expected);
    }

    #[test]
    fn test_disconnected_worker_drops_commands() {
        let (transport, worker) = ChannelTransport::pair(true);
        drop(worker);
        let mut channel = CommandChannel::new(transport);
        channel.execute(Command::OnSimulationResume);

        assert_eq!(channel.flush(), 0);
        assert_eq!(channel.dropped(), 1);
        assert_eq!(channel.pending_len(), 0);
    }
}
