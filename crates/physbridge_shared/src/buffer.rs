//! # Transferable Buffers
//!
//! A [`TransferBuffer`] is the only memory the two execution contexts ever
//! share, and they never share it at the same time. The type is move-only:
//! handing it to the transport consumes the value, so the sender has no
//! handle left to read or write through.
//!
//! The backing storage is reused across hand-offs. The worker fills a
//! buffer, the controller decodes it and moves it back, and the next report
//! is written into the same allocation.

use crate::protocol::SCALAR_SIZE;

/// Byte length of the transfer-support probe.
pub const PROBE_LEN: usize = 1;

/// Owned byte buffer that moves between execution contexts.
///
/// Deliberately not `Clone`. Use [`TransferBuffer::duplicate`] when a real
/// copy is wanted, e.g. when the transport cannot move memory.
#[derive(Debug, Default, PartialEq)]
pub struct TransferBuffer {
    bytes: Vec<u8>,
}

impl TransferBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Creates an empty buffer with room for `scalars` report scalars.
    #[must_use]
    pub fn with_scalar_capacity(scalars: usize) -> Self {
        Self { bytes: Vec::with_capacity(scalars * SCALAR_SIZE) }
    }

    /// Wraps raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Builds a buffer holding the given scalars in native byte order.
    #[must_use]
    pub fn from_scalars(scalars: &[f32]) -> Self {
        Self { bytes: bytemuck::cast_slice(scalars).to_vec() }
    }

    /// The one-byte probe sent during the lifecycle handshake.
    #[must_use]
    pub fn probe() -> Self {
        Self { bytes: vec![0; PROBE_LEN] }
    }

    /// Returns true if this is a probe-sized buffer.
    #[must_use]
    pub fn is_probe(&self) -> bool {
        self.bytes.len() == PROBE_LEN
    }

    /// Byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of complete scalars held.
    #[must_use]
    pub fn scalar_len(&self) -> usize {
        self.bytes.len() / SCALAR_SIZE
    }

    /// Read-only view of the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reads the scalar at `index`, if present.
    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<f32> {
        let start = index.checked_mul(SCALAR_SIZE)?;
        let chunk = self.bytes.get(start..start + SCALAR_SIZE)?;
        Some(bytemuck::pod_read_unaligned(chunk))
    }

    /// Empties the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Appends one scalar.
    pub fn push_scalar(&mut self, value: f32) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a `Pod` record.
    pub fn push_pod<T: bytemuck::Pod>(&mut self, value: &T) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
    }

    /// Makes an independent copy. Used when the transport copies instead of
    /// moving.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self { bytes: self.bytes.clone() }
    }

    /// Releases the backing storage.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
