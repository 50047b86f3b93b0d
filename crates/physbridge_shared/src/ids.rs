//! # Entity Identifiers
//!
//! Bodies, vehicles and constraints share one id space. Ids come from a
//! process-wide counter that only moves forward, so an id is never handed
//! out twice, even after the entity that owned it has been removed.
//!
//! Reports carry ids as `f32` scalars. Every integer up to 2^24 survives
//! that round trip exactly, which bounds the usable id range.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// First id handed out by [`EntityId::allocate`].
const FIRST_ID: u32 = 1;

static NEXT_ID: AtomicU32 = AtomicU32::new(FIRST_ID);

/// Unique identifier of a simulated entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Largest id that is exactly representable as a report scalar.
    pub const MAX_WIRE: u32 = 1 << 24;

    /// Takes the next id from the process-wide counter.
    ///
    /// The counter stops one past [`Self::MAX_WIRE`] and never wraps, so
    /// an exhausted id space keeps returning that same out-of-range id
    /// instead of reissuing a live one. Check [`Self::is_wire_exact`]
    /// when that matters.
    #[must_use]
    pub fn allocate() -> Self {
        let raw = advance(&NEXT_ID);
        debug_assert!(raw <= Self::MAX_WIRE, "entity id space exhausted");
        Self(raw)
    }

    /// Whether the id survives the report scalar round trip.
    #[inline]
    #[must_use]
    pub const fn is_wire_exact(self) -> bool {
        self.0 <= Self::MAX_WIRE
    }

    /// Wraps a raw id received from the other side of the channel.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Interprets a report scalar as an id.
    ///
    /// Returns `None` for values that cannot name an entity (negative,
    /// fractional, non-finite or beyond [`Self::MAX_WIRE`]).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_scalar(value: f32) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > Self::MAX_WIRE as f32 {
            return None;
        }
        Some(Self(value as u32))
    }

    /// Encodes the id as a report scalar.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_scalar(self) -> f32 {
        self.0 as f32
    }
}

/// Returns the counter's value and bumps it, saturating at `MAX_WIRE + 1`.
fn advance(counter: &AtomicU32) -> u32 {
    let bumped = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
        (raw <= EntityId::MAX_WIRE).then_some(raw + 1)
    });
    match bumped {
        Ok(raw) | Err(raw) => raw,
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
