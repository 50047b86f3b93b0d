//! Zero-allocation report decoding.

use super::ReportError;
use physbridge_shared::protocol::SCALAR_SIZE;
use physbridge_shared::{
    CollisionItem, ConstraintItem, ReportItem, ReportKind, VehicleItem, WorldItem,
};
use std::marker::PhantomData;

/// Typed view over the items of one report.
///
/// Borrows the received bytes; items are copied out one at a time.
#[derive(Debug)]
pub struct ItemReader<'a, T> {
    bytes: &'a [u8],
    _item: PhantomData<T>,
}

impl<T> Clone for ItemReader<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ItemReader<'_, T> {}

impl<'a, T: ReportItem> ItemReader<'a, T> {
    /// Size of one item in bytes.
    pub const ITEM_BYTES: usize = std::mem::size_of::<T>();

    /// Wraps a byte run holding whole items only.
    fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % Self::ITEM_BYTES, 0);
        Self { bytes, _item: PhantomData }
    }

    /// Number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / Self::ITEM_BYTES
    }

    /// Returns true if the report carries no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(Self::ITEM_BYTES)?;
        let end = start.checked_add(Self::ITEM_BYTES)?;
        let chunk = self.bytes.get(start..end)?;
        Some(bytemuck::pod_read_unaligned(chunk))
    }

    /// Iterates over the items in report order.
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        self.bytes.chunks_exact(Self::ITEM_BYTES).map(bytemuck::pod_read_unaligned)
    }
}

/// A decoded report, dispatched on its tag.
#[derive(Clone, Copy, Debug)]
pub enum Report<'a> {
    /// Body transforms and velocities.
    World(ItemReader<'a, WorldItem>),
    /// Contact pairs.
    Collision(ItemReader<'a, CollisionItem>),
    /// Wheel transforms.
    Vehicle(ItemReader<'a, VehicleItem>),
    /// Constraint anchors and impulses.
    Constraint(ItemReader<'a, ConstraintItem>),
}

impl Report<'_> {
    /// Report type.
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::World(_) => ReportKind::World,
            Self::Collision(_) => ReportKind::Collision,
            Self::Vehicle(_) => ReportKind::Vehicle,
            Self::Constraint(_) => ReportKind::Constraint,
        }
    }

    /// Number of items carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::World(items) => items.len(),
            Self::Collision(items) => items.len(),
            Self::Vehicle(items) => items.len(),
            Self::Constraint(items) => items.len(),
        }
    }

    /// Returns true if the report carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads one scalar at `index`.
#[inline]
fn scalar_at(bytes: &[u8], index: usize) -> Option<f32> {
    let start = index.checked_mul(SCALAR_SIZE)?;
    let end = start.checked_add(SCALAR_SIZE)?;
    bytes.get(start..end).map(bytemuck::pod_read_unaligned)
}

/// Interprets a count scalar. Anything that is not a finite non-negative
/// number counts as zero.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_scalar(value: f32) -> usize {
    if value.is_finite() && value > 0.0 {
        value as usize
    } else {
        0
    }
}

/// Slices out the item run for `T` after the header.
fn items<'a, T: ReportItem>(bytes: &'a [u8], declared: Option<usize>) -> ItemReader<'a, T> {
    let body = &bytes[T::KIND.header_len() * SCALAR_SIZE..];
    let available = body.len() / ItemReader::<T>::ITEM_BYTES;
    let count = declared.map_or(available, |n| n.min(available));
    ItemReader::new(&body[..count * ItemReader::<T>::ITEM_BYTES])
}

/// Decodes a report buffer.
///
/// # Errors
///
/// Returns [`ReportError`] if the buffer is empty, carries an unknown tag,
/// or ends inside its header.
pub fn decode(bytes: &[u8]) -> Result<Report<'_>, ReportError> {
    let tag = scalar_at(bytes, 0).ok_or(ReportError::Empty)?;
    let kind = ReportKind::from_scalar(tag).ok_or(ReportError::UnknownTag(tag))?;

    let scalars = bytes.len() / SCALAR_SIZE;
    let needed = kind.header_len();
    if scalars < needed {
        return Err(ReportError::TruncatedHeader { kind, scalars, needed });
    }

    let declared = if kind.has_count() {
        scalar_at(bytes, 1).map(count_from_scalar)
    } else {
        None
    };

    Ok(match kind {
        ReportKind::World => Report::World(items(bytes, declared)),
        ReportKind::Collision => Report::Collision(items(bytes, declared)),
        ReportKind::Vehicle => Report::Vehicle(items(bytes, declared)),
        ReportKind::Constraint => Report::Constraint(items(bytes, declared)),
    })
}
