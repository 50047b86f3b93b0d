//! # Report Codec
//!
//! Binary reports from the worker, decoded in place.
//!
//! ## Layout
//!
//! ```text
//! ┌─────┬───────┬──────────────┬──────────────┬─────┐
//! │ tag │ count │ item 0       │ item 1       │ ... │   WORLD, COLLISION
//! └─────┴───────┴──────────────┴──────────────┴─────┘
//! ┌─────┬──────────────┬──────────────┬─────┐
//! │ tag │ item 0       │ item 1       │ ... │           VEHICLE, CONSTRAINT
//! └─────┴──────────────┴──────────────┴─────┘
//! ```
//!
//! Every cell is an `f32`. Items are read straight out of the received
//! buffer with `bytemuck`; decoding a report allocates nothing.
//!
//! ## Validation
//!
//! - unknown tag, or fewer scalars than the header: rejected
//! - declared count larger than the items present: clamped
//! - trailing bytes that do not form a whole item: ignored

mod decoder;
mod encoder;

pub use decoder::{decode, ItemReader, Report};
pub use encoder::encode;

use thiserror::Error;

/// Reasons a report buffer is rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ReportError {
    /// Buffer too short to hold the tag.
    #[error("report is empty")]
    Empty,

    /// Tag scalar names no known report.
    #[error("unknown report tag {0}")]
    UnknownTag(f32),

    /// Buffer ends inside the header.
    #[error("{kind:?} report truncated: {scalars} scalars, header needs {needed}")]
    TruncatedHeader {
        /// Report type from the tag.
        kind: physbridge_shared::ReportKind,
        /// Scalars present.
        scalars: usize,
        /// Scalars the header needs.
        needed: usize,
    },
}
