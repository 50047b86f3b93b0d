//! Report encoding, used by worker implementations and tests.

use physbridge_shared::{ReportItem, TransferBuffer};

/// Writes `items` as one report into `buffer`, replacing its contents.
///
/// The buffer's allocation is reused, so a worker can keep encoding into
/// the buffers the controller hands back.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn encode<T: ReportItem>(items: &[T], mut buffer: TransferBuffer) -> TransferBuffer {
    buffer.clear();
    buffer.push_scalar(T::KIND.to_scalar());
    if T::KIND.has_count() {
        buffer.push_scalar(items.len() as f32);
    }
    for item in items {
        buffer.push_pod(item);
    }
    buffer
}
