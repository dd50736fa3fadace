use std::sync::atomic::{AtomicU64, Ordering};

use super::BodyShape;

/// Track NXCP codec metrics without external dependencies.
pub(crate) struct Metrics;

static ENCODED_BYTES: AtomicU64 = AtomicU64::new(0);
static DECODED_BYTES: AtomicU64 = AtomicU64::new(0);
static DECODE_ERRORS: AtomicU64 = AtomicU64::new(0);

static ENCODED: ShapeCounters = ShapeCounters::new();
static DECODED: ShapeCounters = ShapeCounters::new();

struct ShapeCounters {
    fields: AtomicU64,
    binary: AtomicU64,
    control: AtomicU64,
}

impl ShapeCounters {
    const fn new() -> Self {
        Self {
            fields: AtomicU64::new(0),
            binary: AtomicU64::new(0),
            control: AtomicU64::new(0),
        }
    }

    fn increment(&self, shape: BodyShape) {
        match shape {
            BodyShape::Fields => self.fields.fetch_add(1, Ordering::Relaxed),
            BodyShape::Binary => self.binary.fetch_add(1, Ordering::Relaxed),
            BodyShape::Control => self.control.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn load(&self) -> ShapeTotals {
        ShapeTotals {
            fields: self.fields.load(Ordering::Relaxed),
            binary: self.binary.load(Ordering::Relaxed),
            control: self.control.load(Ordering::Relaxed),
        }
    }
}

/// Direction of a codec operation.
#[derive(Clone, Copy)]
pub(crate) enum Direction {
    Encoded,
    Decoded,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_message(direction: Direction, shape: BodyShape, len: usize) {
        let len = len as u64;
        match direction {
            Direction::Encoded => {
                ENCODED.increment(shape);
                ENCODED_BYTES.fetch_add(len, Ordering::Relaxed);
            }
            Direction::Decoded => {
                DECODED.increment(shape);
                DECODED_BYTES.fetch_add(len, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub(crate) fn record_decode_error() {
        DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Per-shape message counts.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeTotals {
    /// Field dictionary messages
    pub fields: u64,
    /// Raw payload messages
    pub binary: u64,
    /// Control messages
    pub control: u64,
}

impl ShapeTotals {
    /// Sum over all shapes.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.fields + self.binary + self.control
    }
}

/// Lightweight snapshot of codec counters.
#[derive(Default, Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    /// Messages encoded, by shape
    pub encoded: ShapeTotals,
    /// Messages decoded, by shape
    pub decoded: ShapeTotals,
    /// Total bytes produced by the encoder
    pub encoded_bytes: u64,
    /// Total bytes consumed by successful decodes
    pub decoded_bytes: u64,
    /// Rejected inputs
    pub decode_errors: u64,
}

impl MetricsSnapshot {
    /// Average encoded frame size in bytes.
    #[must_use]
    pub fn avg_encoded_len(&self) -> Option<u64> {
        average(self.encoded_bytes, self.encoded.total())
    }

    /// Average decoded frame size in bytes.
    #[must_use]
    pub fn avg_decoded_len(&self) -> Option<u64> {
        average(self.decoded_bytes, self.decoded.total())
    }
}

fn average(total: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }
    Some(total / count)
}

/// Read the process-wide codec counters.
#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        encoded: ENCODED.load(),
        decoded: DECODED.load(),
        encoded_bytes: ENCODED_BYTES.load(Ordering::Relaxed),
        decoded_bytes: DECODED_BYTES.load(Ordering::Relaxed),
        decode_errors: DECODE_ERRORS.load(Ordering::Relaxed),
    }
}
