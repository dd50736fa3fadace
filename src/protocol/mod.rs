//! NXCP protocol core implementation
//!
//! This module provides the wire format, field codec, message envelope and
//! XML form for NXCP.

mod codec;
mod config;
mod error;
mod field;
mod header;
mod message;
mod metrics;
mod types;
mod xml;

pub use codec::{Codec, decode, encode};
pub use config::{CodecConfig, StringEncoding};
pub use error::{Error, FieldError, Result};
pub use field::{FIELD_HEADER_SIZE, Field, FieldValue};
pub use header::MessageHeader;
pub use message::{Body, FieldMap, Message, MessageBuilder};
pub use metrics::{MetricsSnapshot, ShapeTotals, metrics_snapshot};
pub use types::{BodyShape, FieldType, Flags};


/// Current NXCP protocol version (8-byte aligned fields)
pub const PROTOCOL_VERSION: u8 = 2;

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of the body word following the header
pub const BODY_WORD_SIZE: usize = 4;

/// Offset of the first body byte after the body word
pub const BODY_OFFSET: usize = HEADER_SIZE + BODY_WORD_SIZE;

/// Default ceiling for frames read from a stream (4 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Largest content length a single length prefix can describe
pub const MAX_CONTENT_LEN: usize = u32::MAX as usize;

/// Length prefix for `len` content bytes
///
/// Lengths above [`MAX_CONTENT_LEN`] cannot be framed. Debug builds panic;
/// release builds saturate, which peers reject as a truncated frame.
pub(crate) fn wire_len(len: usize) -> u32 {
    debug_assert!(len <= MAX_CONTENT_LEN, "length {len} exceeds the 4 GiB wire limit");
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Zero bytes needed to bring `len` up to a multiple of 8
#[must_use]
pub const fn align_padding(len: usize) -> usize {
    (8 - (len % 8)) & 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_padding() {
        assert_eq!(align_padding(16), 0);
        assert_eq!(align_padding(14), 2);
        assert_eq!(align_padding(17), 7);
    }

    #[test]
    fn test_wire_len_at_limit() {
        assert_eq!(wire_len(0), 0);
        assert_eq!(wire_len(MAX_CONTENT_LEN), u32::MAX);
    }

    #[cfg(all(debug_assertions, target_pointer_width = "64"))]
    #[test]
    #[should_panic(expected = "exceeds the 4 GiB wire limit")]
    fn test_wire_len_rejects_oversized_content() {
        let _ = wire_len(MAX_CONTENT_LEN + 1);
    }
}
