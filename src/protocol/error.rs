//! NXCP error types

use thiserror::Error;

/// Errors raised while decoding a single field frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Field frame extends past the end of the buffer
    #[error("truncated field: need {needed} bytes, got {got}")]
    TruncatedField {
        /// Bytes required by the frame
        needed: usize,
        /// Bytes remaining in the buffer
        got: usize,
    },

    /// Type tag is not one of the six known data types
    #[error("unknown field type: {type_tag:#x}")]
    UnknownFieldType {
        /// Tag byte found on the wire
        type_tag: u8,
    },

    /// String content is not valid text in the configured encoding
    #[error("invalid text in field {field_id}")]
    InvalidText {
        /// Field identifier
        field_id: u32,
    },
}

/// NXCP codec errors
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bytes than a message header
    #[error("truncated header: need 16 bytes, got {got}")]
    TruncatedHeader {
        /// Bytes available
        got: usize,
    },

    /// Declared body length exceeds the available bytes
    #[error("truncated body: need {needed} bytes, got {got}")]
    TruncatedBody {
        /// Frame length declared by the header
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// A field frame inside a normal body failed to decode
    #[error("field #{index}: {source}")]
    Field {
        /// Position of the offending field in the body
        index: usize,
        /// Underlying field codec failure
        #[source]
        source: FieldError,
    },

    /// Mutually exclusive shape flags are both set
    #[error("invalid flag combination: {flags:#06x}")]
    InvalidFlagCombination {
        /// Raw flag word
        flags: u16,
    },

    /// A field id was inserted twice in strict construction mode
    #[error("duplicate field id {field_id}")]
    FieldIdCollision {
        /// Duplicated field identifier
        field_id: u32,
    },

    /// Frame larger than the configured ceiling
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Declared frame length
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// XML document is not well formed
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML document is well formed but does not describe a message
    #[error("invalid XML message: {reason}")]
    InvalidXml {
        /// What was wrong
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the error is caused by missing bytes rather than malformed ones.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. }
                | Self::TruncatedBody { .. }
                | Self::Field {
                    source: FieldError::TruncatedField { .. },
                    ..
                }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
