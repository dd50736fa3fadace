//! Codec configuration

use super::{DEFAULT_MAX_MESSAGE_SIZE, PROTOCOL_VERSION};

/// Text encoding used for `String` fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StringEncoding {
    /// UCS-2 / UTF-16 code units in network byte order
    #[default]
    Utf16Be,
    /// UTF-8 bytes
    Utf8,
}

/// Codec settings shared by encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Protocol version; below 2 field frames are not 8-byte aligned
    pub protocol_version: u8,
    /// Wire encoding for text fields
    pub string_encoding: StringEncoding,
    /// Reject `CONTROL | BINARY` instead of letting `CONTROL` win
    pub strict_flags: bool,
    /// Largest frame accepted by stream readers
    pub max_message_size: usize,
}

impl CodecConfig {
    /// Whether field frames are padded to 8 bytes
    #[must_use]
    pub const fn aligned_fields(&self) -> bool {
        self.protocol_version >= 2
    }

    /// Same settings with a different string encoding
    #[must_use]
    pub const fn with_string_encoding(mut self, encoding: StringEncoding) -> Self {
        self.string_encoding = encoding;
        self
    }

    /// Same settings with strict flag validation
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict_flags = true;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            string_encoding: StringEncoding::Utf16Be,
            strict_flags: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
