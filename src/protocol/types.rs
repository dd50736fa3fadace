//! NXCP field data types, message flags and body shapes

use std::fmt;

/// Field data types as tagged on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FieldType {
    /// 32-bit integer
    Int32 = 0,
    /// Length-prefixed text
    String = 1,
    /// 64-bit integer
    Int64 = 2,
    /// 16-bit integer carried inside the frame header
    Int16 = 3,
    /// Length-prefixed opaque bytes
    Binary = 4,
    /// IEEE-754 double
    Float64 = 5,
}

impl FieldType {
    /// Convert from tag byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Int32),
            1 => Some(Self::String),
            2 => Some(Self::Int64),
            3 => Some(Self::Int16),
            4 => Some(Self::Binary),
            5 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Look up a type by its display name (`int32`, `string`, `float`, ...), ignoring case
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::Int32,
            Self::String,
            Self::Int64,
            Self::Int16,
            Self::Binary,
            Self::Float64,
        ]
        .into_iter()
        .find(|field_type| field_type.name().eq_ignore_ascii_case(name))
    }

    /// Short type name used in text forms
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Int16 => "int16",
            Self::Binary => "binary",
            Self::Float64 => "float",
        }
    }

    /// Convert to tag byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Frame length before alignment, excluding variable content
    #[must_use]
    pub const fn fixed_len(self) -> usize {
        match self {
            Self::Int16 => 8,
            Self::Int32 | Self::String | Self::Binary => 12,
            Self::Int64 | Self::Float64 => 16,
        }
    }

    /// Check if the frame carries a length-prefixed payload
    #[must_use]
    pub const fn is_variable(self) -> bool {
        matches!(self, Self::String | Self::Binary)
    }

    /// Check if the value is an integer
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body layout selected by the shape flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyShape {
    /// Field count followed by field frames
    Fields,
    /// Length-prefixed raw payload
    Binary,
    /// Single 32-bit control value
    Control,
}

/// Message flags
///
/// Bits outside [`Flags::KNOWN_MASK`] are carried through untouched so that
/// newer peers can round-trip through this codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags(u16);

impl Flags {
    /// Body is a raw byte payload
    pub const BINARY: u16 = 0x0001;
    /// Terminal chunk of a file transfer
    pub const END_OF_FILE: u16 = 0x0002;
    /// Terminal message of a sequence
    pub const END_OF_SEQUENCE: u16 = 0x0008;
    /// Consumer should iterate fields in reverse
    pub const REVERSE_ORDER: u16 = 0x0010;
    /// Body is a single control value
    pub const CONTROL: u16 = 0x0020;

    /// Bits that select the body shape
    pub const SHAPE_MASK: u16 = Self::BINARY | Self::CONTROL;
    /// Advisory bits preserved but never interpreted
    pub const ADVISORY_MASK: u16 = Self::END_OF_FILE | Self::END_OF_SEQUENCE | Self::REVERSE_ORDER;
    /// All bits this codec knows about
    pub const KNOWN_MASK: u16 = Self::SHAPE_MASK | Self::ADVISORY_MASK;

    /// Create empty flags
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create from the raw flag word
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// Convert to the raw flag word
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Set a flag
    #[must_use]
    pub const fn with(mut self, flag: u16) -> Self {
        self.0 |= flag;
        self
    }

    /// Clear a flag
    #[must_use]
    pub const fn without(mut self, flag: u16) -> Self {
        self.0 &= !flag;
        self
    }

    /// Set or clear a flag
    #[must_use]
    pub const fn toggled(self, flag: u16, on: bool) -> Self {
        if on { self.with(flag) } else { self.without(flag) }
    }

    /// Check if flag is set
    #[must_use]
    pub const fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Check if both shape bits are set
    #[must_use]
    pub const fn is_conflicting(self) -> bool {
        (self.0 & Self::SHAPE_MASK) == Self::SHAPE_MASK
    }

    /// Body shape, `CONTROL` taking priority over `BINARY`
    #[must_use]
    pub const fn shape(self) -> BodyShape {
        if self.has(Self::CONTROL) {
            BodyShape::Control
        } else if self.has(Self::BINARY) {
            BodyShape::Binary
        } else {
            BodyShape::Fields
        }
    }

    /// Check if end of file
    #[must_use]
    pub const fn is_end_of_file(self) -> bool {
        self.has(Self::END_OF_FILE)
    }

    /// Check if end of sequence
    #[must_use]
    pub const fn is_end_of_sequence(self) -> bool {
        self.has(Self::END_OF_SEQUENCE)
    }

    /// Check if reverse order
    #[must_use]
    pub const fn is_reverse_order(self) -> bool {
        self.has(Self::REVERSE_ORDER)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::BINARY, "BINARY"),
            (Self::END_OF_FILE, "END_OF_FILE"),
            (Self::END_OF_SEQUENCE, "END_OF_SEQUENCE"),
            (Self::REVERSE_ORDER, "REVERSE_ORDER"),
            (Self::CONTROL, "CONTROL"),
        ];
        let mut parts: Vec<String> = names
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, name)| (*name).to_string())
            .collect();
        let unknown = self.0 & !Self::KNOWN_MASK;
        if unknown != 0 {
            parts.push(format!("{unknown:#06x}"));
        }
        if parts.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}
