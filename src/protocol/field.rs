//! NXCP field codec
//!
//! A field is one typed, identifier-keyed value inside a normal message body.
//!
//! # Wire Format
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Field ID (4)                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |    Padding    |      Int16 value (2)          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Int32 / Int64 / Float64 value, or content length (4) + bytes |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              zero padding to an 8-byte boundary               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All integers are big-endian. Padding is only emitted from protocol
//! version 2 onwards.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes};
use uuid::Uuid;

use super::{CodecConfig, FieldError, FieldType, StringEncoding, align_padding, wire_len};

/// Length of the common field header (id, type, padding, int16 slot)
pub const FIELD_HEADER_SIZE: usize = 8;

/// Typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 16-bit integer
    Int16(u16),
    /// 32-bit integer
    Int32(u32),
    /// 64-bit integer
    Int64(u64),
    /// Double precision float
    Float64(f64),
    /// Text, at most [`MAX_CONTENT_LEN`](super::MAX_CONTENT_LEN) bytes once encoded
    String(String),
    /// Opaque bytes, at most [`MAX_CONTENT_LEN`](super::MAX_CONTENT_LEN) long
    Binary(Bytes),
}

impl FieldValue {
    /// Wire type of this value
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::Float64(_) => FieldType::Float64,
            Self::String(_) => FieldType::String,
            Self::Binary(_) => FieldType::Binary,
        }
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::Int16(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int32(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(value))
    }
}

/// One field of a normal message
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    id: u32,
    value: FieldValue,
}

impl Field {
    /// Create a field
    pub fn new(id: u32, value: impl Into<FieldValue>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    /// Boolean stored as a 16-bit 0/1
    #[must_use]
    pub fn from_bool(id: u32, value: bool) -> Self {
        Self::new(id, u16::from(value))
    }

    /// Address stored as 4 (IPv4) or 16 (IPv6) raw bytes
    #[must_use]
    pub fn from_ip_addr(id: u32, addr: IpAddr) -> Self {
        let octets = match addr {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Self::new(id, octets)
    }

    /// UUID stored as its 16 raw bytes
    #[must_use]
    pub fn from_uuid(id: u32, uuid: Uuid) -> Self {
        Self::new(id, Bytes::copy_from_slice(uuid.as_bytes()))
    }

    /// Timestamp stored as signed seconds since the Unix epoch
    #[must_use]
    pub fn from_timestamp(id: u32, time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
            Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
        };
        Self::new(id, secs as u64)
    }

    /// Packed big-endian `u32` sequence
    #[must_use]
    pub fn from_u32_array(id: u32, values: &[u32]) -> Self {
        let mut buf = Vec::with_capacity(values.len() * 4);
        for value in values {
            buf.put_u32(*value);
        }
        Self::new(id, buf)
    }

    /// Element count followed by a packed big-endian `u32` sequence
    #[must_use]
    pub fn from_u32_array_ex(id: u32, values: &[u32]) -> Self {
        let mut buf = Vec::with_capacity(4 + values.len() * 4);
        buf.put_u32(wire_len(values.len()));
        for value in values {
            buf.put_u32(*value);
        }
        Self::new(id, buf)
    }

    /// Field identifier
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Field value
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Consume the field, returning its value
    #[must_use]
    pub fn into_value(self) -> FieldValue {
        self.value
    }

    /// Wire type
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    /// Integer view; floats are truncated toward zero
    #[must_use]
    pub fn as_integer(&self) -> Option<u64> {
        match &self.value {
            FieldValue::Int16(v) => Some(u64::from(*v)),
            FieldValue::Int32(v) => Some(u64::from(*v)),
            FieldValue::Int64(v) => Some(*v),
            FieldValue::Float64(v) => Some(*v as i64 as u64),
            FieldValue::String(_) | FieldValue::Binary(_) => None,
        }
    }

    /// Floating point view
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match &self.value {
            FieldValue::Float64(v) => Some(*v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    /// Text view
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes view
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.value {
            FieldValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Non-zero integer
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_integer().map(|v| v != 0)
    }

    /// 4- or 16-byte binary field, or a legacy `Int32` IPv4 address
    #[must_use]
    pub fn as_ip_addr(&self) -> Option<IpAddr> {
        match &self.value {
            FieldValue::Int32(v) => Some(IpAddr::V4(Ipv4Addr::from(*v))),
            FieldValue::Binary(b) => match b.len() {
                4 => <[u8; 4]>::try_from(&b[..])
                    .ok()
                    .map(|octets| IpAddr::V4(Ipv4Addr::from(octets))),
                16 => <[u8; 16]>::try_from(&b[..])
                    .ok()
                    .map(|octets| IpAddr::V6(Ipv6Addr::from(octets))),
                _ => None,
            },
            _ => None,
        }
    }

    /// 16-byte binary field
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        self.as_bytes()
            .and_then(|b| <[u8; 16]>::try_from(&b[..]).ok())
            .map(Uuid::from_bytes)
    }

    /// Integer seconds since the Unix epoch
    #[must_use]
    pub fn as_timestamp(&self) -> Option<SystemTime> {
        let secs = match &self.value {
            FieldValue::Int64(v) => *v as i64,
            FieldValue::Int32(v) => i64::from(*v),
            FieldValue::Int16(v) => i64::from(*v),
            _ => return None,
        };
        if secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(secs.unsigned_abs()))
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
        }
    }

    /// Packed `u32` sequence; trailing bytes short of a full element are ignored
    #[must_use]
    pub fn as_u32_array(&self) -> Option<Vec<u32>> {
        self.as_bytes().map(|b| {
            b.chunks_exact(4)
                .map(|mut chunk| chunk.get_u32())
                .collect()
        })
    }

    /// Count-prefixed `u32` sequence; `None` if the count disagrees with the length
    #[must_use]
    pub fn as_u32_array_ex(&self) -> Option<Vec<u32>> {
        let mut buf: &[u8] = self.as_bytes()?;
        if buf.remaining() < 4 {
            return None;
        }
        let count = buf.get_u32() as usize;
        if count.checked_mul(4) != Some(buf.remaining()) {
            return None;
        }
        Some((0..count).map(|_| buf.get_u32()).collect())
    }

    /// Frame length on the wire, padding included
    #[must_use]
    pub fn encoded_len(&self, config: &CodecConfig) -> usize {
        let natural = self.natural_len(config.string_encoding);
        if config.aligned_fields() {
            natural + align_padding(natural)
        } else {
            natural
        }
    }

    fn natural_len(&self, encoding: StringEncoding) -> usize {
        let content = match &self.value {
            FieldValue::String(s) => text_len(s, encoding),
            FieldValue::Binary(b) => b.len(),
            _ => 0,
        };
        self.field_type().fixed_len() + content
    }

    /// Append the field frame to `out`, returning the number of bytes written
    pub fn encode_into<B: BufMut>(&self, out: &mut B, config: &CodecConfig) -> usize {
        out.put_u32(self.id);
        out.put_u8(self.field_type().as_u8());
        out.put_u8(0);

        match &self.value {
            FieldValue::Int16(v) => out.put_u16(*v),
            FieldValue::Int32(v) => {
                out.put_u16(0);
                out.put_u32(*v);
            }
            FieldValue::Int64(v) => {
                out.put_u16(0);
                out.put_u64(*v);
            }
            FieldValue::Float64(v) => {
                out.put_u16(0);
                out.put_f64(*v);
            }
            FieldValue::String(s) => {
                out.put_u16(0);
                out.put_u32(wire_len(text_len(s, config.string_encoding)));
                match config.string_encoding {
                    StringEncoding::Utf16Be => {
                        for unit in s.encode_utf16() {
                            out.put_u16(unit);
                        }
                    }
                    StringEncoding::Utf8 => out.put_slice(s.as_bytes()),
                }
            }
            FieldValue::Binary(b) => {
                out.put_u16(0);
                out.put_u32(wire_len(b.len()));
                out.put_slice(b);
            }
        }

        let natural = self.natural_len(config.string_encoding);
        if config.aligned_fields() {
            let padding = align_padding(natural);
            out.put_bytes(0, padding);
            natural + padding
        } else {
            natural
        }
    }

    /// Encode the field frame into a fresh buffer
    #[must_use]
    pub fn encode(&self, config: &CodecConfig) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len(config));
        self.encode_into(&mut out, config);
        out
    }

    /// Decode one field frame from the start of `buf`
    ///
    /// Returns the field and the number of bytes consumed, padding included.
    pub fn decode(buf: &[u8], config: &CodecConfig) -> Result<(Self, usize), FieldError> {
        let got = buf.len();
        let need = |needed: usize| {
            if got < needed {
                Err(FieldError::TruncatedField { needed, got })
            } else {
                Ok(())
            }
        };

        need(FIELD_HEADER_SIZE)?;
        let mut cursor = buf;
        let id = cursor.get_u32();
        let type_tag = cursor.get_u8();
        cursor.advance(1);
        let field_type =
            FieldType::from_u8(type_tag).ok_or(FieldError::UnknownFieldType { type_tag })?;
        let int16 = cursor.get_u16();

        let natural = match field_type {
            FieldType::Int16 | FieldType::Int32 | FieldType::Int64 | FieldType::Float64 => {
                field_type.fixed_len()
            }
            FieldType::String | FieldType::Binary => {
                need(12)?;
                let len = cursor.get_u32() as usize;
                len.checked_add(12).ok_or(FieldError::TruncatedField {
                    needed: usize::MAX,
                    got,
                })?
            }
        };
        need(natural)?;

        let value = match field_type {
            FieldType::Int16 => FieldValue::Int16(int16),
            FieldType::Int32 => FieldValue::Int32(cursor.get_u32()),
            FieldType::Int64 => FieldValue::Int64(cursor.get_u64()),
            FieldType::Float64 => FieldValue::Float64(cursor.get_f64()),
            FieldType::String => {
                let content = &cursor[..natural - 12];
                FieldValue::String(decode_text(content, config.string_encoding, id)?)
            }
            FieldType::Binary => FieldValue::Binary(Bytes::copy_from_slice(&cursor[..natural - 12])),
        };

        let consumed = if config.aligned_fields() {
            let padded = natural.checked_add(align_padding(natural)).ok_or(
                FieldError::TruncatedField {
                    needed: usize::MAX,
                    got,
                },
            )?;
            need(padded)?;
            padded
        } else {
            natural
        };

        Ok((Self { id, value }, consumed))
    }
}

fn text_len(s: &str, encoding: StringEncoding) -> usize {
    match encoding {
        StringEncoding::Utf16Be => s.encode_utf16().count() * 2,
        StringEncoding::Utf8 => s.len(),
    }
}

fn decode_text(content: &[u8], encoding: StringEncoding, field_id: u32) -> Result<String, FieldError> {
    match encoding {
        StringEncoding::Utf16Be => {
            if content.len() % 2 != 0 {
                return Err(FieldError::InvalidText { field_id });
            }
            let units = content
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|_| FieldError::InvalidText { field_id })
        }
        StringEncoding::Utf8 => std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|_| FieldError::InvalidText { field_id }),
    }
}
