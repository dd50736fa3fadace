//! NXCP message header
//!
//! The header is 16 bytes and always present regardless of body shape.

use bytes::{Buf, BufMut};

use super::{Error, Flags, HEADER_SIZE, Result};

/// NXCP message header (16 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Code (2)             |           Flags (2)           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Total Size (4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        Message ID (4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Reserved (4)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `total_size` excludes the 4-byte body word that follows the header
/// (field count, raw payload length or control value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    code: u16,
    flags: u16,
    total_size: u32,
    id: u32,
}

impl MessageHeader {
    /// Create a new message header
    #[must_use]
    pub const fn new(code: u16, flags: Flags, total_size: u32, id: u32) -> Self {
        Self {
            code,
            flags: flags.as_u16(),
            total_size,
            id,
        }
    }

    /// Get message code
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Get flags
    #[must_use]
    pub const fn flags(&self) -> Flags {
        Flags::from_u16(self.flags)
    }

    /// Get declared total size
    #[must_use]
    pub const fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Get message ID
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Convert to bytes (big-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        let mut out = &mut bytes[..];

        out.put_u16(self.code);
        out.put_u16(self.flags);
        out.put_u32(self.total_size);
        out.put_u32(self.id);
        out.put_u32(0);

        bytes
    }

    /// Parse from bytes (big-endian)
    ///
    /// Reserved bytes are ignored.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader { got: bytes.len() });
        }

        Ok(Self {
            code: bytes.get_u16(),
            flags: bytes.get_u16(),
            total_size: bytes.get_u32(),
            id: bytes.get_u32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = MessageHeader::new(0x0102, Flags::new().with(Flags::CONTROL), 16, 7);
        let bytes = header.to_bytes();

        assert_eq!(
            bytes,
            [0x01, 0x02, 0x00, 0x20, 0, 0, 0, 16, 0, 0, 0, 7, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_header_roundtrip() {
        let header = MessageHeader::new(100, Flags::from_u16(0x0018), 36, 0xDEAD_BEEF);
        let decoded = MessageHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(decoded, header);
        assert!(decoded.flags().is_reverse_order());
    }

    #[test]
    fn test_reserved_ignored() {
        let mut bytes = MessageHeader::new(1, Flags::new(), 16, 2).to_bytes();
        bytes[12..].copy_from_slice(&[0xFF; 4]);

        let decoded = MessageHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.id(), 2);
    }

    #[test]
    fn test_truncated_header() {
        let result = MessageHeader::from_bytes(&[0u8; 10]);
        assert!(matches!(result, Err(Error::TruncatedHeader { got: 10 })));
    }
}
