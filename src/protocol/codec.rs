//! NXCP message codec (encode/decode)
//!
//! This module owns the envelope: the header, the body word and the three
//! body shapes. Field frames are delegated to [`Field`].

use bytes::{Buf, BufMut, Bytes};
use tracing::{debug, instrument, trace};

use super::metrics::{Direction, Metrics};
use super::{
    BODY_OFFSET, Body, BodyShape, CodecConfig, Error, Field, FieldMap, Flags, HEADER_SIZE,
    Message, MessageHeader, Result, align_padding, wire_len,
};

/// Encoder/decoder bound to a [`CodecConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    /// Create a codec with explicit settings
    #[must_use]
    pub const fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Active settings
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Number of bytes [`Codec::encode`] will produce for `message`
    #[must_use]
    pub fn encoded_len(&self, message: &Message) -> usize {
        self.total_size(message) + 4
    }

    /// Value written into the header's `total_size`
    fn total_size(&self, message: &Message) -> usize {
        match message.body() {
            Body::Control(_) => HEADER_SIZE,
            Body::Binary(data) => {
                let natural = HEADER_SIZE + data.len();
                natural + align_padding(natural)
            }
            Body::Fields(fields) => {
                let natural = HEADER_SIZE
                    + fields
                        .iter()
                        .map(|field| field.encoded_len(&self.config))
                        .sum::<usize>();
                if self.config.aligned_fields() {
                    natural
                } else {
                    natural + align_padding(natural)
                }
            }
        }
    }

    /// Encode a message to bytes
    ///
    /// # Format
    ///
    /// ```text
    /// [HEADER (16 bytes)] [BODY WORD (4 bytes)] [BODY (variable)]
    /// ```
    ///
    /// The body word is the field count, the raw payload length, or the
    /// control value.
    #[must_use]
    pub fn encode(&self, message: &Message) -> Vec<u8> {
        let total_size = self.total_size(message);
        let header = MessageHeader::new(
            message.code(),
            message.flags(),
            wire_len(total_size),
            message.id(),
        );

        let mut bytes = Vec::with_capacity(total_size + 4);
        bytes.extend_from_slice(&header.to_bytes());

        match message.body() {
            Body::Control(value) => bytes.put_u32(*value),
            Body::Binary(data) => {
                bytes.put_u32(wire_len(data.len()));
                bytes.put_slice(data);
                bytes.put_bytes(0, total_size - HEADER_SIZE - data.len());
            }
            Body::Fields(fields) => {
                bytes.put_u32(wire_len(fields.len()));
                for field in fields {
                    field.encode_into(&mut bytes, &self.config);
                }
                bytes.resize(total_size + 4, 0);
            }
        }

        trace!(
            code = message.code(),
            id = message.id(),
            len = bytes.len(),
            "encoded message"
        );
        Metrics::record_message(Direction::Encoded, message.shape(), bytes.len());
        bytes
    }

    /// Length of the frame that starts with `prefix`
    ///
    /// Needs the header and the body word; callers reading from a stream use
    /// this to learn how many more bytes make up the message.
    pub fn frame_len(&self, prefix: &[u8]) -> Result<usize> {
        let header = MessageHeader::from_bytes(prefix)?;
        let flags = self.check_flags(header.flags())?;
        let word = body_word(prefix)?;
        Ok(frame_len(&header, flags, word))
    }

    fn check_flags(&self, flags: Flags) -> Result<Flags> {
        if self.config.strict_flags && flags.is_conflicting() {
            return Err(Error::InvalidFlagCombination {
                flags: flags.as_u16(),
            });
        }
        Ok(flags)
    }

    /// Decode a message from bytes
    ///
    /// Bytes past the end of the frame are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header
    /// - Buffer is shorter than the frame declared by the header
    /// - A field frame is truncated, has an unknown type, or carries invalid text
    /// - `CONTROL` and `BINARY` are both set in strict mode
    #[instrument(level = "trace", skip_all, fields(len = bytes.len()))]
    pub fn decode(&self, bytes: &[u8]) -> Result<Message> {
        match self.decode_frame(bytes) {
            Ok((message, frame_len)) => {
                Metrics::record_message(Direction::Decoded, message.shape(), frame_len);
                Ok(message)
            }
            Err(error) => {
                debug!(%error, "failed to decode message");
                Metrics::record_decode_error();
                Err(error)
            }
        }
    }

    fn decode_frame(&self, bytes: &[u8]) -> Result<(Message, usize)> {
        let header = MessageHeader::from_bytes(bytes)?;
        let flags = self.check_flags(header.flags())?;
        let word = body_word(bytes)?;

        let frame_len = frame_len(&header, flags, word);
        if bytes.len() < frame_len {
            return Err(Error::TruncatedBody {
                needed: frame_len,
                got: bytes.len(),
            });
        }

        let body = match flags.shape() {
            BodyShape::Control => Body::Control(word),
            BodyShape::Binary => {
                let end = BODY_OFFSET.saturating_add(word as usize);
                Body::Binary(Bytes::copy_from_slice(&bytes[BODY_OFFSET..end]))
            }
            BodyShape::Fields => {
                Body::Fields(self.decode_fields(&bytes[BODY_OFFSET..frame_len], word)?)
            }
        };

        trace!(
            code = header.code(),
            id = header.id(),
            shape = ?flags.shape(),
            "decoded message"
        );
        let message = Message::from_parts(header.code(), header.id(), flags, body);
        Ok((message, frame_len))
    }

    fn decode_fields(&self, mut region: &[u8], count: u32) -> Result<FieldMap> {
        // every frame is at least 8 bytes, so a bogus count cannot over-allocate
        let capacity = (count as usize).min(region.len() / 8);
        let mut fields = FieldMap::with_capacity(capacity);

        for index in 0..count as usize {
            let (field, consumed) = Field::decode(region, &self.config)
                .map_err(|source| Error::Field { index, source })?;
            region.advance(consumed);
            if let Some(previous) = fields.insert(field) {
                trace!(field_id = previous.id(), "duplicate field id overwritten");
            }
        }

        Ok(fields)
    }
}

fn body_word(bytes: &[u8]) -> Result<u32> {
    match bytes.get(HEADER_SIZE..BODY_OFFSET) {
        Some(mut word) => Ok(word.get_u32()),
        None => Err(Error::TruncatedBody {
            needed: BODY_OFFSET,
            got: bytes.len(),
        }),
    }
}

/// Full frame length implied by the header and body word
///
/// `total_size` never counts the body word. Control frames are always the
/// header plus the control value; binary frames must hold at least the
/// declared payload even if `total_size` understates it.
fn frame_len(header: &MessageHeader, flags: Flags, word: u32) -> usize {
    let declared = (header.total_size() as usize).saturating_add(4);
    match flags.shape() {
        BodyShape::Control => BODY_OFFSET,
        BodyShape::Binary => declared.max(BODY_OFFSET.saturating_add(word as usize)),
        BodyShape::Fields => declared.max(BODY_OFFSET),
    }
}

/// Encode a message with the default configuration
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    Codec::default().encode(message)
}

/// Decode a message with the default configuration
pub fn decode(bytes: &[u8]) -> Result<Message> {
    Codec::default().decode(bytes)
}
