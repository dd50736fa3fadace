//! Blocking stream helpers: one complete frame in, one message out.

use std::io::{self, Read, Write};

use tracing::{debug, trace};

use crate::protocol::{BODY_OFFSET, Codec, Error, Message, Result};

/// Reads whole NXCP messages from a byte stream.
///
/// A message is only decoded once every byte of its frame has arrived;
/// partial frames are never exposed. Oversized frames and frames that fail
/// to decode are consumed whole, so the next call starts on a frame
/// boundary. After an I/O error or an unparseable header the stream position
/// is unknown and the reader is fused: every later call returns `Ok(None)`.
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
    codec: Codec,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: Read> MessageReader<R> {
    /// Wrap a reader using the default codec settings.
    pub fn new(inner: R) -> Self {
        Self::with_codec(inner, Codec::default())
    }

    /// Wrap a reader with explicit codec settings.
    pub fn with_codec(inner: R, codec: Codec) -> Self {
        Self {
            inner,
            codec,
            buf: Vec::with_capacity(BODY_OFFSET),
            failed: false,
        }
    }

    /// Read the next message.
    ///
    /// Returns `Ok(None)` on a clean end of stream between messages, and
    /// after an earlier unrecoverable error.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        if self.failed {
            return Ok(None);
        }
        let result = self.read_frame();
        if let Err(error) = &result {
            if error_desyncs(error) {
                debug!(%error, "stream position lost, reader fused");
                self.failed = true;
            }
        }
        result
    }

    /// Whether an earlier error stopped the reader.
    #[must_use]
    pub fn is_fused(&self) -> bool {
        self.failed
    }

    fn read_frame(&mut self) -> Result<Option<Message>> {
        self.buf.clear();
        self.buf.resize(BODY_OFFSET, 0);
        if !read_prefix(&mut self.inner, &mut self.buf)? {
            return Ok(None);
        }

        let frame_len = self.codec.frame_len(&self.buf)?;
        let max = self.codec.config().max_message_size;
        if frame_len > max {
            debug!(frame_len, max, "skipping oversized frame");
            let rest = (frame_len - BODY_OFFSET) as u64;
            let skipped = io::copy(&mut (&mut self.inner).take(rest), &mut io::sink())?;
            if skipped < rest {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside an oversized frame",
                )));
            }
            return Err(Error::MessageTooLarge {
                size: frame_len,
                max,
            });
        }

        self.buf.resize(frame_len, 0);
        self.inner.read_exact(&mut self.buf[BODY_OFFSET..])?;
        trace!(frame_len, "read frame");

        self.codec.decode(&self.buf).map(Some)
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for MessageReader<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_message().transpose()
    }
}

/// Errors after which the next byte is not known to start a frame.
///
/// Decode failures are raised only once the whole frame has been consumed.
fn error_desyncs(error: &Error) -> bool {
    matches!(error, Error::Io(_) | Error::InvalidFlagCombination { .. })
}

/// Fill `buf` completely; `false` if the stream ended before the first byte.
fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a message header",
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(true)
}

/// Encode `message` and write the whole frame, returning its length.
pub fn write_message<W: Write>(writer: &mut W, codec: &Codec, message: &Message) -> Result<usize> {
    let bytes = codec.encode(message);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CodecConfig;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(out.len()).min(self.data.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn sample_stream() -> (Vec<u8>, Vec<Message>) {
        let codec = Codec::default();
        let mut first = Message::with_id(1, 1);
        first.set_string(1, "first");
        let mut second = Message::with_id(2, 2);
        second.set_binary_data(vec![7u8; 9]);
        let mut third = Message::with_id(3, 3);
        third.set_control_data(4);

        let messages = vec![first, second, third];
        let mut stream = Vec::new();
        for message in &messages {
            write_message(&mut stream, &codec, message).unwrap();
        }
        (stream, messages)
    }

    #[test]
    fn test_reads_consecutive_frames() {
        let (stream, messages) = sample_stream();
        let reader = MessageReader::new(Trickle {
            data: &stream,
            chunk: 3,
        });

        let decoded: Vec<Message> = reader.map(|m| m.unwrap()).collect();
        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_eof_inside_frame() {
        let (stream, _) = sample_stream();
        let mut reader = MessageReader::new(Cursor::new(&stream[..50]));

        assert!(reader.read_message().unwrap().is_some());
        let result = reader.read_message();
        assert!(matches!(result, Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let mut msg = Message::new(1);
        msg.set_binary_data(vec![0u8; 256]);
        let bytes = Codec::default().encode(&msg);

        let codec = Codec::new(CodecConfig {
            max_message_size: 64,
            ..CodecConfig::default()
        });
        let mut reader = MessageReader::with_codec(Cursor::new(bytes), codec);
        assert!(matches!(
            reader.read_message(),
            Err(Error::MessageTooLarge { max: 64, .. })
        ));
    }

    #[test]
    fn test_oversized_frame_is_skipped() {
        let mut big = Message::with_id(1, 1);
        big.set_binary_data(vec![0u8; 256]);
        let mut next = Message::with_id(2, 2);
        next.set_u32(1, 99);

        let codec = Codec::default();
        let mut stream = Vec::new();
        write_message(&mut stream, &codec, &big).unwrap();
        write_message(&mut stream, &codec, &next).unwrap();

        let small = Codec::new(CodecConfig {
            max_message_size: 64,
            ..CodecConfig::default()
        });
        let mut reader = MessageReader::with_codec(Cursor::new(stream), small);
        assert!(matches!(
            reader.read_message(),
            Err(Error::MessageTooLarge { size: 276, max: 64 })
        ));
        assert_eq!(reader.read_message().unwrap(), Some(next));
        assert!(reader.read_message().unwrap().is_none());
        assert!(!reader.is_fused());
    }

    #[test]
    fn test_undecodable_frame_is_skipped() {
        let codec = Codec::default();
        let mut bad = Message::with_id(1, 1);
        bad.set_u32(1, 1);
        let mut stream = codec.encode(&bad);
        // unknown type tag
        stream[24] = 0x7F;
        let mut good = Message::with_id(2, 2);
        good.set_string(3, "ok");
        write_message(&mut stream, &codec, &good).unwrap();

        let mut reader = MessageReader::new(Cursor::new(stream));
        assert!(matches!(reader.read_message(), Err(Error::Field { index: 0, .. })));
        assert_eq!(reader.read_message().unwrap(), Some(good));
    }

    #[test]
    fn test_fused_after_io_error() {
        struct Reset;

        impl Read for Reset {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut reader = MessageReader::new(Reset);
        assert!(matches!(reader.read_message(), Err(Error::Io(_))));
        assert!(reader.is_fused());
        assert!(reader.read_message().unwrap().is_none());

        let results: Vec<_> = MessageReader::new(Reset).collect();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_fused_after_truncated_frame() {
        let (stream, _) = sample_stream();
        let mut reader = MessageReader::new(Cursor::new(&stream[..50]));

        assert!(reader.read_message().unwrap().is_some());
        assert!(reader.read_message().is_err());
        assert!(reader.read_message().unwrap().is_none());
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = MessageReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_message().unwrap().is_none());
    }
}
