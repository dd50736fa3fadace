//! NXCP (`NetXMS` Client Protocol) - binary message codec for management agents and servers
//!
//! This library implements the NXCP wire format: a fixed 16-byte header followed
//! by either a dictionary of typed fields, a single raw payload, or a single
//! control word. Messages are plain values; encoding and decoding are pure
//! functions over byte slices.
//!
//! # Quick Start
//!
//! ```rust
//! use nxcp::{Message, MessageBuilder};
//!
//! // Build a request with a few typed fields
//! let msg = MessageBuilder::new(0x0064)
//!     .id(7)
//!     .field(5, 42u32)
//!     .field(6, "agent-01")
//!     .build()?;
//!
//! // Encode to bytes
//! let bytes = msg.encode();
//!
//! // Decode from bytes
//! let decoded = Message::decode(&bytes)?;
//! assert_eq!(decoded.get_u32(5), 42);
//! assert_eq!(decoded.get_str(6), "agent-01");
//! # Ok::<(), nxcp::Error>(())
//! ```
//!
//! # Features
//!
//! - **Three body shapes** - field dictionary, raw binary payload, control word
//! - **Typed accessors** - integers, reals, strings, addresses, UUIDs, timestamps
//! - **Panic-free decoding** - every malformed input maps to an [`Error`]
//! - **XML form** - [`Message::to_xml`] / [`Message::from_xml`] with base64 binary values
//! - **Stream framing** - [`MessageReader`] pulls whole messages from any `std::io::Read`
//! - **Wire traces** - pcap capture behind the `debug-tools` feature

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    Body, BodyShape, Codec, CodecConfig, Error, Field, FieldError, FieldMap, FieldType,
    FieldValue, Flags, HEADER_SIZE, MAX_CONTENT_LEN, Message, MessageBuilder, MessageHeader,
    MetricsSnapshot, PROTOCOL_VERSION, Result, StringEncoding, decode, encode, metrics_snapshot,
};
pub use transport::{MessageReader, write_message};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
