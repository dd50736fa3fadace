//! NXCP stream transport helpers
//!
//! Framing over any `std::io` byte stream. Connection management, TLS and
//! request/reply sequencing belong to the session layer above.

mod reader;
#[cfg(feature = "debug-tools")]
mod trace;

pub use reader::{MessageReader, write_message};
#[cfg(feature = "debug-tools")]
pub use trace::{TraceRecorder, read_trace};
