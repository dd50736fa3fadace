//! Wire trace capture and replay in pcap format.
//!
//! Each record holds exactly one encoded NXCP frame.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::{Codec, Message};

/// Thread-safe pcap writer for NXCP frames.
#[derive(Clone)]
pub struct TraceRecorder {
    inner: Arc<Mutex<PcapWriter>>,
}

impl TraceRecorder {
    /// Create a recorder that writes to the provided path, truncating any existing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        let writer = PcapWriter::new(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(writer)),
        })
    }

    /// Record an already encoded frame with the current system timestamp.
    pub fn record(&self, frame: &[u8]) -> io::Result<()> {
        let timestamp = SystemTime::now();
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("trace recorder poisoned"))?;
        guard.write_frame(timestamp, frame)
    }

    /// Encode and record a message.
    pub fn record_message(&self, codec: &Codec, message: &Message) -> io::Result<()> {
        self.record(&codec.encode(message))
    }
}

impl std::fmt::Debug for TraceRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceRecorder").finish_non_exhaustive()
    }
}

struct PcapWriter {
    file: File,
}

impl PcapWriter {
    fn new(path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        write_global_header(&mut file)?;
        Ok(Self { file })
    }

    fn write_frame(&mut self, timestamp: SystemTime, data: &[u8]) -> io::Result<()> {
        let (sec, usec) = micros(timestamp);
        let length = u32::try_from(data.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds 4 GiB"))?;
        let mut header = [0u8; 16];
        header[0..4].copy_from_slice(&sec.to_le_bytes());
        header[4..8].copy_from_slice(&usec.to_le_bytes());
        header[8..12].copy_from_slice(&length.to_le_bytes());
        header[12..16].copy_from_slice(&length.to_le_bytes());

        self.file.write_all(&header)?;
        self.file.write_all(data)?;
        self.file.flush()
    }
}

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_THISZONE: i32 = 0;
const PCAP_SIGFIGS: u32 = 0;
const PCAP_SNAPLEN: u32 = u32::MAX;
const PCAP_NETWORK: u32 = 147; // LINKTYPE_USER0

fn write_global_header(file: &mut File) -> io::Result<()> {
    let mut header = [0u8; 24];
    header[0..4].copy_from_slice(&PCAP_MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&PCAP_VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&PCAP_VERSION_MINOR.to_le_bytes());
    header[8..12].copy_from_slice(&PCAP_THISZONE.to_le_bytes());
    header[12..16].copy_from_slice(&PCAP_SIGFIGS.to_le_bytes());
    header[16..20].copy_from_slice(&PCAP_SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&PCAP_NETWORK.to_le_bytes());
    file.write_all(&header)
}

fn micros(timestamp: SystemTime) -> (u32, u32) {
    let duration = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs().min(u64::from(u32::MAX)) as u32;
    let micros = duration.subsec_micros();
    (secs, micros)
}

/// Read every frame from a capture written by [`TraceRecorder`].
///
/// Both byte orders of the pcap container are accepted so that captures
/// taken on other hosts replay as well.
pub fn read_trace(path: &Path) -> io::Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut global = [0u8; 24];
    reader.read_exact(&mut global)?;
    let read_u32: fn([u8; 4]) -> u32 = match global[0..4] {
        [0xd4, 0xc3, 0xb2, 0xa1] => u32::from_le_bytes,
        [0xa1, 0xb2, 0xc3, 0xd4] => u32::from_be_bytes,
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not a pcap capture",
            ));
        }
    };

    let mut frames = Vec::new();
    let mut record = [0u8; 16];
    while read_record_header(&mut reader, &mut record)? {
        let captured = read_u32([record[8], record[9], record[10], record[11]]) as usize;
        let mut frame = Vec::new();
        (&mut reader).take(captured as u64).read_to_end(&mut frame)?;
        if frame.len() != captured {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "capture ends inside a record",
            ));
        }
        frames.push(frame);
    }
    Ok(frames)
}

/// Fill `record`; `false` on a clean end of capture before its first byte.
fn read_record_header<R: Read>(reader: &mut R, record: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < record.len() {
        match reader.read(&mut record[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "capture ends inside a record header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
