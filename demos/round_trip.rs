//! Simple request/response exchange using NXCP framing over an in-memory stream

use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};

use nxcp::{Codec, Message, MessageBuilder, MessageReader, write_message};

const CMD_GET_PARAMETER: u16 = 0x0025;
const CMD_REQUEST_COMPLETED: u16 = 0x001C;
const CMD_FILE_DATA: u16 = 0x0037;

const VID_PARAMETER: u32 = 20;
const VID_RCC: u32 = 28;
const VID_VALUE: u32 = 21;
const VID_IP_ADDRESS: u32 = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("NXCP Round-Trip Example");
    println!("=======================\n");

    let codec = Codec::default();
    let mut wire = Vec::new();

    // Request
    let request = MessageBuilder::new(CMD_GET_PARAMETER)
        .id(1)
        .field(VID_PARAMETER, "System.Uptime")
        .build()?;
    let written = write_message(&mut wire, &codec, &request)?;
    println!("Request: code={:#06x} id={} ({written} bytes)", request.code(), request.id());

    // Response with fields
    let mut response = Message::with_id(CMD_REQUEST_COMPLETED, 1);
    response.set_u32(VID_RCC, 0);
    response.set_string(VID_VALUE, "86400");
    response.set_ip_addr(VID_IP_ADDRESS, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    write_message(&mut wire, &codec, &response)?;

    // Raw file chunk
    let mut chunk = Message::with_id(CMD_FILE_DATA, 2);
    chunk.set_binary_data(b"log line\n".to_vec());
    chunk.set_end_of_file(true);
    write_message(&mut wire, &codec, &chunk)?;

    println!("Stream holds {} bytes\n", wire.len());

    for message in MessageReader::new(Cursor::new(wire)) {
        let message = message?;
        println!(
            "Received: code={:#06x} id={} flags=[{}] shape={:?}",
            message.code(),
            message.id(),
            message.flags(),
            message.shape()
        );
        for field in message.fields() {
            println!("  field {} ({}): {:?}", field.id(), field.field_type(), field.value());
        }
        if let Some(data) = message.binary_data() {
            println!("  payload: {:?}", String::from_utf8_lossy(data));
        }
    }

    let metrics = nxcp::metrics_snapshot();
    println!(
        "\nEncoded {} messages, decoded {} messages",
        metrics.encoded.total(),
        metrics.decoded.total()
    );

    Ok(())
}
