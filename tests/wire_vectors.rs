//! Byte-exact wire vectors for the three body shapes.

use nxcp::{
    Codec, CodecConfig, Error, Field, FieldError, FieldValue, Flags, Message, MessageBuilder,
    MessageHeader, StringEncoding, decode, encode,
};

fn header_total_size(bytes: &[u8]) -> u32 {
    MessageHeader::from_bytes(bytes).unwrap().total_size()
}

#[test]
fn int32_field_message() {
    let msg = MessageBuilder::new(100)
        .id(7)
        .field(5, 42u32)
        .build()
        .unwrap();

    let bytes = encode(&msg);
    #[rustfmt::skip]
    let expected: [u8; 36] = [
        // code, flags, total_size, id, reserved
        0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20,
        0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00,
        // field count
        0x00, 0x00, 0x00, 0x01,
        // field 5, int32, value 42, padding
        0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(bytes, expected);
    assert_eq!(header_total_size(&bytes), 32);

    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.code(), 100);
    assert_eq!(decoded.id(), 7);
    assert_eq!(decoded.field_count(), 1);
    assert_eq!(decoded.get_u32(5), 42);
}

#[test]
fn short_string_field_is_padded() {
    let config = CodecConfig::default().with_string_encoding(StringEncoding::Utf8);
    let field = Field::new(9, "AB");

    let frame = field.encode(&config);
    assert_eq!(frame.len(), 16);
    assert_eq!(&frame[8..12], &[0, 0, 0, 2]);
    assert_eq!(&frame[12..14], b"AB");
    assert_eq!(&frame[14..], &[0, 0]);

    let (decoded, consumed) = Field::decode(&frame, &config).unwrap();
    assert_eq!(consumed, 16);
    assert_eq!(decoded.as_str(), Some("AB"));
}

#[test]
fn control_message() {
    let mut msg = Message::with_id(0x0010, 1);
    msg.set_control_data(3);

    let bytes = encode(&msg);
    assert_eq!(bytes.len(), 20);
    assert_eq!(header_total_size(&bytes), 16);
    assert_eq!(&bytes[16..20], &[0, 0, 0, 3]);

    let decoded = decode(&bytes).unwrap();
    assert!(decoded.is_control());
    assert_eq!(decoded.control_data(), Some(3));
    assert_eq!(decoded.field_count(), 0);
    assert!(decoded.flags().has(Flags::CONTROL));
}

#[test]
fn binary_message_padding() {
    let payload: Vec<u8> = (1..=10).collect();
    let mut msg = Message::with_id(0x0037, 2);
    msg.set_binary_data(payload.clone());

    let bytes = encode(&msg);
    assert_eq!(header_total_size(&bytes), 32);
    assert_eq!(bytes.len(), 36);
    assert_eq!(&bytes[16..20], &[0, 0, 0, 10]);
    assert_eq!(&bytes[20..30], payload.as_slice());
    assert!(bytes[30..].iter().all(|&b| b == 0));

    let decoded = decode(&bytes).unwrap();
    assert!(decoded.is_binary());
    assert_eq!(decoded.binary_data().map(|b| &b[..]), Some(payload.as_slice()));
}

#[test]
fn truncated_header() {
    let result = decode(&[0u8; 10]);
    assert!(matches!(result, Err(Error::TruncatedHeader { got: 10 })));
}

#[test]
fn header_without_body_word() {
    let mut bytes = encode(&Message::new(1));
    bytes.truncate(16);
    assert!(matches!(
        decode(&bytes),
        Err(Error::TruncatedBody { needed: 20, got: 16 })
    ));
}

#[test]
fn unknown_field_type_reports_position() {
    let mut msg = Message::new(1);
    msg.set_u32(1, 1);
    msg.set_u32(2, 2);
    let mut bytes = encode(&msg);
    // type tag of the second field
    bytes[20 + 16 + 4] = 0x7F;

    match decode(&bytes) {
        Err(Error::Field { index, source }) => {
            assert_eq!(index, 1);
            assert_eq!(source, FieldError::UnknownFieldType { type_tag: 0x7F });
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn utf16_string_layout() {
    let mut msg = Message::new(1);
    msg.set_string(3, "hi");
    let bytes = encode(&msg);

    // id, type 1, pad, length 4, "h" "i" in UTF-16BE, 4 bytes padding
    assert_eq!(&bytes[20..24], &[0, 0, 0, 3]);
    assert_eq!(bytes[24], 1);
    assert_eq!(&bytes[28..32], &[0, 0, 0, 4]);
    assert_eq!(&bytes[32..36], &[0, b'h', 0, b'i']);
    assert_eq!(bytes.len(), 20 + 24);
}

#[test]
fn advisory_flags_survive() {
    let msg = MessageBuilder::new(2)
        .end_of_file()
        .reverse_order()
        .build()
        .unwrap();
    let bytes = encode(&msg);
    assert_eq!(&bytes[2..4], &[0x00, 0x12]);

    let decoded = decode(&bytes).unwrap();
    assert!(decoded.is_end_of_file());
    assert!(decoded.is_reverse_order());
    assert!(!decoded.is_end_of_sequence());
}

#[test]
fn strict_codec_rejects_control_binary() {
    let mut msg = Message::new(1);
    msg.set_control_data(9);
    let mut bytes = encode(&msg);
    bytes[3] |= 0x01;

    let lenient = decode(&bytes).unwrap();
    assert_eq!(lenient.control_data(), Some(9));

    let strict = Codec::new(CodecConfig::default().strict());
    assert!(matches!(
        strict.decode(&bytes),
        Err(Error::InvalidFlagCombination { flags: 0x0021 })
    ));
}

#[test]
fn every_field_type_round_trips() {
    let mut msg = Message::with_id(0x0100, 11);
    msg.set_u16(1, 0xBEEF);
    msg.set_i32(2, -5);
    msg.set_i64(3, i64::MIN);
    msg.set_f64(4, 2.5);
    msg.set_string(5, "Grüße");
    msg.set_bytes(6, vec![1u8, 2, 3]);

    let decoded = decode(&encode(&msg)).unwrap();
    assert_eq!(decoded, msg);
    assert_eq!(decoded.field(4).map(Field::value), Some(&FieldValue::Float64(2.5)));
    assert_eq!(decoded.get_i64(3), i64::MIN);
    assert_eq!(decoded.get_str(5), "Grüße");
}
