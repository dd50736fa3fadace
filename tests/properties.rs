use nxcp::{Codec, CodecConfig, Error, Field, FieldError, FieldValue, Message, MessageHeader, StringEncoding};
use proptest::prelude::*;

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<u16>().prop_map(FieldValue::Int16),
        any::<u32>().prop_map(FieldValue::Int32),
        any::<u64>().prop_map(FieldValue::Int64),
        (-1.0e12f64..1.0e12).prop_map(FieldValue::Float64),
        ".{0,24}".prop_map(FieldValue::String),
        prop::collection::vec(any::<u8>(), 0..40).prop_map(|v| FieldValue::Binary(v.into())),
    ]
}

fn field_message() -> impl Strategy<Value = Message> {
    (
        any::<u16>(),
        any::<u32>(),
        prop::collection::vec((any::<u32>(), field_value()), 0..12),
    )
        .prop_map(|(code, id, fields)| {
            let mut msg = Message::with_id(code, id);
            for (field_id, value) in fields {
                msg.set_field(Field::new(field_id, value));
            }
            msg
        })
}

fn any_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        field_message(),
        (any::<u16>(), prop::collection::vec(any::<u8>(), 0..64)).prop_map(|(code, data)| {
            let mut msg = Message::new(code);
            msg.set_binary_data(data);
            msg
        }),
        (any::<u16>(), any::<u32>()).prop_map(|(code, value)| {
            let mut msg = Message::new(code);
            msg.set_control_data(value);
            msg
        }),
    ]
}

fn codec() -> impl Strategy<Value = Codec> {
    (
        prop_oneof![Just(StringEncoding::Utf16Be), Just(StringEncoding::Utf8)],
        1u8..=2,
    )
        .prop_map(|(encoding, version)| {
            Codec::new(CodecConfig {
                protocol_version: version,
                ..CodecConfig::default().with_string_encoding(encoding)
            })
        })
}

proptest! {
    #[test]
    fn prop_round_trip(codec in codec(), msg in any_message()) {
        let bytes = codec.encode(&msg);
        prop_assert_eq!(bytes.len(), codec.encoded_len(&msg));
        let decoded = codec.decode(&bytes).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn prop_total_size_is_aligned(codec in codec(), msg in any_message()) {
        let bytes = codec.encode(&msg);
        let header = MessageHeader::from_bytes(&bytes).unwrap();
        prop_assert_eq!(header.total_size() % 8, 0);
        prop_assert_eq!(bytes.len() % 8, 4);
    }

    #[test]
    fn prop_aligned_field_frames(value in field_value(), id in any::<u32>()) {
        let field = Field::new(id, value);
        let frame = field.encode(&CodecConfig::default());
        prop_assert_eq!(frame.len() % 8, 0);
        let (decoded, consumed) = Field::decode(&frame, &CodecConfig::default()).unwrap();
        prop_assert_eq!(consumed, frame.len());
        prop_assert_eq!(decoded, field);
    }

    #[test]
    fn prop_every_prefix_is_rejected(codec in codec(), msg in any_message()) {
        let bytes = codec.encode(&msg);
        for cut in 0..bytes.len() {
            let result = codec.decode(&bytes[..cut]);
            prop_assert!(result.is_err(), "prefix of {} bytes decoded", cut);
            prop_assert!(result.unwrap_err().is_truncation());
        }
    }

    #[test]
    fn prop_every_field_prefix_is_rejected(codec in codec(), value in field_value(), id in any::<u32>()) {
        let config = codec.config();
        let frame = Field::new(id, value).encode(config);
        for cut in 0..frame.len() {
            let result = Field::decode(&frame[..cut], config);
            prop_assert!(
                matches!(result, Err(FieldError::TruncatedField { .. })),
                "field prefix of {} bytes: {:?}", cut, result
            );
        }
    }

    #[test]
    fn prop_trailing_bytes_ignored(msg in any_message(), tail in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut bytes = msg.encode();
        bytes.extend_from_slice(&tail);
        prop_assert_eq!(Message::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn prop_control_has_no_fields(value in any::<u32>(), code in any::<u16>()) {
        let mut msg = Message::new(code);
        msg.set_u32(1, 1);
        msg.set_control_data(value);

        let decoded = Message::decode(&msg.encode()).unwrap();
        prop_assert!(decoded.is_control());
        prop_assert_eq!(decoded.field_count(), 0);
        prop_assert!(decoded.binary_data().is_none());
        prop_assert_eq!(decoded.control_data(), Some(value));
    }

    #[test]
    fn prop_xml_round_trip(
        code in any::<u16>(),
        id in any::<u32>(),
        numbers in prop::collection::vec((any::<u32>(), any::<u64>()), 0..6),
        text in "[a-zA-Z0-9 <>&'\"]{0,24}",
        real in -1.0e12f64..1.0e12,
        blob in prop::collection::vec(any::<u8>(), 0..40),
    ) {
        let mut msg = Message::with_id(code, id);
        for (field_id, value) in numbers {
            msg.set_u64(field_id, value);
        }
        msg.set_string(1_000_001, text);
        msg.set_f64(1_000_002, real);
        msg.set_bytes(1_000_003, blob);
        msg.set_u16(1_000_004, code);

        let xml = msg.to_xml().unwrap();
        prop_assert_eq!(Message::from_xml(&xml).unwrap(), msg);
    }

    #[test]
    fn prop_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        match Message::decode(&bytes) {
            Ok(_) | Err(Error::TruncatedHeader { .. } | Error::TruncatedBody { .. } | Error::Field { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
