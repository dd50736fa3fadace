use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nxcp::{Codec, CodecConfig, Message, StringEncoding};

/// Message with `count` fields cycling through the common field types.
fn field_message(count: u32) -> Message {
    let mut msg = Message::with_id(0x0064, 1);
    for id in 0..count {
        match id % 4 {
            0 => msg.set_u32(id, id),
            1 => msg.set_u64(id, u64::from(id) << 32),
            2 => msg.set_string(id, format!("value-{id}")),
            _ => msg.set_f64(id, f64::from(id) * 0.5),
        }
    }
    msg
}

fn binary_message(len: usize) -> Message {
    let mut msg = Message::with_id(0x0065, 2);
    msg.set_binary_data(vec![0xA5u8; len]);
    msg
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    // Small field dictionary
    let small_msg = field_message(8);
    group.throughput(Throughput::Elements(8));
    group.bench_function("encode_8_fields", |b| {
        b.iter(|| {
            black_box(small_msg.encode());
        });
    });

    // Medium field dictionary
    let medium_msg = field_message(256);
    group.throughput(Throughput::Elements(256));
    group.bench_function("encode_256_fields", |b| {
        b.iter(|| {
            black_box(medium_msg.encode());
        });
    });

    // Large binary payload (64 KB)
    let large_msg = binary_message(64 * 1024);
    group.throughput(Throughput::Bytes(64 * 1024));
    group.bench_function("encode_binary_64kb", |b| {
        b.iter(|| {
            black_box(large_msg.encode());
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let small_encoded = field_message(8).encode();
    group.throughput(Throughput::Elements(8));
    group.bench_function("decode_8_fields", |b| {
        b.iter(|| {
            black_box(Message::decode(&small_encoded).unwrap());
        });
    });

    let medium_encoded = field_message(256).encode();
    group.throughput(Throughput::Elements(256));
    group.bench_function("decode_256_fields", |b| {
        b.iter(|| {
            black_box(Message::decode(&medium_encoded).unwrap());
        });
    });

    let large_encoded = binary_message(64 * 1024).encode();
    group.throughput(Throughput::Bytes(64 * 1024));
    group.bench_function("decode_binary_64kb", |b| {
        b.iter(|| {
            black_box(Message::decode(&large_encoded).unwrap());
        });
    });

    group.finish();
}

fn bench_string_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let msg = field_message(256);
    for (name, encoding) in [
        ("roundtrip_utf16", StringEncoding::Utf16Be),
        ("roundtrip_utf8", StringEncoding::Utf8),
    ] {
        let codec = Codec::new(CodecConfig::default().with_string_encoding(encoding));
        group.bench_function(name, |b| {
            b.iter(|| {
                let encoded = codec.encode(&msg);
                black_box(codec.decode(&encoded).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_string_encoding);
criterion_main!(benches);
