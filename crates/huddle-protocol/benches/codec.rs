//! Codec benchmarks for huddle-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use huddle_protocol::{codec, MessageFrame, SignalFrame};
use serde_json::value::RawValue;

fn bench_encode_chat(c: &mut Criterion) {
    let frame = MessageFrame::chat("lobby", "alice", "x".repeat(64));

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("chat_64B", |b| {
        b.iter(|| codec::encode_message(black_box(&frame)))
    });
    group.finish();
}

fn bench_decode_chat(c: &mut Criterion) {
    let frame = MessageFrame::chat("lobby", "alice", "x".repeat(64));
    let text = codec::encode_message(&frame).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("chat_64B", |b| {
        b.iter(|| codec::decode_message(black_box(&text)))
    });
    group.finish();
}

fn bench_encode_signal(c: &mut Criterion) {
    let sdp = "v=0\\r\\n".repeat(40);
    let offer = RawValue::from_string(format!(r#"{{"type":"offer","sdp":"{}"}}"#, sdp)).unwrap();
    let frame = SignalFrame::new("lobby", "alice", Some(offer));

    c.bench_function("encode_signal_offer", |b| {
        b.iter(|| codec::encode_signal(black_box(&frame)).unwrap())
    });
}

criterion_group!(benches, bench_encode_chat, bench_decode_chat, bench_encode_signal);
criterion_main!(benches);
