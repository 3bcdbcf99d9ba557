//! Fan-out benchmarks for the hub.
//!
//! Measures the time from submitting broadcasts until every member has
//! drained them from its outbound queue.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use huddle_core::{Hub, HubConfig, Message, Session, SessionBinding};
use huddle_protocol::MessageKind;
use huddle_transport::memory;
use std::time::{Duration, Instant};

const STOP: &str = "__stop";

async fn run_fanout(members: usize, iters: u64) -> Duration {
    let hub = Hub::spawn(HubConfig::default());
    hub.create_room("bench", "Bench").await.unwrap();

    let mut drainers = Vec::with_capacity(members);
    for i in 0..members {
        let (_peer, _reader, writer) = memory::pair(1);
        let binding = SessionBinding::new(format!("s{}", i), "bench", format!("user{}", i));
        let (session, mut rx) = Session::new(binding, writer, 1024);
        hub.register(session).await.unwrap();

        drainers.push(tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if msg.kind == MessageKind::Chat && msg.content == STOP {
                    break;
                }
            }
        }));
    }

    let start = Instant::now();
    for _ in 0..iters {
        hub.broadcast(Message::chat("bench", "user0", "x".repeat(64)))
            .await
            .unwrap();
    }
    hub.broadcast(Message::chat("bench", "user0", STOP))
        .await
        .unwrap();
    for drainer in drainers {
        drainer.await.unwrap();
    }
    start.elapsed()
}

fn bench_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("fanout");

    for members in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &members, |b, &members| {
            b.iter_custom(|iters| rt.block_on(run_fanout(members, iters)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fanout);
criterion_main!(benches);
