//! # IPC Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | direct | store call with no channel |
//! | guarded | identity adapter over the store |
//! | channel unary | Sender → Receiver → adapter → store round trip |
//! | channel stream | full streamed query, per item count |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trace_store::InMemoryTraceServer;
use trace_tests::fixtures::{guarded, guarded_receiver, start_req, INTERNAL_PROJECT, PROJECT};
use trace_types::{CallReadReq, CallsFilter, CallsQueryReq, TraceServer};

fn seeded_store(calls: usize) -> Arc<InMemoryTraceServer> {
    let store = Arc::new(InMemoryTraceServer::new());
    for i in 0..calls {
        let _ = store.call_start(start_req(INTERNAL_PROJECT, &format!("c{i}"), None));
    }
    store
}

fn read_req(project_id: &str) -> CallReadReq {
    CallReadReq {
        project_id: project_id.to_string(),
        id: "c0".to_string(),
    }
}

fn bench_unary(c: &mut Criterion) {
    let mut group = c.benchmark_group("unary-call-read");
    group.measurement_time(Duration::from_secs(5));

    let store = seeded_store(1);
    group.bench_function("direct", |b| {
        b.iter(|| black_box(store.call_read(read_req(INTERNAL_PROJECT)).is_ok()))
    });

    let adapter = guarded(store.clone());
    group.bench_function("guarded", |b| {
        b.iter(|| black_box(adapter.call_read(read_req(PROJECT)).is_ok()))
    });

    let receiver = guarded_receiver(store);
    let sender = receiver.get_sender();
    group.bench_function("channel", |b| {
        b.iter(|| black_box(sender.call_read(read_req(PROJECT)).is_ok()))
    });

    group.finish();
    receiver.stop();
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("calls-query-stream");
    group.measurement_time(Duration::from_secs(5));

    for size in [10usize, 100, 1000] {
        let receiver = guarded_receiver(seeded_store(size));
        let sender = receiver.get_sender();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("channel", size), &size, |b, _| {
            b.iter(|| {
                let stream = sender
                    .calls_query_stream(CallsQueryReq {
                        project_id: PROJECT.to_string(),
                        filter: CallsFilter::default(),
                        limit: None,
                        offset: None,
                    })
                    .map(|s| s.count())
                    .unwrap_or(0);
                black_box(stream)
            })
        });
        receiver.stop();
    }

    group.finish();
}

criterion_group!(benches, bench_unary, bench_stream);
criterion_main!(benches);
