//! Benchmarks for the bus delivery path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mediabridge_rs::config::DiagnosticsConfig;
use mediabridge_rs::dispatch::{BusDispatcher, CallbackContext, CallbackSource};
use mediabridge_rs::engine::message::Message;
use mediabridge_rs::{HandleRegistry, Occurrence, PipelineId, State};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn sample_messages() -> Vec<Message> {
    vec![
        Message::Eos {
            source: "pipeline0".to_string(),
        },
        Message::Buffering {
            source: "rtspsrc0".to_string(),
            percent: 50,
        },
        Message::StateChanged {
            source: "pipeline0".to_string(),
            old: State::Null,
            new: State::Paused,
            pending: Some(State::Playing),
        },
        Message::Error {
            source: "filesrc0".to_string(),
            description: "Resource not found.".to_string(),
            debug: Some("no location set".to_string()),
        },
        Message::NewClock {
            source: "pipeline0".to_string(),
        },
        Message::Latency {
            source: "pipeline0".to_string(),
        },
    ]
}

fn counting_registry(handlers: i32) -> (Arc<HandleRegistry>, Arc<AtomicU64>) {
    let registry = Arc::new(HandleRegistry::new());
    let hits = Arc::new(AtomicU64::new(0));
    for id in 0..handlers {
        let hits = Arc::clone(&hits);
        registry
            .register_bus_handler(PipelineId(id), move |_: &Occurrence, _: PipelineId| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }
    registry.set_diagnostic_sink(|_: &str| {});
    (registry, hits)
}

fn bench_classify(c: &mut Criterion) {
    let messages = sample_messages();
    c.bench_function("occurrence_classify", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(Occurrence::classify(black_box(message)));
            }
        });
    });
}

fn bench_registry_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_deliver");
    let occurrence = Occurrence::Buffering {
        percent: 42,
        source: "queue0".to_string(),
    };

    for handlers in [1, 64, 1024].iter() {
        let (registry, _hits) = counting_registry(*handlers);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("handlers", handlers),
            handlers,
            |b, &handlers| {
                let mut id = 0;
                b.iter(|| {
                    black_box(registry.deliver_bus_occurrence(&occurrence, PipelineId(id)));
                    id = (id + 1) % handlers;
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_dispatch");
    let messages = sample_messages();
    let (registry, _hits) = counting_registry(1);

    let context = CallbackContext::new(0, CallbackSource::BusWatch);
    let dispatcher = BusDispatcher::new(
        Arc::clone(&context),
        Arc::clone(&registry),
        DiagnosticsConfig::default(),
    );
    group.throughput(Throughput::Elements(messages.len() as u64));
    group.bench_function("mixed_messages", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(dispatcher.dispatch(black_box(message)));
            }
        });
    });

    // Closed gate: the cost of rejecting late messages after teardown.
    context.close();
    group.bench_function("closed_gate", |b| {
        b.iter(|| black_box(dispatcher.dispatch(black_box(&messages[0]))));
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_registry_lookup, bench_dispatch);
criterion_main!(benches);
