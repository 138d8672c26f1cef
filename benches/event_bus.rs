//! Event bus benchmark suite.
//!
//! Benchmarks the synchronous dispatch path:
//! - Emission fan-out: 1, 10, 100 listeners
//! - Registration churn: on + off by handle
//! - Inbound frame decoding
//!
//! Run with: cargo bench --bench event_bus
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use socket_webox::EventBus;
use socket_webox::protocol::InboundFrame;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LISTENER_COUNTS: &[usize] = &[1, 10, 100];

// ============================================================================
// Benchmark: Emit
// ============================================================================

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit");
    let frame = json!({ "kind": "greeting", "payload": 42 });

    for &count in LISTENER_COUNTS {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        for _ in 0..count {
            let h = Arc::clone(&hits);
            bus.on("greeting", move |_| {
                h.fetch_add(1, Ordering::Relaxed);
            });
        }

        group.bench_with_input(BenchmarkId::new("listeners", count), &count, |b, _| {
            b.iter(|| bus.emit(black_box("greeting"), black_box(&frame)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Registration
// ============================================================================

fn bench_on_off(c: &mut Criterion) {
    let bus = EventBus::new();

    c.bench_function("on_off", |b| {
        b.iter(|| {
            let id = bus.on(black_box("greeting"), |_| {});
            bus.off("greeting", Some(id))
        });
    });
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let bytes = br#"{"msgMode":"chat","msg":{"from":"alice","text":"hello"}}"#;

    c.bench_function("decode_frame", |b| {
        b.iter(|| InboundFrame::decode(black_box(bytes), "msgMode"));
    });
}

criterion_group!(benches, bench_emit, bench_on_off, bench_decode);
criterion_main!(benches);
