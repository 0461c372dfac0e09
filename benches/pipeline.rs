//! Pipeline benchmarks.
//!
//! Measures:
//! - SPSC handoff of 100k orders across two threads, against `rtrb`
//! - End-to-end decode + match through `run_pipeline`

use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tick_lob::{codec, ring_buffer, run_pipeline, EngineConfig, Order, PushError, Side};

const ITEMS: u64 = 100_000;

fn order(id: u64) -> Order {
    let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
    Order::new(id, 10_000 + (id % 21) as i32 - 10, 10, side)
}

fn handoff_tick_lob(slots: usize) -> u64 {
    let (mut tx, mut rx) = ring_buffer::<Order>(slots);

    let producer = thread::spawn(move || {
        for id in 0..ITEMS {
            let mut item = order(id);
            while let Err(PushError::Full(back)) = tx.push(item) {
                item = back;
                std::hint::spin_loop();
            }
        }
    });

    let mut sum = 0u64;
    let mut received = 0;
    while received < ITEMS {
        match rx.pop() {
            Some(o) => {
                sum = sum.wrapping_add(o.id);
                received += 1;
            }
            None => std::hint::spin_loop(),
        }
    }
    producer.join().ok();
    sum
}

fn handoff_rtrb(slots: usize) -> u64 {
    // rtrb has no reserved cell, so size it to the same usable capacity
    let (mut tx, mut rx) = rtrb::RingBuffer::<Order>::new(slots - 1);

    let producer = thread::spawn(move || {
        for id in 0..ITEMS {
            let mut item = order(id);
            while let Err(rtrb::PushError::Full(back)) = tx.push(item) {
                item = back;
                std::hint::spin_loop();
            }
        }
    });

    let mut sum = 0u64;
    let mut received = 0;
    while received < ITEMS {
        match rx.pop() {
            Ok(o) => {
                sum = sum.wrapping_add(o.id);
                received += 1;
            }
            Err(_) => std::hint::spin_loop(),
        }
    }
    producer.join().ok();
    sum
}

fn bench_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_handoff");
    group.throughput(Throughput::Elements(ITEMS));
    group.sample_size(20);

    for slots in [64usize, 1024, 65536] {
        group.bench_with_input(BenchmarkId::new("tick_lob", slots), &slots, |b, &slots| {
            b.iter(|| black_box(handoff_tick_lob(slots)))
        });
        group.bench_with_input(BenchmarkId::new("rtrb", slots), &slots, |b, &slots| {
            b.iter(|| black_box(handoff_rtrb(slots)))
        });
    }

    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_pipeline");
    group.throughput(Throughput::Elements(ITEMS));
    group.sample_size(20);

    let orders: Vec<Order> = (0..ITEMS).map(order).collect();
    let bytes = codec::encode_all(&orders);

    group.bench_function("100k_orders", |b| {
        b.iter(|| {
            let config = EngineConfig {
                pipeline_slots: 4096,
                ..EngineConfig::with_capacity(ITEMS as u32)
            };
            black_box(run_pipeline(config, &bytes).map(|run| run.report.fills).ok())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_handoff, bench_end_to_end);
criterion_main!(benches);
