//! Benchmarks for event-listener rebind churn.
//!
//! Run with: `cargo bench --package hookwire-runtime --bench rebind_bench`
//!
//! # Performance Baselines
//!
//! These benchmarks establish baselines for:
//! - Initial registration of a target × event × listener product
//! - One rebind cycle after a reactive input change
//! - Many input changes coalesced into one batch
//! - Dispatch through a manager-owned registration set

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hookwire_core::{Listener, ListenerOptions, MemoryTarget, TargetRef};
use hookwire_runtime::{Observable, batch, use_event_listener};
use std::hint::black_box;

// ============================================================================
// Fixtures
// ============================================================================

const EVENTS: [&str; 8] = [
    "click", "dblclick", "focus", "blur", "keydown", "keyup", "scroll", "input",
];

fn hosts(n: usize) -> Vec<MemoryTarget> {
    (0..n).map(|i| MemoryTarget::new(format!("t{i}"))).collect()
}

fn refs(hosts: &[MemoryTarget]) -> Vec<TargetRef> {
    hosts.iter().map(MemoryTarget::target_ref).collect()
}

fn event_names(n: usize) -> Vec<String> {
    EVENTS.iter().take(n).map(|e| (*e).to_owned()).collect()
}

// ============================================================================
// Registration
// ============================================================================

fn bench_initial_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebind/initial");
    for &(targets, events) in &[(1, 1), (4, 4), (16, 8)] {
        let product = (targets * events) as u64;
        group.throughput(Throughput::Elements(product));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{targets}x{events}")),
            &(targets, events),
            |b, &(targets, events)| {
                let targets = hosts(targets);
                let names = event_names(events);
                let listener = Listener::new(|_| {});
                b.iter(|| {
                    let handle = use_event_listener(
                        refs(&targets),
                        names.clone(),
                        listener.clone(),
                        ListenerOptions::new(),
                    );
                    black_box(handle)
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Rebind cycles
// ============================================================================

fn bench_single_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebind/change");
    for &(targets, events) in &[(1, 1), (4, 4), (16, 8)] {
        group.throughput(Throughput::Elements((targets * events) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{targets}x{events}")),
            &(targets, events),
            |b, &(targets, events)| {
                let targets = hosts(targets);
                let options = Observable::new(ListenerOptions::new());
                let _handle = use_event_listener(
                    refs(&targets),
                    event_names(events),
                    Listener::new(|_| {}),
                    options.clone(),
                );
                let mut capture = false;
                b.iter(|| {
                    capture = !capture;
                    options.set(ListenerOptions::new().capture(capture));
                });
            },
        );
    }
    group.finish();
}

fn bench_batched_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebind/batched");
    for &changes in &[1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(changes), &changes, |b, &n| {
            let targets = hosts(4);
            let names = Observable::new(event_names(1));
            let _handle = use_event_listener(
                refs(&targets),
                names.clone(),
                Listener::new(|_| {}),
                ListenerOptions::new(),
            );
            b.iter(|| {
                batch(|| {
                    for i in 0..n {
                        names.set(event_names(1 + i % EVENTS.len()));
                    }
                    names.set(event_names(2));
                });
            });
        });
    }
    group.finish();
}

// ============================================================================
// Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebind/dispatch");
    for &listeners in &[1usize, 16, 128] {
        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(listeners),
            &listeners,
            |b, &n| {
                let target = MemoryTarget::new("bench");
                let fs: Vec<Listener> = (0..n).map(|_| Listener::new(|_| {})).collect();
                let _handle = use_event_listener(&target, "click", fs, false);
                b.iter(|| black_box(target.emit("click")));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_initial_registration,
    bench_single_change,
    bench_batched_changes,
    bench_dispatch
);
criterion_main!(benches);
