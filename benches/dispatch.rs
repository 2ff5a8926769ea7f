//! Stepped vs. unrolled dispatch throughput.
//!
//! Compares:
//! 1. One transition lookup per gate (`Automaton::run`)
//! 2. One batch lookup per `L` gates (`BatchDispatch::run`) for L = 1..=6
//! 3. Chunked state maps on scoped threads (`BatchDispatch::run_parallel`)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qubitfsm::gate::NUM_GATES;
use qubitfsm::sequence::MAX_BATCH_LEN;
use qubitfsm::{Automaton, BatchDispatch, BatchLen, Gate, StateId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_gates(len: usize, seed: u64) -> Vec<Gate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| Gate::ALL[rng.gen_range(0..NUM_GATES)])
        .collect()
}

fn bench_dispatch(c: &mut Criterion) {
    let automaton = Automaton::canonical().expect("embedded tables");
    let transitions = automaton.transitions();
    let mut group = c.benchmark_group("dispatch");

    for num_gates in [48 * 8, 48 * 8 * 100, 48 * 8 * 10_000] {
        let gates = random_gates(num_gates, 42);
        group.throughput(Throughput::Elements(num_gates as u64));

        group.bench_with_input(
            BenchmarkId::new("stepped", num_gates),
            &gates,
            |b, gates| {
                b.iter(|| automaton.run(StateId::INITIAL, black_box(gates).iter().copied()))
            },
        );

        for len in 1..=MAX_BATCH_LEN {
            let dispatch = BatchDispatch::build(transitions, BatchLen::new(len).expect("valid L"));
            group.bench_with_input(
                BenchmarkId::new(format!("unrolled{}", len), num_gates),
                &gates,
                |b, gates| b.iter(|| dispatch.run(StateId::INITIAL, black_box(gates))),
            );
        }
    }

    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let automaton = Automaton::canonical().expect("embedded tables");
    let dispatch = BatchDispatch::build(
        automaton.transitions(),
        BatchLen::new(4).expect("valid L"),
    );
    let num_gates = 48 * 8 * 10_000;
    let gates = random_gates(num_gates, 7);

    let mut group = c.benchmark_group("parallel_unrolled4");
    group.throughput(Throughput::Elements(num_gates as u64));
    for threads in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &gates, |b, gates| {
            b.iter(|| dispatch.run_parallel(StateId::INITIAL, black_box(gates), threads))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let automaton = Automaton::canonical().expect("embedded tables");
    let mut group = c.benchmark_group("dispatch_build");

    for len in 1..=MAX_BATCH_LEN {
        let batch = BatchLen::new(len).expect("valid L");
        group.bench_function(BenchmarkId::from_parameter(len), |b| {
            b.iter(|| BatchDispatch::build(automaton.transitions(), black_box(batch)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_parallel, bench_build);
criterion_main!(benches);
