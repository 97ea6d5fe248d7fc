//! Criterion benchmarks for the merge policies.
//!
//! Traffic is generated from fixed seeds so every policy sees the same
//! instances.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_lanemerge::conflict::ConflictModel;
use u_lanemerge::experiment::{ExperimentConfig, ExperimentDriver, TrialConfig};
use u_lanemerge::policy::{AnnealingConfig, AnnealingPolicy, DpPolicy, FcfsPolicy, MergePolicy};
use u_lanemerge::random::create_rng;
use u_lanemerge::traffic::{Traffic, TrafficConfig, TrafficGenerator};

fn traffic(lanes: usize, per_lane: usize) -> Traffic {
    let config = TrafficConfig::default()
        .with_lane_count(lanes)
        .with_rate(0.5)
        .with_horizon(per_lane as f64 * 4.0)
        .with_max_per_lane(per_lane);
    let generator = TrafficGenerator::new(config).unwrap();
    generator.generate(&mut create_rng(42)).unwrap()
}

fn model() -> ConflictModel {
    ConflictModel::new(1.0)
        .unwrap()
        .with_lane_change_headway(2.0)
        .unwrap()
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_fcfs(c: &mut Criterion) {
    let mut group = c.benchmark_group("fcfs");
    let model = model();

    for &per_lane in &[10, 100, 1000] {
        let traffic = traffic(2, per_lane);
        group.bench_with_input(BenchmarkId::from_parameter(per_lane), &traffic, |b, t| {
            b.iter(|| black_box(FcfsPolicy::new().schedule(black_box(t), &model)))
        });
    }
    group.finish();
}

fn bench_dp(c: &mut Criterion) {
    let mut group = c.benchmark_group("dp");
    group.sample_size(10);
    let model = model();

    for (lanes, per_lane) in [(2usize, 20usize), (2, 100), (3, 15)] {
        let traffic = traffic(lanes, per_lane);
        let policy = DpPolicy::default();
        group.bench_with_input(
            BenchmarkId::new(format!("l{}_n{}", lanes, per_lane), traffic.len()),
            &traffic,
            |b, t| b.iter(|| black_box(policy.solve(black_box(t), &model))),
        );
    }
    group.finish();
}

fn bench_annealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("annealing");
    group.sample_size(10);
    let model = model();

    for &per_lane in &[20, 100, 500] {
        let traffic = traffic(2, per_lane);
        let policy = AnnealingPolicy::new(
            AnnealingConfig::default()
                .with_iterations(5_000)
                .with_seed(42),
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(per_lane), &traffic, |b, t| {
            b.iter(|| black_box(policy.run(black_box(t), &model)))
        });
    }
    group.finish();
}

fn bench_experiment(c: &mut Criterion) {
    let mut group = c.benchmark_group("experiment");
    group.sample_size(10);

    let trial = TrialConfig::default()
        .with_traffic(TrafficConfig::default().with_rate(0.3).with_horizon(40.0))
        .with_lane_change_headway(2.0)
        .with_annealing(AnnealingConfig::default().with_iterations(2_000));
    for &workers in &[1, 4] {
        let config = ExperimentConfig::default()
            .with_trials(8)
            .with_workers(workers)
            .with_seed(42)
            .with_trial(trial.clone());
        let driver = ExperimentDriver::new(config).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &driver, |b, d| {
            b.iter(|| black_box(d.run()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fcfs, bench_dp, bench_annealing, bench_experiment);
criterion_main!(benches);
