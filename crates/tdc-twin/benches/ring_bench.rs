//! Ring Benchmark Suite - scheduler throughput under oscillation
//!
//! # Scenarios
//!
//! 1. **Measurement**: one start/stop interval, plain vs interleaved
//!    - N = 8, 64, 256 stages
//!    - Dominated by ring events per lap
//!
//! 2. **Backends**: the same measurement on the heap and the linear-scan
//!    scheduler
//!
//! 3. **Calibration**: warm-up laps plus phase table construction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tdc_twin::domain::{GateDelays, PhaseCalibration, Tdc, TdcConfig};

// ============================================================================
// Benchmarks
// ============================================================================

/// One measurement, ten laps long
fn bench_measurement(c: &mut Criterion) {
    let mut group = c.benchmark_group("measurement");
    let delays = GateDelays::default();

    for n in [8usize, 64, 256].iter() {
        let stop = 10 * 100 * *n as u64;

        group.bench_with_input(BenchmarkId::new("plain", n), n, |b, &n| {
            b.iter(|| {
                let mut tdc = Tdc::production(TdcConfig::plain(n, 8, delays)).unwrap();
                black_box(tdc.measure(0, stop).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("interleaved", n), n, |b, &n| {
            b.iter(|| {
                let mut tdc = Tdc::production(TdcConfig::interleaved(n, 8, delays)).unwrap();
                black_box(tdc.measure(0, stop).unwrap())
            });
        });
    }

    group.finish();
}

/// Heap vs linear-scan scheduler
fn bench_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("backends");
    let config = TdcConfig::interleaved(16, 8, GateDelays::default());

    group.bench_function("production", |b| {
        b.iter(|| {
            let mut tdc = Tdc::production(config.clone()).unwrap();
            black_box(tdc.measure(0, 20_000).unwrap())
        });
    });

    group.bench_function("verification", |b| {
        b.iter(|| {
            let mut tdc = Tdc::verification(config.clone()).unwrap();
            black_box(tdc.measure(0, 20_000).unwrap())
        });
    });

    group.finish();
}

/// Full calibration run
fn bench_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");

    for n in [8usize, 64].iter() {
        group.bench_with_input(BenchmarkId::new("interleaved", n), n, |b, &n| {
            let config = TdcConfig::interleaved(n, 8, GateDelays::default());
            b.iter(|| black_box(PhaseCalibration::measure(&config).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_measurement, bench_backends, bench_calibration);

criterion_main!(benches);
