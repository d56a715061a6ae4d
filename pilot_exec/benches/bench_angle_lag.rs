//! # Angle Lag Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pilot_lib::drift::{estimate_lag, DriftEstimator, DriftParams};

/// Compass and GPS course over six minutes at 1 Hz, the GPS lagging by 4 s
/// and reading 12 degrees anticlockwise of the compass.
fn six_minute_window() -> (Vec<f64>, Vec<f64>) {
    let n = 360;
    let course = |t: f64| 180.0 + 40.0 * (t / 45.0).sin() + 15.0 * (t / 11.0).cos();

    let compass = (0..n).map(|i| course(i as f64) + 12.0).collect();
    let gps = (0..n).map(|i| course(i as f64 - 4.0)).collect();

    (compass, gps)
}

fn angle_lag_benchmark(c: &mut Criterion) {
    let (compass, gps) = six_minute_window();

    c.bench_function("estimate_lag 360 samples, 30 lag", |b| {
        b.iter(|| estimate_lag(black_box(&compass), black_box(&gps), 30))
    });

    let mut estimator = DriftEstimator::new(&DriftParams::default());
    for (i, (c, g)) in compass.iter().zip(gps.iter()).enumerate() {
        estimator.add(i as f64, *c, *g);
    }

    c.bench_function("DriftEstimator::estimate full window", |b| {
        b.iter(|| black_box(&estimator).estimate())
    });
}

criterion_group!(benches, angle_lag_benchmark);
criterion_main!(benches);
