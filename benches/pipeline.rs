//! Benchmarks for the structure and harmonic detection pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use marketstruct::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

/// Generate realistic deterministic bars
fn generate_bars(n: usize) -> Vec<TestBar> {
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

        let o = price;
        let c = price + change;
        let h = o.max(c) + volatility * 0.5;
        let l = o.min(c) - volatility * 0.5;

        bars.push(TestBar { o, h, l, c });
        price = c;
    }

    bars
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let analyzer = StructureAnalyzer::default();

    for size in [100, 1000, 10_000] {
        let bars = generate_bars(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &bars, |b, bars| {
            b.iter(|| analyzer.analyze(black_box(bars)).unwrap());
        });
    }

    group.finish();
}

fn bench_swings(c: &mut Criterion) {
    let bars = generate_bars(10_000);
    let detector = SwingDetector::default();

    c.bench_function("swings_10k", |b| {
        b.iter(|| detector.detect(black_box(&bars)));
    });
}

fn bench_backtest(c: &mut Criterion) {
    let bars = generate_bars(10_000);
    let analyzer = StructureAnalyzer::default();
    let report = analyzer.analyze(&bars).unwrap();

    c.bench_function("backtest_10k", |b| {
        b.iter(|| backtest_patterns(black_box(&report.patterns), black_box(&bars)));
    });
}

fn bench_pulse_cycle(c: &mut Criterion) {
    c.bench_function("pulse_cycle", |b| {
        let mut pulse = MarketPulse::default();
        let mut tick = 0i64;
        b.iter(|| {
            tick += 1;
            let price = 100.0 + (tick % 17) as f64;
            MarketSnapshot::assemble(
                black_box(&mut pulse),
                price,
                (tick % 9) as f64 - 4.0,
                price * 1.02,
                price * 0.98,
                tick,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_analyze,
    bench_swings,
    bench_backtest,
    bench_pulse_cycle
);
criterion_main!(benches);
