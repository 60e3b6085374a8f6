//! Criterion benchmarks for the analysis hot paths.
//!
//! Benchmarks:
//! 1. Full `analyze` call at several buffer sizes
//! 2. Swing extraction and structure labeling
//! 3. Zone detection

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use confluence_core::config::{AnalysisConfig, ZoneConfig};
use confluence_core::domain::{Candle, Timeframe};
use confluence_core::engine::{AnalysisOptions, Analyzer};
use confluence_core::indicators::latest_atr;
use confluence_core::structure::{find_swings, label_structure};
use confluence_core::zones::ZoneSet;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.07).sin() * 10.0 + (x * 0.31).sin() * 2.0 + x * 0.02;
            let open = close - (x * 0.5).cos();
            Candle::new(
                1_700_000_000_000 + i as i64 * 3_600_000,
                open,
                open.max(close) + 0.8,
                open.min(close) - 0.8,
                close,
                1_000.0 + (i % 37) as f64 * 40.0,
            )
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_analyze(c: &mut Criterion) {
    let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
    let options = AnalysisOptions::default();
    let mut group = c.benchmark_group("analyze");
    for n in [200, 500, 1000] {
        let candles = make_candles(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| {
                analyzer
                    .analyze(black_box(candles), "BENCH", Timeframe::H1, &options)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_structure(c: &mut Criterion) {
    let candles = make_candles(1000);
    c.bench_function("swings_and_structure_1000", |b| {
        b.iter(|| {
            let swings = find_swings(black_box(&candles), 5);
            label_structure(&candles, &swings)
        })
    });
}

fn bench_zones(c: &mut Criterion) {
    let candles = make_candles(1000);
    let swings = find_swings(&candles, 5);
    let atr = latest_atr(&candles, 14);
    let config = ZoneConfig::default();
    c.bench_function("zones_1000", |b| {
        b.iter(|| ZoneSet::detect(black_box(&candles), &swings, atr, &config))
    });
}

criterion_group!(benches, bench_analyze, bench_structure, bench_zones);
criterion_main!(benches);
