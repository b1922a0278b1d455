//! Criterion benchmarks for TradeSim hot paths.
//!
//! Benchmarks:
//! 1. Full simulation per built-in strategy
//! 2. Incremental indicator engine over a whole series
//! 3. Report analysis (summary, drawdown periods, sanitized JSON)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tradesim_core::analysis::Report;
use tradesim_core::domain::{Bar, BarSeries};
use tradesim_core::engine::{run_backtest, EngineConfig, FillPolicy, Simulation};
use tradesim_core::indicators::{precompute, Ema, Indicator, Sma};
use tradesim_core::StrategyConfig;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> BarSeries {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar {
                timestamp: (base_date + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open,
                high: close + 1.5,
                low: open - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect();
    BarSeries::new("BENCH", bars).unwrap()
}

// ── 1. Simulation ────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let strategies = [
        ("ma_cross", StrategyConfig::ma_cross(10, 30)),
        ("monthly_accumulation", StrategyConfig::monthly_accumulation(1_000.0)),
        ("lump_sum", StrategyConfig::lump_sum(50_000.0)),
    ];

    for &bar_count in &[252, 1260, 2520] {
        let series = make_series(bar_count);
        let config = EngineConfig::new(100_000.0);
        for (name, strategy) in &strategies {
            group.bench_with_input(BenchmarkId::new(*name, bar_count), &bar_count, |b, _| {
                b.iter(|| {
                    let strategy = strategy.build().unwrap();
                    Simulation::new(black_box(&series), strategy, config.clone())
                        .unwrap()
                        .run()
                        .unwrap()
                });
            });
        }
    }

    let series = make_series(2520);
    let config = EngineConfig::new(100_000.0).with_fill_policy(FillPolicy::NextOpen);
    let strategy = StrategyConfig::ma_cross(10, 30);
    group.bench_function("ma_cross_next_open_2520", |b| {
        b.iter(|| run_backtest(black_box(&series), &strategy, &config).unwrap());
    });

    group.finish();
}

// ── 2. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let series = make_series(2520);

    group.bench_function("sma_20_compute", |b| {
        let mut sma = Sma::new(20).unwrap();
        b.iter(|| sma.compute(black_box(series.bars())));
    });

    group.bench_function("ema_50_compute", |b| {
        let mut ema = Ema::new(50).unwrap();
        b.iter(|| ema.compute(black_box(series.bars())));
    });

    group.bench_function("precompute_4", |b| {
        b.iter(|| {
            let indicators: Vec<Box<dyn Indicator>> = vec![
                Box::new(Sma::new(10).unwrap()),
                Box::new(Sma::new(30).unwrap()),
                Box::new(Ema::new(12).unwrap()),
                Box::new(Ema::new(26).unwrap()),
            ];
            precompute(black_box(&series), indicators)
        });
    });

    group.finish();
}

// ── 3. Analysis ──────────────────────────────────────────────────────

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let series = make_series(2520);
    let strategy = StrategyConfig::ma_cross(5, 20).build().unwrap();
    let output = Simulation::new(&series, strategy, EngineConfig::new(100_000.0))
        .unwrap()
        .run()
        .unwrap();

    group.bench_function("report_from_run", |b| {
        b.iter(|| Report::from_run(black_box(output.clone())));
    });

    let report = Report::from_run(output);
    group.bench_function("report_to_json", |b| {
        b.iter(|| black_box(&report).to_json().unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_simulation, bench_indicators, bench_analysis);
criterion_main!(benches);
