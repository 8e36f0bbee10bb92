//! Criterion benchmarks for IntraLab hot paths.
//!
//! Benchmarks:
//! 1. Cross-sectional scoring (score matrix over the full panel)
//! 2. Membership updates (rank + hysteresis per rebalance)
//! 3. Full backtest loop at realistic panel sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, TimeZone, Utc};
use intralab_core::portfolio::MembershipState;
use intralab_core::{compute_scores, run_backtest, BacktestConfig, PricePanel};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_panel(n_days: usize, bars_per_day: usize, n_symbols: usize) -> PricePanel {
    let symbols: Vec<String> = (0..n_symbols).map(|i| format!("SYM{i}")).collect();
    let mut timestamps = Vec::with_capacity(n_days * bars_per_day);
    for d in 0..n_days {
        let open = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap() + Duration::days(d as i64);
        for b in 0..bars_per_day {
            timestamps.push(open + Duration::minutes(5 * b as i64));
        }
    }
    let n_bars = timestamps.len();
    let mut closes = Vec::with_capacity(n_bars * n_symbols);
    for t in 0..n_bars {
        for s in 0..n_symbols {
            let base = 50.0 + 10.0 * s as f64;
            closes.push(base * (1.0 + 0.001 * ((t * (s + 3)) as f64 * 0.1).sin()));
        }
    }
    PricePanel::new(timestamps, symbols, closes).unwrap()
}

// ── 1. Scoring ───────────────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_scores");
    let config = BacktestConfig::default();

    for &n_symbols in &[20, 100, 500] {
        let panel = make_panel(5, 78, n_symbols);
        group.bench_with_input(
            BenchmarkId::new("momentum_5d", n_symbols),
            &n_symbols,
            |b, _| {
                b.iter(|| compute_scores(black_box(&panel), black_box(&config)));
            },
        );
    }

    group.finish();
}

// ── 2. Membership ────────────────────────────────────────────────────

fn bench_membership(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_update");

    for &n_symbols in &[100, 500] {
        let scores: Vec<f64> = (0..n_symbols)
            .map(|s| ((s * 37) % n_symbols) as f64 / n_symbols as f64 - 0.5)
            .collect();
        group.bench_with_input(
            BenchmarkId::new("rank_and_update", n_symbols),
            &n_symbols,
            |b, _| {
                let mut state = MembershipState::new(n_symbols);
                b.iter(|| {
                    state.update(black_box(&scores), 0.3, 0.55);
                });
            },
        );
    }

    group.finish();
}

// ── 3. Full backtest ─────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_backtest");
    group.sample_size(20);

    for &(n_days, n_symbols) in &[(5, 50), (20, 100)] {
        let panel = make_panel(n_days, 78, n_symbols);
        let config = BacktestConfig::default();
        group.bench_with_input(
            BenchmarkId::new(format!("{n_days}d"), n_symbols),
            &n_symbols,
            |b, _| {
                b.iter(|| run_backtest(black_box(&panel), black_box(&config)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_scoring, bench_membership, bench_backtest);
criterion_main!(benches);
