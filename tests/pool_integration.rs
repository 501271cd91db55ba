//! Batch and worker-pool behaviour under load, timeouts and panics.
//!
//! Run with: cargo test --release pool_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::RngCore;

use buyround::sim::JsonDirSink;
use buyround::{Batch, BatchConfig, CancelToken, DistributionTable, GameRules, Side, StrategyContext, StrategyRegistry};

fn table() -> Arc<DistributionTable> {
    let text = include_str!("fixtures/distributions.json");
    Arc::new(DistributionTable::from_json_str(text).unwrap())
}

fn sleepy(ctx: &StrategyContext<'_>, _: &mut dyn RngCore) -> f64 {
    thread::sleep(Duration::from_millis(20));
    ctx.funds / 2.0
}

/// Panics on the opening round when it starts on CT.
fn flaky(ctx: &StrategyContext<'_>, _: &mut dyn RngCore) -> f64 {
    assert!(
        !(ctx.current_round == 1 && ctx.side == Side::CounterTerrorist),
        "flaky strategy gave up"
    );
    ctx.funds
}

fn registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_builtins();
    registry.register("sleepy", Arc::new(sleepy));
    registry.register("flaky", Arc::new(flaky));
    registry
}

fn batch(config: BatchConfig) -> Batch {
    Batch::new(config, Arc::new(GameRules::default()), table(), &registry()).unwrap()
}

fn names(a: &str, b: &str) -> [String; 2] {
    [a.to_string(), b.to_string()]
}

#[test]
fn test_every_job_accounted_for() {
    for (simulations, workers) in [(1, 1), (7, 1), (25, 3), (100, 8), (64, 64)] {
        let stats = batch(BatchConfig {
            simulations,
            workers,
            strategy_names: names("smart_v1", "casual"),
            ..BatchConfig::default()
        })
        .run()
        .unwrap();
        assert_eq!(
            stats.completed + stats.failed,
            simulations,
            "{simulations} jobs on {workers} workers"
        );
        assert_eq!(stats.failed, 0);
    }
}

#[test]
fn test_zero_simulations() {
    let stats = batch(BatchConfig {
        simulations: 0,
        workers: 2,
        ..BatchConfig::default()
    })
    .run()
    .unwrap();
    assert_eq!(stats.completed + stats.failed, 0);
    assert!(stats.team_one_win_rate.abs() < f64::EPSILON);
}

#[test]
fn test_short_timeout_fails_every_job() {
    let stats = batch(BatchConfig {
        simulations: 16,
        workers: 4,
        job_timeout: Duration::from_millis(1),
        strategy_names: names("sleepy", "sleepy"),
        ..BatchConfig::default()
    })
    .run()
    .unwrap();
    assert_eq!(stats.timed_out, 16);
    assert_eq!(stats.failed, 16);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.panicked, 0);
}

#[test]
fn test_panics_are_isolated() {
    let stats = batch(BatchConfig {
        simulations: 60,
        workers: 4,
        strategy_names: names("flaky", "half"),
        ..BatchConfig::default()
    })
    .run()
    .unwrap();
    assert_eq!(stats.completed + stats.failed, 60);
    assert_eq!(stats.failed, stats.panicked);
    assert!(stats.panicked > 0);
    assert!(stats.completed > 0);
}

#[test]
fn test_sequential_contains_panics() {
    let stats = batch(BatchConfig {
        simulations: 30,
        sequential: true,
        strategy_names: names("flaky", "half"),
        ..BatchConfig::default()
    })
    .run()
    .unwrap();
    assert_eq!(stats.completed + stats.failed, 30);
    assert_eq!(stats.failed, stats.panicked);
}

#[test]
fn test_identical_strategies_are_symmetric() {
    let stats = batch(BatchConfig {
        simulations: 10_000,
        workers: 4,
        base_seed: 12_345,
        strategy_names: names("half", "half"),
        ..BatchConfig::default()
    })
    .run()
    .unwrap();
    assert_eq!(stats.completed, 10_000);
    assert!(
        (stats.team_one_win_rate - 0.5).abs() < 0.03,
        "team one won {:.3}",
        stats.team_one_win_rate
    );
    assert!((stats.team_one_win_rate + stats.team_two_win_rate - 1.0).abs() < 1e-9);
}

#[test]
fn test_cancel_mid_batch() {
    let cancel = CancelToken::new();
    let b = batch(BatchConfig {
        simulations: 200,
        workers: 2,
        strategy_names: names("sleepy", "sleepy"),
        ..BatchConfig::default()
    })
    .with_cancel(cancel.clone());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
    });
    let stats = b.run().unwrap();
    canceller.join().unwrap();

    assert_eq!(stats.completed + stats.failed, 200);
    assert!(stats.cancelled > 0);
}

#[test]
fn test_export_writes_every_game() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonDirSink::create(dir.path()).unwrap();
    let stats = batch(BatchConfig {
        simulations: 12,
        workers: 3,
        keep_history: true,
        strategy_names: names("all_in", "half"),
        ..BatchConfig::default()
    })
    .with_sink(Box::new(sink))
    .run()
    .unwrap();
    assert_eq!(stats.completed, 12);
    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 12);
}
