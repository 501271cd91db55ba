//! Batch driver: configuration, parallel and sequential runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::job::run_inline;
use super::monitor::{progress_interval, spawn_memory_monitor, spawn_progress_reporter, MemoryMonitorConfig};
use super::{
    CancelToken, FinalStats, JobFailure, ResultSink, SimulationJob, SimulationResult, SimulationStats, WorkerPool,
};
use crate::distributions::DistributionTable;
use crate::error::SimError;
use crate::game::GameSetup;
use crate::rules::GameRules;
use crate::strategy::{Strategy, StrategyRegistry};

/// Default per-job timeout.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default memory ceiling in megabytes.
pub const DEFAULT_MEMORY_CEILING_MB: u64 = 3000;

/// Default time between memory samples.
pub const DEFAULT_MEMORY_INTERVAL: Duration = Duration::from_secs(5);

/// Worker count that leaves a fifth of the machine free, at least one.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| (n.get() * 4 / 5).max(1))
}

/// How a batch is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchConfig {
    /// Games to play.
    pub simulations: u64,
    /// Worker threads for a parallel run.
    pub workers: usize,
    /// Per-game time limit for a parallel run.
    pub job_timeout: Duration,
    /// Memory ceiling; above it games stop keeping round history.
    pub memory_ceiling_mb: u64,
    /// Time between memory samples.
    pub memory_interval: Duration,
    /// Time between progress lines. `None` picks one from the batch size.
    pub progress_interval: Option<Duration>,
    /// Game `id` is seeded with `base_seed + id`.
    pub base_seed: u64,
    /// Team names, team one first.
    pub team_names: [String; 2],
    /// Strategy identifiers, team one first.
    pub strategy_names: [String; 2],
    /// Keep round-by-round history in each result.
    pub keep_history: bool,
    /// Play games one after another on the calling thread.
    pub sequential: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            simulations: 1000,
            workers: default_workers(),
            job_timeout: DEFAULT_JOB_TIMEOUT,
            memory_ceiling_mb: DEFAULT_MEMORY_CEILING_MB,
            memory_interval: DEFAULT_MEMORY_INTERVAL,
            progress_interval: None,
            base_seed: 0,
            team_names: ["Team 1".to_string(), "Team 2".to_string()],
            strategy_names: ["all_in".to_string(), "all_in".to_string()],
            keep_history: false,
            sequential: false,
        }
    }
}

impl BatchConfig {
    /// Reject settings no batch can run with.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.workers == 0 {
            return Err(SimError::Config("workers must be at least 1".to_string()));
        }
        if self.job_timeout.is_zero() {
            return Err(SimError::Config("job timeout must be positive".to_string()));
        }
        if self.memory_interval.is_zero() {
            return Err(SimError::Config("memory sample interval must be positive".to_string()));
        }
        if self.progress_interval.is_some_and(|i| i.is_zero()) {
            return Err(SimError::Config("progress interval must be positive".to_string()));
        }
        Ok(())
    }

    fn resolved_progress_interval(&self) -> Duration {
        self.progress_interval
            .unwrap_or_else(|| progress_interval(self.simulations))
    }
}

/// A validated batch, ready to run.
pub struct Batch {
    config: BatchConfig,
    rules: Arc<GameRules>,
    table: Arc<DistributionTable>,
    strategies: [Arc<dyn Strategy>; 2],
    sink: Option<Box<dyn ResultSink>>,
    progress: Option<ProgressBar>,
    cancel: CancelToken,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("config", &self.config)
            .field("has_sink", &self.sink.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Batch {
    /// Resolve both strategies and check the configuration.
    ///
    /// # Errors
    ///
    /// An unknown strategy name or an invalid setting. Nothing has run yet.
    pub fn new(
        config: BatchConfig,
        rules: Arc<GameRules>,
        table: Arc<DistributionTable>,
        registry: &StrategyRegistry,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let [one, two] = &config.strategy_names;
        let strategies = [registry.get(one)?, registry.get(two)?];
        Ok(Self {
            config,
            rules,
            table,
            strategies,
            sink: None,
            progress: None,
            cancel: CancelToken::new(),
        })
    }

    /// Send every finished game to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Advance `bar` once per processed job.
    #[must_use]
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels this batch.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Configuration the batch runs with.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The job for game `id`.
    #[must_use]
    pub fn job(&self, id: u64) -> SimulationJob {
        SimulationJob {
            id,
            setup: GameSetup {
                rules: Arc::clone(&self.rules),
                table: Arc::clone(&self.table),
                team_names: self.config.team_names.clone(),
                strategy_names: self.config.strategy_names.clone(),
                strategies: self.strategies.clone(),
                seed: self.config.base_seed.wrapping_add(id),
                keep_history: self.config.keep_history,
            },
        }
    }

    /// Run sequentially or in parallel, as configured.
    ///
    /// # Errors
    ///
    /// Only if a background thread cannot be started. Failed games are
    /// counted in the returned stats, never returned as errors.
    pub fn run(self) -> Result<FinalStats, SimError> {
        if self.config.sequential {
            self.run_sequential()
        } else {
            self.run_parallel()
        }
    }

    /// Run on a [`WorkerPool`], with per-job timeouts and panic isolation.
    ///
    /// # Errors
    ///
    /// See [`Batch::run`].
    pub fn run_parallel(mut self) -> Result<FinalStats, SimError> {
        let total = self.config.simulations;
        info!(
            simulations = total,
            workers = self.config.workers,
            timeout = ?self.config.job_timeout,
            memory_ceiling_mb = self.config.memory_ceiling_mb,
            "starting parallel batch"
        );

        let stats = Arc::new(SimulationStats::new(total));
        let pressure = Arc::new(AtomicBool::new(false));
        let monitors = Monitors::start(&self.config, &stats, &pressure, &self.cancel)?;

        let mut pool = WorkerPool::spawn(
            self.config.workers,
            self.config.job_timeout,
            self.cancel.clone(),
            Arc::clone(&pressure),
        )?;
        let collector = spawn_collector(pool.results(), Arc::clone(&stats), self.sink.take(), self.progress.clone())?;

        let mut rejected = 0u64;
        for id in 0..total {
            let job = self.job(id);
            if !pool.submit(job) {
                stats.record_failure(&JobFailure::Cancelled);
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
                rejected += 1;
            }
        }
        if rejected > 0 {
            warn!(rejected, "jobs not submitted, batch was cancelled");
        }

        pool.stop();
        if collector.join().is_err() {
            warn!("result collector panicked");
        }
        drop(monitors);

        Ok(finish(&stats, self.progress.as_ref()))
    }

    /// Run every game on the calling thread. Panics are still contained;
    /// there is no timeout.
    ///
    /// # Errors
    ///
    /// See [`Batch::run`].
    pub fn run_sequential(mut self) -> Result<FinalStats, SimError> {
        let total = self.config.simulations;
        info!(simulations = total, "starting sequential batch");

        let stats = Arc::new(SimulationStats::new(total));
        let pressure = Arc::new(AtomicBool::new(false));
        let monitors = Monitors::start(&self.config, &stats, &pressure, &self.cancel)?;
        let mut sink = self.sink.take();

        for id in 0..total {
            let mut job = self.job(id);
            let result = if self.cancel.is_cancelled() {
                SimulationResult::failed(&job, JobFailure::Cancelled)
            } else {
                if pressure.load(Ordering::Relaxed) {
                    job.setup.keep_history = false;
                }
                run_inline(job)
            };
            absorb(&stats, &mut sink, &result);
            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
        }

        finish_sink(sink);
        drop(monitors);
        Ok(finish(&stats, self.progress.as_ref()))
    }
}

/// Run `batch` as configured.
///
/// # Errors
///
/// See [`Batch::run`].
pub fn run_batch(batch: Batch) -> Result<FinalStats, SimError> {
    batch.run()
}

fn finish(stats: &SimulationStats, bar: Option<&ProgressBar>) -> FinalStats {
    let final_stats = stats.calculate_final_stats();
    if let Some(bar) = bar {
        bar.finish();
    }
    info!(
        completed = final_stats.completed,
        failed = final_stats.failed,
        elapsed_secs = final_stats.elapsed_secs,
        "batch finished"
    );
    final_stats
}

/// Background monitors for one batch. Dropping stops and joins them.
struct Monitors {
    done: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl Monitors {
    fn start(
        config: &BatchConfig,
        stats: &Arc<SimulationStats>,
        pressure: &Arc<AtomicBool>,
        cancel: &CancelToken,
    ) -> std::io::Result<Self> {
        let (done_tx, done_rx): (Sender<()>, Receiver<()>) = bounded(0);
        let mut monitors = Self {
            done: Some(done_tx),
            handles: Vec::with_capacity(2),
        };
        monitors.handles.push(spawn_memory_monitor(
            MemoryMonitorConfig {
                ceiling_mb: config.memory_ceiling_mb,
                interval: config.memory_interval,
            },
            Arc::clone(stats),
            Arc::clone(pressure),
            cancel.clone(),
            done_rx.clone(),
        )?);
        monitors.handles.push(spawn_progress_reporter(
            Arc::clone(stats),
            config.resolved_progress_interval(),
            cancel.clone(),
            done_rx,
        )?);
        Ok(monitors)
    }
}

impl Drop for Monitors {
    fn drop(&mut self) {
        drop(self.done.take());
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("monitor thread panicked");
            }
        }
    }
}

fn spawn_collector(
    results: Receiver<SimulationResult>,
    stats: Arc<SimulationStats>,
    mut sink: Option<Box<dyn ResultSink>>,
    bar: Option<ProgressBar>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("collector".to_string()).spawn(move || {
        for result in &results {
            absorb(&stats, &mut sink, &result);
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }
        finish_sink(sink);
    })
}

fn absorb(stats: &SimulationStats, sink: &mut Option<Box<dyn ResultSink>>, result: &SimulationResult) {
    stats.record(result);
    match &result.outcome {
        Ok(game) => {
            if let Some(sink) = sink.as_mut() {
                if let Err(e) = sink.write(result.id, game) {
                    warn!(id = result.id, error = %e, "failed to persist game result");
                }
            }
        }
        Err(JobFailure::Cancelled) => debug!(id = result.id, "simulation cancelled"),
        Err(failure) => warn!(id = result.id, seed = result.seed, %failure, "simulation failed"),
    }
}

fn finish_sink(sink: Option<Box<dyn ResultSink>>) {
    if let Some(mut sink) = sink {
        if let Err(e) = sink.finish() {
            warn!(error = %e, "result sink did not finish cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::test_table;
    use crate::game::GameResult;
    use std::sync::Mutex;

    fn config(simulations: u64) -> BatchConfig {
        BatchConfig {
            simulations,
            workers: 2,
            strategy_names: ["half".to_string(), "smart_v1".to_string()],
            ..BatchConfig::default()
        }
    }

    fn batch(config: BatchConfig) -> Batch {
        Batch::new(
            config,
            Arc::new(GameRules::default()),
            Arc::new(test_table()),
            &StrategyRegistry::with_builtins(),
        )
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<u64>>>);

    impl ResultSink for Recorder {
        fn write(&mut self, id: u64, _: &GameResult) -> std::io::Result<()> {
            self.0.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = BatchConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 1);
        assert_eq!(config.job_timeout, DEFAULT_JOB_TIMEOUT);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = BatchConfig {
            workers: 0,
            ..BatchConfig::default()
        };
        assert!(matches!(bad.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let config = BatchConfig {
            strategy_names: ["half".to_string(), "nope".to_string()],
            ..BatchConfig::default()
        };
        let err = Batch::new(
            config,
            Arc::new(GameRules::default()),
            Arc::new(test_table()),
            &StrategyRegistry::with_builtins(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown strategy 'nope'"));
    }

    #[test]
    fn test_seeds_follow_ids() {
        let b = batch(BatchConfig {
            base_seed: 1000,
            ..config(3)
        });
        assert_eq!(b.job(0).setup.seed, 1000);
        assert_eq!(b.job(7).setup.seed, 1007);
    }

    #[test]
    fn test_parallel_accounts_for_every_job() {
        let recorder = Recorder::default();
        let stats = batch(config(40)).with_sink(Box::new(recorder.clone())).run().unwrap();
        assert_eq!(stats.completed + stats.failed, 40);
        assert_eq!(stats.completed, 40);
        let mut ids = recorder.0.lock().unwrap().clone();
        ids.sort_unstable();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let parallel = batch(config(30)).run_parallel().unwrap();
        let sequential = batch(config(30)).run_sequential().unwrap();
        assert_eq!(parallel.team_one_wins, sequential.team_one_wins);
        assert_eq!(parallel.round_histogram, sequential.round_histogram);
    }

    #[test]
    fn test_cancelled_batch_still_accounts_for_every_job() {
        let b = batch(config(50));
        b.cancel_token().cancel();
        let stats = b.run().unwrap();
        assert_eq!(stats.completed + stats.failed, 50);
        assert_eq!(stats.cancelled, 50);
    }
}
