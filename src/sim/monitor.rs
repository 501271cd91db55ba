//! Background memory and progress monitors.
//!
//! Both loops wake on a ticker and exit on whichever comes first: the
//! batch's cancel signal or the `done` channel closing when the batch
//! finishes.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};
use tracing::{debug, info, warn};

use super::{CancelToken, SimulationStats};

/// Batches at least this large report progress less often.
pub const LARGE_BATCH: u64 = 100_000;

/// Progress interval for ordinary batches.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Progress interval for batches of [`LARGE_BATCH`] jobs or more.
pub const LARGE_BATCH_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Page size assumed when converting `/proc/self/statm` pages to bytes.
const PAGE_SIZE: u64 = 4096;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Progress interval for a batch of `total` jobs.
#[must_use]
pub const fn progress_interval(total: u64) -> Duration {
    if total >= LARGE_BATCH {
        LARGE_BATCH_PROGRESS_INTERVAL
    } else {
        PROGRESS_INTERVAL
    }
}

/// Resident set size of this process, where the platform exposes it.
#[must_use]
pub fn resident_memory_bytes() -> Option<u64> {
    let statm = fs::read_to_string("/proc/self/statm").ok()?;
    parse_statm(&statm)
}

fn parse_statm(statm: &str) -> Option<u64> {
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * PAGE_SIZE)
}

/// Settings for [`spawn_memory_monitor`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryMonitorConfig {
    /// Ceiling in megabytes.
    pub ceiling_mb: u64,
    /// Time between samples.
    pub interval: Duration,
}

/// Sample resident memory every `interval`, keep the peak in `stats`, and
/// hold `pressure` high while usage is above the ceiling.
///
/// There is no collector to force in Rust; the pressure flag makes the
/// pool stop keeping round history, which is where a batch's memory goes.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_memory_monitor(
    config: MemoryMonitorConfig,
    stats: Arc<SimulationStats>,
    pressure: Arc<AtomicBool>,
    cancel: CancelToken,
    done: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    let ceiling = config.ceiling_mb.saturating_mul(BYTES_PER_MB);
    thread::Builder::new().name("memory-monitor".to_string()).spawn(move || {
        let ticker = tick(config.interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    let Some(bytes) = resident_memory_bytes() else {
                        debug!("resident memory not available on this platform");
                        return;
                    };
                    sample_memory(bytes, ceiling, &stats, &pressure);
                },
                recv(cancel.signal()) -> _ => break,
                recv(done) -> _ => break,
            }
        }
        debug!("memory monitor exiting");
    })
}

fn sample_memory(bytes: u64, ceiling: u64, stats: &SimulationStats, pressure: &AtomicBool) {
    stats.observe_memory(bytes);
    let over = bytes > ceiling;
    let was_over = pressure.swap(over, Ordering::Relaxed);
    if over {
        stats.record_memory_pressure();
        if !was_over {
            warn!(
                used_mb = bytes / BYTES_PER_MB,
                ceiling_mb = ceiling / BYTES_PER_MB,
                "memory above ceiling, dropping round history"
            );
        }
    } else if was_over {
        info!(used_mb = bytes / BYTES_PER_MB, "memory back under ceiling");
    }
}

/// Log completed/total every `interval`.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_progress_reporter(
    stats: Arc<SimulationStats>,
    interval: Duration,
    cancel: CancelToken,
    done: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("progress".to_string()).spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => report(&stats),
                recv(cancel.signal()) -> _ => break,
                recv(done) -> _ => break,
            }
        }
    })
}

#[allow(clippy::cast_precision_loss)]
fn report(stats: &SimulationStats) {
    let processed = stats.processed();
    let total = stats.total();
    let secs = stats.elapsed().as_secs_f64();
    let rate = if secs > 0.0 { processed as f64 / secs } else { 0.0 };
    let percent = if total == 0 { 100.0 } else { processed as f64 * 100.0 / total as f64 };
    info!(
        processed,
        total,
        failed = stats.failed(),
        percent = (percent * 10.0).round() / 10.0,
        per_sec = rate.round(),
        "progress"
    );
}
