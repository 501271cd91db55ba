//! Batch simulation.
//!
//! ```text
//!            ┌──────────── CancelToken ─────────────┐
//!            ▼                                      ▼
//! Batch ──▶ WorkerPool ──▶ collector ──▶ SimulationStats ──▶ FinalStats
//!   │                         │               ▲
//!   │                         └──▶ ResultSink │
//!   └──▶ memory monitor ──────────────────────┤
//!   └──▶ progress reporter ───────────────────┘ (reads)
//! ```
//!
//! Each game is owned by exactly one thread. The only shared mutable state
//! is the atomics inside [`SimulationStats`] and the memory-pressure flag.

mod batch;
mod cancel;
mod job;
mod monitor;
mod pool;
mod sink;
mod stats;

pub use batch::{
    default_workers, run_batch, Batch, BatchConfig, DEFAULT_JOB_TIMEOUT, DEFAULT_MEMORY_CEILING_MB,
    DEFAULT_MEMORY_INTERVAL,
};
pub use cancel::CancelToken;
pub use job::{JobFailure, SimulationJob, SimulationResult};
pub use monitor::{
    progress_interval, resident_memory_bytes, spawn_memory_monitor, spawn_progress_reporter, MemoryMonitorConfig,
    LARGE_BATCH, LARGE_BATCH_PROGRESS_INTERVAL, PROGRESS_INTERVAL,
};
pub use pool::WorkerPool;
pub use sink::{game_file_name, JsonDirSink, ResultSink};
pub use stats::{FinalStats, SimulationStats, BLOWOUT_MARGIN, CLOSE_GAME_MARGIN, ROUND_HISTOGRAM_SLOTS};
