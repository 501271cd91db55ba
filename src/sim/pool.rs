//! Fixed-size worker pool.
//!
//! ```text
//! submit ──▶ [jobs: bounded 2W] ──▶ worker × W ──▶ [results: bounded 2W] ──▶ collector
//! ```
//!
//! Shutdown order matters: [`WorkerPool::stop`] closes the job channel,
//! joins every worker, and only then drops the last results sender, so no
//! worker can ever publish into a closed channel. Dropping a pool that was
//! never stopped abandons it instead: the batch is cancelled and workers
//! stop publishing, so a full results channel cannot hold up the drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::{debug, warn};

use super::job::run_isolated;
use super::{CancelToken, JobFailure, SimulationJob, SimulationResult};

/// Long-lived workers consuming [`SimulationJob`]s.
#[derive(Debug)]
pub struct WorkerPool {
    jobs_tx: Option<Sender<SimulationJob>>,
    results_tx: Option<Sender<SimulationResult>>,
    results_rx: Option<Receiver<SimulationResult>>,
    abandon_tx: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Start `workers` threads (at least one).
    ///
    /// Each job runs under `job_timeout`. While `memory_pressure` is set,
    /// jobs are played without round history.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned.
    pub fn spawn(
        workers: usize,
        job_timeout: Duration,
        cancel: CancelToken,
        memory_pressure: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let (jobs_tx, jobs_rx) = bounded::<SimulationJob>(workers * 2);
        let (results_tx, results_rx) = bounded::<SimulationResult>(workers * 2);
        let (abandon_tx, abandon_rx) = bounded::<()>(0);

        let mut pool = Self {
            jobs_tx: Some(jobs_tx),
            results_tx: None,
            results_rx: Some(results_rx),
            abandon_tx: Some(abandon_tx),
            workers: Vec::with_capacity(workers),
            cancel: cancel.clone(),
        };

        for index in 0..workers {
            let jobs = jobs_rx.clone();
            let results = results_tx.clone();
            let abandon = abandon_rx.clone();
            let cancel = cancel.clone();
            let pressure = Arc::clone(&memory_pressure);
            let handle = thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || {
                    let outbox = Outbox {
                        results: &results,
                        abandon: &abandon,
                    };
                    worker_loop(index, &jobs, &outbox, job_timeout, &cancel, &pressure);
                });
            match handle {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    pool.results_tx = Some(results_tx);
                    pool.stop();
                    return Err(e);
                }
            }
        }
        pool.results_tx = Some(results_tx);
        debug!(workers, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Receiver for finished jobs. Disconnects once [`WorkerPool::stop`]
    /// has returned and every result has been taken.
    ///
    /// The results channel is bounded: whoever holds this receiver must keep
    /// draining it while [`WorkerPool::stop`] runs, or stop waits on the
    /// workers forever. Results nobody asked for before `stop` are discarded.
    /// After `stop`, the returned receiver is already disconnected.
    #[must_use]
    pub fn results(&self) -> Receiver<SimulationResult> {
        match &self.results_rx {
            Some(rx) => rx.clone(),
            None => bounded(0).1,
        }
    }

    /// Queue a job, blocking while the queue is full.
    ///
    /// Returns `false` without queueing once the pool is stopping or the
    /// batch has been cancelled.
    pub fn submit(&self, job: SimulationJob) -> bool {
        let Some(jobs) = &self.jobs_tx else {
            return false;
        };
        if self.cancel.is_cancelled() {
            return false;
        }
        select! {
            send(jobs, job) -> res => res.is_ok(),
            recv(self.cancel.signal()) -> _ => false,
        }
    }

    /// Close the job queue, wait for the workers to drain it, then close
    /// the results channel. Idempotent.
    pub fn stop(&mut self) {
        drop(self.jobs_tx.take());
        // Without an outside receiver, sends fail and workers exit early.
        drop(self.results_rx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        drop(self.results_tx.take());
        drop(self.abandon_tx.take());
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            warn!(workers = self.workers.len(), "worker pool dropped without stop, abandoning jobs");
            self.cancel.cancel();
            drop(self.abandon_tx.take());
        }
        self.stop();
    }
}

/// Where a worker publishes, and the signal to give up publishing.
struct Outbox<'a> {
    results: &'a Sender<SimulationResult>,
    /// Disconnects when the pool is abandoned.
    abandon: &'a Receiver<()>,
}

impl Outbox<'_> {
    /// Returns `false` once nobody will read the result.
    fn publish(&self, result: SimulationResult) -> bool {
        select! {
            send(self.results, result) -> res => res.is_ok(),
            recv(self.abandon) -> _ => false,
        }
    }
}

fn worker_loop(
    index: usize,
    jobs: &Receiver<SimulationJob>,
    outbox: &Outbox<'_>,
    timeout: Duration,
    cancel: &CancelToken,
    pressure: &AtomicBool,
) {
    for mut job in jobs {
        let result = if cancel.is_cancelled() {
            SimulationResult::failed(&job, JobFailure::Cancelled)
        } else {
            if pressure.load(Ordering::Relaxed) {
                job.setup.keep_history = false;
            }
            let mut result = run_isolated(job, timeout, cancel);
            if pressure.load(Ordering::Relaxed) {
                result.drop_rounds();
            }
            result
        };
        if !outbox.publish(result) {
            break;
        }
    }
    debug!(worker = index, "worker exiting");
}
