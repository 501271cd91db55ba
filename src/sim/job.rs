//! One simulated game as a unit of pool work.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, select};
use serde::Serialize;
use tracing::{debug, warn};

use super::CancelToken;
use crate::game::{Game, GameResult, GameSetup};

/// A game to simulate.
#[derive(Debug, Clone)]
pub struct SimulationJob {
    /// Position in the batch, starting at 0.
    pub id: u64,
    /// Everything the game needs, including its seed.
    pub setup: GameSetup,
}

/// Why a job produced no game result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobFailure {
    /// The game panicked; holds the panic message.
    Panicked(String),
    /// The game did not finish within the job timeout.
    TimedOut(Duration),
    /// The batch was cancelled before or while the job ran.
    Cancelled,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(msg) => write!(f, "simulation panicked: {msg}"),
            Self::TimedOut(limit) => write!(f, "simulation timed out after {limit:?}"),
            Self::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

/// What came back from one job.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Job id.
    pub id: u64,
    /// Seed the game was (or would have been) played with.
    pub seed: u64,
    /// Wall time spent on the job.
    pub elapsed: Duration,
    /// The finished game or the reason there is none.
    pub outcome: Result<GameResult, JobFailure>,
}

impl SimulationResult {
    pub(crate) fn failed(job: &SimulationJob, failure: JobFailure) -> Self {
        Self {
            id: job.id,
            seed: job.setup.seed,
            elapsed: Duration::ZERO,
            outcome: Err(failure),
        }
    }

    /// Whether the game finished.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The finished game, if any.
    #[must_use]
    pub fn game(&self) -> Option<&GameResult> {
        self.outcome.as_ref().ok()
    }

    /// Discard the game's round history, if there is a game.
    pub fn drop_rounds(&mut self) {
        if let Ok(game) = &mut self.outcome {
            game.drop_rounds();
        }
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&JobFailure> {
        self.outcome.as_ref().err()
    }
}

/// Play the game on the calling thread, turning a panic into a failure.
pub(crate) fn run_inline(job: SimulationJob) -> SimulationResult {
    let started = Instant::now();
    let SimulationJob { id, setup } = job;
    let seed = setup.seed;
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || Game::new(setup).run()))
        .map_err(|payload| JobFailure::Panicked(panic_message(payload.as_ref())));
    SimulationResult {
        id,
        seed,
        elapsed: started.elapsed(),
        outcome,
    }
}

/// Play the game on its own thread and wait for whichever comes first:
/// the result, `timeout`, or cancellation.
///
/// A game that loses the race keeps running in the background. Its
/// result is discarded because the receiving end is gone by then.
pub(crate) fn run_isolated(job: SimulationJob, timeout: Duration, cancel: &CancelToken) -> SimulationResult {
    let started = Instant::now();
    let id = job.id;
    let seed = job.setup.seed;
    let (done_tx, done_rx) = bounded(1);

    let spawned = thread::Builder::new().name(format!("sim-{id}")).spawn(move || {
        let result = run_inline(job);
        // Capacity 1: never blocks, fails only when nobody is waiting.
        let _ = done_tx.send(result);
    });
    if let Err(e) = spawned {
        warn!(id, error = %e, "could not spawn simulation thread");
        return SimulationResult {
            id,
            seed,
            elapsed: started.elapsed(),
            outcome: Err(JobFailure::Panicked(format!("could not spawn simulation thread: {e}"))),
        };
    }

    let outcome = select! {
        recv(done_rx) -> msg => match msg {
            Ok(result) => return result,
            Err(_) => Err(JobFailure::Panicked("simulation thread exited without a result".to_string())),
        },
        recv(after(timeout)) -> _ => {
            debug!(id, ?timeout, "simulation abandoned after timeout");
            Err(JobFailure::TimedOut(timeout))
        },
        recv(cancel.signal()) -> _ => Err(JobFailure::Cancelled),
    };

    SimulationResult {
        id,
        seed,
        elapsed: started.elapsed(),
        outcome,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::test_table;
    use crate::rules::GameRules;
    use crate::strategy::{Strategy, StrategyContext, StrategyRegistry};
    use rand::RngCore;
    use std::sync::Arc;

    fn job(id: u64, strategy: Arc<dyn Strategy>) -> SimulationJob {
        SimulationJob {
            id,
            setup: GameSetup {
                rules: Arc::new(GameRules::default()),
                table: Arc::new(test_table()),
                team_names: ["A".to_string(), "B".to_string()],
                strategy_names: ["x".to_string(), "x".to_string()],
                strategies: [Arc::clone(&strategy), strategy],
                seed: 100 + id,
                keep_history: false,
            },
        }
    }

    fn exploding(_: &StrategyContext<'_>, _: &mut dyn RngCore) -> f64 {
        panic!("strategy blew up")
    }

    fn sleepy(_: &StrategyContext<'_>, _: &mut dyn RngCore) -> f64 {
        thread::sleep(Duration::from_millis(50));
        0.0
    }

    #[test]
    fn test_completes() {
        let half = StrategyRegistry::with_builtins().get("half").unwrap();
        let result = run_isolated(job(1, half), Duration::from_secs(30), &CancelToken::new());
        assert!(result.is_success());
        assert_eq!(result.seed, 101);
        assert!(result.game().unwrap().total_rounds >= 16);
    }

    #[test]
    fn test_panic_is_contained() {
        let result = run_isolated(job(2, Arc::new(exploding)), Duration::from_secs(30), &CancelToken::new());
        match result.failure() {
            Some(JobFailure::Panicked(msg)) => assert!(msg.contains("strategy blew up")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_times_out() {
        let limit = Duration::from_millis(5);
        let result = run_isolated(job(3, Arc::new(sleepy)), limit, &CancelToken::new());
        assert_eq!(result.failure(), Some(&JobFailure::TimedOut(limit)));
    }

    #[test]
    fn test_cancelled_job_returns_promptly() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = run_isolated(job(4, Arc::new(sleepy)), Duration::from_secs(30), &cancel);
        assert_eq!(result.failure(), Some(&JobFailure::Cancelled));
        assert!(result.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(JobFailure::Cancelled.to_string(), "simulation cancelled");
        assert!(JobFailure::TimedOut(Duration::from_secs(1)).to_string().contains("timed out"));
    }
}
