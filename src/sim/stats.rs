//! Lock-free batch statistics.
//!
//! Producers (the collector thread, and the submitting thread for rejected
//! jobs) only ever touch atomics. [`SimulationStats::calculate_final_stats`]
//! reads them once every producer has been joined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::{JobFailure, SimulationResult};
use crate::game::GameResult;

/// Round counts at or above this share the last histogram slot.
pub const ROUND_HISTOGRAM_SLOTS: usize = 64;

/// Margin at or below which a game counts as close.
pub const CLOSE_GAME_MARGIN: u32 = 3;

/// Margin above which a game counts as a blowout.
pub const BLOWOUT_MARGIN: u32 = 10;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Shared counters for one batch.
#[derive(Debug)]
pub struct SimulationStats {
    total: u64,
    started: Instant,

    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,

    team_one_wins: AtomicU64,
    team_two_wins: AtomicU64,
    team_one_regulation_wins: AtomicU64,
    team_one_overtime_wins: AtomicU64,
    team_two_regulation_wins: AtomicU64,
    team_two_overtime_wins: AtomicU64,
    overtime_games: AtomicU64,
    close_games: AtomicU64,
    blowouts: AtomicU64,

    score_one_total: AtomicU64,
    score_two_total: AtomicU64,
    rounds_total: AtomicU64,
    rounds_squared_total: AtomicU64,
    round_histogram: [AtomicU64; ROUND_HISTOGRAM_SLOTS],

    peak_memory_bytes: AtomicU64,
    memory_pressure_events: AtomicU64,
}

impl SimulationStats {
    /// Fresh counters for a batch of `total` jobs. The processing-rate
    /// clock starts now.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            started: Instant::now(),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            team_one_wins: AtomicU64::new(0),
            team_two_wins: AtomicU64::new(0),
            team_one_regulation_wins: AtomicU64::new(0),
            team_one_overtime_wins: AtomicU64::new(0),
            team_two_regulation_wins: AtomicU64::new(0),
            team_two_overtime_wins: AtomicU64::new(0),
            overtime_games: AtomicU64::new(0),
            close_games: AtomicU64::new(0),
            blowouts: AtomicU64::new(0),
            score_one_total: AtomicU64::new(0),
            score_two_total: AtomicU64::new(0),
            rounds_total: AtomicU64::new(0),
            rounds_squared_total: AtomicU64::new(0),
            round_histogram: std::array::from_fn(|_| AtomicU64::new(0)),
            peak_memory_bytes: AtomicU64::new(0),
            memory_pressure_events: AtomicU64::new(0),
        }
    }

    /// Jobs in the batch.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Jobs that produced a game.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Jobs that failed.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Jobs accounted for so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.completed() + self.failed()
    }

    /// Time since the counters were created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fold one finished game into the counters.
    pub fn update_game_result(
        &self,
        team_one_won: bool,
        score_one: u32,
        score_two: u32,
        total_rounds: u32,
        went_to_overtime: bool,
    ) {
        self.completed.fetch_add(1, Ordering::Relaxed);

        let (wins, split) = match (team_one_won, went_to_overtime) {
            (true, false) => (&self.team_one_wins, &self.team_one_regulation_wins),
            (true, true) => (&self.team_one_wins, &self.team_one_overtime_wins),
            (false, false) => (&self.team_two_wins, &self.team_two_regulation_wins),
            (false, true) => (&self.team_two_wins, &self.team_two_overtime_wins),
        };
        wins.fetch_add(1, Ordering::Relaxed);
        split.fetch_add(1, Ordering::Relaxed);
        if went_to_overtime {
            self.overtime_games.fetch_add(1, Ordering::Relaxed);
        }

        let margin = score_one.abs_diff(score_two);
        if margin <= CLOSE_GAME_MARGIN {
            self.close_games.fetch_add(1, Ordering::Relaxed);
        } else if margin > BLOWOUT_MARGIN {
            self.blowouts.fetch_add(1, Ordering::Relaxed);
        }

        let rounds = u64::from(total_rounds);
        self.score_one_total.fetch_add(u64::from(score_one), Ordering::Relaxed);
        self.score_two_total.fetch_add(u64::from(score_two), Ordering::Relaxed);
        self.rounds_total.fetch_add(rounds, Ordering::Relaxed);
        self.rounds_squared_total.fetch_add(rounds * rounds, Ordering::Relaxed);
        let slot = usize::try_from(total_rounds).map_or(ROUND_HISTOGRAM_SLOTS - 1, |r| r.min(ROUND_HISTOGRAM_SLOTS - 1));
        self.round_histogram[slot].fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed job.
    pub fn record_failure(&self, failure: &JobFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let counter = match failure {
            JobFailure::Panicked(_) => &self.panicked,
            JobFailure::TimedOut(_) => &self.timed_out,
            JobFailure::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a game.
    pub fn record_game(&self, game: &GameResult) {
        let [one, two] = game.scores;
        self.update_game_result(game.team_one_won(), one, two, game.total_rounds, game.went_to_overtime);
    }

    /// Count whatever came back from a job.
    pub fn record(&self, result: &SimulationResult) {
        match &result.outcome {
            Ok(game) => self.record_game(game),
            Err(failure) => self.record_failure(failure),
        }
    }

    /// Raise the recorded peak to `bytes` if it is higher. Returns the peak
    /// after the update.
    pub fn observe_memory(&self, bytes: u64) -> u64 {
        let mut current = self.peak_memory_bytes.load(Ordering::Relaxed);
        while bytes > current {
            match self.peak_memory_bytes.compare_exchange_weak(
                current,
                bytes,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return bytes,
                Err(actual) => current = actual,
            }
        }
        current
    }

    /// Count one sample taken above the memory ceiling.
    pub fn record_memory_pressure(&self) {
        self.memory_pressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Highest memory sample seen, in bytes.
    #[must_use]
    pub fn peak_memory_bytes(&self) -> u64 {
        self.peak_memory_bytes.load(Ordering::Relaxed)
    }

    /// Derive rates and summary figures.
    ///
    /// Call only after every producer has stopped; the counters are read
    /// one at a time and would not form a consistent snapshot otherwise.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_final_stats(&self) -> FinalStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        let completed = load(&self.completed);
        let failed = load(&self.failed);
        let processed = completed + failed;
        let team_one_wins = load(&self.team_one_wins);
        let team_two_wins = load(&self.team_two_wins);
        let overtime_games = load(&self.overtime_games);
        let histogram: Vec<u64> = self.round_histogram.iter().map(load).collect();

        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();

        let (average_rounds, round_std_dev) = if completed == 0 {
            (0.0, 0.0)
        } else {
            let n = completed as f64;
            let mean = load(&self.rounds_total) as f64 / n;
            let variance = (load(&self.rounds_squared_total) as f64 / n - mean * mean).max(0.0);
            (mean, variance.sqrt())
        };

        FinalStats {
            total_simulations: self.total,
            completed,
            failed,
            panicked: load(&self.panicked),
            timed_out: load(&self.timed_out),
            cancelled: load(&self.cancelled),
            team_one_wins,
            team_two_wins,
            team_one_win_rate: ratio(team_one_wins, completed),
            team_two_win_rate: ratio(team_two_wins, completed),
            team_one_regulation_wins: load(&self.team_one_regulation_wins),
            team_one_overtime_wins: load(&self.team_one_overtime_wins),
            team_two_regulation_wins: load(&self.team_two_regulation_wins),
            team_two_overtime_wins: load(&self.team_two_overtime_wins),
            overtime_games,
            overtime_rate: ratio(overtime_games, completed),
            close_games: load(&self.close_games),
            blowouts: load(&self.blowouts),
            average_score: [
                ratio(load(&self.score_one_total), completed),
                ratio(load(&self.score_two_total), completed),
            ],
            average_rounds,
            median_rounds: histogram_median(&histogram),
            round_std_dev,
            round_histogram: trim_histogram(histogram),
            failure_rate: ratio(failed, processed),
            elapsed_secs: secs,
            simulations_per_second: if secs > 0.0 { processed as f64 / secs } else { 0.0 },
            peak_memory_mb: load(&self.peak_memory_bytes) as f64 / BYTES_PER_MB,
            memory_pressure_events: load(&self.memory_pressure_events),
        }
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalStats {
    /// Jobs in the batch.
    pub total_simulations: u64,
    /// Jobs that produced a game.
    pub completed: u64,
    /// Jobs that did not.
    pub failed: u64,
    /// Failed by panic.
    pub panicked: u64,
    /// Failed by timeout.
    pub timed_out: u64,
    /// Failed by cancellation.
    pub cancelled: u64,
    /// Games won by team one.
    pub team_one_wins: u64,
    /// Games won by team two.
    pub team_two_wins: u64,
    /// Team one wins over completed games.
    pub team_one_win_rate: f64,
    /// Team two wins over completed games.
    pub team_two_win_rate: f64,
    /// Team one wins without overtime.
    pub team_one_regulation_wins: u64,
    /// Team one wins in overtime.
    pub team_one_overtime_wins: u64,
    /// Team two wins without overtime.
    pub team_two_regulation_wins: u64,
    /// Team two wins in overtime.
    pub team_two_overtime_wins: u64,
    /// Games that reached overtime.
    pub overtime_games: u64,
    /// Overtime games over completed games.
    pub overtime_rate: f64,
    /// Games decided by a small margin.
    pub close_games: u64,
    /// Games decided by a large margin.
    pub blowouts: u64,
    /// Mean final score, team one first.
    pub average_score: [f64; 2],
    /// Mean rounds per game.
    pub average_rounds: f64,
    /// Median rounds per game.
    pub median_rounds: u32,
    /// Population standard deviation of rounds per game.
    pub round_std_dev: f64,
    /// `round_histogram[r]` = games that lasted `r` rounds. Trailing zeros
    /// are trimmed.
    pub round_histogram: Vec<u64>,
    /// Failed over processed.
    pub failure_rate: f64,
    /// Wall time from stats creation to finalisation.
    pub elapsed_secs: f64,
    /// Processed jobs per second.
    pub simulations_per_second: f64,
    /// Highest sampled resident memory.
    pub peak_memory_mb: f64,
    /// Samples taken above the memory ceiling.
    pub memory_pressure_events: u64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Lower median of the histogram.
fn histogram_median(histogram: &[u64]) -> u32 {
    let count: u64 = histogram.iter().sum();
    if count == 0 {
        return 0;
    }
    let rank = count.div_ceil(2);
    let mut seen = 0;
    for (rounds, &n) in histogram.iter().enumerate() {
        seen += n;
        if seen >= rank {
            return u32::try_from(rounds).unwrap_or(u32::MAX);
        }
    }
    0
}

fn trim_histogram(mut histogram: Vec<u64>) -> Vec<u64> {
    while histogram.last() == Some(&0) {
        histogram.pop();
    }
    histogram
}
