// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Buyround: a stochastic simulator of a two-team buy-round economy.
//!
//! Each round both teams decide how much to invest, a contest success
//! function turns the two equipment totals into a CT win probability, and
//! the round outcome (winner, end reason, bomb, survivors, saved equipment)
//! is drawn from empirical distributions. Settlement then moves money
//! according to the economic rules, and the match runs to its score target
//! through halves and overtime periods.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  sim: Batch, WorkerPool, stats, monitors    │
//! ├─────────────────────────────────────────────┤
//! │  game: Game state machine, Team ledger      │
//! ├──────────────────────┬──────────────────────┤
//! │  strategy: registry  │  distributions, csf  │
//! ├──────────────────────┴──────────────────────┤
//! │  rules: GameRules                           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A single game is deterministic for a given seed; batches give game `i`
//! the seed `base_seed + i`.

pub mod csf;
pub mod distributions;
pub mod error;
pub mod game;
pub mod rules;
pub mod sim;
pub mod strategy;

pub use csf::{contest_success, DEFAULT_CSF_EXPONENT};
pub use distributions::{sample_from_cdf, CdfEntry, DistributionTable};
pub use error::{DistributionError, RulesError, SimError, StrategyError};
pub use game::{Game, GameResult, GameSetup, RoundEndReason, RoundOutcome, Side, TeamSlot};
pub use rules::GameRules;
pub use sim::{run_batch, Batch, BatchConfig, CancelToken, FinalStats, JobFailure, SimulationStats, WorkerPool};
pub use strategy::{Strategy, StrategyContext, StrategyRegistry};
