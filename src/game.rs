//! Round and match engine.
//!
//! - Sides, round-end reasons and team slots
//! - Team ledger (funds, equipment, score, streaks, loss bonus)
//! - Outcome sampling from the distribution tables
//! - Economic settlement
//! - The match state machine

mod economy;
mod outcome;
mod round;
mod state;
mod team;
mod types;

pub use economy::{next_loss_bonus_level, settle_round, Settlement};
pub use outcome::{determine_round_outcome, resolve_outcome, OutcomeDraws, RoundOutcome};
pub use round::{RoundRecord, TeamRound};
pub use state::{Game, GamePhase, GameResult, GameSetup};
pub use team::{Team, TeamEconomics};
pub use types::{RoundEndReason, Side, TeamSlot};
