//! Archived record of one played round.

use serde::Serialize;

use crate::game::{RoundOutcome, Side, TeamSlot};

/// Per-team view of a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamRound {
    /// Side played.
    pub side: Side,
    /// Funds before buying.
    pub funds_before: f64,
    /// Amount invested.
    pub spent: f64,
    /// Equipment fielded (carried over plus spent).
    pub equipment: f64,
    /// Amount earned at settlement.
    pub earned: f64,
    /// Funds after settlement and the cap.
    pub funds_after: f64,
    /// Loss-bonus level after settlement.
    pub loss_bonus_level: usize,
}

/// Everything recorded about one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    /// 1-based round number.
    pub number: u32,
    /// Whether the round was played in overtime.
    pub overtime: bool,
    /// CT win probability from the CSF.
    pub ct_win_probability: f64,
    /// Sampled outcome.
    pub outcome: RoundOutcome,
    /// Winning team.
    pub winner: TeamSlot,
    /// Team one, then team two.
    pub teams: [TeamRound; 2],
    /// Score after the round, team one first.
    pub score: [u32; 2],
}

impl RoundRecord {
    /// Per-team data for `slot`.
    #[must_use]
    pub fn team(&self, slot: TeamSlot) -> &TeamRound {
        &self.teams[slot.index()]
    }
}
