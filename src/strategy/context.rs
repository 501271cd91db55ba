//! Read-only snapshot handed to a strategy during the buy phase.

use crate::game::{RoundEndReason, Side};
use crate::rules::GameRules;

/// What a team knows when it decides how much to invest.
///
/// Money values are team totals.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Funds available to spend.
    pub funds: f64,
    /// Equipment carried into this round before buying.
    pub equipment: f64,
    /// 1-based round number.
    pub current_round: u32,
    /// Own rounds won.
    pub own_score: u32,
    /// Opponent rounds won.
    pub opponent_score: u32,
    /// Current losing streak.
    pub consecutive_losses: u32,
    /// Current winning streak.
    pub consecutive_wins: u32,
    /// Index into the loss-bonus schedule.
    pub loss_bonus_level: usize,
    /// Side this team plays this round.
    pub side: Side,
    /// First round of a half (regulation or overtime).
    pub is_pistol_round: bool,
    /// Second round of a half.
    pub is_after_pistol: bool,
    /// Last round of a half (regulation or overtime).
    pub is_last_round_of_half: bool,
    /// The round is played in overtime.
    pub is_overtime: bool,
    /// Score that wins the match in the current period.
    pub score_to_win: u32,
    /// Own survivors at the end of the previous round.
    pub own_survivors: u8,
    /// Enemy survivors at the end of the previous round.
    pub enemy_survivors: u8,
    /// How the previous round ended, if there was one in this half.
    pub last_round_reason: Option<RoundEndReason>,
    /// Whether the bomb was planted in the previous round.
    pub last_bomb_planted: bool,
    /// The match rules.
    pub rules: &'a GameRules,
}

impl StrategyContext<'_> {
    /// Rounds this team still needs to win the match.
    #[must_use]
    pub const fn rounds_to_win(&self) -> u32 {
        self.score_to_win.saturating_sub(self.own_score)
    }

    /// Rounds the opponent still needs to win the match.
    #[must_use]
    pub const fn opponent_rounds_to_win(&self) -> u32 {
        self.score_to_win.saturating_sub(self.opponent_score)
    }

    /// One round from either side winning.
    #[must_use]
    pub const fn is_match_point(&self) -> bool {
        self.rounds_to_win() <= 1 || self.opponent_rounds_to_win() <= 1
    }
}
