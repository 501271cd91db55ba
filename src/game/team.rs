//! Per-team economic ledger.
//!
//! All amounts are team totals. A `Team` is owned by exactly one
//! [`crate::game::Game`] and is only mutated by that game's round loop.

use serde::Serialize;

use crate::game::Side;
use crate::rules::{GameRules, TEAM_SIZE, TEAM_SIZE_F};

/// Mutable economic state of one team.
#[derive(Debug, Clone)]
pub struct Team {
    name: String,
    strategy: String,
    side: Side,
    funds: f64,
    /// Equipment fielded this round: carried over plus this round's buy.
    equipment: f64,
    survivors: u8,
    score: u32,
    consecutive_losses: u32,
    consecutive_wins: u32,
    loss_bonus_level: usize,
    spent_this_round: f64,
    earned_this_round: f64,
    total_spent: f64,
    total_earned: f64,
    fielded_sum: f64,
    rounds_fielded: u32,
}

/// Whole-game economic summary of one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamEconomics {
    /// Total money invested across all rounds.
    pub total_spent: f64,
    /// Total money earned across all rounds, before the funds cap.
    pub total_earned: f64,
    /// Funds at the end of the game.
    pub final_funds: f64,
    /// Mean fielded equipment per round.
    pub average_equipment: f64,
}

impl Team {
    /// Create a team with regulation starting money.
    #[must_use]
    pub fn new(name: impl Into<String>, strategy: impl Into<String>, side: Side, rules: &GameRules) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            side,
            funds: TEAM_SIZE_F * rules.starting_funds,
            equipment: TEAM_SIZE_F * rules.default_equipment,
            survivors: TEAM_SIZE,
            score: 0,
            consecutive_losses: 0,
            consecutive_wins: 0,
            loss_bonus_level: 0,
            spent_this_round: 0.0,
            earned_this_round: 0.0,
            total_spent: 0.0,
            total_earned: 0.0,
            fielded_sum: 0.0,
            rounds_fielded: 0,
        }
    }

    /// Team name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strategy identifier.
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Current side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Funds available.
    #[must_use]
    pub const fn funds(&self) -> f64 {
        self.funds
    }

    /// Equipment value, including anything bought this round.
    #[must_use]
    pub const fn equipment(&self) -> f64 {
        self.equipment
    }

    /// Players alive at the end of the last round.
    #[must_use]
    pub const fn survivors(&self) -> u8 {
        self.survivors
    }

    /// Rounds won.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Current losing streak.
    #[must_use]
    pub const fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Current winning streak.
    #[must_use]
    pub const fn consecutive_wins(&self) -> u32 {
        self.consecutive_wins
    }

    /// Index into the loss-bonus schedule.
    #[must_use]
    pub const fn loss_bonus_level(&self) -> usize {
        self.loss_bonus_level
    }

    /// Amount invested this round.
    #[must_use]
    pub const fn spent_this_round(&self) -> f64 {
        self.spent_this_round
    }

    /// Amount earned this round.
    #[must_use]
    pub const fn earned_this_round(&self) -> f64 {
        self.earned_this_round
    }

    /// Clear the per-round accumulators.
    pub fn begin_round(&mut self) {
        self.spent_this_round = 0.0;
        self.earned_this_round = 0.0;
    }

    /// Invest up to `amount` in equipment and return what was actually spent.
    ///
    /// The request is clamped to `[0, min(funds, max_funds)]`; a NaN
    /// request spends nothing.
    pub fn buy(&mut self, amount: f64, rules: &GameRules) -> f64 {
        let ceiling = self.funds.min(rules.max_funds).max(0.0);
        let spend = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, ceiling) };
        self.funds -= spend;
        self.equipment += spend;
        self.spent_this_round += spend;
        self.total_spent += spend;
        self.fielded_sum += self.equipment;
        self.rounds_fielded += 1;
        spend
    }

    /// Update score and streaks.
    pub fn record_result(&mut self, won: bool) {
        if won {
            self.score += 1;
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
        }
    }

    /// Credit round earnings, then clamp funds to the cap.
    pub fn earn(&mut self, amount: f64, rules: &GameRules) {
        let amount = amount.max(0.0);
        self.earned_this_round += amount;
        self.total_earned += amount;
        self.funds = (self.funds + amount).min(rules.max_funds);
    }

    /// Set the loss-bonus level.
    pub const fn set_loss_bonus_level(&mut self, level: usize) {
        self.loss_bonus_level = level;
    }

    /// Roll equipment into the next round.
    ///
    /// With saves, survivors keep what they saved (never more than was
    /// fielded) and every dead player respawns with the default kit.
    /// Without saves everyone starts from the default kit.
    pub fn carry_over(&mut self, saved: f64, survivors: u8, rules: &GameRules) {
        let survivors = survivors.min(TEAM_SIZE);
        self.survivors = survivors;
        self.equipment = if rules.with_saves {
            let kept = if saved.is_finite() { saved.clamp(0.0, self.equipment) } else { 0.0 };
            let dead = f64::from(TEAM_SIZE - survivors);
            kept + dead * rules.default_equipment
        } else {
            TEAM_SIZE_F * rules.default_equipment
        };
    }

    /// Start a new half: take `side`, reset money, streaks and loss bonus.
    ///
    /// `funds` and `equipment` are per-player amounts.
    pub fn reset_for_half(&mut self, side: Side, funds: f64, equipment: f64) {
        self.side = side;
        self.funds = TEAM_SIZE_F * funds;
        self.equipment = TEAM_SIZE_F * equipment;
        self.survivors = TEAM_SIZE;
        self.loss_bonus_level = 0;
        self.consecutive_losses = 0;
        self.consecutive_wins = 0;
    }

    /// Whole-game summary.
    #[must_use]
    pub fn economics(&self) -> TeamEconomics {
        TeamEconomics {
            total_spent: self.total_spent,
            total_earned: self.total_earned,
            final_funds: self.funds,
            average_equipment: if self.rounds_fielded == 0 {
                0.0
            } else {
                self.fielded_sum / f64::from(self.rounds_fielded)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        Team::new("A", "half", Side::CounterTerrorist, &GameRules::default())
    }

    #[test]
    fn test_new_team_uses_team_totals() {
        let t = team();
        assert!((t.funds() - 4000.0).abs() < f64::EPSILON);
        assert!((t.equipment() - 1000.0).abs() < f64::EPSILON);
        assert_eq!(t.survivors(), 5);
    }

    #[test]
    fn test_buy_clamps_to_funds() {
        let rules = GameRules::default();
        let mut t = team();
        let spent = t.buy(1_000_000.0, &rules);
        assert!((spent - 4000.0).abs() < f64::EPSILON);
        assert!(t.funds().abs() < f64::EPSILON);
        assert!((t.equipment() - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_buy_rejects_negative_and_nan() {
        let rules = GameRules::default();
        let mut t = team();
        assert!(t.buy(-50.0, &rules).abs() < f64::EPSILON);
        assert!(t.buy(f64::NAN, &rules).abs() < f64::EPSILON);
        assert!((t.funds() - 4000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_earn_caps_funds() {
        let rules = GameRules::default();
        let mut t = team();
        t.earn(200_000.0, &rules);
        assert!((t.funds() - rules.max_funds).abs() < f64::EPSILON);
        assert!((t.earned_this_round() - 200_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_streaks() {
        let mut t = team();
        t.record_result(false);
        t.record_result(false);
        assert_eq!(t.consecutive_losses(), 2);
        t.record_result(true);
        assert_eq!(t.consecutive_losses(), 0);
        assert_eq!(t.consecutive_wins(), 1);
        assert_eq!(t.score(), 1);
    }

    #[test]
    fn test_carry_over_with_saves() {
        let rules = GameRules::default();
        let mut t = team();
        t.buy(3000.0, &rules);
        // 4000 fielded; saved value above that is capped.
        t.carry_over(9000.0, 2, &rules);
        assert!((t.equipment() - (4000.0 + 3.0 * 200.0)).abs() < f64::EPSILON);
        assert_eq!(t.survivors(), 2);
    }

    #[test]
    fn test_carry_over_without_saves() {
        let rules = GameRules {
            with_saves: false,
            ..GameRules::default()
        };
        let mut t = team();
        t.buy(3000.0, &rules);
        t.carry_over(2500.0, 4, &rules);
        assert!((t.equipment() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_for_half() {
        let rules = GameRules::default();
        let mut t = team();
        t.record_result(false);
        t.set_loss_bonus_level(3);
        t.reset_for_half(Side::Terrorist, rules.starting_funds, rules.default_equipment);
        assert_eq!(t.side(), Side::Terrorist);
        assert_eq!(t.loss_bonus_level(), 0);
        assert_eq!(t.consecutive_losses(), 0);
        assert!((t.funds() - 4000.0).abs() < f64::EPSILON);
    }
}
