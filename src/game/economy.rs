//! Round settlement: who earns what once the outcome is known.
//!
//! # Rewards
//!
//! | Reason | Winner | Loser |
//! |---|---|---|
//! | 1 bomb exploded | 5 × reward\[0\] + plant | loss bonus |
//! | 2 T elimination | 5 × reward\[1\] (+ plant if planted) | loss bonus |
//! | 3 bomb defused | 5 × reward\[2\] + defuse | loss bonus + 5 × plant-all + plant |
//! | 4 CT elimination / time | 5 × reward\[3\] | loss bonus for dead Ts only |
//!
//! Both sides also earn an elimination reward for every enemy killed.
//! The loss bonus is per player and comes from the loser's level *before*
//! this round's level update.

use crate::game::{RoundEndReason, RoundOutcome, Side};
use crate::rules::{GameRules, TEAM_SIZE, TEAM_SIZE_F};

/// Money earned by each side in one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    /// Earned by the CT side.
    pub ct_earned: f64,
    /// Earned by the T side.
    pub t_earned: f64,
}

impl Settlement {
    /// Earnings for `side`.
    #[must_use]
    pub const fn earned(&self, side: Side) -> f64 {
        match side {
            Side::CounterTerrorist => self.ct_earned,
            Side::Terrorist => self.t_earned,
        }
    }
}

/// Compute both sides' earnings.
///
/// `loser_level` is the losing team's loss-bonus level going into the
/// round.
#[must_use]
pub fn settle_round(outcome: &RoundOutcome, loser_level: usize, rules: &GameRules) -> Settlement {
    let reward = |reason: RoundEndReason| rules.round_outcome_reward[reason.index()] * TEAM_SIZE_F;

    let mut winner_funds = 0.0;
    let mut loser_funds = 0.0;

    match outcome.reason {
        RoundEndReason::BombExploded => {
            winner_funds += reward(outcome.reason) + rules.bombplant_reward;
        }
        RoundEndReason::TerroristsEliminatedCt => {
            winner_funds += reward(outcome.reason);
            if outcome.bomb_planted {
                winner_funds += rules.bombplant_reward;
            }
        }
        RoundEndReason::BombDefused => {
            winner_funds += reward(outcome.reason) + rules.bombdefuse_reward;
            loser_funds += rules.bombplant_reward_all * TEAM_SIZE_F + rules.bombplant_reward;
        }
        RoundEndReason::CtEliminationOrTime => {
            winner_funds += reward(outcome.reason);
        }
    }

    let winner = outcome.winner();
    let loser = winner.opposite();

    winner_funds += kills(outcome, winner) * per_kill(winner, rules);
    loser_funds += kills(outcome, loser) * per_kill(loser, rules);

    // Surviving Ts who let the clock run out forfeit their loss bonus.
    let paid_players = if outcome.reason == RoundEndReason::CtEliminationOrTime {
        TEAM_SIZE.saturating_sub(outcome.t_survivors)
    } else {
        TEAM_SIZE
    };
    loser_funds += rules.loss_bonus_for_level(loser_level) * f64::from(paid_players);

    match winner {
        Side::CounterTerrorist => Settlement {
            ct_earned: winner_funds,
            t_earned: loser_funds,
        },
        Side::Terrorist => Settlement {
            ct_earned: loser_funds,
            t_earned: winner_funds,
        },
    }
}

/// Enemies `side` killed this round.
fn kills(outcome: &RoundOutcome, side: Side) -> f64 {
    f64::from(TEAM_SIZE.saturating_sub(outcome.survivors(side.opposite())))
}

fn per_kill(side: Side, rules: &GameRules) -> f64 {
    let additional = match side {
        Side::CounterTerrorist => rules.additional_ct_elimination_reward,
        Side::Terrorist => rules.additional_t_elimination_reward,
    };
    rules.elimination_reward + additional * TEAM_SIZE_F
}

/// Loss-bonus level after a round.
///
/// A loss moves one step up the schedule, up to its end. A win moves one
/// step down when `loss_bonus_calc` is set and resets to zero otherwise.
#[must_use]
pub fn next_loss_bonus_level(level: usize, won: bool, rules: &GameRules) -> usize {
    if won {
        if rules.loss_bonus_calc {
            level.saturating_sub(1)
        } else {
            0
        }
    } else {
        (level + 1).min(rules.max_loss_bonus_level())
    }
}
