//! Round outcome sampling.
//!
//! The winner is drawn first, straight from the CSF probability. Every
//! other facet is then sampled from the tables conditioned on that winner,
//! each with its own uniform draw, and finally repaired so the facets
//! agree with each other (a defused bomb was planted, an elimination
//! leaves no CT alive, ...).

use rand::Rng;
use serde::Serialize;

use crate::distributions::{sample_from_cdf, DistributionTable};
use crate::game::{RoundEndReason, Side};
use crate::rules::TEAM_SIZE;

/// Survivors assumed for the winning side when the table has no data.
const FALLBACK_WINNER_SURVIVORS: u8 = 3;

/// Everything that happened in one round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundOutcome {
    /// Whether the CT side won.
    pub ct_wins: bool,
    /// How the round ended.
    pub reason: RoundEndReason,
    /// Whether the bomb was planted.
    pub bomb_planted: bool,
    /// CT players alive at round end.
    pub ct_survivors: u8,
    /// T players alive at round end.
    pub t_survivors: u8,
    /// Equipment value the CT survivors keep.
    pub ct_equipment_saved: f64,
    /// Equipment value the T survivors keep.
    pub t_equipment_saved: f64,
}

impl RoundOutcome {
    /// Side that won.
    #[must_use]
    pub const fn winner(&self) -> Side {
        if self.ct_wins {
            Side::CounterTerrorist
        } else {
            Side::Terrorist
        }
    }

    /// Survivors on `side`.
    #[must_use]
    pub const fn survivors(&self, side: Side) -> u8 {
        match side {
            Side::CounterTerrorist => self.ct_survivors,
            Side::Terrorist => self.t_survivors,
        }
    }

    /// Saved equipment on `side`.
    #[must_use]
    pub const fn equipment_saved(&self, side: Side) -> f64 {
        match side {
            Side::CounterTerrorist => self.ct_equipment_saved,
            Side::Terrorist => self.t_equipment_saved,
        }
    }
}

/// The seven uniform draws one outcome consumes, in consumption order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeDraws {
    /// Decides the winner against the CT win probability.
    pub winner: f64,
    /// Round-end reason lookup.
    pub reason: f64,
    /// Bomb-plant Bernoulli draw.
    pub bomb: f64,
    /// CT survivor lookup.
    pub ct_survivors: f64,
    /// T survivor lookup.
    pub t_survivors: f64,
    /// CT saved-equipment lookup.
    pub ct_equipment: f64,
    /// T saved-equipment lookup.
    pub t_equipment: f64,
}

impl OutcomeDraws {
    /// Take seven draws from `rng`, always in the same order.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            winner: rng.r#gen(),
            reason: rng.r#gen(),
            bomb: rng.r#gen(),
            ct_survivors: rng.r#gen(),
            t_survivors: rng.r#gen(),
            ct_equipment: rng.r#gen(),
            t_equipment: rng.r#gen(),
        }
    }
}

/// Sample a complete, consistent outcome for a round in which the CT side
/// wins with probability `ct_win_probability`.
pub fn determine_round_outcome<R: Rng + ?Sized>(
    table: &DistributionTable,
    ct_win_probability: f64,
    rng: &mut R,
) -> RoundOutcome {
    let draws = OutcomeDraws::sample(rng);
    resolve_outcome(table, ct_win_probability, &draws)
}

/// Turn a fixed set of draws into an outcome.
#[must_use]
pub fn resolve_outcome(
    table: &DistributionTable,
    ct_win_probability: f64,
    draws: &OutcomeDraws,
) -> RoundOutcome {
    let p = if ct_win_probability.is_finite() {
        ct_win_probability.clamp(0.0, 1.0)
    } else {
        0.5
    };

    let ct_wins = draws.winner < p;
    let winner = if ct_wins { Side::CounterTerrorist } else { Side::Terrorist };

    let reason = sample_from_cdf(table.reason_cdf(winner, p), draws.reason)
        .filter(|r| r.winner() == winner)
        .unwrap_or_else(|| default_reason(winner));

    let bomb_planted = match reason {
        RoundEndReason::BombExploded | RoundEndReason::BombDefused => true,
        RoundEndReason::CtEliminationOrTime => false,
        RoundEndReason::TerroristsEliminatedCt => draws.bomb < table.bomb_plant_probability(p),
    };

    let sample_survivors = |side: Side, u: f64| {
        sample_from_cdf(table.survivor_cdf(side, reason, p), u)
            .unwrap_or(if side == winner { FALLBACK_WINNER_SURVIVORS } else { 0 })
            .min(TEAM_SIZE)
    };
    let mut ct_survivors = sample_survivors(Side::CounterTerrorist, draws.ct_survivors);
    let t_survivors = sample_survivors(Side::Terrorist, draws.t_survivors);

    match reason {
        RoundEndReason::TerroristsEliminatedCt => ct_survivors = 0,
        RoundEndReason::BombDefused | RoundEndReason::CtEliminationOrTime => {
            ct_survivors = ct_survivors.max(1);
        }
        RoundEndReason::BombExploded => {}
    }

    let sample_saved = |side: Side, survivors: u8, u: f64| {
        if survivors == 0 {
            return 0.0;
        }
        sample_from_cdf(table.equipment_cdf(side, reason, survivors), u).unwrap_or(0.0)
    };

    RoundOutcome {
        ct_wins,
        reason,
        bomb_planted,
        ct_survivors,
        t_survivors,
        ct_equipment_saved: sample_saved(Side::CounterTerrorist, ct_survivors, draws.ct_equipment),
        t_equipment_saved: sample_saved(Side::Terrorist, t_survivors, draws.t_equipment),
    }
}

const fn default_reason(winner: Side) -> RoundEndReason {
    match winner {
        Side::CounterTerrorist => RoundEndReason::CtEliminationOrTime,
        Side::Terrorist => RoundEndReason::TerroristsEliminatedCt,
    }
}
