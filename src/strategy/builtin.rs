//! Built-in strategies.

use std::sync::Arc;

use rand::{Rng, RngCore};

use super::{Strategy, StrategyContext};
use crate::game::Side;
use crate::rules::TEAM_SIZE_F;

/// Every built-in strategy with its registry name.
#[must_use]
pub fn builtin_strategies() -> Vec<(&'static str, Arc<dyn Strategy>)> {
    vec![
        ("all_in", Arc::new(AllIn)),
        ("all_in_v2", Arc::new(AllInV2)),
        ("anti_allin", Arc::new(AntiAllIn)),
        ("casual", Arc::new(Casual)),
        ("expected_value", Arc::new(ExpectedValue)),
        ("half", Arc::new(Half)),
        ("min_max_v4", Arc::new(MinMaxV4)),
        ("random", Arc::new(RandomSpend)),
        ("scrooge", Arc::new(Scrooge)),
        ("smart_v1", Arc::new(SmartV1)),
    ]
}

/// Rounds where anything short of a full buy is a mistake: pistol rounds,
/// the last round of a half, and regulation rounds where one side is one
/// win (`near`) or no wins from the half-length mark.
///
/// Returns the fraction to invest, or `None` when the round is ordinary.
fn decisive_round(ctx: &StrategyContext<'_>, near: f64) -> Option<f64> {
    if ctx.is_last_round_of_half || ctx.is_pistol_round {
        return Some(1.0);
    }
    if ctx.is_overtime {
        return None;
    }
    let half = ctx.rules.half_length;
    let gap = |score: u32| half.checked_sub(score);
    match (gap(ctx.opponent_score), gap(ctx.own_score)) {
        (Some(1), _) => Some(near),
        (Some(0), _) => Some(1.0),
        (_, Some(1)) => Some(near),
        (_, Some(0)) => Some(1.0),
        _ => None,
    }
}

/// Spend everything, every round.
#[derive(Debug, Clone, Copy)]
struct AllIn;

impl Strategy for AllIn {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        ctx.funds
    }
}

/// Full buys except right after a first loss.
#[derive(Debug, Clone, Copy)]
struct AllInV2;

impl Strategy for AllInV2 {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if let Some(fraction) = decisive_round(ctx, 1.0) {
            return ctx.funds * fraction;
        }
        match ctx.consecutive_losses {
            1 => ctx.funds * 0.2,
            _ => ctx.funds * 0.9,
        }
    }
}

/// Half the funds, except the last round of each regulation half.
#[derive(Debug, Clone, Copy)]
struct Half;

impl Strategy for Half {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        let half = ctx.rules.half_length;
        if ctx.current_round == half || ctx.current_round == half * 2 {
            ctx.funds
        } else {
            ctx.funds / 2.0
        }
    }
}

/// Spends the bare minimum.
#[derive(Debug, Clone, Copy)]
struct Scrooge;

impl Scrooge {
    const MINIMUM: f64 = 300.0 * TEAM_SIZE_F;
}

impl Strategy for Scrooge {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if ctx.funds < Self::MINIMUM {
            ctx.funds * 0.8
        } else {
            Self::MINIMUM
        }
    }
}

/// A casual player's rule of thumb: keep a safety reserve, never sink more
/// than a full buy into one round.
#[derive(Debug, Clone, Copy)]
struct Casual;

impl Casual {
    const MIN_THRESHOLD: f64 = 5000.0 * TEAM_SIZE_F;
    const SAFETY: f64 = 2000.0 * TEAM_SIZE_F;
    const MAX_THRESHOLD: f64 = 10_000.0 * TEAM_SIZE_F - Self::SAFETY;
}

impl Strategy for Casual {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if let Some(fraction) = decisive_round(ctx, 0.8) {
            return ctx.funds * fraction;
        }
        if ctx.funds > Self::MAX_THRESHOLD {
            Self::MAX_THRESHOLD
        } else if ctx.funds > Self::MIN_THRESHOLD {
            ctx.funds
        } else if ctx.funds > Self::SAFETY {
            ctx.funds - Self::SAFETY
        } else {
            0.0
        }
    }
}

/// Streak-aware buying: eco after a first loss, build back up with longer
/// losing streaks.
#[derive(Debug, Clone, Copy)]
struct SmartV1;

impl Strategy for SmartV1 {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if let Some(fraction) = decisive_round(ctx, 0.8) {
            return ctx.funds * fraction;
        }
        let fraction = match ctx.consecutive_losses {
            0 => 0.8,
            1 => 0.2,
            2 => 0.3,
            3 => 0.4,
            _ => 0.9,
        };
        ctx.funds * fraction
    }
}

/// All or nothing on alternating rounds, full buys at half edges.
#[derive(Debug, Clone, Copy)]
struct MinMaxV4;

impl Strategy for MinMaxV4 {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if ctx.is_pistol_round || ctx.is_last_round_of_half {
            return ctx.funds;
        }
        if ctx.current_round % 2 == 1 {
            ctx.funds
        } else {
            0.0
        }
    }
}

/// Counters teams that force-buy after losing the pistol.
#[derive(Debug, Clone, Copy)]
struct AntiAllIn;

impl Strategy for AntiAllIn {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if ctx.is_last_round_of_half || ctx.is_pistol_round {
            return ctx.funds;
        }
        if ctx.is_after_pistol && ctx.consecutive_losses > 0 {
            return 0.0;
        }
        if let Some(fraction) = decisive_round(ctx, 0.8) {
            return ctx.funds * fraction;
        }

        if ctx.enemy_survivors < 1 && ctx.consecutive_wins <= 2 {
            // The most a team on a first loss bonus can field.
            let enemy_ceiling = (1900.0 + ctx.rules.default_equipment) * TEAM_SIZE_F;
            return (enemy_ceiling * 2.0 - ctx.equipment).min(ctx.funds);
        }
        match ctx.consecutive_wins {
            1 => ctx.funds,
            0 => ctx.funds * 0.9,
            wins => {
                let ratio = (1.0 - f64::from(wins) * 0.1).max(0.4);
                ctx.funds * ratio
            }
        }
    }
}

/// Spend the expected income of the round: the mean of the win payout and
/// the loss bonus.
#[derive(Debug, Clone, Copy)]
struct ExpectedValue;

impl Strategy for ExpectedValue {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        if ctx.is_last_round_of_half {
            return ctx.funds;
        }
        let rules = ctx.rules;
        let reward = &rules.round_outcome_reward;
        let win = match ctx.side {
            Side::CounterTerrorist => {
                0.5 * (reward[2] * TEAM_SIZE_F + rules.bombdefuse_reward)
                    + 0.5 * (reward[3] * TEAM_SIZE_F)
            }
            Side::Terrorist => {
                0.5 * (reward[0] * TEAM_SIZE_F + rules.bombplant_reward)
                    + 0.5 * (reward[1] * TEAM_SIZE_F)
            }
        };
        let loss = rules.loss_bonus_for_level(ctx.loss_bonus_level + 1) * TEAM_SIZE_F;
        (0.5 * win + 0.5 * loss).min(ctx.funds)
    }
}

/// Uniformly random spend between 10 % and 95 % of funds, with occasional
/// all-in and near-zero rounds.
#[derive(Debug, Clone, Copy)]
struct RandomSpend;

impl Strategy for RandomSpend {
    fn invest(&self, ctx: &StrategyContext<'_>, rng: &mut dyn RngCore) -> f64 {
        let low = ctx.funds * 0.1;
        let high = ctx.funds * 0.95;
        let mut investment = low + rng.r#gen::<f64>() * (high - low);
        if rng.r#gen::<f64>() < 0.05 {
            investment = ctx.funds;
        }
        if rng.r#gen::<f64>() < 0.05 {
            investment = ctx.funds * 0.05;
        }
        investment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameRules;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(rules: &GameRules) -> StrategyContext<'_> {
        StrategyContext {
            funds: 20_000.0,
            equipment: 1000.0,
            current_round: 6,
            own_score: 3,
            opponent_score: 2,
            consecutive_losses: 0,
            consecutive_wins: 0,
            loss_bonus_level: 0,
            side: Side::Terrorist,
            is_pistol_round: false,
            is_after_pistol: false,
            is_last_round_of_half: false,
            is_overtime: false,
            score_to_win: 16,
            own_survivors: 2,
            enemy_survivors: 2,
            last_round_reason: None,
            last_bomb_planted: false,
            rules,
        }
    }

    fn lookup(name: &str) -> Arc<dyn Strategy> {
        builtin_strategies()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s)
            .unwrap()
    }

    fn invest(name: &str, ctx: &StrategyContext<'_>) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        lookup(name).invest(ctx, &mut rng)
    }

    #[test]
    fn test_names_are_unique_and_sorted() {
        let names: Vec<&str> = builtin_strategies().iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_all_in_spends_everything() {
        let rules = GameRules::default();
        assert!((invest("all_in", &ctx(&rules)) - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_half_spends_half() {
        let rules = GameRules::default();
        assert!((invest("half", &ctx(&rules)) - 10_000.0).abs() < f64::EPSILON);
        let mut c = ctx(&rules);
        c.current_round = 15;
        assert!((invest("half", &c) - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scrooge_spends_minimum() {
        let rules = GameRules::default();
        assert!((invest("scrooge", &ctx(&rules)) - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_smart_v1_ecos_after_first_loss() {
        let rules = GameRules::default();
        let mut c = ctx(&rules);
        c.consecutive_losses = 1;
        assert!((invest("smart_v1", &c) - 4000.0).abs() < 1e-9);
        c.is_pistol_round = true;
        assert!((invest("smart_v1", &c) - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_min_max_alternates() {
        let rules = GameRules::default();
        let mut c = ctx(&rules);
        c.current_round = 6;
        assert!(invest("min_max_v4", &c).abs() < f64::EPSILON);
        c.current_round = 7;
        assert!((invest("min_max_v4", &c) - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expected_value_bounded_by_funds() {
        let rules = GameRules::default();
        let mut c = ctx(&rules);
        c.funds = 1000.0;
        assert!((invest("expected_value", &c) - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_within_funds() {
        let rules = GameRules::default();
        let c = ctx(&rules);
        let strategy = lookup("random");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..200 {
            let x = strategy.invest(&c, &mut rng);
            assert!((0.0..=c.funds).contains(&x));
        }
    }

    #[test]
    fn test_casual_keeps_reserve() {
        let rules = GameRules::default();
        let mut c = ctx(&rules);
        c.funds = 15_000.0;
        assert!((invest("casual", &c) - 5000.0).abs() < f64::EPSILON);
        c.funds = 70_000.0;
        assert!((invest("casual", &c) - 40_000.0).abs() < f64::EPSILON);
    }
}
