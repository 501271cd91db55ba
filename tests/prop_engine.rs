//! Property-based tests for the round engine.
//!
//! Run with: cargo test --release prop_engine

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, OnceLock};

use proptest::prelude::*;

use buyround::game::{resolve_outcome, settle_round, OutcomeDraws, RoundEndReason, Side};
use buyround::{
    contest_success, sample_from_cdf, CdfEntry, DistributionTable, Game, GameRules, GameSetup, StrategyRegistry,
};

fn table() -> Arc<DistributionTable> {
    static TABLE: OnceLock<Arc<DistributionTable>> = OnceLock::new();
    Arc::clone(TABLE.get_or_init(|| {
        let text = include_str!("fixtures/distributions.json");
        Arc::new(DistributionTable::from_json_str(text).unwrap())
    }))
}

fn strategy_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "all_in", "all_in_v2", "anti_allin", "casual", "expected_value", "half", "min_max_v4", "random",
        "scrooge", "smart_v1",
    ])
}

fn draws() -> impl Strategy<Value = OutcomeDraws> {
    prop::array::uniform7(0.0f64..1.0).prop_map(|d| OutcomeDraws {
        winner: d[0],
        reason: d[1],
        bomb: d[2],
        ct_survivors: d[3],
        t_survivors: d[4],
        ct_equipment: d[5],
        t_equipment: d[6],
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// The CSF is a probability and complementary under swapping.
    #[test]
    fn prop_csf_bounded_and_complementary(
        a in 0.0f64..1e6,
        b in 0.0f64..1e6,
        r in 0.0f64..5.0
    ) {
        let p = contest_success(a, b, r);
        let q = contest_success(b, a, r);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert!((p + q - 1.0).abs() < 1e-9);
    }

    /// Equal investments are a coin flip.
    #[test]
    fn prop_csf_equal_is_half(x in 1e-3f64..1e6, r in 0.0f64..5.0) {
        prop_assert!((contest_success(x, x, r) - 0.5).abs() < 1e-12);
    }

    /// Draw 0 hits the first entry; draws at or past the last threshold hit the last.
    #[test]
    fn prop_cdf_edges(mut thresholds in prop::collection::vec(0.0f64..1.0, 1..20)) {
        thresholds.sort_by(f64::total_cmp);
        let entries: Vec<CdfEntry<usize>> = thresholds
            .iter()
            .enumerate()
            .map(|(i, &t)| CdfEntry::new(t, i))
            .collect();
        let last = entries.len() - 1;
        prop_assert_eq!(sample_from_cdf(&entries, 0.0), Some(0));
        prop_assert_eq!(sample_from_cdf(&entries, 1.0), Some(last));
        prop_assert_eq!(sample_from_cdf(&entries, 5.0), Some(last));
    }

    /// Sampled outcomes are internally consistent.
    #[test]
    fn prop_outcome_consistent(p in 0.0f64..=1.0, d in draws()) {
        let outcome = resolve_outcome(&table(), p, &d);
        prop_assert_eq!(outcome.ct_wins, outcome.reason.winner() == Side::CounterTerrorist);
        prop_assert!(outcome.ct_survivors <= 5 && outcome.t_survivors <= 5);
        match outcome.reason {
            RoundEndReason::BombExploded | RoundEndReason::BombDefused => prop_assert!(outcome.bomb_planted),
            RoundEndReason::CtEliminationOrTime => {
                prop_assert!(!outcome.bomb_planted);
                prop_assert!(outcome.ct_survivors >= 1);
            }
            RoundEndReason::TerroristsEliminatedCt => prop_assert_eq!(outcome.ct_survivors, 0),
        }
        if outcome.reason == RoundEndReason::BombDefused {
            prop_assert!(outcome.ct_survivors >= 1);
        }
        prop_assert!(outcome.ct_equipment_saved >= 0.0 && outcome.t_equipment_saved >= 0.0);
    }

    /// Settlement never pays a negative amount.
    #[test]
    fn prop_settlement_non_negative(p in 0.0f64..=1.0, d in draws(), level in 0usize..10) {
        let rules = GameRules::default();
        let outcome = resolve_outcome(&table(), p, &d);
        let settlement = settle_round(&outcome, level, &rules);
        prop_assert!(settlement.ct_earned >= 0.0);
        prop_assert!(settlement.t_earned >= 0.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whole games respect the score, cap and half-switch rules.
    #[test]
    fn prop_game_invariants(seed in any::<u64>(), a in strategy_name(), b in strategy_name()) {
        let registry = StrategyRegistry::with_builtins();
        let rules = Arc::new(GameRules::default());
        let result = Game::new(GameSetup {
            rules: Arc::clone(&rules),
            table: table(),
            team_names: ["A".to_string(), "B".to_string()],
            strategy_names: [a.to_string(), b.to_string()],
            strategies: [registry.get(a).unwrap(), registry.get(b).unwrap()],
            seed,
            keep_history: true,
        })
        .run();

        let [s1, s2] = result.scores;
        prop_assert_eq!(s1 + s2, result.total_rounds);
        let target = rules.score_to_win(result.overtime_periods);
        prop_assert_eq!(result.scores[result.winner.index()], target);
        prop_assert!(result.scores[result.winner.other().index()] < target);
        prop_assert_eq!(result.side_switches.first().copied(), Some(rules.half_length));

        for round in &result.rounds {
            for team in &round.teams {
                prop_assert!(team.funds_after <= rules.max_funds);
                prop_assert!(team.funds_after >= 0.0);
                prop_assert!(team.spent <= team.funds_before + 1e-9);
            }
            prop_assert!(round.teams[0].side != round.teams[1].side);
        }
    }
}
