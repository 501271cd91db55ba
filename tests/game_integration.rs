//! End-to-end tests: loading the artifact from disk and playing full games.
//!
//! Run with: cargo test --release game_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use buyround::error::DistributionError;
use buyround::game::GamePhase;
use buyround::strategy::{InvestmentModel, ModelStrategy, FEATURE_COUNT};
use buyround::{DistributionTable, Game, GameRules, GameSetup, Side, StrategyRegistry, TeamSlot};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/distributions.json")
}

fn setup(seed: u64, a: &str, b: &str, rules: GameRules) -> GameSetup {
    let registry = StrategyRegistry::with_builtins();
    GameSetup {
        rules: Arc::new(rules),
        table: Arc::new(DistributionTable::load(Some(&fixture())).unwrap()),
        team_names: ["Alpha".to_string(), "Bravo".to_string()],
        strategy_names: [a.to_string(), b.to_string()],
        strategies: [registry.get(a).unwrap(), registry.get(b).unwrap()],
        seed,
        keep_history: true,
    }
}

#[test]
fn test_fixture_loads() {
    let table = DistributionTable::load(Some(&fixture())).unwrap();
    assert!(table.entry_count() > 0);
    assert!((table.csf_exponent() - 1.0855).abs() < 1e-12);
    assert_eq!(table.csf_range(), (0, 100));
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = DistributionTable::load(Some(&dir.path().join("nope.json"))).unwrap_err();
    assert!(matches!(err, DistributionError::Io { .. }));
}

#[test]
fn test_empty_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("distributions.json");
    fs::write(&path, "").unwrap();
    assert!(matches!(
        DistributionTable::load(Some(&path)),
        Err(DistributionError::Empty(_))
    ));
}

#[test]
fn test_missing_family_is_fatal() {
    let text = fs::read_to_string(fixture()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["distributions"]
        .as_object_mut()
        .unwrap()
        .remove("survivors");
    let err = DistributionTable::from_json_str(&value.to_string()).unwrap_err();
    assert!(matches!(err, DistributionError::MissingFamily(_)));
}

#[test]
fn test_full_game_plays_out() {
    let mut game = Game::new(setup(42, "smart_v1", "expected_value", GameRules::default()));
    let mut rounds = 0;
    while let Some(round) = game.play_round() {
        rounds += 1;
        assert_eq!(round.number, rounds);
        assert!((0.0..=1.0).contains(&round.ct_win_probability));
    }
    assert_eq!(game.phase(), GamePhase::Finished);
    assert_eq!(game.rounds_played(), rounds);
    assert_eq!(game.history().len() as u32, rounds);
}

#[test]
fn test_sides_swap_at_half() {
    let result = Game::new(setup(7, "half", "half", GameRules::default())).run();
    let first = &result.rounds[0];
    let starting_side = first.team(result.starting_ct).side;
    assert_eq!(starting_side, Side::CounterTerrorist);
    for round in result.rounds.iter().take(15) {
        assert_eq!(round.team(result.starting_ct).side, Side::CounterTerrorist);
    }
    if let Some(round) = result.rounds.get(15) {
        assert_eq!(round.team(result.starting_ct).side, Side::Terrorist);
        // Second half opens with pistol-round money.
        for team in &round.teams {
            assert!((team.funds_before - 5.0 * 800.0).abs() < 1e-9);
        }
    }
}

#[test]
fn test_overtime_rules() {
    // Half length 1 makes overtime common enough to observe.
    let rules = GameRules {
        half_length: 1,
        ot_half_length: 1,
        ..GameRules::default()
    };
    let mut saw_overtime = false;
    for seed in 0..200 {
        let result = Game::new(setup(seed, "all_in", "all_in", rules.clone())).run();
        let [a, b] = result.scores;
        assert_eq!(a + b, result.total_rounds);
        if result.went_to_overtime {
            saw_overtime = true;
            assert!(result.margin() >= 2);
            assert_eq!(
                result.scores[result.winner.index()],
                rules.score_to_win(result.overtime_periods)
            );
            let first_ot = &result.rounds[2];
            assert!(first_ot.overtime);
            for team in &first_ot.teams {
                assert!((team.funds_before - 5.0 * rules.ot_funds).abs() < 1e-9);
            }
        } else {
            assert_eq!(result.total_rounds, 2);
        }
    }
    assert!(saw_overtime);
}

#[test]
fn test_multiple_overtime_periods() {
    let rules = GameRules::default();
    let h = rules.half_length;
    let oh = rules.ot_half_length;
    let ot_funds = 5.0 * rules.ot_funds;

    let mut found = 0;
    for seed in 0..50_000 {
        let result = Game::new(setup(seed, "all_in", "all_in", rules.clone())).run();
        let periods = result.overtime_periods;
        if periods < 2 {
            continue;
        }
        found += 1;
        let round = |n: u32| &result.rounds[n as usize - 1];

        // One regulation switch, then one per period after its first half.
        let mut expected = vec![h];
        expected.extend((0..periods).map(|k| 2 * h + k * 2 * oh + oh));
        assert_eq!(result.side_switches, expected, "seed {seed}");

        for k in 0..periods {
            let start = 2 * h + k * 2 * oh + 1;
            let switch = start + oh - 1;

            // Every period opens level and with overtime money.
            let tied = h + k * oh;
            assert_eq!(round(start - 1).score, [tied, tied], "seed {seed} period {}", k + 1);
            for team in &round(start).teams {
                assert!((team.funds_before - ot_funds).abs() < 1e-9);
            }
            assert!(round(start).overtime);

            // Sides hold through a period entry and flip at the overtime half.
            assert_eq!(round(start - 1).teams[0].side, round(start).teams[0].side);
            assert_ne!(round(switch).teams[0].side, round(switch + 1).teams[0].side);
            for team in &round(switch + 1).teams {
                assert!((team.funds_before - ot_funds).abs() < 1e-9);
            }
        }

        let target = h + periods * oh + 1;
        assert_eq!(rules.score_to_win(periods), target);
        assert_eq!(result.scores[result.winner.index()], target, "seed {seed}");
        assert!(result.scores[result.winner.other().index()] < target);
        assert_eq!(result.total_rounds as usize, result.rounds.len());

        if found == 25 {
            break;
        }
    }
    assert!(found > 0, "no game reached a second overtime period");
}

struct AlwaysAllIn;

impl InvestmentModel for AlwaysAllIn {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        assert!(features.iter().all(|f| f.is_finite()));
        1.0
    }
}

#[test]
fn test_injected_model_plays_like_all_in() {
    let mut registry = StrategyRegistry::with_builtins();
    registry.register("model", Arc::new(ModelStrategy::new(Arc::new(AlwaysAllIn))));
    let table = Arc::new(DistributionTable::load(Some(&fixture())).unwrap());
    let play = |name: &str| {
        Game::new(GameSetup {
            rules: Arc::new(GameRules::default()),
            table: Arc::clone(&table),
            team_names: ["Alpha".to_string(), "Bravo".to_string()],
            strategy_names: [name.to_string(), "half".to_string()],
            strategies: [registry.get(name).unwrap(), registry.get("half").unwrap()],
            seed: 17,
            keep_history: true,
        })
        .run()
    };
    let model = play("model");
    let all_in = play("all_in");
    assert_eq!(model.scores, all_in.scores);
    assert_eq!(model.rounds.len(), all_in.rounds.len());
}

#[test]
fn test_same_seed_same_game() {
    let a = Game::new(setup(99, "random", "casual", GameRules::default())).run();
    let b = Game::new(setup(99, "random", "casual", GameRules::default())).run();
    assert_eq!(a.rounds, b.rounds);
    assert_eq!(a.winner, b.winner);
    assert_eq!(a.starting_ct, b.starting_ct);
}

#[test]
fn test_starting_side_varies_with_seed() {
    let starts: Vec<TeamSlot> = (0..64)
        .map(|seed| Game::new(setup(seed, "half", "half", GameRules::default())).run().starting_ct)
        .collect();
    assert!(starts.contains(&TeamSlot::One));
    assert!(starts.contains(&TeamSlot::Two));
}

#[test]
fn test_scrooge_loses_to_all_in() {
    let mut all_in_wins = 0;
    for seed in 0..200 {
        let result = Game::new(setup(seed, "all_in", "scrooge", GameRules::default())).run();
        if result.team_one_won() {
            all_in_wins += 1;
        }
    }
    assert!(all_in_wins > 100, "all_in won only {all_in_wins}/200");
}
