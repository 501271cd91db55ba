#![no_main]

//! Full match fuzzer.
//!
//! Plays a complete game under fuzzed rules and strategy choices and
//! checks the end state: a single winner at the target, non-negative
//! funds, and one record per round played.

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use buyround::{DistributionTable, Game, GameRules, GameSetup, StrategyRegistry};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct GameInput {
    seed: u64,
    strategies: [u8; 2],
    half_length: u8,
    ot_half_length: u8,
    starting_funds: u16,
    loss_bonus_calc: bool,
    with_saves: bool,
}

fn table() -> Arc<DistributionTable> {
    static TABLE: OnceLock<Arc<DistributionTable>> = OnceLock::new();
    Arc::clone(TABLE.get_or_init(|| {
        Arc::new(
            DistributionTable::from_json_str(include_str!("../../tests/fixtures/distributions.json"))
                .expect("fixture parses"),
        )
    }))
}

fuzz_target!(|input: GameInput| {
    let rules = GameRules {
        half_length: u32::from(input.half_length % 20) + 1,
        ot_half_length: u32::from(input.ot_half_length % 6) + 1,
        starting_funds: f64::from(input.starting_funds),
        loss_bonus_calc: input.loss_bonus_calc,
        with_saves: input.with_saves,
        ..GameRules::default()
    };
    if rules.validate().is_err() {
        return;
    }

    let registry = StrategyRegistry::with_builtins();
    let names = registry.names();
    let pick = |i: u8| names[usize::from(i) % names.len()].clone();
    let strategy_names = [pick(input.strategies[0]), pick(input.strategies[1])];
    let strategies = [
        registry.get(&strategy_names[0]).expect("registered"),
        registry.get(&strategy_names[1]).expect("registered"),
    ];

    let half = rules.half_length;
    let ot_half = rules.ot_half_length;
    let result = Game::new(GameSetup {
        rules: Arc::new(rules),
        table: table(),
        team_names: ["A".to_string(), "B".to_string()],
        strategy_names,
        strategies,
        seed: input.seed,
        keep_history: true,
    })
    .run();

    let [a, b] = result.scores;
    let target = half + result.overtime_periods * ot_half + 1;
    assert_eq!(a.max(b), target, "{result:?}");
    assert!(a.min(b) < target);
    assert_eq!(a + b, result.total_rounds);
    assert_eq!(result.rounds.len() as u32, result.total_rounds);
    for eco in &result.economics {
        assert!(eco.final_funds >= 0.0 && eco.final_funds.is_finite());
    }
});
