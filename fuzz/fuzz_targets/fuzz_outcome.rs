#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use buyround::game::{resolve_outcome, settle_round, OutcomeDraws};
use buyround::{DistributionTable, GameRules, RoundEndReason};
use libfuzzer_sys::fuzz_target;

/// Raw draws; mapped into [0, 1) before use.
#[derive(Arbitrary, Debug)]
struct OutcomeInput {
    ct_win_probability: f64,
    draws: [u32; 7],
    loser_level: u8,
}

fn table() -> &'static DistributionTable {
    static TABLE: OnceLock<DistributionTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        DistributionTable::from_json_str(include_str!("../../tests/fixtures/distributions.json"))
            .expect("fixture parses")
    })
}

fn unit(x: u32) -> f64 {
    f64::from(x) / (f64::from(u32::MAX) + 1.0)
}

fuzz_target!(|input: OutcomeInput| {
    let d = input.draws.map(unit);
    let draws = OutcomeDraws {
        winner: d[0],
        reason: d[1],
        bomb: d[2],
        ct_survivors: d[3],
        t_survivors: d[4],
        ct_equipment: d[5],
        t_equipment: d[6],
    };

    // Any probability, including NaN and infinities, must yield a consistent outcome
    let outcome = resolve_outcome(table(), input.ct_win_probability, &draws);

    assert!(outcome.ct_survivors <= 5 && outcome.t_survivors <= 5);
    assert!(outcome.ct_equipment_saved >= 0.0 && outcome.t_equipment_saved >= 0.0);
    assert_eq!(outcome.reason.winner(), outcome.winner(), "{outcome:?}");
    match outcome.reason {
        RoundEndReason::BombExploded => assert!(outcome.bomb_planted),
        RoundEndReason::TerroristsEliminatedCt => assert_eq!(outcome.ct_survivors, 0),
        RoundEndReason::BombDefused => assert!(outcome.bomb_planted && outcome.ct_survivors > 0),
        RoundEndReason::CtEliminationOrTime => assert!(!outcome.bomb_planted && outcome.ct_survivors > 0),
    }

    let rules = GameRules::default();
    let settlement = settle_round(&outcome, usize::from(input.loser_level), &rules);
    assert!(settlement.ct_earned.is_finite() && settlement.ct_earned >= 0.0);
    assert!(settlement.t_earned.is_finite() && settlement.t_earned >= 0.0);
});
