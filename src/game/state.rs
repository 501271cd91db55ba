//! Match state machine.
//!
//! ```text
//! NotStarted ──start──▶ InProgress ──(score reaches target)──▶ Finished
//!                         │    ▲
//!                         └────┘ play_round
//! ```
//!
//! Within `InProgress`, after each round:
//! - round `H` ends: half switch, regulation money
//! - round `2H` ends tied: overtime period 1, overtime money
//! - `OH` rounds into a period: overtime half switch
//! - `2·OH` rounds into a period, still tied: next overtime period
//!
//! The match is won by the first team to reach `H + k·OH + 1`, where `k`
//! is the current overtime period (0 in regulation).

use std::fmt;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::trace;

use super::economy::{next_loss_bonus_level, settle_round};
use super::outcome::determine_round_outcome;
use super::round::{RoundRecord, TeamRound};
use super::team::{Team, TeamEconomics};
use super::{RoundOutcome, Side, TeamSlot};
use crate::csf::contest_success;
use crate::distributions::DistributionTable;
use crate::rules::GameRules;
use crate::strategy::{Strategy, StrategyContext};

const SLOTS: [TeamSlot; 2] = [TeamSlot::One, TeamSlot::Two];

/// Lifecycle of a [`Game`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Constructed, no side assignment yet.
    NotStarted,
    /// Rounds are being played.
    InProgress,
    /// A team reached the winning score.
    Finished,
}

/// Inputs for one match.
#[derive(Clone)]
pub struct GameSetup {
    /// Economic rules.
    pub rules: Arc<GameRules>,
    /// Outcome distributions.
    pub table: Arc<DistributionTable>,
    /// Team names, team one first.
    pub team_names: [String; 2],
    /// Strategy identifiers, for reporting.
    pub strategy_names: [String; 2],
    /// Strategy implementations, team one first.
    pub strategies: [Arc<dyn Strategy>; 2],
    /// RNG seed for the whole match.
    pub seed: u64,
    /// Keep a [`RoundRecord`] for every round.
    pub keep_history: bool,
}

impl fmt::Debug for GameSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSetup")
            .field("team_names", &self.team_names)
            .field("strategy_names", &self.strategy_names)
            .field("seed", &self.seed)
            .field("keep_history", &self.keep_history)
            .finish_non_exhaustive()
    }
}

/// Final result of a match.
#[derive(Debug, Clone, Serialize)]
pub struct GameResult {
    /// Seed the match was played with.
    pub seed: u64,
    /// Winning team.
    pub winner: TeamSlot,
    /// Team names, team one first.
    pub team_names: [String; 2],
    /// Strategy identifiers, team one first.
    pub strategies: [String; 2],
    /// Final score, team one first.
    pub scores: [u32; 2],
    /// Rounds played.
    pub total_rounds: u32,
    /// Whether at least one overtime period was played.
    pub went_to_overtime: bool,
    /// Overtime periods played.
    pub overtime_periods: u32,
    /// Team that started on CT.
    pub starting_ct: TeamSlot,
    /// Rounds after which sides were switched.
    pub side_switches: Vec<u32>,
    /// Per-team economics, team one first.
    pub economics: [TeamEconomics; 2],
    /// Round history; empty when history was not kept.
    pub rounds: Vec<RoundRecord>,
}

impl GameResult {
    /// Whether team one won.
    #[must_use]
    pub fn team_one_won(&self) -> bool {
        self.winner == TeamSlot::One
    }

    /// Winner's score minus loser's score.
    #[must_use]
    pub fn margin(&self) -> u32 {
        let [a, b] = self.scores;
        a.abs_diff(b)
    }

    /// Name of the winning team.
    #[must_use]
    pub fn winner_name(&self) -> &str {
        &self.team_names[self.winner.index()]
    }

    /// Discard the round history.
    pub fn drop_rounds(&mut self) {
        self.rounds = Vec::new();
    }
}

/// One simulated match.
///
/// A `Game` owns its teams and its RNG; nothing inside it is shared with
/// other games.
pub struct Game {
    rules: Arc<GameRules>,
    table: Arc<DistributionTable>,
    strategies: [Arc<dyn Strategy>; 2],
    strategy_names: [String; 2],
    teams: [Team; 2],
    phase: GamePhase,
    rounds_played: u32,
    overtime_period: u32,
    csf_r: f64,
    rng: ChaCha8Rng,
    seed: u64,
    keep_history: bool,
    history: Vec<RoundRecord>,
    side_switches: Vec<u32>,
    starting_ct: TeamSlot,
    /// Previous round of the current half, for strategy context.
    last_outcome: Option<RoundOutcome>,
    winner: Option<TeamSlot>,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("rounds_played", &self.rounds_played)
            .field("overtime_period", &self.overtime_period)
            .field("teams", &self.teams)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Create a match that has not started yet.
    #[must_use]
    pub fn new(setup: GameSetup) -> Self {
        let GameSetup {
            rules,
            table,
            team_names: [name_one, name_two],
            strategy_names,
            strategies,
            seed,
            keep_history,
        } = setup;

        let csf_r = rules.csf_exponent(table.csf_exponent());
        let teams = [
            Team::new(name_one, strategy_names[0].clone(), Side::CounterTerrorist, &rules),
            Team::new(name_two, strategy_names[1].clone(), Side::Terrorist, &rules),
        ];

        Self {
            rules,
            table,
            strategies,
            strategy_names,
            teams,
            phase: GamePhase::NotStarted,
            rounds_played: 0,
            overtime_period: 0,
            csf_r,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            keep_history,
            history: Vec::new(),
            side_switches: Vec::new(),
            starting_ct: TeamSlot::One,
            last_outcome: None,
            winner: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Rounds completed so far.
    #[must_use]
    pub const fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// Overtime period in progress (0 in regulation).
    #[must_use]
    pub const fn overtime_period(&self) -> u32 {
        self.overtime_period
    }

    /// CSF exponent this match uses.
    #[must_use]
    pub const fn csf_exponent(&self) -> f64 {
        self.csf_r
    }

    /// Ledger for `slot`.
    #[must_use]
    pub fn team(&self, slot: TeamSlot) -> &Team {
        &self.teams[slot.index()]
    }

    /// Rounds recorded so far (empty when history is off).
    #[must_use]
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// Stop or resume keeping round history. Turning it off drops what was
    /// recorded.
    pub fn set_keep_history(&mut self, keep: bool) {
        self.keep_history = keep;
        if !keep {
            self.history = Vec::new();
        }
    }

    /// Winner, once finished.
    #[must_use]
    pub const fn winner(&self) -> Option<TeamSlot> {
        self.winner
    }

    /// Assign starting sides by coin flip and move to `InProgress`.
    /// Has no effect once started.
    pub fn start(&mut self) {
        if self.phase != GamePhase::NotStarted {
            return;
        }
        self.starting_ct = if self.rng.gen_bool(0.5) { TeamSlot::One } else { TeamSlot::Two };
        for slot in SLOTS {
            let side = if slot == self.starting_ct {
                Side::CounterTerrorist
            } else {
                Side::Terrorist
            };
            self.teams[slot.index()].reset_for_half(
                side,
                self.rules.starting_funds,
                self.rules.default_equipment,
            );
        }
        self.phase = GamePhase::InProgress;
        trace!(seed = self.seed, starting_ct = ?self.starting_ct, "game started");
    }

    /// Play the next round. Starts the match if needed; returns `None` once
    /// the match is finished.
    pub fn play_round(&mut self) -> Option<RoundRecord> {
        match self.phase {
            GamePhase::NotStarted => self.start(),
            GamePhase::Finished => return None,
            GamePhase::InProgress => {}
        }

        let rules = Arc::clone(&self.rules);
        let number = self.rounds_played + 1;
        let position = self.half_position(number);
        let score_to_win = rules.score_to_win(self.overtime_period);

        // Buy phase. Team one decides first so a seeded game replays exactly.
        let mut funds_before = [0.0; 2];
        let mut spent = [0.0; 2];
        for slot in SLOTS {
            let i = slot.index();
            let opponent = &self.teams[slot.other().index()];
            let own = &self.teams[i];
            let ctx = StrategyContext {
                funds: own.funds(),
                equipment: own.equipment(),
                current_round: number,
                own_score: own.score(),
                opponent_score: opponent.score(),
                consecutive_losses: own.consecutive_losses(),
                consecutive_wins: own.consecutive_wins(),
                loss_bonus_level: own.loss_bonus_level(),
                side: own.side(),
                is_pistol_round: position.index == 1,
                is_after_pistol: position.index == 2,
                is_last_round_of_half: position.index == position.length,
                is_overtime: self.overtime_period > 0,
                score_to_win,
                own_survivors: own.survivors(),
                enemy_survivors: opponent.survivors(),
                last_round_reason: self.last_outcome.map(|o| o.reason),
                last_bomb_planted: self.last_outcome.is_some_and(|o| o.bomb_planted),
                rules: &rules,
            };
            let request = self.strategies[i].invest(&ctx, &mut self.rng);

            let team = &mut self.teams[i];
            team.begin_round();
            funds_before[i] = team.funds();
            spent[i] = team.buy(request, &rules);
        }

        // Resolution.
        let ct_slot = if self.teams[0].side().is_ct() { TeamSlot::One } else { TeamSlot::Two };
        let ct_equipment = self.teams[ct_slot.index()].equipment();
        let t_equipment = self.teams[ct_slot.other().index()].equipment();
        let ct_win_probability = contest_success(ct_equipment, t_equipment, self.csf_r);
        let outcome = determine_round_outcome(&self.table, ct_win_probability, &mut self.rng);

        let winner = if outcome.ct_wins { ct_slot } else { ct_slot.other() };
        let loser_level = self.teams[winner.other().index()].loss_bonus_level();
        let settlement = settle_round(&outcome, loser_level, &rules);

        // Settlement.
        let teams = SLOTS.map(|slot| {
            let i = slot.index();
            let won = slot == winner;
            let team = &mut self.teams[i];
            let side = team.side();
            let fielded = team.equipment();

            team.set_loss_bonus_level(next_loss_bonus_level(team.loss_bonus_level(), won, &rules));
            team.earn(settlement.earned(side), &rules);
            team.record_result(won);
            team.carry_over(outcome.equipment_saved(side), outcome.survivors(side), &rules);

            TeamRound {
                side,
                funds_before: funds_before[i],
                spent: spent[i],
                equipment: fielded,
                earned: team.earned_this_round(),
                funds_after: team.funds(),
                loss_bonus_level: team.loss_bonus_level(),
            }
        });

        let record = RoundRecord {
            number,
            overtime: self.overtime_period > 0,
            ct_win_probability,
            outcome,
            winner,
            teams,
            score: [self.teams[0].score(), self.teams[1].score()],
        };

        self.rounds_played = number;
        self.last_outcome = Some(outcome);
        if self.keep_history {
            self.history.push(record.clone());
        }

        self.advance(number);
        Some(record)
    }

    /// Play to completion and return the result.
    #[must_use]
    pub fn run(mut self) -> GameResult {
        self.start();
        loop {
            if let Some(winner) = self.winner {
                return self.into_result(winner);
            }
            self.play_round();
        }
    }

    /// Check for a winner, otherwise apply any half or overtime transition
    /// due after round `number`.
    fn advance(&mut self, number: u32) {
        let target = self.rules.score_to_win(self.overtime_period);
        if let Some(slot) = SLOTS.into_iter().find(|s| self.teams[s.index()].score() >= target) {
            self.winner = Some(slot);
            self.phase = GamePhase::Finished;
            trace!(seed = self.seed, rounds = number, winner = ?slot, "game finished");
            return;
        }

        let half = self.rules.half_length;
        let ot_half = self.rules.ot_half_length;
        let regulation = self.rules.regulation_rounds();

        if number == half {
            self.switch_sides(number, self.rules.starting_funds, self.rules.default_equipment);
        } else if number == regulation {
            self.enter_overtime();
        } else if number > regulation {
            let into_period = (number - regulation - 1) % self.rules.overtime_period_rounds() + 1;
            if into_period == ot_half {
                self.switch_sides(number, self.rules.ot_funds, self.rules.ot_equipment);
            } else if into_period == ot_half * 2 {
                self.enter_overtime();
            }
        }
    }

    fn switch_sides(&mut self, after_round: u32, funds: f64, equipment: f64) {
        for team in &mut self.teams {
            let side = team.side().opposite();
            team.reset_for_half(side, funds, equipment);
        }
        self.side_switches.push(after_round);
        self.last_outcome = None;
        trace!(seed = self.seed, after_round, "sides switched");
    }

    fn enter_overtime(&mut self) {
        self.overtime_period += 1;
        for team in &mut self.teams {
            let side = team.side();
            team.reset_for_half(side, self.rules.ot_funds, self.rules.ot_equipment);
        }
        self.last_outcome = None;
        trace!(seed = self.seed, period = self.overtime_period, "overtime");
    }

    /// 1-based position of round `number` within its half, and the half's
    /// length.
    fn half_position(&self, number: u32) -> HalfPosition {
        let half = self.rules.half_length;
        let regulation = self.rules.regulation_rounds();
        if number <= regulation {
            let index = (number - 1) % half + 1;
            HalfPosition { index, length: half }
        } else {
            let ot_half = self.rules.ot_half_length;
            let into_period = (number - regulation - 1) % self.rules.overtime_period_rounds() + 1;
            let index = (into_period - 1) % ot_half + 1;
            HalfPosition {
                index,
                length: ot_half,
            }
        }
    }

    fn into_result(self, winner: TeamSlot) -> GameResult {
        GameResult {
            seed: self.seed,
            winner,
            team_names: [self.teams[0].name().to_string(), self.teams[1].name().to_string()],
            strategies: self.strategy_names,
            scores: [self.teams[0].score(), self.teams[1].score()],
            total_rounds: self.rounds_played,
            went_to_overtime: self.overtime_period > 0,
            overtime_periods: self.overtime_period,
            starting_ct: self.starting_ct,
            side_switches: self.side_switches,
            economics: [self.teams[0].economics(), self.teams[1].economics()],
            rounds: self.history,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HalfPosition {
    index: u32,
    length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::test_table;
    use crate::strategy::StrategyRegistry;

    fn setup(seed: u64, a: &str, b: &str) -> GameSetup {
        let registry = StrategyRegistry::with_builtins();
        GameSetup {
            rules: Arc::new(GameRules::default()),
            table: Arc::new(test_table()),
            team_names: ["Team A".to_string(), "Team B".to_string()],
            strategy_names: [a.to_string(), b.to_string()],
            strategies: [registry.get(a).unwrap(), registry.get(b).unwrap()],
            seed,
            keep_history: true,
        }
    }

    #[test]
    fn test_phases() {
        let mut game = Game::new(setup(1, "half", "half"));
        assert_eq!(game.phase(), GamePhase::NotStarted);
        game.play_round();
        assert_eq!(game.phase(), GamePhase::InProgress);
        while game.play_round().is_some() {}
        assert_eq!(game.phase(), GamePhase::Finished);
        assert!(game.winner().is_some());
        assert!(game.play_round().is_none());
    }

    #[test]
    fn test_score_sums_to_rounds() {
        for seed in 0..40 {
            let result = Game::new(setup(seed, "all_in", "smart_v1")).run();
            let [a, b] = result.scores;
            assert_eq!(a + b, result.total_rounds);
            assert_eq!(result.rounds.len() as u32, result.total_rounds);
        }
    }

    #[test]
    fn test_winner_reaches_target() {
        let rules = GameRules::default();
        for seed in 0..40 {
            let result = Game::new(setup(seed, "half", "random")).run();
            let target = rules.score_to_win(result.overtime_periods);
            let winner = result.scores[result.winner.index()];
            let loser = result.scores[result.winner.other().index()];
            assert_eq!(winner, target);
            assert!(loser < winner);
            if result.went_to_overtime {
                assert!(winner - loser >= 2);
            }
        }
    }

    #[test]
    fn test_half_switch_after_round_15() {
        for seed in 0..20 {
            let result = Game::new(setup(seed, "all_in", "all_in")).run();
            assert!(result.total_rounds >= 16);
            assert_eq!(result.side_switches.first(), Some(&15));
            let sides_15 = result.rounds[14].teams[0].side;
            let sides_16 = result.rounds[15].teams[0].side;
            assert_eq!(sides_16, sides_15.opposite());
            assert_eq!(
                result.side_switches.iter().filter(|&&r| r == 15).count(),
                1
            );
        }
    }

    #[test]
    fn test_funds_never_exceed_cap() {
        let rules = GameRules::default();
        for seed in 0..20 {
            let result = Game::new(setup(seed, "scrooge", "scrooge")).run();
            for round in &result.rounds {
                for team in &round.teams {
                    assert!(team.funds_after <= rules.max_funds);
                }
            }
        }
    }

    #[test]
    fn test_seed_reproduces_game() {
        let a = Game::new(setup(42, "random", "random")).run();
        let b = Game::new(setup(42, "random", "random")).run();
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.rounds, b.rounds);
    }

    #[test]
    fn test_history_can_be_dropped() {
        let mut game = Game::new(setup(3, "half", "half"));
        game.set_keep_history(false);
        let result = game.run();
        assert!(result.rounds.is_empty());
        assert!(result.total_rounds >= 16);
    }

    #[test]
    fn test_half_position() {
        let game = Game::new(setup(0, "half", "half"));
        let p = game.half_position(1);
        assert_eq!((p.index, p.length), (1, 15));
        let p = game.half_position(16);
        assert_eq!((p.index, p.length), (1, 15));
        let p = game.half_position(30);
        assert_eq!((p.index, p.length), (15, 15));
        let p = game.half_position(31);
        assert_eq!((p.index, p.length), (1, 3));
        let p = game.half_position(34);
        assert_eq!((p.index, p.length), (1, 3));
        let p = game.half_position(37);
        assert_eq!((p.index, p.length), (1, 3));
    }
}
