//! Output formatting utilities for CLI.

use buyround::game::RoundRecord;
use buyround::{BatchConfig, FinalStats, GameResult, GameRules};
use serde::Serialize;
use std::fmt::Write;

/// Contents of the batch summary JSON file.
#[derive(Debug, Serialize)]
pub(super) struct BatchSummary<'a> {
    /// How the batch was run.
    pub(super) config: &'a BatchConfig,
    /// Rules the games were played under.
    pub(super) rules: &'a GameRules,
    /// Aggregated results.
    pub(super) stats: &'a FinalStats,
}

/// Format a game result as human-readable text.
pub(super) fn format_game_text(result: &GameResult) -> String {
    let mut output = String::new();
    let [one, two] = &result.team_names;
    let [s1, s2] = &result.strategies;

    let _ = writeln!(output, "Game Result (seed: {})", result.seed);
    let _ = writeln!(output, "  {one} ({s1}) {} - {} {two} ({s2})", result.scores[0], result.scores[1]);
    let _ = writeln!(output, "  Winner: {}", result.winner_name());
    let _ = write!(output, "  Rounds: {}", result.total_rounds);
    if result.went_to_overtime {
        let _ = write!(output, " ({} overtime period(s))", result.overtime_periods);
    }
    output.push('\n');
    let _ = writeln!(output, "  Started on CT: {}", result.team_names[result.starting_ct.index()]);
    output.push('\n');

    for (name, eco) in result.team_names.iter().zip(&result.economics) {
        let _ = writeln!(
            output,
            "  {name}: spent {:.0}, earned {:.0}, final funds {:.0}, avg equipment {:.0}",
            eco.total_spent, eco.total_earned, eco.final_funds, eco.average_equipment
        );
    }

    output
}

/// One line per round.
pub(super) fn format_rounds_text(rounds: &[RoundRecord], names: &[String; 2]) -> String {
    let mut output = String::new();
    for round in rounds {
        let [a, b] = &round.teams;
        let _ = writeln!(
            output,
            "  R{:>2}{} {:>2}-{:<2} P(CT)={:.2} {:<22} {} wins | {} {}: spent {:>6.0} funds {:>6.0} | {} {}: spent {:>6.0} funds {:>6.0}",
            round.number,
            if round.overtime { "*" } else { " " },
            round.score[0],
            round.score[1],
            round.ct_win_probability,
            round.outcome.reason.name(),
            names[round.winner.index()],
            names[0],
            a.side,
            a.spent,
            a.funds_after,
            names[1],
            b.side,
            b.spent,
            b.funds_after,
        );
    }
    output
}

/// Format batch statistics as human-readable text.
pub(super) fn format_stats_text(stats: &FinalStats, names: &[String; 2], strategies: &[String; 2]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Batch Results ({} simulations)", stats.total_simulations);
    let _ = writeln!(
        output,
        "  Completed: {}  Failed: {} (panicked {}, timed out {}, cancelled {})",
        stats.completed, stats.failed, stats.panicked, stats.timed_out, stats.cancelled
    );
    output.push('\n');

    let rows = [
        (
            &names[0],
            &strategies[0],
            stats.team_one_wins,
            stats.team_one_win_rate,
            stats.team_one_regulation_wins,
            stats.team_one_overtime_wins,
            stats.average_score[0],
        ),
        (
            &names[1],
            &strategies[1],
            stats.team_two_wins,
            stats.team_two_win_rate,
            stats.team_two_regulation_wins,
            stats.team_two_overtime_wins,
            stats.average_score[1],
        ),
    ];
    let _ = writeln!(
        output,
        "  {:<16} {:<16} {:>8} {:>7} {:>6} {:>6} {:>6}",
        "Team", "Strategy", "Wins", "Rate", "Reg", "OT", "Score"
    );
    for (name, strategy, wins, rate, reg, ot, score) in rows {
        let _ = writeln!(
            output,
            "  {name:<16} {strategy:<16} {wins:>8} {:>6.2}% {reg:>6} {ot:>6} {score:>6.2}",
            rate * 100.0
        );
    }
    output.push('\n');

    let _ = writeln!(
        output,
        "  Rounds: avg {:.2}, median {}, std dev {:.2}",
        stats.average_rounds, stats.median_rounds, stats.round_std_dev
    );
    let _ = writeln!(
        output,
        "  Overtime: {} games ({:.2}%)",
        stats.overtime_games,
        stats.overtime_rate * 100.0
    );
    let _ = writeln!(output, "  Close games: {}  Blowouts: {}", stats.close_games, stats.blowouts);
    let _ = writeln!(
        output,
        "  Duration: {:.2}s ({:.0} games/sec)",
        stats.elapsed_secs, stats.simulations_per_second
    );
    let _ = writeln!(
        output,
        "  Peak memory: {:.1} MB ({} pressure events)",
        stats.peak_memory_mb, stats.memory_pressure_events
    );

    output
}
