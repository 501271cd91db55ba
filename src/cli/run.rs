//! Run command implementation.

use super::output::{format_game_text, format_rounds_text};
use super::{seed_or_now, CliError, Inputs, OutputFormat};
use buyround::{Game, GameSetup};

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the inputs cannot be loaded or a strategy is unknown.
pub(crate) fn execute(
    inputs: &Inputs,
    strategies: [String; 2],
    seed: Option<u64>,
    format: OutputFormat,
    rounds: bool,
) -> Result<(), CliError> {
    let loaded = inputs.load()?;
    let [one, two] = &strategies;
    let resolved = [loaded.registry.get(one)?, loaded.registry.get(two)?];
    let seed = seed_or_now(seed);

    let result = Game::new(GameSetup {
        rules: loaded.rules,
        table: loaded.table,
        team_names: ["Team 1".to_string(), "Team 2".to_string()],
        strategy_names: strategies,
        strategies: resolved,
        seed,
        keep_history: rounds,
    })
    .run();

    match format {
        OutputFormat::Text => {
            print!("{}", format_game_text(&result));
            if rounds {
                println!();
                print!("{}", format_rounds_text(&result.rounds, &result.team_names));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
