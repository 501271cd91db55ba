//! Strategies command implementation.

use super::CliError;
use buyround::StrategyRegistry;

/// Print the built-in strategy names, one per line.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn execute() -> Result<(), CliError> {
    for name in StrategyRegistry::with_builtins().names() {
        println!("{name}");
    }
    Ok(())
}
