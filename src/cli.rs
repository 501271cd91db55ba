//! CLI command implementations for Buyround.

pub(crate) mod batch;
pub(crate) mod run;
pub(crate) mod strategies;

mod output;

use buyround::error::{DistributionError, SimError, StrategyError};
use buyround::strategy::{LogisticModel, ModelStrategy};
use buyround::{DistributionTable, GameRules, StrategyRegistry};
use clap::{Args, ValueEnum};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Output format for the `run` and `batch` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Input files shared by the game commands.
#[derive(Args, Debug)]
pub(crate) struct Inputs {
    /// Distributions artifact (default: distributions.json here or in the parent directory)
    #[arg(short, long)]
    distributions: Option<PathBuf>,

    /// Game rules JSON ("default" or omitted for built-in rules)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Register a logistic model as a strategy: NAME=PATH (repeatable)
    #[arg(long = "model", value_name = "NAME=PATH")]
    models: Vec<String>,
}

/// Everything loaded before the first game.
pub(crate) struct Loaded {
    pub(crate) rules: Arc<GameRules>,
    pub(crate) table: Arc<DistributionTable>,
    pub(crate) registry: StrategyRegistry,
}

impl Inputs {
    /// Load rules, distributions and the strategy registry.
    ///
    /// # Errors
    ///
    /// Missing or malformed distributions and unusable model files are
    /// fatal. Rules fall back to defaults.
    pub(crate) fn load(&self) -> Result<Loaded, CliError> {
        let (rules, _) = GameRules::load_or_default(self.rules.as_deref());
        let table = DistributionTable::load(self.distributions.as_deref())?;

        let mut registry = StrategyRegistry::with_builtins();
        for entry in &self.models {
            let (name, path) = entry
                .split_once('=')
                .ok_or_else(|| CliError::new(format!("invalid --model '{entry}', expected NAME=PATH")))?;
            let model = LogisticModel::load(Path::new(path))?;
            registry.register(name, Arc::new(ModelStrategy::new(Arc::new(model))));
        }

        Ok(Loaded {
            rules: Arc::new(rules),
            table: Arc::new(table),
            registry,
        })
    }
}

/// Seed from the clock when none was given.
pub(crate) fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
            .unwrap_or(42)
    })
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<DistributionError> for CliError {
    fn from(e: DistributionError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<StrategyError> for CliError {
    fn from(e: StrategyError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<SimError> for CliError {
    fn from(e: SimError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
