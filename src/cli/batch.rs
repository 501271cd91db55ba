//! Batch command implementation.

use super::output::{format_stats_text, BatchSummary};
use super::{seed_or_now, CliError, Inputs, OutputFormat};
use buyround::sim::{default_workers, JsonDirSink};
use buyround::{Batch, BatchConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for the batch command.
#[derive(Debug)]
pub(crate) struct BatchArgs {
    pub(crate) strategies: [String; 2],
    pub(crate) simulations: u64,
    pub(crate) workers: Option<usize>,
    pub(crate) seed: Option<u64>,
    pub(crate) timeout: u64,
    pub(crate) memory_limit: u64,
    pub(crate) sequential: bool,
    pub(crate) export: Option<PathBuf>,
    pub(crate) summary: Option<PathBuf>,
    pub(crate) format: OutputFormat,
    pub(crate) progress: bool,
}

/// Execute the batch command.
///
/// # Errors
///
/// Returns an error if the inputs cannot be loaded, a strategy is unknown,
/// or an output file cannot be written. Failed games are only counted.
pub(crate) fn execute(inputs: &Inputs, args: BatchArgs) -> Result<(), CliError> {
    let loaded = inputs.load()?;

    let config = BatchConfig {
        simulations: args.simulations,
        workers: args.workers.unwrap_or_else(default_workers),
        job_timeout: Duration::from_secs(args.timeout),
        memory_ceiling_mb: args.memory_limit,
        base_seed: seed_or_now(args.seed),
        strategy_names: args.strategies,
        sequential: args.sequential,
        ..BatchConfig::default()
    };
    let names = config.team_names.clone();
    let strategies = config.strategy_names.clone();

    let rules = Arc::clone(&loaded.rules);
    let mut batch = Batch::new(config, loaded.rules, loaded.table, &loaded.registry)?;

    if let Some(dir) = &args.export {
        if args.simulations > 10_000 {
            eprintln!("Warning: exporting {} individual results may put pressure on the filesystem", args.simulations);
        }
        batch = batch.with_sink(Box::new(JsonDirSink::create(dir)?));
    }

    if args.progress {
        let pb = ProgressBar::new(args.simulations);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
                .map_err(|e| CliError::new(format!("invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        batch = batch.with_progress(pb);
    }

    let config = batch.config().clone();
    let stats = batch.run()?;

    if let Some(path) = &args.summary {
        let summary = BatchSummary {
            config: &config,
            rules: &rules,
            stats: &stats,
        };
        fs::write(path, serde_json::to_string_pretty(&summary)?)
            .map_err(|e| CliError::new(format!("Failed to write {}: {e}", path.display())))?;
    }

    match args.format {
        OutputFormat::Text => {
            println!();
            print!("{}", format_stats_text(&stats, &names, &strategies));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
