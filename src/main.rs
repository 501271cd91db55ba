//! Buyround CLI - play single games or simulation batches.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

/// Buyround - a buy-round economy simulator
#[derive(Parser, Debug)]
#[command(name = "buyround")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a single game
    Run {
        #[command(flatten)]
        inputs: cli::Inputs,

        /// Team one strategy
        #[arg(long, default_value = "all_in")]
        team1: String,

        /// Team two strategy
        #[arg(long, default_value = "all_in")]
        team2: String,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Include every round in the output
        #[arg(long)]
        rounds: bool,
    },

    /// Run many games and aggregate statistics
    Batch {
        #[command(flatten)]
        inputs: cli::Inputs,

        /// Team one strategy
        #[arg(long, default_value = "all_in")]
        team1: String,

        /// Team two strategy
        #[arg(long, default_value = "all_in")]
        team2: String,

        /// Number of games to run
        #[arg(short = 'n', long, default_value = "1000")]
        simulations: u64,

        /// Worker threads (default: 80% of CPUs)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Starting seed (increments for each game, default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Per-game timeout in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Memory ceiling in megabytes
        #[arg(long, default_value = "3000")]
        memory_limit: u64,

        /// Play games one after another instead of on a worker pool
        #[arg(long)]
        sequential: bool,

        /// Write one JSON file per game into this directory
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the batch summary as JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// List the available strategies
    Strategies,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            inputs,
            team1,
            team2,
            seed,
            format,
            rounds,
        } => cli::run::execute(&inputs, [team1, team2], seed, format, rounds),

        Commands::Batch {
            inputs,
            team1,
            team2,
            simulations,
            workers,
            seed,
            timeout,
            memory_limit,
            sequential,
            export,
            summary,
            format,
            progress,
        } => cli::batch::execute(
            &inputs,
            cli::batch::BatchArgs {
                strategies: [team1, team2],
                simulations,
                workers,
                seed,
                timeout,
                memory_limit,
                sequential,
                export,
                summary,
                format,
                progress,
            },
        ),

        Commands::Strategies => cli::strategies::execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays clean for JSON output.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
