//! MEP CLI - evolve expressions that fit sample data.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// MEP - Multi Expression Programming symbolic regression
#[derive(Parser, Debug)]
#[command(name = "mep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve an expression for a dataset or a delimited file
    Solve(cli::solve::SolveArgs),

    /// List the operator palette
    Operators {
        /// Show only enabled operators
        #[arg(long)]
        enabled: bool,
    },

    /// Print a synthetic dataset
    Data {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Number of rows (default: 100)
        #[arg(short, long, default_value = "100")]
        rows: usize,

        /// Random seed (default: 42)
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Field separator (default: ',')
        #[arg(long, default_value = ",")]
        sep: char,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match args.command {
        Commands::Solve(solve) => cli::solve::execute(&solve),
        Commands::Operators { enabled } => {
            cli::operators::execute(enabled);
            Ok(())
        }
        Commands::Data {
            dataset,
            rows,
            seed,
            sep,
        } => cli::data::execute(&dataset, rows, seed, sep),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
