// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Bucketbench CLI
//!
//! Command-line interface for benchmarking container engine lifecycles.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod report;
mod reporter;

/// Bucketbench - Container engine lifecycle benchmark
#[derive(Parser)]
#[command(name = "bucketbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log filter (error, warn, info, debug, trace or a full directive)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the benchmarks of a definition file
    Run {
        /// Path to the benchmark YAML file
        #[arg(short, long)]
        benchmark: PathBuf,

        /// Skip the Limit benchmark
        #[arg(short, long)]
        skip_limit: bool,

        /// Enable engine debug output
        #[arg(short, long)]
        trace: bool,

        /// Limit benchmark thread count (default: first driver's)
        #[arg(long)]
        limit_threads: Option<usize>,

        /// Limit benchmark iterations per thread (default: first driver's)
        #[arg(long)]
        limit_iterations: Option<usize>,

        /// Write a JSON report of every level to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a benchmark definition file
    Validate {
        /// Path to the benchmark YAML file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            benchmark,
            skip_limit,
            trace,
            limit_threads,
            limit_iterations,
            output,
        } => {
            let options = commands::run::RunOptions {
                skip_limit,
                trace,
                limit_threads,
                limit_iterations,
                output,
            };
            commands::run::execute(&benchmark, options).await
        }
        Commands::Validate { file } => commands::validate::execute(&file).await,
    }
}
