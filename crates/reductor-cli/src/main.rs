//! CLI for reductor — a preemptive, user-space process scheduler runtime.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reductor")]
#[command(about = "reductor — a BEAM-style preemptive process scheduler runtime")]
#[command(version = reductor_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the invariant/law/scenario battery; exits 1 if any check fails
    Check {
        /// Write the full pass/fail report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Print the per-core topology classification (performance/efficiency)
    Topology {
        /// Number of cores to classify
        #[arg(long, default_value = "16")]
        cores: usize,
    },

    /// Drive a synthetic workload through the runtime and report stats
    Run {
        /// Number of cores in the runtime
        #[arg(long, default_value = "4")]
        cores: usize,

        /// Number of processes to spawn
        #[arg(long, default_value = "64")]
        processes: usize,

        /// Number of schedule/steal/tick rounds to run
        #[arg(long, default_value = "100")]
        ticks: u64,

        /// Seed for the deterministic work-stealing RNG
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check { output } => commands::check::run(output.as_deref()),
        Commands::Topology { cores } => {
            commands::topology::run(cores);
            0
        }
        Commands::Run {
            cores,
            processes,
            ticks,
            seed,
        } => {
            commands::run::run(commands::run::RunCommandConfig {
                cores,
                processes,
                ticks,
                seed,
            });
            0
        }
    };

    std::process::exit(exit_code);
}
