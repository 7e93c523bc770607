//! variant-eval CLI - Image variation comparison tool

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::compare::CompareArgs;
use commands::inspect::InspectFormat;

/// Compare image variations across two directories with PSNR and SSIM.
#[derive(Parser)]
#[command(name = "variant-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare same-named files in two directories
    Compare(CompareArgs),

    /// Describe every image in a directory
    Inspect {
        /// Directory to scan
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,

        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,variant_eval={level},variant_eval_cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compare(args) => commands::compare::run(args),
        Commands::Inspect { dir, format, output } => commands::inspect::run(dir, format, output),
    }
}
