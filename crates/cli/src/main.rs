//! galley - build and release pipeline for a typeset manuscript.

mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::EventArg;
use output::OutputFormat;

/// galley - manuscript build and release pipeline
#[derive(Parser)]
#[command(name = "galley")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the project configuration file
  #[arg(short, long, global = true, default_value = "galley.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile the manuscript to validate it, without publishing
  Check {
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Build the full manuscript and publish it at the release tag
  Release {
    /// Build fully but skip the upload
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Evaluate the trigger and run the pipeline it selects
  Run {
    /// Trigger event (detected from the hosting environment if omitted)
    #[arg(long, value_enum)]
    event: Option<EventArg>,

    /// Changed path reported by the host (repeatable)
    #[arg(long = "changed")]
    changed: Vec<String>,

    /// Manual dispatch carries release intent
    #[arg(long)]
    release: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show configuration and toolchain status
  Status {
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Initialize logging
  let filter = if cli.verbose {
    EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt().with_env_filter(filter).without_time().init();

  match cli.command {
    Commands::Check { format } => cmd::cmd_check(&cli.config, format).await,
    Commands::Release { dry_run, format } => cmd::cmd_release(&cli.config, dry_run, format).await,
    Commands::Run {
      event,
      changed,
      release,
      format,
    } => cmd::cmd_run(&cli.config, event, changed, release, format).await,
    Commands::Status { format } => cmd::cmd_status(&cli.config, format),
  }
}
