//! Implementation of the `galley release` command.
//!
//! Full build of the manuscript (partial directive stripped) followed
//! by publication at the fixed release tag. `--dry-run` does the full
//! build and reports instead of uploading.

use std::path::Path;
use std::process;

use anyhow::Result;

use galley_core::BuildMode;
use galley_core::pipeline::{self, RunOptions};
use galley_core::release::{GitHubReleases, NullChannel};
use galley_platform::{HostContext, Toolchain};

use crate::cmd::load_config;
use crate::output::{self, OutputFormat};

pub async fn cmd_release(config_path: &Path, dry_run: bool, format: OutputFormat) -> Result<()> {
  let (config, root) = load_config(config_path)?;

  let toolchain = Toolchain::provision(
    &config.engine.command,
    &config.engine.highlighter,
    config.engine.shell_escape,
  )?;

  let options = RunOptions {
    mode: BuildMode::Release,
    dry_run,
    revision: HostContext::detect().and_then(|ctx| ctx.revision),
  };

  // The channel is resolved before the engine runs; a missing token
  // fails before any typesetting starts.
  let report = if dry_run {
    pipeline::run(&config, &root, &toolchain, &NullChannel, &options).await?
  } else {
    let channel = GitHubReleases::from_config(&config.release)?;
    pipeline::run(&config, &root, &toolchain, &channel, &options).await?
  };

  output::print_report(&report, format)?;

  if !report.is_success() {
    process::exit(1);
  }
  Ok(())
}
