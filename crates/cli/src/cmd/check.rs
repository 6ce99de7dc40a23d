//! Implementation of the `galley check` command.
//!
//! A compile-only validation build: the partial directive stays active
//! and nothing is ever published, whatever the outcome.

use std::path::Path;
use std::process;

use anyhow::Result;

use galley_core::BuildMode;
use galley_core::pipeline::{self, RunOptions};
use galley_core::release::NullChannel;
use galley_platform::{HostContext, Toolchain};

use crate::cmd::load_config;
use crate::output::{self, OutputFormat};

pub async fn cmd_check(config_path: &Path, format: OutputFormat) -> Result<()> {
  let (config, root) = load_config(config_path)?;

  let toolchain = Toolchain::provision(
    &config.engine.command,
    &config.engine.highlighter,
    config.engine.shell_escape,
  )?;

  let mut options = RunOptions::for_mode(BuildMode::Check);
  options.revision = HostContext::detect().and_then(|ctx| ctx.revision);

  let report = pipeline::run(&config, &root, &toolchain, &NullChannel, &options).await?;
  output::print_report(&report, format)?;

  if !report.is_success() {
    process::exit(1);
  }
  Ok(())
}
