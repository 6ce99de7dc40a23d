//! Implementation of the `galley run` command.
//!
//! Evaluates the trigger (from flags, or detected from the hosting
//! environment) and dispatches the pipeline it selects. A skip decision
//! is a successful, empty run.

use std::path::Path;
use std::process;

use anyhow::Result;
use clap::ValueEnum;

use galley_core::pipeline::{self, RunOptions};
use galley_core::release::{GitHubReleases, NullChannel};
use galley_core::trigger::{self, RunDecision, TriggerEvent};
use galley_platform::{HostContext, Toolchain};

use crate::cmd::load_config;
use crate::output::{self, OutputFormat};

/// Trigger events addressable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventArg {
  Push,
  PullRequest,
  Schedule,
  Manual,
}

pub async fn cmd_run(
  config_path: &Path,
  event: Option<EventArg>,
  changed: Vec<String>,
  release: bool,
  format: OutputFormat,
) -> Result<()> {
  let (config, root) = load_config(config_path)?;

  let event = resolve_event(event, changed, release)?;
  let filter = config.path_filter()?;

  let decision = trigger::evaluate(&event, &filter);
  let mode = match &decision {
    RunDecision::Skip { reason } => {
      if format.is_json() {
        output::print_json(&decision)?;
      } else {
        output::print_info(&format!("run skipped: {reason}"));
      }
      return Ok(());
    }
    RunDecision::Run { mode } => *mode,
  };

  let toolchain = Toolchain::provision(
    &config.engine.command,
    &config.engine.highlighter,
    config.engine.shell_escape,
  )?;

  let options = RunOptions {
    mode,
    dry_run: false,
    revision: HostContext::detect().and_then(|ctx| ctx.revision),
  };

  let report = if mode.publishes() {
    let channel = GitHubReleases::from_config(&config.release)?;
    pipeline::run(&config, &root, &toolchain, &channel, &options).await?
  } else {
    pipeline::run(&config, &root, &toolchain, &NullChannel, &options).await?
  };

  output::print_report(&report, format)?;

  if !report.is_success() {
    process::exit(1);
  }
  Ok(())
}

/// Build the trigger event from flags, falling back to the hosting
/// environment when no `--event` was given.
fn resolve_event(
  event: Option<EventArg>,
  changed: Vec<String>,
  release: bool,
) -> Result<TriggerEvent> {
  let event = match event {
    Some(EventArg::Push) => TriggerEvent::Push { changed },
    Some(EventArg::PullRequest) => TriggerEvent::PullRequest { changed },
    Some(EventArg::Schedule) => TriggerEvent::Schedule,
    Some(EventArg::Manual) => TriggerEvent::Manual { release },
    None => match HostContext::detect() {
      Some(ctx) => TriggerEvent::from(&ctx),
      None => anyhow::bail!(
        "no --event given and no hosting environment detected; pass --event to run locally"
      ),
    },
  };
  Ok(event)
}
