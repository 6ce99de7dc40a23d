//! Implementation of the `galley status` command.
//!
//! Diagnostic view: config summary plus a toolchain provisioning probe.
//! Informational only, so a missing tool is reported as a warning and
//! the command still exits zero.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use galley_platform::{HostContext, Toolchain};

use crate::cmd::load_config;
use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct StatusReport {
  entry: String,
  engine: String,
  shell_escape: bool,
  highlighter: String,
  work_dir: String,
  release_tag: String,
  release_repo: String,
  release_asset: String,
  schedule: Option<String>,
  trigger_paths: Vec<String>,
  toolchain: Option<Toolchain>,
  toolchain_error: Option<String>,
  host: Option<HostContext>,
}

pub fn cmd_status(config_path: &Path, format: OutputFormat) -> Result<()> {
  let (config, root) = load_config(config_path)?;

  let provisioned = Toolchain::provision(
    &config.engine.command,
    &config.engine.highlighter,
    config.engine.shell_escape,
  );
  let (toolchain, toolchain_error) = match provisioned {
    Ok(toolchain) => (Some(toolchain), None),
    Err(e) => (None, Some(e.to_string())),
  };

  let host = HostContext::detect();

  let report = StatusReport {
    entry: config.entry_path(&root).display().to_string(),
    engine: config.engine.command.clone(),
    shell_escape: config.engine.shell_escape,
    highlighter: config.engine.highlighter.clone(),
    work_dir: root.join(&config.engine.work_dir).display().to_string(),
    release_tag: config.release.tag.clone(),
    release_repo: config.release.repo.clone(),
    release_asset: config.artifact_name(),
    schedule: config.triggers.schedule.clone(),
    trigger_paths: config.triggers.paths.clone(),
    toolchain,
    toolchain_error,
    host,
  };

  if format.is_json() {
    return output::print_json(&report);
  }

  print_text(&report);
  Ok(())
}

fn print_text(report: &StatusReport) {
  output::print_info(&format!("galley v{}", env!("CARGO_PKG_VERSION")));

  output::print_stat("entry", &report.entry);
  output::print_stat("work dir", &report.work_dir);

  match &report.toolchain {
    Some(toolchain) => {
      output::print_stat(
        "engine",
        &format!(
          "{} ({})",
          toolchain.engine.display(),
          toolchain.engine_version.as_deref().unwrap_or("version unknown")
        ),
      );
      match &toolchain.highlighter {
        Some(highlighter) => output::print_stat(
          "highlighter",
          &format!(
            "{} ({})",
            highlighter.display(),
            toolchain
              .highlighter_version
              .as_deref()
              .unwrap_or("version unknown")
          ),
        ),
        None => output::print_stat("highlighter", "not required (shell escape disabled)"),
      }
    }
    None => {
      output::print_stat("engine", &report.engine);
      if let Some(error) = &report.toolchain_error {
        output::print_warning(error);
      }
    }
  }

  output::print_stat(
    "release",
    &format!(
      "{} @ {} ({})",
      report.release_asset, report.release_repo, report.release_tag
    ),
  );
  output::print_stat(
    "schedule",
    report.schedule.as_deref().unwrap_or("none (host-triggered only)"),
  );
  output::print_stat("trigger paths", &report.trigger_paths.join(", "));

  match &report.host {
    Some(host) => output::print_stat(
      "host event",
      &format!(
        "{:?}{}",
        host.event,
        host
          .revision
          .as_deref()
          .map(|r| format!(" @ {}", output::truncate_hash(r)))
          .unwrap_or_default()
      ),
    ),
    None => output::print_stat("host event", "none (local invocation)"),
  }
}
