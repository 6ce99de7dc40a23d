//! CLI output formatting utilities.
//!
//! Consistent terminal output: colored status lines, Unicode symbols,
//! byte/duration formatting, and JSON report printing.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use galley_core::engine::BuildStatus;
use galley_core::pipeline::{PublishStatus, RunReport};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

impl std::fmt::Display for OutputFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      OutputFormat::Text => "text",
      OutputFormat::Json => "json",
    })
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

/// Seconds-granular human duration; sub-second spans print as millis.
pub fn format_elapsed(duration: Duration) -> String {
  if duration.as_secs() == 0 {
    return format!("{}ms", duration.subsec_millis());
  }
  humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Render a run report. Failure logs go to stderr unmodified; the
/// summary lines say what happened to the build and, when one was
/// attempted, to the release tag.
pub fn print_report(report: &RunReport, format: OutputFormat) -> anyhow::Result<()> {
  if format.is_json() {
    return print_json(report);
  }

  match report.build.status {
    BuildStatus::Success => {
      print_success(&format!(
        "{} build succeeded in {}",
        report.mode,
        format_elapsed(report.elapsed)
      ));
      if let Some(artifact) = &report.build.artifact {
        let size = std::fs::metadata(artifact).map(|m| m.len()).unwrap_or(0);
        print_stat(
          "artifact",
          &format!("{} ({})", artifact.display(), format_bytes(size)),
        );
      }
      if let Some(digest) = &report.artifact_digest {
        print_stat("sha256", truncate_hash(&digest.0));
      }
    }
    BuildStatus::Failure => {
      if !report.build.log.is_empty() {
        eprintln!("{}", report.build.log.trim_end());
      }
      match report.build.code {
        Some(code) => print_error(&format!("{} build failed (engine exited {code})", report.mode)),
        None => print_error(&format!("{} build failed (engine was terminated)", report.mode)),
      }
      if let Some(log_path) = &report.build.log_path {
        print_stat("log", &log_path.display().to_string());
      }
    }
  }

  if let Some(publish) = &report.publish {
    match &publish.status {
      PublishStatus::Updated { replaced: true } => print_success(&format!(
        "release tag '{}' updated ({} replaced)",
        publish.tag, publish.asset
      )),
      PublishStatus::Updated { replaced: false } => print_success(&format!(
        "release tag '{}' updated ({} created)",
        publish.tag, publish.asset
      )),
      PublishStatus::DryRun => print_info(&format!(
        "dry run: upload of {} to tag '{}' skipped",
        publish.asset, publish.tag
      )),
      PublishStatus::Failed { error } => print_error(&format!(
        "publish to tag '{}' failed: {}",
        publish.tag, error
      )),
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_hash() {
    assert_eq!(truncate_hash("abcdef123456789"), "abcdef123456");
    assert_eq!(truncate_hash("short"), "short");
    assert_eq!(truncate_hash(""), "");
  }

  #[test]
  fn test_format_bytes() {
    assert_eq!(format_bytes(500), "500 B");
    assert_eq!(format_bytes(1024), "1.0 KB");
    assert_eq!(format_bytes(1536), "1.5 KB");
    assert_eq!(format_bytes(1048576), "1.0 MB");
    assert_eq!(format_bytes(1073741824), "1.0 GB");
  }

  #[test]
  fn test_format_elapsed() {
    assert_eq!(format_elapsed(Duration::from_millis(50)), "50ms");
    assert_eq!(format_elapsed(Duration::from_secs(5)), "5s");
    assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
  }
}
