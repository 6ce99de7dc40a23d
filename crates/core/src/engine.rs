//! Build invocation: one atomic call into the typesetting engine.
//!
//! The engine runs to its own fixed point (it may take several internal
//! passes for cross-references); the pipeline treats the whole thing as a
//! single blocking call that either leaves the expected artifact in the
//! work directory or fails. Nothing is retained between invocations.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::consts::{BUILD_LOG_FILE, SHELL_ESCAPE_FLAG, SOURCE_DATE_EPOCH};
use crate::error::BuildError;

/// One build invocation against a derived entry document.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  /// Derived entry document to compile. Lives in the work directory.
  pub entry: PathBuf,

  /// Directory the engine runs in; intermediates, the build log, and
  /// the artifact all land here.
  pub work_dir: PathBuf,

  /// Directory the chapter sources are included from.
  pub source_dir: PathBuf,

  /// Allow the engine to shell out to the highlighting renderer.
  /// Explicit here so the invocation's side-effect surface is visible
  /// in the interface rather than ambient in the environment.
  pub allow_shell_escape: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
  Success,
  Failure,
}

/// Outcome of one engine invocation. Created once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub status: BuildStatus,

  /// Artifact location, on success.
  pub artifact: Option<PathBuf>,

  /// Captured engine stdout and stderr, unmodified.
  pub log: String,

  /// Where the log was persisted, when writing it succeeded.
  pub log_path: Option<PathBuf>,

  /// Engine exit code, if it exited normally.
  pub code: Option<i32>,

  /// Wall-clock duration of the engine call.
  pub duration: Duration,
}

impl BuildReport {
  pub fn is_success(&self) -> bool {
    self.status == BuildStatus::Success
  }
}

/// Expected artifact path for `entry` inside `work_dir`.
///
/// The engine derives its output name from the entry document's stem. A
/// missing file here after a zero exit is still a build failure: no
/// artifact, no success.
pub fn artifact_path(work_dir: &Path, entry: &Path) -> PathBuf {
  let stem = entry.file_stem().unwrap_or(entry.as_os_str());
  work_dir.join(stem).with_extension("pdf")
}

/// Run the engine to completion against `request`.
///
/// Engine failure (non-zero exit, missing artifact) is reported in the
/// returned `BuildReport`, log attached; `Err` is reserved for the
/// engine being unspawnable and for I/O failures around the invocation.
pub async fn build(
  config: &EngineConfig,
  engine_path: &Path,
  request: &BuildRequest,
) -> Result<BuildReport, BuildError> {
  tokio::fs::create_dir_all(&request.work_dir).await?;

  let mut command = Command::new(engine_path);
  command.args(&config.args);
  if request.allow_shell_escape {
    command.arg(SHELL_ESCAPE_FLAG);
  }
  command
    .arg(&request.entry)
    .current_dir(&request.work_dir)
    // Chapter includes resolve against the source tree, not the work dir.
    .env("TEXINPUTS", search_path(&request.source_dir))
    // Reproducible timestamps across runs of unchanged source.
    .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH);

  info!(
    engine = %engine_path.display(),
    entry = %request.entry.display(),
    shell_escape = request.allow_shell_escape,
    "invoking typesetting engine"
  );

  let start = Instant::now();
  let output = command.output().await.map_err(|e| BuildError::Spawn {
    engine: engine_path.display().to_string(),
    message: e.to_string(),
  })?;
  let duration = start.elapsed();

  let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
  let stderr = String::from_utf8_lossy(&output.stderr);
  if !stderr.is_empty() {
    if !log.is_empty() && !log.ends_with('\n') {
      log.push('\n');
    }
    log.push_str(&stderr);
  }

  let log_path = request.work_dir.join(BUILD_LOG_FILE);
  let log_path = match tokio::fs::write(&log_path, &log).await {
    Ok(()) => Some(log_path),
    Err(e) => {
      warn!(error = %e, "failed to persist build log");
      None
    }
  };

  let code = output.status.code();
  if !output.status.success() {
    info!(code = ?code, "engine exited with failure");
    return Ok(BuildReport {
      status: BuildStatus::Failure,
      artifact: None,
      log,
      log_path,
      code,
      duration,
    });
  }

  let expected = artifact_path(&request.work_dir, &request.entry);
  if !expected.exists() {
    warn!(path = %expected.display(), "engine succeeded but artifact is missing");
    return Ok(BuildReport {
      status: BuildStatus::Failure,
      artifact: None,
      log,
      log_path,
      code,
      duration,
    });
  }

  info!(artifact = %expected.display(), "build complete");
  Ok(BuildReport {
    status: BuildStatus::Success,
    artifact: Some(expected),
    log,
    log_path,
    code,
    duration,
  })
}

/// Search path handing the source tree to the engine: work dir first,
/// then the source dir, then the trailing empty component that keeps the
/// engine's default search path active.
fn search_path(source_dir: &Path) -> String {
  let sep = if cfg!(windows) { ';' } else { ':' };
  format!(".{sep}{}{sep}", source_dir.display())
}
