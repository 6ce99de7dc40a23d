//! Typesetting toolchain provisioning.
//!
//! Locates the typesetting engine and the auxiliary highlighting renderer
//! on PATH before any build step runs, and probes their versions for
//! diagnostics. The pipeline treats a successful `provision` as the
//! "ready" signal; it never invokes a tool that was not resolved here.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ProvisionError;

/// Resolved locations of the external tools a build needs.
#[derive(Debug, Clone, Serialize)]
pub struct Toolchain {
  /// Absolute path to the typesetting engine.
  pub engine: PathBuf,

  /// First line of the engine's `--version` output, if the probe worked.
  pub engine_version: Option<String>,

  /// Absolute path to the highlighting renderer, when one was required.
  pub highlighter: Option<PathBuf>,

  /// First line of the renderer's `--version` output, if probed.
  pub highlighter_version: Option<String>,
}

impl Toolchain {
  /// Locate the engine, and the highlighting renderer when
  /// `require_highlighter` is set, on PATH.
  ///
  /// The renderer is required whenever the engine will run with dynamic
  /// execution enabled: the engine shells out to it for every embedded
  /// code listing, so a missing renderer must fail the run here, not
  /// halfway through typesetting.
  ///
  /// Version probes are best-effort: a located tool that runs but
  /// refuses `--version` stays provisioned with an unknown version. A
  /// located tool that cannot be executed at all is `ToolFailed`.
  pub fn provision(
    engine: &str,
    highlighter: &str,
    require_highlighter: bool,
  ) -> Result<Self, ProvisionError> {
    let engine_path = find_tool(engine)?;
    let engine_version = probe_version(engine, &engine_path)?;
    debug!(
      engine = %engine_path.display(),
      version = engine_version.as_deref().unwrap_or("unknown"),
      "typesetting engine resolved"
    );

    let (highlighter_path, highlighter_version) = if require_highlighter {
      let path = find_tool(highlighter)?;
      let version = probe_version(highlighter, &path)?;
      debug!(
        highlighter = %path.display(),
        version = version.as_deref().unwrap_or("unknown"),
        "highlighting renderer resolved"
      );
      (Some(path), version)
    } else {
      (None, None)
    };

    info!(engine = %engine_path.display(), "toolchain provisioned");

    Ok(Self {
      engine: engine_path,
      engine_version,
      highlighter: highlighter_path,
      highlighter_version,
    })
  }
}

/// Resolve a tool name (or explicit path) to an executable.
fn find_tool(name: &str) -> Result<PathBuf, ProvisionError> {
  which::which(name).map_err(|_| ProvisionError::ToolMissing {
    name: name.to_string(),
  })
}

/// Ask a tool for its version and keep the first output line. Failure
/// to execute the tool at all is fatal; a tool that runs and refuses
/// the flag is not.
fn probe_version(name: &str, path: &Path) -> Result<Option<String>, ProvisionError> {
  let output = Command::new(path).arg("--version").output().map_err(|e| {
    ProvisionError::ToolFailed {
      name: name.to_string(),
      message: e.to_string(),
    }
  })?;

  if !output.status.success() {
    return Ok(None);
  }
  let stdout = String::from_utf8_lossy(&output.stdout);
  Ok(stdout.lines().next().map(|line| line.trim().to_string()).filter(|line| !line.is_empty()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[cfg(unix)]
  fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  #[test]
  fn missing_engine_fails() {
    let result = Toolchain::provision("galley-no-such-engine", "pygmentize", false);
    assert!(matches!(result, Err(ProvisionError::ToolMissing { name }) if name == "galley-no-such-engine"));
  }

  #[test]
  #[cfg(unix)]
  fn absolute_path_resolves() {
    let temp = TempDir::new().unwrap();
    let engine = write_tool(temp.path(), "engine", "#!/bin/sh\necho engine 1.0\n");

    let toolchain =
      Toolchain::provision(engine.to_str().unwrap(), "galley-no-such-renderer", false).unwrap();
    assert_eq!(toolchain.engine, engine);
    assert_eq!(toolchain.engine_version.as_deref(), Some("engine 1.0"));
    assert!(toolchain.highlighter.is_none());
  }

  #[test]
  #[cfg(unix)]
  fn required_highlighter_missing_fails() {
    let temp = TempDir::new().unwrap();
    let engine = write_tool(temp.path(), "engine", "#!/bin/sh\nexit 0\n");

    let result =
      Toolchain::provision(engine.to_str().unwrap(), "galley-no-such-renderer", true);
    assert!(matches!(result, Err(ProvisionError::ToolMissing { name }) if name == "galley-no-such-renderer"));
  }

  #[test]
  #[cfg(unix)]
  fn version_probe_failure_is_tolerated() {
    let temp = TempDir::new().unwrap();
    let engine = write_tool(temp.path(), "engine", "#!/bin/sh\nexit 3\n");

    let toolchain =
      Toolchain::provision(engine.to_str().unwrap(), "galley-no-such-renderer", false).unwrap();
    assert!(toolchain.engine_version.is_none());
  }
}
