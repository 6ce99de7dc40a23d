//! Run orchestration: the linear select → build → publish sequence.
//!
//! Each run is a single sequence of blocking steps behind the
//! provisioning gate; there is no internal parallelism because the
//! engine itself is one long blocking call. Overlapping runs are the
//! hosting environment's concern (last-writer-wins at the release tag).

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use galley_platform::Toolchain;

use crate::config::Config;
use crate::engine::{self, BuildReport, BuildRequest, BuildStatus};
use crate::error::CoreError;
use crate::hash::{self, ContentHash};
use crate::release::ReleaseChannel;
use crate::selector::{self, BuildMode};

/// Per-run options threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RunOptions {
  pub mode: BuildMode,

  /// Build fully but skip the upload (Release mode only).
  pub dry_run: bool,

  /// Source revision this run was produced from, when the host knows
  /// it. Travels with the published asset so a stale writer is
  /// attributable.
  pub revision: Option<String>,
}

impl RunOptions {
  pub fn for_mode(mode: BuildMode) -> Self {
    Self {
      mode,
      dry_run: false,
      revision: None,
    }
  }
}

/// What happened at the release tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
  /// Asset uploaded. `replaced` is true when a previous asset was
  /// overwritten rather than created.
  Updated { replaced: bool },

  /// Dry run: the build completed, the upload was skipped.
  DryRun,

  /// Upload failed; the artifact remains in the work directory for
  /// manual recovery.
  Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
  pub tag: String,
  pub asset: String,
  pub status: PublishStatus,
}

/// Aggregate outcome of one pipeline run. Created once, never mutated.
#[derive(Debug, Serialize)]
pub struct RunReport {
  pub mode: BuildMode,
  pub started_at: DateTime<Utc>,
  pub build: BuildReport,

  /// Digest of the produced artifact, on build success.
  pub artifact_digest: Option<ContentHash>,

  /// Publication outcome; `None` when the mode does not publish or the
  /// build failed before publishing was reached.
  pub publish: Option<PublishReport>,

  pub revision: Option<String>,
  pub elapsed: Duration,
}

impl RunReport {
  /// Exit contract: the run succeeded only if the build did and, when a
  /// publish was attempted, the tag was updated (or the run was dry).
  pub fn is_success(&self) -> bool {
    self.build.status == BuildStatus::Success
      && !matches!(
        self.publish,
        Some(PublishReport {
          status: PublishStatus::Failed { .. },
          ..
        })
      )
  }
}

/// Run the pipeline for `options.mode`.
///
/// Provisioning happens before this call; the toolchain handed in is
/// the gate's proof. The selected entry text is materialized as a
/// derived document in the work directory, so the shared source file is
/// never edited. Publication is reached only on a successful Release
/// build — a failed build never puts anything at the tag.
pub async fn run<C: ReleaseChannel>(
  config: &Config,
  project_root: &Path,
  toolchain: &Toolchain,
  channel: &C,
  options: &RunOptions,
) -> Result<RunReport, CoreError> {
  let started_at = Utc::now();
  let start = Instant::now();

  let entry_path = config.entry_path(project_root);
  let raw = tokio::fs::read_to_string(&entry_path)
    .await
    .map_err(|e| CoreError::EntryUnreadable {
      path: entry_path.display().to_string(),
      message: e.to_string(),
    })?;

  let selected = selector::select_entry(options.mode, &raw);

  let work_dir = project_root.join(&config.engine.work_dir);
  tokio::fs::create_dir_all(&work_dir).await?;
  let derived_entry = work_dir.join(&config.manuscript.entry);
  tokio::fs::write(&derived_entry, selected.as_bytes()).await?;

  info!(
    mode = %options.mode,
    entry = %derived_entry.display(),
    "starting pipeline run"
  );

  let request = BuildRequest {
    entry: derived_entry,
    work_dir,
    source_dir: project_root.join(&config.manuscript.source_dir),
    allow_shell_escape: config.engine.shell_escape,
  };
  let build = engine::build(&config.engine, &toolchain.engine, &request).await?;

  let mut artifact_digest = None;
  let mut publish = None;

  if let (BuildStatus::Success, Some(artifact)) = (build.status, build.artifact.as_deref()) {
    artifact_digest = Some(hash::hash_file(artifact)?);

    if options.mode.publishes() {
      publish = Some(publish_artifact(config, channel, artifact, options).await);
    }
  }

  Ok(RunReport {
    mode: options.mode,
    started_at,
    build,
    artifact_digest,
    publish,
    revision: options.revision.clone(),
    elapsed: start.elapsed(),
  })
}

/// Upload the built artifact under the fixed release tag.
///
/// Failures land in the report rather than aborting: the artifact is
/// already on disk and the caller decides how loudly to fail.
async fn publish_artifact<C: ReleaseChannel>(
  config: &Config,
  channel: &C,
  artifact: &Path,
  options: &RunOptions,
) -> PublishReport {
  let tag = config.release.tag.clone();
  let asset = config.artifact_name();

  if options.dry_run {
    info!(tag = %tag, asset = %asset, "dry run, upload skipped");
    return PublishReport {
      tag,
      asset,
      status: PublishStatus::DryRun,
    };
  }

  let bytes = match tokio::fs::read(artifact).await {
    Ok(bytes) => bytes,
    Err(e) => {
      return PublishReport {
        tag,
        asset,
        status: PublishStatus::Failed {
          error: format!("cannot read artifact {}: {e}", artifact.display()),
        },
      };
    }
  };

  match channel.put(&tag, &asset, bytes, options.revision.as_deref()).await {
    Ok(outcome) => PublishReport {
      tag,
      asset,
      status: PublishStatus::Updated {
        replaced: outcome.replaced,
      },
    },
    Err(e) => {
      warn!(
        error = %e,
        artifact = %artifact.display(),
        "publish failed, artifact preserved in the work directory"
      );
      PublishReport {
        tag,
        asset,
        status: PublishStatus::Failed { error: e.to_string() },
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use std::path::PathBuf;
  use std::sync::Mutex;

  use tempfile::TempDir;

  use crate::error::PublishError;
  use crate::release::PutOutcome;

  /// Test double that records every `put` and models overwrite
  /// semantics: the second upload of a name replaces the first.
  #[derive(Default)]
  struct RecordingChannel {
    calls: Mutex<Vec<(String, String, Vec<u8>, Option<String>)>>,
    fail_with: Option<String>,
  }

  impl RecordingChannel {
    fn failing(message: &str) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        fail_with: Some(message.to_string()),
      }
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  impl ReleaseChannel for RecordingChannel {
    async fn put(
      &self,
      tag: &str,
      name: &str,
      bytes: Vec<u8>,
      revision: Option<&str>,
    ) -> Result<PutOutcome, PublishError> {
      let mut calls = self.calls.lock().unwrap();
      if let Some(message) = &self.fail_with {
        return Err(PublishError::Protocol {
          status: 500,
          body: message.clone(),
        });
      }
      let replaced = calls.iter().any(|(t, n, _, _)| t == tag && n == name);
      calls.push((tag.to_string(), name.to_string(), bytes, revision.map(String::from)));
      Ok(PutOutcome { replaced })
    }
  }

  const SUCCEEDING_ENGINE: &str = "#!/bin/sh\nprintf 'PDF:' > main.pdf\ncat main.tex >> main.pdf\necho typeset ok\n";
  const FAILING_ENGINE: &str = "#!/bin/sh\necho 'engine exited 1' >&2\nexit 1\n";

  struct Project {
    temp: TempDir,
    config: Config,
    toolchain: Toolchain,
  }

  impl Project {
    #[cfg(unix)]
    fn new(engine_body: &str, entry_text: &str) -> Self {
      use std::os::unix::fs::PermissionsExt;

      let temp = TempDir::new().unwrap();
      let root = temp.path();

      fs::create_dir_all(root.join("manuscript")).unwrap();
      fs::write(root.join("manuscript/main.tex"), entry_text).unwrap();

      let engine = root.join("engine");
      fs::write(&engine, engine_body).unwrap();
      fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

      let config: Config = toml::from_str(&format!(
        r#"
[manuscript]
entry = "main.tex"
source_dir = "manuscript"

[engine]
command = "{engine}"
args = []
shell_escape = false

[release]
tag = "latest"
repo = "example/manuscript"
"#,
        engine = engine.display()
      ))
      .unwrap();

      let toolchain = Toolchain {
        engine,
        engine_version: None,
        highlighter: None,
        highlighter_version: None,
      };

      Self {
        temp,
        config,
        toolchain,
      }
    }

    fn root(&self) -> &Path {
      self.temp.path()
    }

    fn work_dir(&self) -> PathBuf {
      self.root().join("build")
    }
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn check_mode_never_publishes() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\includeonly{ch01}\n\\chapter{X}\n");
    let channel = RecordingChannel::default();

    let report = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Check),
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert!(report.publish.is_none());
    assert_eq!(channel.call_count(), 0);

    // Check mode keeps the partial directive active in the derived entry.
    let derived = fs::read_to_string(project.work_dir().join("main.tex")).unwrap();
    assert!(derived.contains("\\includeonly"));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn release_mode_strips_directive_and_publishes() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\includeonly{ch01}\n\\chapter{X}\n");
    let channel = RecordingChannel::default();

    let report = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions {
        mode: BuildMode::Release,
        dry_run: false,
        revision: Some("abc123".to_string()),
      },
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert_eq!(channel.call_count(), 1);
    assert!(matches!(
      report.publish,
      Some(PublishReport {
        status: PublishStatus::Updated { replaced: false },
        ..
      })
    ));

    let derived = fs::read_to_string(project.work_dir().join("main.tex")).unwrap();
    assert!(!derived.contains("\\includeonly"));

    let calls = channel.calls.lock().unwrap();
    let (tag, asset, _, revision) = &calls[0];
    assert_eq!(tag, "latest");
    assert_eq!(asset, "main.pdf");
    assert_eq!(revision.as_deref(), Some("abc123"));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn failed_build_reaches_no_publish() {
    let project = Project::new(FAILING_ENGINE, "\\chapter{X}\n");
    let channel = RecordingChannel::default();

    let report = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Release),
    )
    .await
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.build.status, BuildStatus::Failure);
    assert!(report.build.log.contains("engine exited 1"));
    assert!(report.publish.is_none());
    assert_eq!(channel.call_count(), 0);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn repeated_runs_are_deterministic_and_overwrite() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\chapter{X}\n");
    let channel = RecordingChannel::default();

    let first = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Release),
    )
    .await
    .unwrap();
    let second = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Release),
    )
    .await
    .unwrap();

    // Unchanged source, byte-identical artifacts.
    assert_eq!(first.artifact_digest, second.artifact_digest);
    assert!(first.artifact_digest.is_some());

    // The second publish overwrites the tag rather than appending.
    assert_eq!(channel.call_count(), 2);
    assert!(matches!(
      second.publish,
      Some(PublishReport {
        status: PublishStatus::Updated { replaced: true },
        ..
      })
    ));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn dry_run_builds_but_skips_upload() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\chapter{X}\n");
    let channel = RecordingChannel::default();

    let report = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions {
        mode: BuildMode::Release,
        dry_run: true,
        revision: None,
      },
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert_eq!(channel.call_count(), 0);
    assert!(matches!(
      report.publish,
      Some(PublishReport {
        status: PublishStatus::DryRun,
        ..
      })
    ));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn publish_failure_fails_the_run_but_keeps_artifact() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\chapter{X}\n");
    let channel = RecordingChannel::failing("upload rejected");

    let report = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Release),
    )
    .await
    .unwrap();

    assert!(!report.is_success());
    assert!(matches!(
      &report.publish,
      Some(PublishReport {
        status: PublishStatus::Failed { error },
        ..
      }) if error.contains("upload rejected")
    ));

    // The built artifact stays in the work dir for manual recovery.
    assert!(project.work_dir().join("main.pdf").exists());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn missing_entry_document_is_an_error() {
    let project = Project::new(SUCCEEDING_ENGINE, "\\chapter{X}\n");
    fs::remove_file(project.root().join("manuscript/main.tex")).unwrap();
    let channel = RecordingChannel::default();

    let result = run(
      &project.config,
      project.root(),
      &project.toolchain,
      &channel,
      &RunOptions::for_mode(BuildMode::Check),
    )
    .await;

    assert!(matches!(result, Err(CoreError::EntryUnreadable { .. })));
  }
}
