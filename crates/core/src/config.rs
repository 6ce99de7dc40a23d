//! Project configuration (`galley.toml`).
//!
//! Everything the pipeline needs to know about a manuscript project:
//! where the entry document lives, how to invoke the engine, where
//! releases go, and which content changes should trigger a run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::error::ConfigError;
use crate::trigger::{self, PathFilter};

/// Top-level project configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub manuscript: ManuscriptConfig,

  #[serde(default)]
  pub engine: EngineConfig,

  pub release: ReleaseConfig,

  #[serde(default)]
  pub triggers: TriggerConfig,
}

/// The manuscript layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ManuscriptConfig {
  /// Entry document the engine is invoked against.
  #[serde(default = "default_entry")]
  pub entry: String,

  /// Directory containing the entry document and the chapters it
  /// includes, relative to the project root.
  #[serde(default = "default_source_dir")]
  pub source_dir: PathBuf,
}

/// How the typesetting engine is invoked.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
  /// Engine command name, or an explicit path to it.
  #[serde(default = "default_engine_command")]
  pub command: String,

  /// Arguments passed on every invocation.
  #[serde(default = "default_engine_args")]
  pub args: Vec<String>,

  /// Allow the engine to shell out to the highlighting renderer for
  /// embedded code listings.
  #[serde(default = "default_true")]
  pub shell_escape: bool,

  /// Highlighting renderer command the engine shells out to.
  #[serde(default = "default_highlighter")]
  pub highlighter: String,

  /// Directory for intermediates, the build log, and the artifact,
  /// relative to the project root.
  #[serde(default = "default_work_dir")]
  pub work_dir: PathBuf,
}

/// Where successful Release builds are published.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
  /// Fixed tag the artifact is published under. The tag holds at most
  /// one artifact; publishing replaces it.
  pub tag: String,

  /// Repository the release lives in, as `owner/name`.
  pub repo: String,

  /// Asset name at the tag. Defaults to the artifact file name derived
  /// from the entry document.
  #[serde(default)]
  pub asset: Option<String>,

  /// Base URL of the release-hosting API.
  #[serde(default = "default_api_base")]
  pub api_base: String,

  /// Environment variable the auth token is read from.
  #[serde(default = "default_token_env")]
  pub token_env: String,
}

/// What starts a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
  /// Path globs a content change must intersect to trigger a check
  /// build.
  #[serde(default = "default_trigger_paths")]
  pub paths: Vec<String>,

  /// Cron expression for the scheduled release build. Validated for
  /// shape here; executing it is the hosting environment's job.
  #[serde(default)]
  pub schedule: Option<String>,
}

fn default_entry() -> String {
  consts::DEFAULT_ENTRY.to_string()
}

fn default_source_dir() -> PathBuf {
  PathBuf::from(".")
}

fn default_engine_command() -> String {
  "latexmk".to_string()
}

fn default_engine_args() -> Vec<String> {
  vec![
    "-pdf".to_string(),
    "-interaction=nonstopmode".to_string(),
    "-halt-on-error".to_string(),
  ]
}

fn default_true() -> bool {
  true
}

fn default_highlighter() -> String {
  "pygmentize".to_string()
}

fn default_work_dir() -> PathBuf {
  PathBuf::from(consts::DEFAULT_WORK_DIR)
}

fn default_api_base() -> String {
  "https://api.github.com".to_string()
}

fn default_token_env() -> String {
  consts::DEFAULT_TOKEN_ENV.to_string()
}

fn default_trigger_paths() -> Vec<String> {
  vec![
    "**/*.tex".to_string(),
    "**/*.sty".to_string(),
    "images/**".to_string(),
    "fonts/**".to_string(),
  ]
}

impl Default for ManuscriptConfig {
  fn default() -> Self {
    Self {
      entry: default_entry(),
      source_dir: default_source_dir(),
    }
  }
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      command: default_engine_command(),
      args: default_engine_args(),
      shell_escape: default_true(),
      highlighter: default_highlighter(),
      work_dir: default_work_dir(),
    }
  }
}

impl Default for TriggerConfig {
  fn default() -> Self {
    Self {
      paths: default_trigger_paths(),
      schedule: None,
    }
  }
}

impl Config {
  /// Load and validate a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;

    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
  }

  /// Cross-field validation: globs must compile, the schedule must have
  /// cron shape, the entry must have a file stem to derive the artifact
  /// name from.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.path_filter()?;

    if let Some(schedule) = &self.triggers.schedule {
      if !trigger::is_cron_shaped(schedule) {
        return Err(ConfigError::BadSchedule {
          schedule: schedule.clone(),
        });
      }
    }

    if Path::new(&self.manuscript.entry).file_stem().is_none() {
      return Err(ConfigError::BadEntry {
        entry: self.manuscript.entry.clone(),
      });
    }

    Ok(())
  }

  /// Compile the trigger path globs.
  pub fn path_filter(&self) -> Result<PathFilter, ConfigError> {
    PathFilter::new(&self.triggers.paths)
  }

  /// Absolute-ish path of the entry document under `project_root`.
  pub fn entry_path(&self, project_root: &Path) -> PathBuf {
    project_root.join(&self.manuscript.source_dir).join(&self.manuscript.entry)
  }

  /// Name of the produced artifact: the configured asset name, or the
  /// entry stem with the artifact extension.
  pub fn artifact_name(&self) -> String {
    if let Some(asset) = &self.release.asset {
      return asset.clone();
    }
    let stem = Path::new(&self.manuscript.entry)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.manuscript.entry.clone());
    format!("{stem}.pdf")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
[release]
tag = "latest"
repo = "example/manuscript"
"#;

  #[test]
  fn minimal_config_gets_defaults() {
    let config: Config = toml::from_str(MINIMAL).unwrap();
    config.validate().unwrap();

    assert_eq!(config.manuscript.entry, "main.tex");
    assert_eq!(config.engine.command, "latexmk");
    assert!(config.engine.shell_escape);
    assert_eq!(config.engine.work_dir, PathBuf::from("build"));
    assert_eq!(config.release.token_env, "GALLEY_TOKEN");
    assert_eq!(config.artifact_name(), "main.pdf");
  }

  #[test]
  fn asset_name_overrides_entry_stem() {
    let config: Config = toml::from_str(
      r#"
[manuscript]
entry = "book.tex"

[release]
tag = "latest"
repo = "example/manuscript"
asset = "manuscript-latest.pdf"
"#,
    )
    .unwrap();

    assert_eq!(config.artifact_name(), "manuscript-latest.pdf");
  }

  #[test]
  fn missing_release_section_is_rejected() {
    let result: Result<Config, _> = toml::from_str("[manuscript]\nentry = \"main.tex\"\n");
    assert!(result.is_err());
  }

  #[test]
  fn unknown_field_is_rejected() {
    let result: Result<Config, _> = toml::from_str(
      r#"
[release]
tag = "latest"
repo = "example/manuscript"
channel = "stable"
"#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn bad_glob_is_rejected() {
    let config: Config = toml::from_str(
      r#"
[release]
tag = "latest"
repo = "example/manuscript"

[triggers]
paths = ["chapters/[broken"]
"#,
    )
    .unwrap();

    assert!(matches!(config.validate(), Err(ConfigError::BadGlob { .. })));
  }

  #[test]
  fn bad_schedule_is_rejected() {
    let config: Config = toml::from_str(
      r#"
[release]
tag = "latest"
repo = "example/manuscript"

[triggers]
schedule = "daily at noon"
"#,
    )
    .unwrap();

    assert!(matches!(config.validate(), Err(ConfigError::BadSchedule { .. })));
  }

  #[test]
  fn five_field_schedule_is_accepted() {
    let config: Config = toml::from_str(
      r#"
[release]
tag = "latest"
repo = "example/manuscript"

[triggers]
schedule = "0 17 * * *"
"#,
    )
    .unwrap();

    config.validate().unwrap();
  }

  #[test]
  fn entry_path_is_rooted() {
    let config: Config = toml::from_str(
      r#"
[manuscript]
entry = "main.tex"
source_dir = "manuscript"

[release]
tag = "latest"
repo = "example/manuscript"
"#,
    )
    .unwrap();

    assert_eq!(
      config.entry_path(Path::new("/project")),
      PathBuf::from("/project/manuscript/main.tex")
    );
  }
}
