//! Error types for galley-core
//!
//! One enum per pipeline concern, aggregated under `CoreError`. None of
//! these are retried by the core; propagation is immediate and the
//! underlying tool's diagnostic text passes through unmodified.

use thiserror::Error;

use galley_platform::ProvisionError;

/// Errors loading or validating the project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {message}")]
  Read { path: String, message: String },

  #[error("failed to parse config {path}: {message}")]
  Parse { path: String, message: String },

  #[error("invalid path filter '{pattern}': {message}")]
  BadGlob { pattern: String, message: String },

  #[error("invalid schedule '{schedule}': expected 5 whitespace-separated cron fields")]
  BadSchedule { schedule: String },

  #[error("manuscript entry '{entry}' has no file stem")]
  BadEntry { entry: String },
}

/// Errors around invoking the typesetting engine.
///
/// An engine that runs and fails is not an error here: that outcome is a
/// `BuildStatus::Failure` in the report, with the captured log. This enum
/// covers the invocation itself going wrong.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to start typesetting engine '{engine}': {message}")]
  Spawn { engine: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors publishing an artifact to the release channel.
#[derive(Debug, Error)]
pub enum PublishError {
  #[error("release channel authentication failed: {message}")]
  Auth { message: String },

  #[error("no release found for tag '{tag}'")]
  ReleaseNotFound { tag: String },

  #[error("release channel is disabled for this run")]
  Disabled,

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("release channel returned {status}: {body}")]
  Protocol { status: u16, body: String },
}

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("config error: {0}")]
  Config(#[from] ConfigError),

  #[error("provisioning failed: {0}")]
  Provision(#[from] ProvisionError),

  #[error("build error: {0}")]
  Build(#[from] BuildError),

  #[error("publish error: {0}")]
  Publish(#[from] PublishError),

  #[error("cannot read entry document {path}: {message}")]
  EntryUnreadable { path: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
