//! Error types for galley-platform

use thiserror::Error;

/// Errors raised while provisioning the external toolchain.
///
/// Provisioning is the gate in front of the pipeline: any of these aborts
/// the run before a build step executes.
#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("required tool '{name}' not found on PATH")]
  ToolMissing { name: String },

  #[error("tool '{name}' is present but not invocable: {message}")]
  ToolFailed { name: String, message: String },
}
