//! galley-core: build-mode orchestration and artifact publication
//!
//! This crate implements the pipeline around an external typesetting
//! engine:
//! - `selector`: the pure build-mode transform of the entry document
//! - `engine`: one atomic invocation of the typesetting engine
//! - `release`: idempotent artifact publication under a fixed tag
//! - `trigger`: decides whether and how a run proceeds
//! - `pipeline`: the linear select → build → publish sequence behind the
//!   provisioning gate

pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod release;
pub mod selector;
pub mod trigger;

pub use config::Config;
pub use error::{BuildError, ConfigError, CoreError, PublishError};
pub use pipeline::{RunOptions, RunReport};
pub use selector::BuildMode;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
