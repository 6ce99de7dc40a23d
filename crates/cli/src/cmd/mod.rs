use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use galley_core::Config;

mod check;
mod release;
mod run;
mod status;

pub use check::cmd_check;
pub use release::cmd_release;
pub use run::{EventArg, cmd_run};
pub use status::cmd_status;

/// Load the project config and derive the project root from its
/// location.
pub(crate) fn load_config(config_path: &Path) -> Result<(Config, PathBuf)> {
  let config = Config::load(config_path)
    .with_context(|| format!("cannot load project config {}", config_path.display()))?;

  let root = match config_path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  };

  Ok((config, root))
}
