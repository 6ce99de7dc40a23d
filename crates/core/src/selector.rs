//! Source selection: the pure transform between build mode and the entry
//! document handed to the engine.
//!
//! Historically the build scope was toggled by hand-editing the shared
//! entry file. Here the mode is an explicit parameter and selection is a
//! stateless text transform, so the directive-stripping rule is testable
//! without the engine and the source tree is never mutated.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::consts::PARTIAL_DIRECTIVE;

/// Which subset of the manuscript a run compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  /// Validate compilability of the developer's working subset. The
  /// partial directive, if present, stays active.
  Check,

  /// Compile the full manuscript and publish the artifact.
  Release,
}

impl BuildMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildMode::Check => "check",
      BuildMode::Release => "release",
    }
  }

  /// Whether a successful run of this mode publishes its artifact.
  pub fn publishes(&self) -> bool {
    matches!(self, BuildMode::Release)
  }
}

impl std::fmt::Display for BuildMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// True when `line` is an active partial-build directive.
pub fn is_partial_directive(line: &str) -> bool {
  line.trim_start().starts_with(PARTIAL_DIRECTIVE)
}

/// Derive the entry document for `mode`.
///
/// Check mode returns the input unchanged so iteration builds stay fast
/// and partial. Release mode removes every partial-directive line; when
/// none is present the input comes back untouched. Total: never fails,
/// at most a no-op.
pub fn select_entry(mode: BuildMode, raw: &str) -> Cow<'_, str> {
  match mode {
    BuildMode::Check => Cow::Borrowed(raw),
    BuildMode::Release => {
      if !raw.lines().any(is_partial_directive) {
        return Cow::Borrowed(raw);
      }

      let mut selected = String::with_capacity(raw.len());
      for line in raw.split_inclusive('\n') {
        if !is_partial_directive(line) {
          selected.push_str(line);
        }
      }
      Cow::Owned(selected)
    }
  }
}
