//! Trigger evaluation: deciding whether and how a run proceeds.
//!
//! Each invocation is one-shot: evaluate the event, run (or skip), and
//! return to idle. The only state surviving a run is the previously
//! published artifact at the release tag.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::debug;

use galley_platform::host::{HostContext, HostEvent};

use crate::error::ConfigError;
use crate::selector::BuildMode;

/// What started (or asked about starting) a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
  /// Content pushed to the manuscript repository. `changed` is the set
  /// of paths the host reports as touched; empty when the host reports
  /// none.
  Push { changed: Vec<String> },

  /// A proposed change under review, same payload as `Push`.
  PullRequest { changed: Vec<String> },

  /// The daily timer fired.
  Schedule,

  /// An explicit dispatch, with or without release intent.
  Manual { release: bool },
}

/// Outcome of trigger evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum RunDecision {
  Run { mode: BuildMode },
  Skip { reason: String },
}

/// Compiled set of path globs a content change must intersect.
#[derive(Debug, Clone)]
pub struct PathFilter {
  set: GlobSet,
  patterns: Vec<String>,
}

impl PathFilter {
  /// Compile `patterns` into a matcher. An empty pattern list matches
  /// nothing.
  pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
      let glob = Glob::new(pattern).map_err(|e| ConfigError::BadGlob {
        pattern: pattern.clone(),
        message: e.to_string(),
      })?;
      builder.add(glob);
    }
    let set = builder.build().map_err(|e| ConfigError::BadGlob {
      pattern: patterns.join(", "),
      message: e.to_string(),
    })?;

    Ok(Self {
      set,
      patterns: patterns.to_vec(),
    })
  }

  /// True when any changed path matches any pattern.
  pub fn matches_any<I, S>(&self, changed: I) -> bool
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    changed.into_iter().any(|path| self.set.is_match(path.as_ref()))
  }

  pub fn patterns(&self) -> &[String] {
    &self.patterns
  }
}

/// Evaluate `event` against the configured path filter.
///
/// Push and pull-request events run a Check build when their changed
/// paths intersect the filter. A host that reports no paths at all has
/// already filtered the event before delivering it, so those run rather
/// than skip. Schedule and release dispatches run the full Release
/// build; a plain dispatch runs Check.
pub fn evaluate(event: &TriggerEvent, filter: &PathFilter) -> RunDecision {
  match event {
    TriggerEvent::Push { changed } | TriggerEvent::PullRequest { changed } => {
      if changed.is_empty() || filter.matches_any(changed) {
        RunDecision::Run {
          mode: BuildMode::Check,
        }
      } else {
        debug!(changed = ?changed, "content change outside manuscript paths");
        RunDecision::Skip {
          reason: "changed paths do not touch the manuscript".to_string(),
        }
      }
    }
    TriggerEvent::Schedule => RunDecision::Run {
      mode: BuildMode::Release,
    },
    TriggerEvent::Manual { release } => RunDecision::Run {
      mode: if *release {
        BuildMode::Release
      } else {
        BuildMode::Check
      },
    },
  }
}

/// Shape check for a cron schedule: five whitespace-separated fields.
/// Executing the schedule is the hosting environment's job.
pub fn is_cron_shaped(schedule: &str) -> bool {
  schedule.split_whitespace().count() == 5
}

impl From<&HostContext> for TriggerEvent {
  /// Map a detected hosting context onto a trigger event.
  ///
  /// Hosts do not report changed paths through the environment, so push
  /// and pull-request events arrive with an empty changed set. A host
  /// dispatch carries release intent: the dispatch surface exists to
  /// force a publish.
  fn from(ctx: &HostContext) -> Self {
    match ctx.event {
      HostEvent::Push => TriggerEvent::Push { changed: Vec::new() },
      HostEvent::PullRequest => TriggerEvent::PullRequest { changed: Vec::new() },
      HostEvent::Schedule => TriggerEvent::Schedule,
      HostEvent::Manual => TriggerEvent::Manual { release: true },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn manuscript_filter() -> PathFilter {
    PathFilter::new(&[
      "manuscript/**/*.tex".to_string(),
      "images/**".to_string(),
      "fonts/**".to_string(),
    ])
    .unwrap()
  }

  #[test]
  fn push_touching_manuscript_runs_check() {
    let event = TriggerEvent::Push {
      changed: vec!["manuscript/ch01.tex".to_string(), "README.md".to_string()],
    };
    assert_eq!(
      evaluate(&event, &manuscript_filter()),
      RunDecision::Run {
        mode: BuildMode::Check
      }
    );
  }

  #[test]
  fn push_outside_manuscript_skips() {
    let event = TriggerEvent::Push {
      changed: vec!["README.md".to_string(), ".gitignore".to_string()],
    };
    assert!(matches!(
      evaluate(&event, &manuscript_filter()),
      RunDecision::Skip { .. }
    ));
  }

  #[test]
  fn push_without_reported_paths_runs_check() {
    let event = TriggerEvent::Push { changed: Vec::new() };
    assert_eq!(
      evaluate(&event, &manuscript_filter()),
      RunDecision::Run {
        mode: BuildMode::Check
      }
    );
  }

  #[test]
  fn pull_request_touching_fonts_runs_check() {
    let event = TriggerEvent::PullRequest {
      changed: vec!["fonts/garamond.otf".to_string()],
    };
    assert_eq!(
      evaluate(&event, &manuscript_filter()),
      RunDecision::Run {
        mode: BuildMode::Check
      }
    );
  }

  #[test]
  fn schedule_runs_release() {
    assert_eq!(
      evaluate(&TriggerEvent::Schedule, &manuscript_filter()),
      RunDecision::Run {
        mode: BuildMode::Release
      }
    );
  }

  #[test]
  fn manual_dispatch_honors_release_intent() {
    let filter = manuscript_filter();
    assert_eq!(
      evaluate(&TriggerEvent::Manual { release: true }, &filter),
      RunDecision::Run {
        mode: BuildMode::Release
      }
    );
    assert_eq!(
      evaluate(&TriggerEvent::Manual { release: false }, &filter),
      RunDecision::Run {
        mode: BuildMode::Check
      }
    );
  }

  #[test]
  fn empty_filter_matches_nothing() {
    let filter = PathFilter::new(&[]).unwrap();
    assert!(!filter.matches_any(["manuscript/ch01.tex"]));
  }

  #[test]
  fn cron_shape_check() {
    assert!(is_cron_shaped("0 17 * * *"));
    assert!(is_cron_shaped("*/5  1 2 3 4"));
    assert!(!is_cron_shaped("daily"));
    assert!(!is_cron_shaped("0 17 * *"));
    assert!(!is_cron_shaped(""));
  }

  #[test]
  fn host_schedule_maps_to_schedule() {
    let ctx = HostContext {
      event: HostEvent::Schedule,
      revision: None,
      reference: None,
    };
    assert_eq!(TriggerEvent::from(&ctx), TriggerEvent::Schedule);
  }

  #[test]
  fn host_dispatch_maps_to_release_manual() {
    let ctx = HostContext {
      event: HostEvent::Manual,
      revision: Some("abc123".to_string()),
      reference: None,
    };
    assert_eq!(TriggerEvent::from(&ctx), TriggerEvent::Manual { release: true });
  }
}
