//! Hosting-environment detection.
//!
//! When a run starts under a CI host, trigger facts arrive as environment
//! variables rather than CLI flags. `HostContext::detect` reads them so
//! `galley run` can evaluate its trigger without arguments. Outside a
//! recognized host there is no context and the caller must say what it
//! wants explicitly.

use std::env;

use serde::Serialize;
use tracing::debug;

/// Event kinds a hosting environment can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
  Push,
  PullRequest,
  Schedule,
  Manual,
}

/// Facts about the hosting environment of the current run.
#[derive(Debug, Clone, Serialize)]
pub struct HostContext {
  /// What the host says started this run.
  pub event: HostEvent,

  /// Source revision the run was started from.
  pub revision: Option<String>,

  /// Git ref the run was started from, when the host reports one.
  pub reference: Option<String>,
}

impl HostContext {
  /// Detect the hosting environment from `GITHUB_*` variables.
  ///
  /// Returns `None` for local invocations and for event kinds the
  /// pipeline has no mapping for.
  pub fn detect() -> Option<Self> {
    let event_name = env::var("GITHUB_EVENT_NAME").ok()?;
    let event = match event_name.as_str() {
      "push" => HostEvent::Push,
      "pull_request" | "pull_request_target" => HostEvent::PullRequest,
      "schedule" => HostEvent::Schedule,
      "workflow_dispatch" => HostEvent::Manual,
      other => {
        debug!(event = %other, "unrecognized host event");
        return None;
      }
    };

    Some(Self {
      event,
      revision: non_empty_var("GITHUB_SHA"),
      reference: non_empty_var("GITHUB_REF"),
    })
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn detects_push_with_revision() {
    temp_env::with_vars(
      [
        ("GITHUB_EVENT_NAME", Some("push")),
        ("GITHUB_SHA", Some("abc123")),
        ("GITHUB_REF", Some("refs/heads/main")),
      ],
      || {
        let ctx = HostContext::detect().unwrap();
        assert_eq!(ctx.event, HostEvent::Push);
        assert_eq!(ctx.revision.as_deref(), Some("abc123"));
        assert_eq!(ctx.reference.as_deref(), Some("refs/heads/main"));
      },
    );
  }

  #[test]
  #[serial]
  fn detects_schedule_without_revision() {
    temp_env::with_vars(
      [
        ("GITHUB_EVENT_NAME", Some("schedule")),
        ("GITHUB_SHA", None::<&str>),
      ],
      || {
        let ctx = HostContext::detect().unwrap();
        assert_eq!(ctx.event, HostEvent::Schedule);
        assert!(ctx.revision.is_none());
      },
    );
  }

  #[test]
  #[serial]
  fn detects_dispatch_as_manual() {
    temp_env::with_vars([("GITHUB_EVENT_NAME", Some("workflow_dispatch"))], || {
      let ctx = HostContext::detect().unwrap();
      assert_eq!(ctx.event, HostEvent::Manual);
    });
  }

  #[test]
  #[serial]
  fn unknown_event_is_none() {
    temp_env::with_vars([("GITHUB_EVENT_NAME", Some("deployment_status"))], || {
      assert!(HostContext::detect().is_none());
    });
  }

  #[test]
  #[serial]
  fn no_host_is_none() {
    temp_env::with_vars([("GITHUB_EVENT_NAME", None::<&str>)], || {
      assert!(HostContext::detect().is_none());
    });
  }
}
