//! Artifact publication to the release channel.
//!
//! The channel holds at most one asset per (tag, name): `put` replaces
//! whatever was published before, it never appends. Replacement is
//! staged — the new bytes are uploaded fully under a staging name before
//! the old asset is removed — so a reader of the final asset name never
//! observes partial content, and a cancelled run leaves the tag intact.

use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ReleaseConfig;
use crate::consts::USER_AGENT;
use crate::error::PublishError;

/// Destination for built artifacts.
pub trait ReleaseChannel {
  /// Upload `bytes` as asset `name` under `tag`, overwriting any
  /// previous asset of the same name. `revision` identifies the source
  /// the artifact was built from, when known.
  fn put(
    &self,
    tag: &str,
    name: &str,
    bytes: Vec<u8>,
    revision: Option<&str>,
  ) -> impl Future<Output = Result<PutOutcome, PublishError>> + Send;
}

/// What `put` did at the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PutOutcome {
  /// True when an existing asset of the same name was replaced.
  pub replaced: bool,
}

/// Channel for runs that never publish. The pipeline does not reach
/// `put` in Check mode or on dry runs; if it ever did, this fails loudly
/// instead of uploading anywhere.
pub struct NullChannel;

impl ReleaseChannel for NullChannel {
  async fn put(
    &self,
    _tag: &str,
    _name: &str,
    _bytes: Vec<u8>,
    _revision: Option<&str>,
  ) -> Result<PutOutcome, PublishError> {
    Err(PublishError::Disabled)
  }
}

/// Release channel backed by a GitHub-style releases API.
pub struct GitHubReleases {
  client: Client,
  api_base: String,
  repo: String,
  token: String,
}

#[derive(Debug, Deserialize)]
struct Release {
  upload_url: String,
  assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
  id: u64,
  name: String,
}

impl GitHubReleases {
  pub fn new(
    api_base: impl Into<String>,
    repo: impl Into<String>,
    token: impl Into<String>,
  ) -> Result<Self, PublishError> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(Self {
      client,
      api_base: api_base.into().trim_end_matches('/').to_string(),
      repo: repo.into(),
      token: token.into(),
    })
  }

  /// Build a channel from config, reading the auth token from the
  /// environment.
  pub fn from_config(config: &ReleaseConfig) -> Result<Self, PublishError> {
    let token = std::env::var(&config.token_env).map_err(|_| PublishError::Auth {
      message: format!("environment variable {} is not set", config.token_env),
    })?;
    Self::new(config.api_base.clone(), config.repo.clone(), token)
  }

  async fn release_by_tag(&self, tag: &str) -> Result<Release, PublishError> {
    let url = format!("{}/repos/{}/releases/tags/{}", self.api_base, self.repo, tag);
    debug!(url = %url, "resolving release by tag");

    let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
    match response.status() {
      status if status.is_success() => Ok(response.json().await?),
      StatusCode::NOT_FOUND => Err(PublishError::ReleaseNotFound {
        tag: tag.to_string(),
      }),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PublishError::Auth {
        message: response.text().await.unwrap_or_default(),
      }),
      status => Err(PublishError::Protocol {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
      }),
    }
  }

  async fn upload_asset(
    &self,
    release: &Release,
    name: &str,
    bytes: Vec<u8>,
  ) -> Result<Asset, PublishError> {
    // upload_url arrives as a URI template: ".../assets{?name,label}"
    let base = release.upload_url.split('{').next().unwrap_or(&release.upload_url);
    debug!(url = %base, name = %name, size = bytes.len(), "uploading asset");

    let response = self
      .client
      .post(base)
      .query(&[("name", name)])
      .bearer_auth(&self.token)
      .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
      .body(bytes)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(PublishError::Protocol {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
      });
    }
    Ok(response.json().await?)
  }

  async fn delete_asset(&self, id: u64) -> Result<(), PublishError> {
    let url = format!("{}/repos/{}/releases/assets/{}", self.api_base, self.repo, id);
    debug!(url = %url, "deleting asset");

    let response = self.client.delete(&url).bearer_auth(&self.token).send().await?;
    let status = response.status();
    if !status.is_success() && status != StatusCode::NOT_FOUND {
      return Err(PublishError::Protocol {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
      });
    }
    Ok(())
  }

  async fn rename_asset(
    &self,
    id: u64,
    name: &str,
    revision: Option<&str>,
  ) -> Result<(), PublishError> {
    let url = format!("{}/repos/{}/releases/assets/{}", self.api_base, self.repo, id);

    let response = self
      .client
      .patch(&url)
      .bearer_auth(&self.token)
      .json(&serde_json::json!({ "name": name, "label": revision }))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(PublishError::Protocol {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
      });
    }
    Ok(())
  }
}

impl ReleaseChannel for GitHubReleases {
  async fn put(
    &self,
    tag: &str,
    name: &str,
    bytes: Vec<u8>,
    revision: Option<&str>,
  ) -> Result<PutOutcome, PublishError> {
    let release = self.release_by_tag(tag).await?;

    // A staging asset left behind by a cancelled run must not block us.
    let staging = format!("{name}.staging");
    if let Some(stale) = release.assets.iter().find(|a| a.name == staging) {
      self.delete_asset(stale.id).await?;
    }

    let uploaded = self.upload_asset(&release, &staging, bytes).await?;

    let previous = release.assets.iter().find(|a| a.name == name);
    if let Some(previous) = previous {
      self.delete_asset(previous.id).await?;
    }
    self.rename_asset(uploaded.id, name, revision).await?;

    let replaced = previous.is_some();
    info!(tag = %tag, asset = %name, replaced, "release asset updated");
    Ok(PutOutcome { replaced })
  }
}
