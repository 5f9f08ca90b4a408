//! GitHub contents API client for the project blob.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::SyncSettings;
use crate::error::SyncError;

const USER_AGENT: &str = "labdesk";

/// The project blob as stored on GitHub.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteProjects {
    pub content: Value,
    /// Blob sha, required to overwrite the file.
    pub sha: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct SaveResponse {
    content: SavedContent,
}

#[derive(Deserialize)]
struct SavedContent {
    sha: String,
}

pub struct GitHubSync {
    client: Client,
    token: String,
    url: String,
    branch: Option<String>,
}

impl GitHubSync {
    /// Fails with [`SyncError::NotConfigured`] when the repository or token is
    /// missing, before anything touches the network.
    pub fn new(settings: &SyncSettings, token: Option<String>) -> Result<Self, SyncError> {
        let repo = settings
            .repo
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| SyncError::NotConfigured("no repository set (sync.repo)".into()))?;
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::NotConfigured("no GitHub token available".into()))?;

        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let url = format!(
            "{}/repos/{}/contents/{}",
            settings.api_base.trim_end_matches('/'),
            repo,
            settings.file_path.trim_start_matches('/')
        );
        Ok(Self {
            client,
            token,
            url,
            branch: settings.branch.clone().filter(|b| !b.is_empty()),
        })
    }

    /// Like [`new`](Self::new), with the token from
    /// [`resolve_token`](super::resolve_token). The keyring is only consulted
    /// once a repository is configured.
    pub fn from_settings(settings: &SyncSettings) -> Result<Self, SyncError> {
        if !settings.is_configured() {
            return Err(SyncError::NotConfigured("no repository set (sync.repo)".into()));
        }
        Self::new(settings, super::resolve_token()?)
    }

    pub fn contents_url(&self) -> &str {
        &self.url
    }

    /// Current remote blob, or `None` when the file does not exist yet.
    pub async fn fetch(&self) -> Result<Option<RemoteProjects>, SyncError> {
        let mut request = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = %self.url, "remote project file not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SyncError::Api {
                status: response.status().as_u16(),
            });
        }

        let body: ContentsResponse = response.json().await?;
        let encoded: String = body.content.split_whitespace().collect();
        let bytes = STANDARD.decode(encoded)?;
        let content = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::InvalidPayload(format!("remote file is not JSON: {e}")))?;
        Ok(Some(RemoteProjects {
            content,
            sha: body.sha,
        }))
    }

    /// Write `content` and return the new blob sha. `sha` must be the current
    /// remote sha when the file already exists.
    pub async fn save(&self, content: &Value, sha: Option<&str>) -> Result<String, SyncError> {
        let pretty = serde_json::to_string_pretty(content)
            .map_err(|e| SyncError::InvalidPayload(e.to_string()))?;
        let message = format!(
            "Update ML research projects - {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(pretty.as_bytes()),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        if let Some(branch) = &self.branch {
            body["branch"] = json!(branch);
        }

        let response = self
            .client
            .put(&self.url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SyncError::Api {
                status: response.status().as_u16(),
            });
        }

        let saved: SaveResponse = response.json().await?;
        info!(url = %self.url, sha = %saved.content.sha, "pushed project data");
        Ok(saved.content.sha)
    }

    /// Overwrite the remote file with `content`, creating it if needed.
    pub async fn push(&self, content: &Value) -> Result<String, SyncError> {
        let current = self.fetch().await?;
        self.save(content, current.as_ref().map(|r| r.sha.as_str()))
            .await
    }

    pub async fn pull(&self) -> Result<Option<Value>, SyncError> {
        Ok(self.fetch().await?.map(|remote| remote.content))
    }
}
