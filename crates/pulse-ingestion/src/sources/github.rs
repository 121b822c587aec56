//! GitHub issues client.
//!
//! Endpoint used:
//!   GET https://api.github.com/repos/{owner}/{repo}/issues?state=all&per_page=N
//!
//! The issues endpoint also returns pull requests; those are dropped.

use std::time::Duration;

use pulse_common::{IssueRecord, PulseError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

pub const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("pulse/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    html_url: String,
}

impl From<GitHubIssue> for IssueRecord {
    fn from(i: GitHubIssue) -> Self {
        IssueRecord {
            issue_id: i.id,
            title: i.title,
            description: i.body.unwrap_or_default(),
            created_at: i.created_at,
            state: i.state,
            issue_url: i.html_url,
            ..IssueRecord::default()
        }
    }
}

/// Issues (not pull requests) from a raw `/issues` response array.
pub fn issues_from_json(items: Vec<serde_json::Value>) -> Result<Vec<IssueRecord>> {
    items
        .into_iter()
        .filter(|item| item.get("pull_request").is_none())
        .map(|item| -> Result<IssueRecord> { Ok(serde_json::from_value::<GitHubIssue>(item)?.into()) })
        .collect()
}

/// `owner/name`, both halves non-empty.
fn validate_repo(repo: &str) -> Result<()> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => Ok(()),
        _ => Err(PulseError::Config(format!("repository must be 'owner/name', got '{repo}'"))),
    }
}

pub struct GitHubIssuesClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl GitHubIssuesClient {
    pub fn new(token: Option<SecretString>) -> Result<Self> {
        Self::with_base_url(GITHUB_API_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<SecretString>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url: base_url.into(), token })
    }

    pub fn issues_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/issues", self.base_url.trim_end_matches('/'), repo)
    }

    /// Most recent issues of `repo` in any state, pull requests excluded.
    #[instrument(skip(self))]
    pub async fn fetch_issues(&self, repo: &str, per_page: u32) -> Result<Vec<IssueRecord>> {
        validate_repo(repo)?;

        let mut req = self.client
            .get(self.issues_url(repo))
            .header("Accept", "application/vnd.github+json")
            .query(&[("state", "all".to_string()), ("per_page", per_page.to_string())]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(PulseError::Upstream { status: status.as_u16(), message: text });
        }

        let items: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        let fetched = items.len();
        let issues = issues_from_json(items)?;
        debug!(fetched, issues = issues.len(), "GitHub issues fetched");
        Ok(issues)
    }
}
