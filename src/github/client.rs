//! GitHub issues REST client.
//!
//! Three operations (list issues, create issue, create comment), each a
//! single authenticated request whose response goes through
//! [`check_response`] before it is decoded.

use crate::config::GithubConfig;
use crate::github::error::TrackerError;
use crate::models::{Comment, Issue, NewComment, NewIssue};
use anyhow::Context;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Repository coordinates every request is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    /// Base URL without trailing slash.
    pub api_url: String,
}

impl RepoTarget {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            owner: owner.into(),
            repo: repo.into(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build `{api_url}/repos/{owner}/{repo}{path}`, rejecting malformed parts.
    fn endpoint(&self, path: &str) -> Result<String, TrackerError> {
        let invalid = |reason: &str| TrackerError::InvalidEndpoint {
            url: self.api_url.clone(),
            reason: reason.to_string(),
        };

        let base = Url::parse(&self.api_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        for (field, value) in [("owner", &self.owner), ("repo", &self.repo)] {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{field} must not be empty")));
            }
            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(invalid(&format!("{field} '{value}' is not a valid name")));
            }
        }

        Ok(format!(
            "{}/repos/{}/{}{}",
            self.api_url, self.owner, self.repo, path
        ))
    }
}

/// Client for one repository's issues.
///
/// Cheap to clone; holds no mutable state. Use [`IssueTracker::with_target`]
/// to address a different repository for a single call.
#[derive(Debug, Clone)]
pub struct IssueTracker {
    http: reqwest::Client,
    target: RepoTarget,
    token: String,
    timeout_seconds: u64,
}

impl IssueTracker {
    /// Create a client from configuration and the auth token.
    ///
    /// The token is not validated locally; GitHub rejects a bad one with 401.
    pub fn new(config: &GithubConfig, token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            target: RepoTarget::new(&config.owner, &config.repo, &config.api_url),
            token: token.into(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// The repository this client addresses.
    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    /// A copy of this client addressing another repository.
    pub fn with_target(&self, target: RepoTarget) -> Self {
        Self {
            target: RepoTarget::new(target.owner, target.repo, target.api_url),
            ..self.clone()
        }
    }

    /// List the repository's issues in the order GitHub returns them.
    ///
    /// An empty list is reported as [`TrackerError::Request`], never as an
    /// empty success.
    pub async fn list_issues(&self) -> Result<Vec<Issue>, TrackerError> {
        let url = self.target.endpoint("/issues")?;
        info!(
            "Listing issues for {}/{}",
            self.target.owner, self.target.repo
        );

        let issues: Vec<Issue> = self.send(self.http.get(&url), &url).await?;
        debug!("Fetched {} issues", issues.len());
        Ok(issues)
    }

    /// Post a comment on an existing issue.
    pub async fn create_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment, TrackerError> {
        if issue_number == 0 {
            return Err(invalid_input("issue number must be positive"));
        }
        if body.trim().is_empty() {
            return Err(invalid_input("comment body must not be empty"));
        }

        let url = self
            .target
            .endpoint(&format!("/issues/{}/comments", issue_number))?;
        info!("Commenting on issue #{}", issue_number);

        let request = self.http.post(&url).json(&NewComment { body });
        self.send(request, &url).await
    }

    /// Open a new issue.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, TrackerError> {
        if issue.title.trim().is_empty() {
            return Err(invalid_input("issue title must not be empty"));
        }

        let url = self.target.endpoint("/issues")?;
        info!("Creating issue '{}'", issue.title);

        let request = self
            .http
            .post(&url)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(issue);
        let created: Issue = self.send(request, &url).await?;
        info!("Created issue #{}", created.number);
        Ok(created)
    }

    /// Send an authenticated request, validate the response and decode it.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, TrackerError> {
        let transport_error = |e: reqwest::Error| {
            let err = TrackerError::from_transport(&e, url, self.timeout_seconds);
            error!("{}", err);
            err
        };

        let response = request
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        let value = check_response(status, &body)?;

        serde_json::from_value(value).map_err(|e| {
            error!("Unexpected response shape from {}: {}", url, e);
            TrackerError::Request {
                status: status.as_u16(),
                message: format!("unexpected response shape: {}", e),
            }
        })
    }
}

/// Classify a raw response before handing it to the caller.
///
/// 401 and 404 map to their own variants, any other status outside
/// {200, 201} and any empty or falsy JSON body map to
/// [`TrackerError::Request`]. Logs once per failure.
pub fn check_response(status: StatusCode, body: &str) -> Result<Value, TrackerError> {
    match status {
        StatusCode::UNAUTHORIZED => {
            error!("Authentication failed, check your auth token");
            return Err(TrackerError::Authentication);
        }
        StatusCode::NOT_FOUND => {
            error!("Resource not found, check your owner and repo");
            return Err(TrackerError::NotFound);
        }
        StatusCode::OK | StatusCode::CREATED => {}
        other => {
            error!("Request failed with status code {}", other.as_u16());
            return Err(TrackerError::Request {
                status: other.as_u16(),
                message: format!("unexpected status {}", other),
            });
        }
    }

    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    if is_falsy(&value) {
        error!("Request succeeded but response body empty");
        return Err(TrackerError::Request {
            status: status.as_u16(),
            message: "request succeeded but response body empty".to_string(),
        });
    }

    Ok(value)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn invalid_input(reason: &str) -> TrackerError {
    error!("Invalid input: {}", reason);
    TrackerError::InvalidInput(reason.to_string())
}
