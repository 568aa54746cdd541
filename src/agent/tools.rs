//! Tool definitions for the issue agents.
//!
//! This module defines the tools the LLM can call and the registry that
//! dispatches those calls. Tools report back a short confirmation, never the
//! raw GitHub payload.

use crate::github::{IssueTracker, TrackerError};
use crate::models::NewIssue;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool definition for Ollama's tool-calling API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text handed back to the model as the tool message.
    pub fn to_message(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or_default())
        }
    }
}

/// Something the agent can call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool and return a short human-readable confirmation.
    async fn call(&self, args: &Value) -> Result<String>;
}

/// Fixed set of tools available to one agent, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// PM tools: comment on the root issue and open sub-issues.
    pub fn pm_tools(tracker: &IssueTracker) -> Self {
        Self::worker_tools(tracker).register(CreateIssue::new(tracker.clone()))
    }

    /// Worker and code tools: comment only.
    pub fn worker_tools(tracker: &IssueTracker) -> Self {
        Self::new().register(CommentOnIssue::new(tracker.clone()))
    }

    /// Add a tool. A tool with the same name replaces the earlier one.
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        let name = tool.definition().function.name;
        let tool: Arc<dyn Tool> = Arc::new(tool);
        self.tools.retain(|(existing, _)| *existing != name);
        self.tools.push((name, tool));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for the chat request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool.definition()).collect()
    }

    /// Execute a tool call.
    ///
    /// Unknown tools and bad arguments become an error result for the model.
    /// A [`TrackerError`] is returned as `Err` and ends the agent run; it was
    /// already logged where it was detected.
    pub async fn execute(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        let name = &tool_call.function.name;
        let args = normalize_arguments(&tool_call.function.arguments);

        debug!("Executing tool: {} with args: {:?}", name, args);

        let Some((_, tool)) = self.tools.iter().find(|(n, _)| n == name) else {
            warn!("Model requested unknown tool: {}", name);
            return Ok(ToolResult::error(format!("Unknown tool: {}", name)));
        };

        match tool.call(&args).await {
            Ok(output) => Ok(ToolResult::success(output)),
            Err(e) if e.downcast_ref::<TrackerError>().is_some() => {
                Err(e.context(format!("Tool {} failed", name)))
            }
            Err(e) => {
                warn!("Tool {} rejected its arguments: {:#}", name, e);
                Ok(ToolResult::error(format!("{:#}", e)))
            }
        }
    }
}

/// Some models send arguments as a JSON-encoded string.
fn normalize_arguments(args: &Value) -> Value {
    match args {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
        Value::Null => json!({}),
        other => other.clone(),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing required parameter: {}", key))
}

/// Accepts `5` as well as `"5"` or `"#5"`.
fn required_issue_number(args: &Value, key: &str) -> Result<u64> {
    let value = args
        .get(key)
        .ok_or_else(|| anyhow!("Missing required parameter: {}", key))?;

    value
        .as_u64()
        .or_else(|| {
            value
                .as_str()
                .and_then(|s| s.trim().trim_start_matches('#').parse().ok())
        })
        .ok_or_else(|| anyhow!("Parameter {} must be a positive integer", key))
}

fn optional_strings(args: &Value, key: &str) -> Option<Vec<String>> {
    let items = args.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(String::from)
            .collect(),
    )
}

/// `comment_on_github_issue(issue_number, comment)`.
pub struct CommentOnIssue {
    tracker: IssueTracker,
}

impl CommentOnIssue {
    pub fn new(tracker: IssueTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for CommentOnIssue {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            "comment_on_github_issue",
            "Comment on a GitHub issue. Use this to post your result on the issue you were given.",
            json!({
                "type": "object",
                "properties": {
                    "issue_number": {
                        "type": "integer",
                        "description": "The issue number to comment on"
                    },
                    "comment": {
                        "type": "string",
                        "description": "The comment to post on the issue (Markdown)"
                    }
                },
                "required": ["issue_number", "comment"]
            }),
        )
    }

    async fn call(&self, args: &Value) -> Result<String> {
        let issue_number = required_issue_number(args, "issue_number")?;
        let comment = required_str(args, "comment")?;

        self.tracker.create_comment(issue_number, comment).await?;
        Ok("Commented on GitHub Issue".to_string())
    }
}

/// `create_github_issue(title, body, assignees?, labels?)`.
pub struct CreateIssue {
    tracker: IssueTracker,
}

impl CreateIssue {
    pub fn new(tracker: IssueTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Tool for CreateIssue {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            "create_github_issue",
            "Open a new GitHub issue, e.g. one sub-issue per subtask. Title format: <Role>_<short task>.",
            json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Issue title, formatted as <Role>_<short task>"
                    },
                    "body": {
                        "type": "string",
                        "description": "Detailed description of the subtask"
                    },
                    "assignees": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "GitHub logins to assign (optional)"
                    },
                    "labels": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Labels to apply (optional)"
                    }
                },
                "required": ["title", "body"]
            }),
        )
    }

    async fn call(&self, args: &Value) -> Result<String> {
        let title = required_str(args, "title")?;
        let body = args.get("body").and_then(|v| v.as_str()).unwrap_or("");

        let mut issue = NewIssue::new(title, body);
        if let Some(assignees) = optional_strings(args, "assignees") {
            issue = issue.with_assignees(assignees);
        }
        if let Some(labels) = optional_strings(args, "labels") {
            issue = issue.with_labels(labels);
        }

        let created = self.tracker.create_issue(&issue).await?;
        Ok(format!("Created GitHub Issue #{}", created.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;
    use mockito::{Matcher, Server};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::function("echo", "Echo the text back", json!({"type": "object"}))
        }

        async fn call(&self, args: &Value) -> Result<String> {
            Ok(required_str(args, "text")?.to_string())
        }
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            function: FunctionCall {
                name: name.to_string(),
                arguments,
            },
        }
    }

    fn tracker(api_url: &str) -> IssueTracker {
        let config = GithubConfig {
            owner: "octo".to_string(),
            repo: "crew".to_string(),
            api_url: api_url.to_string(),
            timeout_seconds: 5,
        };
        IssueTracker::new(&config, "test-token").unwrap()
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = ToolRegistry::new().register(Echo);

        let result = registry
            .execute(&call("echo", json!({"text": "hi"})))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hi");

        let result = registry.execute(&call("echo", json!({}))).await.unwrap();
        assert!(!result.success);
        assert!(result.to_message().contains("Missing required parameter: text"));

        let result = registry.execute(&call("nope", json!({}))).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.to_message(), "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_string_encoded_arguments() {
        let registry = ToolRegistry::new().register(Echo);
        let result = registry
            .execute(&call("echo", Value::String(r#"{"text": "from string"}"#.to_string())))
            .await
            .unwrap();
        assert_eq!(result.output, "from string");
    }

    #[test]
    fn test_pm_tool_definitions() {
        let registry = ToolRegistry::pm_tools(&tracker("https://api.github.com"));
        assert_eq!(
            registry.names(),
            vec!["comment_on_github_issue", "create_github_issue"]
        );

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert!(defs.iter().all(|d| d.tool_type == "function"));
    }

    #[test]
    fn test_worker_tools_cannot_open_issues() {
        let registry = ToolRegistry::worker_tools(&tracker("https://api.github.com"));
        assert_eq!(registry.names(), vec!["comment_on_github_issue"]);
    }

    #[tokio::test]
    async fn test_worker_tools_reject_create_issue() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo/crew/issues")
            .expect(0)
            .create_async()
            .await;

        let registry = ToolRegistry::worker_tools(&tracker(&server.url()));
        let result = registry
            .execute(&call(
                "create_github_issue",
                json!({"title": "QA_more work", "body": "x"}),
            ))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.to_message(), "Error: Unknown tool: create_github_issue");
        mock.assert_async().await;
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::new().register(Echo).register(Echo);
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_issue_number_parsing() {
        assert_eq!(required_issue_number(&json!({"n": 5}), "n").unwrap(), 5);
        assert_eq!(required_issue_number(&json!({"n": "#12"}), "n").unwrap(), 12);
        assert!(required_issue_number(&json!({"n": "twelve"}), "n").is_err());
        assert!(required_issue_number(&json!({}), "n").is_err());
    }

    #[tokio::test]
    async fn test_comment_tool_posts_and_confirms() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo/crew/issues/4/comments")
            .match_body(Matcher::Json(json!({"body": "Here is the plan"})))
            .with_status(201)
            .with_body(r#"{"id": 1, "body": "Here is the plan"}"#)
            .create_async()
            .await;

        let registry = ToolRegistry::worker_tools(&tracker(&server.url()));
        let result = registry
            .execute(&call(
                "comment_on_github_issue",
                json!({"issue_number": 4, "comment": "Here is the plan"}),
            ))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "Commented on GitHub Issue");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_issue_tool_reports_number() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/octo/crew/issues")
            .match_body(Matcher::Json(json!({
                "title": "Python Developer_write parser",
                "body": "Parse the input",
                "labels": ["python"]
            })))
            .with_status(201)
            .with_body(r#"{"number": 8, "title": "Python Developer_write parser", "body": "Parse the input"}"#)
            .create_async()
            .await;

        let registry = ToolRegistry::pm_tools(&tracker(&server.url()));
        let result = registry
            .execute(&call(
                "create_github_issue",
                json!({
                    "title": "Python Developer_write parser",
                    "body": "Parse the input",
                    "labels": ["python"]
                }),
            ))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "Created GitHub Issue #8");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_tracker_error_ends_the_call() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/repos/octo/crew/issues/4/comments")
            .with_status(401)
            .create_async()
            .await;

        let registry = ToolRegistry::worker_tools(&tracker(&server.url()));
        let err = registry
            .execute(&call(
                "comment_on_github_issue",
                json!({"issue_number": 4, "comment": "x"}),
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Authentication)
        ));
        assert!(format!("{:#}", err).contains("auth token"));
    }

    #[tokio::test]
    async fn test_bad_issue_number_goes_back_to_model() {
        let registry = ToolRegistry::worker_tools(&tracker("http://127.0.0.1:1"));
        let result = registry
            .execute(&call(
                "comment_on_github_issue",
                json!({"issue_number": "first", "comment": "x"}),
            ))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.to_message().contains("must be a positive integer"));
    }
}
