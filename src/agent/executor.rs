//! The agent wrapper and the executor capability behind it.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One tool call made during an invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    /// Confirmation or error text returned to the model.
    pub result: String,
    pub success: bool,
}

/// Structured result of one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentOutput {
    /// Text the executor was invoked with.
    pub input: String,
    /// Final answer from the model.
    pub output: String,
    pub tool_calls: Vec<ToolInvocation>,
}

/// Runs a reasoning engine over an input, calling tools as it sees fit.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn invoke(&self, input: &str) -> Result<AgentOutput>;
}

/// An executor plus the prompt that frames every task handed to it.
///
/// Cheap to clone. Switching roles goes through [`Agent::with_prompt`],
/// which leaves the original agent untouched.
#[derive(Clone)]
pub struct Agent {
    executor: Arc<dyn AgentExecutor>,
    prompt: Option<String>,
}

impl Agent {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            executor,
            prompt: None,
        }
    }

    /// A new agent sharing this one's executor, framed by `prompt`.
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            prompt: Some(prompt.into()),
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// The text the executor receives for `user_input`.
    pub fn render_input(&self, user_input: &str) -> String {
        match self.prompt.as_deref() {
            Some(prompt) if !prompt.is_empty() => {
                format!("{} Task: ```{}```", prompt, user_input)
            }
            _ => user_input.to_string(),
        }
    }

    pub async fn invoke(&self, user_input: &str) -> Result<AgentOutput> {
        let input = self.render_input(user_input);
        debug!("Invoking agent with {} chars of input", input.len());
        self.executor.invoke(&input).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;

    #[tokio::test]
    async fn test_invoke_without_prompt_passes_input_through() {
        let executor = Arc::new(RecordingExecutor::default());
        let agent = Agent::new(executor.clone());

        let output = agent.invoke("Number: 1").await.unwrap();
        assert_eq!(output.input, "Number: 1");
        assert_eq!(executor.inputs(), vec!["Number: 1"]);
    }

    #[tokio::test]
    async fn test_invoke_wraps_input_in_prompt() {
        let executor = Arc::new(RecordingExecutor::default());
        let agent = Agent::new(executor.clone()).with_prompt("Act as Tester.");

        agent.invoke("check it").await.unwrap();
        assert_eq!(executor.inputs(), vec!["Act as Tester. Task: ```check it```"]);
    }

    #[test]
    fn test_with_prompt_returns_new_agent() {
        let executor = Arc::new(RecordingExecutor::default());
        let base = Agent::new(executor);
        let first = base.with_prompt("Act as A.");
        let second = first.with_prompt("Act as B.");

        assert_eq!(base.prompt(), None);
        assert_eq!(first.prompt(), Some("Act as A."));
        assert_eq!(second.prompt(), Some("Act as B."));
    }

    #[test]
    fn test_empty_prompt_is_ignored() {
        let agent = Agent::new(Arc::new(RecordingExecutor::default())).with_prompt("");
        assert_eq!(agent.render_input("raw"), "raw");
    }
}
