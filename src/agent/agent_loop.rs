//! Tool-calling agent loop backed by Ollama.
//!
//! The model does all the planning. This loop only relays messages, runs the
//! tool calls the model asks for, and feeds their results back until the
//! model answers without calling a tool.

use crate::agent::executor::{AgentExecutor, AgentOutput, ToolInvocation};
use crate::agent::tools::{ToolCall, ToolRegistry};
use crate::config::ModelConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub timeout_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.0,
            max_iterations: 15,
            timeout_seconds: 600,
        }
    }
}

impl From<&ModelConfig> for AgentConfig {
    fn from(model: &ModelConfig) -> Self {
        Self {
            ollama_url: model.ollama_url.trim_end_matches('/').to_string(),
            model_name: model.name.clone(),
            temperature: model.temperature,
            max_iterations: model.max_iterations,
            timeout_seconds: model.timeout_seconds,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
    /// Tool that produced a `tool` message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
            tool_name: None,
        }
    }

    fn tool(name: &str, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(name.to_string()),
            ..Self::new("tool", content)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: Value,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallMessage>>,
}

/// Executor that drives an Ollama chat model with native tool calling.
pub struct OllamaExecutor {
    config: AgentConfig,
    http_client: reqwest::Client,
    tools: ToolRegistry,
    system_prompt: String,
}

impl OllamaExecutor {
    pub fn new(config: AgentConfig, tools: ToolRegistry) -> Result<Self> {
        info!(
            "Initializing agent with model {} and tools [{}]",
            config.model_name,
            tools.names().join(", ")
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let system_prompt = system_prompt(&tools);
        Ok(Self {
            config,
            http_client,
            tools,
            system_prompt,
        })
    }

    /// Send the conversation so far and return the model's reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ResponseMessage> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let tools_json = self
            .tools
            .definitions()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .context("Failed to serialize tool definitions")?;

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages,
            tools: tools_json,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request with {} messages", messages.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!(
                        "Request timed out after {}s. Try a different model.",
                        self.config.timeout_seconds
                    )
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message)
    }
}

#[async_trait]
impl AgentExecutor for OllamaExecutor {
    async fn invoke(&self, input: &str) -> Result<AgentOutput> {
        let mut messages = vec![
            ChatMessage::new("system", self.system_prompt.as_str()),
            ChatMessage::new("user", input),
        ];
        let mut invocations = Vec::new();

        for iteration in 0..self.config.max_iterations {
            debug!("Agent iteration {}", iteration + 1);

            let reply = self.chat(&messages).await?;
            let tool_calls = reply.tool_calls.clone().unwrap_or_default();

            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: reply.content.clone(),
                tool_calls: reply.tool_calls,
                tool_name: None,
            });

            if tool_calls.is_empty() {
                info!("Agent finished after {} iterations", iteration + 1);
                return Ok(AgentOutput {
                    input: input.to_string(),
                    output: reply.content,
                    tool_calls: invocations,
                });
            }

            for tool_call in tool_calls {
                let call = ToolCall {
                    function: crate::agent::tools::FunctionCall {
                        name: tool_call.function.name.clone(),
                        arguments: tool_call.function.arguments.clone(),
                    },
                };

                let result = self.tools.execute(&call).await?;
                let message = result.to_message();
                info!("Tool {} executed", tool_call.function.name);

                messages.push(ChatMessage::tool(&tool_call.function.name, message.clone()));
                invocations.push(ToolInvocation {
                    name: tool_call.function.name,
                    arguments: tool_call.function.arguments,
                    result: message,
                    success: result.success,
                });
            }
        }

        warn!(
            "Agent stopped after {} iterations without a final answer",
            self.config.max_iterations
        );
        Ok(AgentOutput {
            input: input.to_string(),
            output: "Agent stopped due to iteration limit.".to_string(),
            tool_calls: invocations,
        })
    }
}

/// System prompt listing the tools this agent was given.
fn system_prompt(tools: &ToolRegistry) -> String {
    let mut prompt =
        String::from("You are a member of a software team that works through GitHub issues.\n\n");

    if tools.is_empty() {
        prompt.push_str("You have no tools; answer in text only.\n");
    } else {
        prompt.push_str("You have access to tools:\n");
        for def in tools.definitions() {
            prompt.push_str(&format!(
                "- `{}` - {}\n",
                def.function.name, def.function.description
            ));
        }
        prompt.push_str(
            "\nUse the tools to publish your work on GitHub. Only call a tool when the task asks for it.\n",
        );
    }

    prompt.push_str(
        "When you are done, reply with a short summary of what you did and do not call any more tools.\n",
    );
    prompt
}
