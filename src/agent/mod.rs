//! LLM agent modules for issue work.
//!
//! This module provides the agent wrapper, the tool registry it exposes to
//! the model, and the Ollama-backed tool-calling executor.

pub mod agent_loop;
pub mod executor;
pub mod tools;

pub use agent_loop::{AgentConfig, OllamaExecutor};
pub use executor::{Agent, AgentExecutor, AgentOutput, ToolInvocation};
pub use tools::ToolRegistry;
