//! Role scripts.
//!
//! Each role fetches issues, frames them as a task and hands the task to an
//! agent. Whatever the agent publishes goes through its GitHub tools.

pub mod code;
pub mod pm;
pub mod worker;

pub use code::run_code;
pub use pm::run_pm;
pub use worker::{plan_worker_tasks, run_workers, RoleTasks};

use crate::agent::AgentOutput;
use crate::models::Issue;

/// Issue rendered as agent input.
pub fn describe_issue(issue: &Issue) -> String {
    format!(
        "Number: {}\n\nTitle: {}\n\nDescription: {}",
        issue.number, issue.title, issue.body
    )
}

/// Outcome of one agent invocation on one issue.
#[derive(Debug, Clone)]
pub struct RoleRun {
    /// Role the agent acted as.
    pub role: String,
    pub issue_number: u64,
    pub output: AgentOutput,
}
