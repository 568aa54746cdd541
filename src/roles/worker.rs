//! Worker role: answer the role-tagged sub-issues opened by the PM agent.
//!
//! Sub-issue titles follow `<Role>_<task>`. Issues are grouped by role in the
//! order roles first appear, and each group is handled by the agent
//! re-prompted for that role.

use super::{describe_issue, RoleRun};
use crate::agent::Agent;
use crate::github::IssueTracker;
use crate::models::Issue;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Prompt for a worker acting as `role`.
pub fn worker_prompt(role: &str) -> String {
    format!(
        "Act as {}. Your task is to complete the request given. \
         Comment your detailed solution on GitHub.",
        role
    )
}

/// Agent input for one sub-issue.
pub fn worker_input(task: &str, issue: &Issue) -> String {
    format!("Task: {}\n\n{}", task, describe_issue(issue))
}

/// Inputs for one role, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleTasks {
    pub role: String,
    /// `(issue number, agent input)` pairs.
    pub inputs: Vec<(u64, String)>,
}

/// Split `<Role>_<task>` at the first underscore.
fn split_title(title: &str) -> Option<(&str, &str)> {
    let (role, task) = title.split_once('_')?;
    let (role, task) = (role.trim(), task.trim());
    if role.is_empty() || task.is_empty() {
        None
    } else {
        Some((role, task))
    }
}

/// Group sub-issues by role, skipping the root issue and untagged titles.
pub fn plan_worker_tasks(issues: &[Issue], root_issue: u64) -> Vec<RoleTasks> {
    let mut plan: Vec<RoleTasks> = Vec::new();

    for issue in issues {
        if issue.number == root_issue {
            continue;
        }

        let Some((role, task)) = split_title(&issue.title) else {
            warn!("Skipping issue {}: title is not <Role>_<task>", issue);
            continue;
        };

        let input = (issue.number, worker_input(task, issue));
        match plan.iter_mut().find(|group| group.role == role) {
            Some(group) => group.inputs.push(input),
            None => plan.push(RoleTasks {
                role: role.to_string(),
                inputs: vec![input],
            }),
        }
    }

    plan
}

/// Run a worker agent for every role-tagged sub-issue.
pub async fn run_workers(
    tracker: &IssueTracker,
    agent: &Agent,
    root_issue: u64,
) -> Result<Vec<RoleRun>> {
    info!("Getting issues...");
    let issues = tracker
        .list_issues()
        .await
        .context("Failed to fetch issues for the worker agents")?;

    let plan = plan_worker_tasks(&issues, root_issue);
    if plan.is_empty() {
        warn!("No <Role>_<task> sub-issues found");
    }

    let mut runs = Vec::new();
    for group in plan {
        info!("Creating worker agent for {}...", group.role);
        let worker = agent.with_prompt(worker_prompt(&group.role));

        for (issue_number, input) in group.inputs {
            info!("Invoking worker agent on issue #{}...", issue_number);
            let output = worker.invoke(&input).await.with_context(|| {
                format!("{} agent failed on issue #{}", group.role, issue_number)
            })?;
            runs.push(RoleRun {
                role: group.role.clone(),
                issue_number,
                output,
            });
        }
    }

    Ok(runs)
}
