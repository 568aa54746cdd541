//! Project manager role: split the newest issue into role-tagged subtasks.

use super::{describe_issue, RoleRun};
use crate::agent::Agent;
use crate::github::IssueTracker;
use anyhow::{Context, Result};
use tracing::info;

pub const PM_ROLE: &str = "Project Manager";

pub const PM_PROMPT: &str = "Act as Project Manager, break down the following task \
and assign a role (i.e.: Python Developer, Frontend Developer, etc.) to each subtask. \
Comment the breakdown on the GitHub issue, then open one GitHub issue per subtask \
titled <Role>_<short task> with the subtask details as its body.";

/// Run the PM agent on the first issue the tracker returns.
pub async fn run_pm(tracker: &IssueTracker, agent: &Agent) -> Result<RoleRun> {
    info!("Getting issues...");
    let issues = tracker
        .list_issues()
        .await
        .context("Failed to fetch issues for the PM agent")?;

    let issue = issues.first().context("No issues found")?;
    info!("PM agent breaking down issue {}", issue);

    let pm = agent.with_prompt(PM_PROMPT);
    let output = pm
        .invoke(&describe_issue(issue))
        .await
        .with_context(|| format!("PM agent failed on issue #{}", issue.number))?;

    Ok(RoleRun {
        role: PM_ROLE.to_string(),
        issue_number: issue.number,
        output,
    })
}
