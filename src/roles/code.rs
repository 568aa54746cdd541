//! Python engineer role: write code for a single issue.

use super::{describe_issue, RoleRun};
use crate::agent::Agent;
use crate::github::IssueTracker;
use anyhow::{Context, Result};
use tracing::info;

pub const CODE_ROLE: &str = "Python Engineer";

pub const CODE_PROMPT: &str = "Act as Python Engineer. \
Your task is to generate the code for the request provided. \
Comment the high level aspects of your implementation on GitHub.";

/// Run the Python engineer agent on issue `issue_number`.
pub async fn run_code(
    tracker: &IssueTracker,
    agent: &Agent,
    issue_number: u64,
) -> Result<RoleRun> {
    let issues = tracker
        .list_issues()
        .await
        .context("Failed to fetch issues for the code agent")?;

    let issue = issues
        .iter()
        .find(|issue| issue.number == issue_number)
        .with_context(|| {
            format!(
                "Issue #{} is not among the repository's issues",
                issue_number
            )
        })?;

    info!("Code agent working on issue {}", issue);
    let output = agent
        .with_prompt(CODE_PROMPT)
        .invoke(&describe_issue(issue))
        .await
        .with_context(|| format!("Code agent failed on issue #{}", issue_number))?;

    Ok(RoleRun {
        role: CODE_ROLE.to_string(),
        issue_number,
        output,
    })
}
