//! issue-crew - LLM agents that triage GitHub issues
//!
//! A "PM" agent breaks an issue down into role-tagged sub-issues and
//! "worker" agents pick those up and comment their solutions. The agents
//! run on Ollama with tool calling; their tools talk to the GitHub REST API.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (configuration, GitHub, model)

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use issue_crew::agent::{Agent, AgentConfig, OllamaExecutor, ToolRegistry};
use issue_crew::cli::{Args, Command, IssuesCommand};
use issue_crew::config::{Config, CONFIG_FILE};
use issue_crew::github::IssueTracker;
use issue_crew::models::NewIssue;
use issue_crew::roles::{self, RoleRun};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GITHUB_AUTH_TOKEN and friends from a .env file
    dotenv::dotenv().ok();

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if args.command == Command::InitConfig {
        return handle_init_config();
    }

    init_logging(&args);

    info!("issue-crew v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command);

    if let Err(e) = run(args).await {
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .issue-crew.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Set github.owner and github.repo, and export GITHUB_AUTH_TOKEN.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration, build the tracker client and dispatch the command.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let token = args.token.clone().unwrap_or_default();
    if token.is_empty() {
        warn!("GITHUB_AUTH_TOKEN is not set; GitHub will reject authenticated requests");
    }

    let tracker = IssueTracker::new(&config.github, token)?;
    info!(
        "Repository: {}/{} via {}",
        config.github.owner, config.github.repo, config.github.api_url
    );

    let quiet = args.quiet;
    match args.command {
        Command::Issues { action } => run_issue_command(&tracker, action).await,
        Command::Pm => {
            let agent = build_agent(&config, ToolRegistry::pm_tools(&tracker))?;
            let run = with_spinner(
                quiet,
                "PM agent is planning...",
                roles::run_pm(&tracker, &agent),
            )
            .await?;
            print_runs(&[run]);
            Ok(())
        }
        Command::Worker { root_issue } => {
            let agent = build_agent(&config, ToolRegistry::worker_tools(&tracker))?;
            let root_issue = root_issue.unwrap_or(config.worker.root_issue);
            let runs = with_spinner(
                quiet,
                "Worker agents are working...",
                roles::run_workers(&tracker, &agent, root_issue),
            )
            .await?;
            print_runs(&runs);
            Ok(())
        }
        Command::Code { issue } => {
            let agent = build_agent(&config, ToolRegistry::worker_tools(&tracker))?;
            let run = with_spinner(
                quiet,
                "Code agent is writing...",
                roles::run_code(&tracker, &agent, issue),
            )
            .await?;
            print_runs(&[run]);
            Ok(())
        }
        Command::InitConfig => handle_init_config(),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that is present but broken is an error
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Agent with the given GitHub tools, driven by the configured Ollama model.
fn build_agent(config: &Config, tools: ToolRegistry) -> Result<Agent> {
    let executor = OllamaExecutor::new(AgentConfig::from(&config.model), tools)?;

    println!("🤖 Model: {} ({})", config.model.name, config.model.ollama_url);
    Ok(Agent::new(Arc::new(executor)))
}

/// Await `task` behind a spinner unless running quiet.
async fn with_spinner<T>(
    quiet: bool,
    message: &'static str,
    task: impl Future<Output = T>,
) -> T {
    if quiet {
        return task.await;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = task.await;
    spinner.finish_and_clear();
    result
}

fn print_runs(runs: &[RoleRun]) {
    if runs.is_empty() {
        println!("\nNo issues to work on.");
        return;
    }

    for run in runs {
        println!("\n📌 {} on issue #{}", run.role, run.issue_number);
        for call in &run.output.tool_calls {
            let mark = if call.success { "✅" } else { "⚠️ " };
            println!("   {} {}: {}", mark, call.name, call.result);
        }
        if !run.output.output.trim().is_empty() {
            println!("   {}", run.output.output.trim());
        }
    }
    println!("\n✅ Done: {} agent run(s).", runs.len());
}

/// Direct issue operations without an agent.
async fn run_issue_command(tracker: &IssueTracker, action: IssuesCommand) -> Result<()> {
    match action {
        IssuesCommand::List => {
            let issues = tracker.list_issues().await.context("Failed to list issues")?;
            println!("📋 {} issue(s):", issues.len());
            for issue in &issues {
                let labels = if issue.labels.is_empty() {
                    String::new()
                } else {
                    format!(
                        " [{}]",
                        issue.labels.iter().cloned().collect::<Vec<_>>().join(", ")
                    )
                };
                let created = issue
                    .created_at
                    .map(|at| format!(" ({})", at.format("%Y-%m-%d")))
                    .unwrap_or_default();
                println!("   {}{}{}", issue, labels, created);
            }
        }
        IssuesCommand::Comment { number, body } => {
            let comment = tracker
                .create_comment(number, &body)
                .await
                .with_context(|| format!("Failed to comment on issue #{}", number))?;
            println!(
                "✅ Commented on issue #{}{}",
                number,
                comment.html_url.map(|url| format!(": {}", url)).unwrap_or_default()
            );
        }
        IssuesCommand::Create {
            title,
            body,
            assignees,
            labels,
        } => {
            let mut issue = NewIssue::new(title, body);
            if !assignees.is_empty() {
                issue = issue.with_assignees(assignees);
            }
            if !labels.is_empty() {
                issue = issue.with_labels(labels);
            }

            let created = tracker
                .create_issue(&issue)
                .await
                .context("Failed to create issue")?;
            println!(
                "✅ Created issue {}{}",
                created,
                created
                    .html_url
                    .as_deref()
                    .map(|url| format!(": {}", url))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}
