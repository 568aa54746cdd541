//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation of flag combinations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// issue-crew - LLM agents that triage GitHub issues
///
/// A PM agent breaks an issue into role-tagged sub-issues; worker agents
/// pick them up and comment their solutions.
///
/// Examples:
///   issue-crew --owner octo --repo app pm
///   issue-crew worker --root-issue 1
///   issue-crew code --issue 4
///   issue-crew issues list
///   issue-crew issues comment 4 "Looks good"
///   issue-crew init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .issue-crew.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Repository owner (user or organisation)
    #[arg(long, env = "GITHUB_OWNER", global = true)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "GITHUB_REPO", global = true)]
    pub repo: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, value_name = "URL", env = "GITHUB_API_URL", global = true)]
    pub api_url: Option<String>,

    /// GitHub request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// GitHub auth token
    #[arg(long, env = "GITHUB_AUTH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Ollama model to drive the agents
    #[arg(short, long, env = "ISSUE_CREW_MODEL", global = true)]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, value_name = "URL", env = "OLLAMA_URL", global = true)]
    pub ollama_url: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Break the newest issue down into role-tagged sub-issues
    Pm,

    /// Answer every <Role>_<task> sub-issue with a worker agent
    Worker {
        /// Issue number the PM agent worked on (skipped by workers)
        #[arg(long, value_name = "NUMBER")]
        root_issue: Option<u64>,
    },

    /// Have the Python engineer agent write code for one issue
    Code {
        /// Issue number to work on
        #[arg(long, value_name = "NUMBER")]
        issue: u64,
    },

    /// Direct issue operations, without an agent
    Issues {
        #[command(subcommand)]
        action: IssuesCommand,
    },

    /// Generate a default .issue-crew.toml configuration file
    InitConfig,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum IssuesCommand {
    /// List the repository's issues
    List,

    /// Comment on an issue
    Comment {
        /// Issue number
        number: u64,
        /// Comment body (Markdown)
        body: String,
    },

    /// Open a new issue
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Login to assign (repeatable)
        #[arg(long = "assignee", value_name = "LOGIN")]
        assignees: Vec<String>,
        /// Label to apply (repeatable)
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,
    },
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// The GitHub URL is left to the tracker client, which reports a
    /// malformed one as an invalid endpoint.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref ollama_url) = self.ollama_url {
            if !ollama_url.starts_with("http://") && !ollama_url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Code { issue: 0 } => {
                return Err("Issue number must be at least 1".to_string());
            }
            Command::Worker {
                root_issue: Some(0),
            } => {
                return Err("Root issue number must be at least 1".to_string());
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("issue-crew").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_subcommands() {
        assert_eq!(parse(&["pm"]).command, Command::Pm);
        assert_eq!(
            parse(&["worker", "--root-issue", "3"]).command,
            Command::Worker {
                root_issue: Some(3)
            }
        );
        assert_eq!(
            parse(&["code", "--issue", "4"]).command,
            Command::Code { issue: 4 }
        );
        assert_eq!(
            parse(&["issues", "comment", "4", "hello"]).command,
            Command::Issues {
                action: IssuesCommand::Comment {
                    number: 4,
                    body: "hello".to_string()
                }
            }
        );
    }

    #[test]
    fn test_parse_create_with_repeated_flags() {
        let args = parse(&[
            "issues", "create", "--title", "QA_tests", "--label", "qa", "--label", "tests",
        ]);
        match args.command {
            Command::Issues {
                action:
                    IssuesCommand::Create {
                        title,
                        body,
                        assignees,
                        labels,
                    },
            } => {
                assert_eq!(title, "QA_tests");
                assert_eq!(body, "");
                assert!(assignees.is_empty());
                assert_eq!(labels, vec!["qa", "tests"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["issues", "list", "--owner", "octo", "--repo", "crew"]);
        assert_eq!(args.owner.as_deref(), Some("octo"));
        assert_eq!(args.repo.as_deref(), Some("crew"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["pm", "--verbose", "--quiet"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_ollama_url() {
        let args = parse(&["pm", "--ollama-url", "localhost:11434"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_issue() {
        assert!(parse(&["code", "--issue", "0"]).validate().is_err());
        assert!(parse(&["worker", "--root-issue", "0"]).validate().is_err());
        assert!(parse(&["--timeout", "0", "pm"]).validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["pm"]).log_level(), tracing::Level::INFO);
        assert_eq!(parse(&["pm", "-v"]).log_level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["pm", "-q"]).log_level(), tracing::Level::ERROR);
    }
}
