//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.issue-crew.toml` files. The GitHub auth token never lives here; it is
//! read from the environment by the CLI.

use crate::github::DEFAULT_API_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".issue-crew.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub repository settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Worker role settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// GitHub repository and API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository owner (user or organisation).
    #[serde(default)]
    pub owner: String,

    /// Repository name.
    #[serde(default)]
    pub repo: String,

    /// REST API base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_github_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            api_url: default_api_url(),
            timeout_seconds: default_github_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_github_timeout() -> u64 {
    30
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name as known to Ollama.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default)]
    pub temperature: f32,

    /// Chat request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,

    /// Maximum chat rounds per agent invocation.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: 0.0,
            timeout_seconds: default_model_timeout(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_timeout() -> u64 {
    600
}

fn default_max_iterations() -> usize {
    15
}

/// Worker role settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of the root issue the PM agent works on; workers skip it.
    #[serde(default = "default_root_issue")]
    pub root_issue: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            root_issue: default_root_issue(),
        }
    }
}

fn default_root_issue() -> u64 {
    1
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(CONFIG_FILE))
    }

    /// Load `path` if it exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or via their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref owner) = args.owner {
            self.github.owner = owner.clone();
        }
        if let Some(ref repo) = args.repo {
            self.github.repo = repo.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.github.api_url = api_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.github.timeout_seconds = timeout;
        }

        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref ollama_url) = args.ollama_url {
            self.model.ollama_url = ollama_url.clone();
        }
    }

    /// Check values that cannot be caught by deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.github.timeout_seconds == 0 {
            anyhow::bail!("github.timeout_seconds must be at least 1");
        }
        if self.model.timeout_seconds == 0 {
            anyhow::bail!("model.timeout_seconds must be at least 1");
        }
        if self.model.max_iterations == 0 {
            anyhow::bail!("model.max_iterations must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            anyhow::bail!("model.temperature must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.timeout_seconds, 30);
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.worker.root_issue, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[github]
owner = "octo"
repo = "crew"
timeout_seconds = 10

[model]
name = "qwen2.5-coder:32b"
temperature = 0.2

[worker]
root_issue = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.github.owner, "octo");
        assert_eq!(config.github.repo, "crew");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.timeout_seconds, 10);
        assert_eq!(config.model.name, "qwen2.5-coder:32b");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.max_iterations, 15);
        assert_eq!(config.worker.root_issue, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[github]\nowner = \"a\"\nrepo = \"b\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.github.owner, "a");
        assert_eq!(config.github.repo, "b");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[github\nowner = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_optional() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(Config::load_optional(&path).unwrap().is_none());

        std::fs::write(&path, "[worker]\nroot_issue = \"one\"\n").unwrap();
        let err = Config::load_optional(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.github.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[worker]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.github, GithubConfig::default());
    }
}
