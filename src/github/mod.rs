//! GitHub issue tracker client.
//!
//! This module provides the REST client used by the role scripts and by the
//! agent tools to read issues and write comments and sub-issues.

pub mod client;
pub mod error;

pub use client::{check_response, IssueTracker, RepoTarget, DEFAULT_API_URL};
pub use error::TrackerError;
