//! issue-crew library.
//!
//! GitHub issue tracker client, tool-calling agents and the role scripts
//! that connect them. The `issue-crew` binary is a thin CLI over this crate.

pub mod agent;
pub mod cli;
pub mod config;
pub mod github;
pub mod models;
pub mod roles;
