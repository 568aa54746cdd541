//! Data models for the issue tracker.
//!
//! This module contains the records exchanged with the GitHub issues API:
//! issues and comments as returned by the tracker, and the request payloads
//! used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An issue as stored by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker-assigned issue number.
    pub number: u64,
    /// Issue title.
    #[serde(default)]
    pub title: String,
    /// Issue description. GitHub sends `null` for an empty body.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Logins of the assigned users.
    #[serde(default, deserialize_with = "names")]
    pub assignees: BTreeSet<String>,
    /// Label names.
    #[serde(default, deserialize_with = "names")]
    pub labels: BTreeSet<String>,
    /// Browser URL of the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.number, self.title)
    }
}

/// A comment attached to an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Payload for `POST /repos/{owner}/{repo}/issues`.
///
/// `assignees` and `labels` are only serialized when set: GitHub treats a
/// present-but-empty array differently from an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeSet<String>>,
}

impl NewIssue {
    /// Creates a payload with a title and body and no assignees or labels.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            assignees: None,
            labels: None,
        }
    }

    pub fn with_assignees<I, S>(mut self, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignees = Some(assignees.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }
}

/// Payload for `POST /repos/{owner}/{repo}/issues/{number}/comments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment<'a> {
    pub body: &'a str,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// GitHub returns users and labels as objects; plain strings are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameRef {
    Plain(String),
    User { login: String },
    Label { name: String },
}

impl NameRef {
    fn into_name(self) -> String {
        match self {
            NameRef::Plain(name) | NameRef::User { login: name } | NameRef::Label { name } => name,
        }
    }
}

fn names<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Option::<Vec<NameRef>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(refs.into_iter().map(NameRef::into_name).collect())
}
