//! Connection newtypes and the remote resource models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Public Sentry endpoint used when no override is configured.
pub const DEFAULT_SENTRY_URL: &str = "https://sentry.io";

/// Base URL every request path is appended to.
///
/// Trailing slashes are stripped so `base + "/api/0/..."` never doubles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn new(url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        Self(url)
    }

    /// Use `url` unless it is blank, in which case the public endpoint applies.
    #[must_use]
    pub fn or_default(url: Option<&str>) -> Self {
        url.map(str::trim)
            .filter(|u| !u.is_empty())
            .map_or_else(Self::default, Self::new)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a request path (which starts with `/`) onto the base.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self(DEFAULT_SENTRY_URL.to_string())
    }
}

impl From<&str> for BaseUrl {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BaseUrl {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Sentry API authentication token.
///
/// `Debug` never prints the secret.
#[derive(Clone, Default)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0.is_empty() {
            "AuthToken(<empty>)"
        } else {
            "AuthToken(<redacted>)"
        })
    }
}

impl From<&str> for AuthToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AuthToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Body returned by Sentry alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationStatus {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SentryOrganization {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub date_created: Option<DateTime<Utc>>,
    pub status: Option<OrganizationStatus>,
    pub is_early_adopter: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SentryProject {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub platform: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub is_bookmarked: bool,
    pub is_member: bool,
    pub has_access: bool,
    pub status: Option<String>,
    pub features: Vec<String>,
}

/// Project summary embedded in every issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IssueProject {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IssueMetadata {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
    pub filename: Option<String>,
    pub function: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SentryIssue {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub culprit: Option<String>,
    pub permalink: String,
    pub level: String,
    pub status: String,
    pub platform: Option<String>,
    pub project: IssueProject,
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: IssueMetadata,
    pub num_comments: i64,
    pub is_bookmarked: bool,
    pub is_subscribed: bool,
    pub is_public: bool,
    pub has_seen: bool,
    /// Event count; Sentry sends it as a string.
    pub count: String,
    pub user_count: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsV2Group {
    pub by: BTreeMap<String, Value>,
    pub totals: BTreeMap<String, Value>,
    pub series: BTreeMap<String, Vec<Value>>,
}

/// Response of the organization `stats_v2` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsV2Response {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub intervals: Vec<DateTime<Utc>>,
    pub groups: Vec<StatsV2Group>,
}
