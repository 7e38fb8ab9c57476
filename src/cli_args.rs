//! Command-line argument structures.
//!
//! Each struct doubles as an `ortho_config` section so values can come from
//! the command line, the environment or a configuration file.

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Connection settings shared by every sub-command.
#[derive(Parser, Deserialize, Serialize, Default, Debug, OrthoConfig, Clone)]
#[command(name = "connection")]
#[ortho_config(prefix = "SENTRY")]
pub struct GlobalArgs {
    /// Base URL of the Sentry instance (defaults to https://sentry.io)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
    /// Organization slug used when a sub-command does not name one
    #[arg(long, value_name = "SLUG")]
    pub org_slug: Option<String>,
    /// Sentry auth token
    #[arg(long, value_name = "TOKEN")]
    pub auth_token: Option<String>,
    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,
    /// HTTP connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,
}

impl GlobalArgs {
    /// Merge another instance into `self`, overwriting only fields that are
    /// set in `other`.
    ///
    /// CLI flags have higher priority than configuration sources.
    pub fn merge(&mut self, other: Self) {
        self.url = other.url.or_else(|| self.url.take());
        self.org_slug = other.org_slug.or_else(|| self.org_slug.take());
        self.auth_token = other.auth_token.or_else(|| self.auth_token.take());
        self.http_timeout = other.http_timeout.or_else(|| self.http_timeout.take());
        self.connect_timeout = other
            .connect_timeout
            .or_else(|| self.connect_timeout.take());
    }
}

/// Parameters accepted by the `organizations` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[command(name = "organizations")]
pub struct OrganizationsArgs {}

/// Parameters accepted by the `projects` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "projects")]
#[ortho_config(prefix = "SENTRY")]
pub struct ProjectsArgs {
    /// Organization whose projects are listed
    #[arg(long, value_name = "SLUG")]
    pub org: Option<String>,
}

/// Parameters accepted by the `issues` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "issues")]
#[ortho_config(prefix = "SENTRY")]
pub struct IssuesArgs {
    /// Organization whose issues are listed
    #[arg(long, value_name = "SLUG")]
    pub org: Option<String>,
    /// Restrict to these project ids
    #[arg(long = "project", value_name = "ID")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    /// Restrict to these environments
    #[arg(long = "environment", value_name = "NAME")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    /// Search expression, e.g. `is:unresolved`
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,
    /// Sort order (`date`, `new`, `freq`, `user`, ...)
    #[arg(long, value_name = "SORT")]
    pub sort: Option<String>,
    /// Maximum number of issues returned across pages
    #[arg(long, value_name = "N")]
    pub limit: Option<i64>,
    /// Start of the time range (RFC 3339); defaults to 24 hours before `--to`
    #[arg(long, value_name = "TIME")]
    pub from: Option<String>,
    /// End of the time range (RFC 3339); defaults to now
    #[arg(long, value_name = "TIME")]
    pub to: Option<String>,
}

/// Parameters accepted by the `stats` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "stats")]
#[ortho_config(prefix = "SENTRY")]
pub struct StatsArgs {
    /// Organization whose usage is reported
    #[arg(long, value_name = "SLUG")]
    pub org: Option<String>,
    /// Restrict to these project ids
    #[arg(long = "project", value_name = "ID")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    /// Data categories (`error`, `transaction`, ...)
    #[arg(long = "category", value_name = "NAME")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Aggregated fields; defaults to `sum(quantity)`
    #[arg(long = "field", value_name = "FIELD")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Grouping keys (`category`, `outcome`, `project`, `reason`)
    #[arg(long = "group-by", value_name = "KEY")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Restrict to these outcomes
    #[arg(long = "outcome", value_name = "NAME")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<String>,
    /// Restrict to these reasons
    #[arg(long = "reason", value_name = "NAME")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Bucket width; defaults to `1h`
    #[arg(long, value_name = "INTERVAL")]
    pub interval: Option<String>,
    /// Start of the time range (RFC 3339); defaults to 24 hours before `--to`
    #[arg(long, value_name = "TIME")]
    pub from: Option<String>,
    /// End of the time range (RFC 3339); defaults to now
    #[arg(long, value_name = "TIME")]
    pub to: Option<String>,
}

/// Parameters accepted by the `batch` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "batch")]
#[ortho_config(prefix = "SENTRY")]
pub struct BatchArgs {
    /// JSON query request to run; reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub file: Option<std::path::PathBuf>,
}
