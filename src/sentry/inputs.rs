//! Inputs of the typed operations and their request paths.
//!
//! Query parameters are always emitted sorted by key, with repeated keys in
//! input order, so the executed query string is reproducible.

use chrono::{DateTime, Utc};
use url::form_urlencoded;

use crate::error::SentryError;

/// Path listing the organizations visible to the token.
pub const ORGANIZATIONS_PATH: &str = "/api/0/organizations/";

/// Largest page Sentry serves for issue listings; also the default limit.
pub const ISSUES_PAGE_SIZE: i64 = 100;
/// Upper bound on the issues gathered across all pages.
pub const MAX_ISSUES_LIMIT: i64 = 10_000;

const DEFAULT_STATS_FIELD: &str = "sum(quantity)";
const DEFAULT_STATS_INTERVAL: &str = "1h";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Trim `slug` and check it is a single path segment of Sentry's slug
/// alphabet: ASCII letters, digits, `-` and `_`.
fn org_slug(slug: &str) -> Result<&str, SentryError> {
    let slug = slug.trim();
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if !valid {
        return Err(SentryError::InvalidOrganizationSlug);
    }
    Ok(slug)
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIME_FORMAT).to_string()
}

fn with_sorted_query(path: String, mut params: Vec<(&'static str, String)>) -> String {
    // Stable sort keeps repeated keys in the order they were pushed.
    params.sort_by_key(|(key, _)| *key);
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &params {
        query.append_pair(key, value);
    }
    format!("{path}?{}", query.finish())
}

fn push_all(params: &mut Vec<(&'static str, String)>, key: &'static str, values: &[String]) {
    params.extend(values.iter().map(|v| (key, v.clone())));
}

/// Path listing an organization's projects.
///
/// # Errors
///
/// Returns [`SentryError::InvalidOrganizationSlug`] for a blank slug or
/// one that is not a plain slug.
pub fn projects_path(organization_slug: &str) -> Result<String, SentryError> {
    Ok(format!(
        "/api/0/organizations/{}/projects/",
        org_slug(organization_slug)?
    ))
}

/// Filters for the organization issue listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetIssuesInput {
    pub organization_slug: String,
    pub project_ids: Vec<String>,
    pub environments: Vec<String>,
    /// Free-text search expression, e.g. `is:unresolved`.
    pub query: String,
    pub sort: String,
    /// Total number of issues wanted across pages; non-positive means
    /// [`ISSUES_PAGE_SIZE`], anything above [`MAX_ISSUES_LIMIT`] is capped.
    pub limit: i64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl GetIssuesInput {
    /// Total number of issues to gather.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        if self.limit < 1 {
            ISSUES_PAGE_SIZE
        } else {
            self.limit.min(MAX_ISSUES_LIMIT)
        }
    }

    /// Page size sent as the `limit` parameter.
    #[must_use]
    pub fn page_size(&self) -> i64 {
        self.effective_limit().min(ISSUES_PAGE_SIZE)
    }

    /// Build the request path and query string.
    ///
    /// # Errors
    ///
    /// Returns [`SentryError::InvalidOrganizationSlug`] for a blank slug or
    /// one that is not a plain slug.
    pub fn to_query(&self) -> Result<String, SentryError> {
        let path = format!(
            "/api/0/organizations/{}/issues/",
            org_slug(&self.organization_slug)?
        );
        let mut params = vec![
            ("query", self.query.clone()),
            ("start", timestamp(&self.from)),
            ("end", timestamp(&self.to)),
            ("limit", self.page_size().to_string()),
        ];
        if !self.sort.is_empty() {
            params.push(("sort", self.sort.clone()));
        }
        push_all(&mut params, "project", &self.project_ids);
        push_all(&mut params, "environment", &self.environments);
        Ok(with_sorted_query(path, params))
    }
}

/// Filters for the organization `stats_v2` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatsV2Input {
    pub organization_slug: String,
    pub project_ids: Vec<String>,
    /// Data categories such as `error` or `transaction`.
    pub categories: Vec<String>,
    /// Aggregates; defaults to `sum(quantity)`.
    pub fields: Vec<String>,
    pub group_by: Vec<String>,
    pub outcomes: Vec<String>,
    pub reasons: Vec<String>,
    /// Bucket width such as `1h` or `1d`; defaults to `1h`.
    pub interval: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl GetStatsV2Input {
    /// Build the request path and query string.
    ///
    /// # Errors
    ///
    /// Returns [`SentryError::InvalidOrganizationSlug`] for a blank slug or
    /// one that is not a plain slug.
    pub fn to_query(&self) -> Result<String, SentryError> {
        let path = format!(
            "/api/0/organizations/{}/stats_v2/",
            org_slug(&self.organization_slug)?
        );
        let interval = if self.interval.trim().is_empty() {
            DEFAULT_STATS_INTERVAL.to_string()
        } else {
            self.interval.clone()
        };
        let mut params = vec![
            ("start", timestamp(&self.from)),
            ("end", timestamp(&self.to)),
            ("interval", interval),
        ];
        if self.fields.is_empty() {
            params.push(("field", DEFAULT_STATS_FIELD.to_string()));
        } else {
            push_all(&mut params, "field", &self.fields);
        }
        push_all(&mut params, "category", &self.categories);
        push_all(&mut params, "groupBy", &self.group_by);
        push_all(&mut params, "outcome", &self.outcomes);
        push_all(&mut params, "project", &self.project_ids);
        push_all(&mut params, "reason", &self.reasons);
        Ok(with_sorted_query(path, params))
    }
}
