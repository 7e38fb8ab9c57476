//! Per-query JSON payload.

use serde::{Deserialize, Deserializer, Serialize};

use super::DataQuery;
use crate::error::SentryError;

/// Query type served by [`query_one`](super::query_one).
pub const QUERY_TYPE_ISSUES: &str = "issues";

/// Decoded query payload. Fields irrelevant to `query_type` are ignored.
///
/// Missing and `null` fields both decode to their empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentryQuery {
    #[serde(deserialize_with = "null_as_default")]
    pub query_type: String,
    #[serde(
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub org_slug: String,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub project_ids: Vec<String>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub environments: Vec<String>,
    #[serde(
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub issues_query: String,
    #[serde(
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub issues_sort: String,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub issues_limit: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[allow(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde passes skip predicates by reference"
)]
fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Decode the JSON payload of `query`.
///
/// # Errors
///
/// Returns [`SentryError::InvalidQuery`] when the payload is not a valid
/// [`SentryQuery`].
pub fn get_query(query: &DataQuery) -> Result<SentryQuery, SentryError> {
    SentryQuery::deserialize(&query.json).map_err(SentryError::InvalidQuery)
}
