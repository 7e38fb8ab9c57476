//! Query dispatcher.
//!
//! Receives a batch of dashboard queries, resolves the client instance for
//! the request's context and produces one [`DataResponse`] per query, keyed
//! by the query's reference id. Failures are reported per query; a batch
//! where some queries fail is an ordinary outcome.

mod query;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::SentryError;
use crate::frame::{Frame, FrameMeta};
use crate::sentry::{ApiProvider, GetIssuesInput, QueryFailure};

pub use self::query::{QUERY_TYPE_ISSUES, SentryQuery, get_query};

/// Response key used when no client instance could be resolved.
pub const ERROR_RESPONSE_KEY: &str = "error";

/// Identifies the caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginContext {
    pub org_id: i64,
    pub datasource_uid: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// One query of a batch: an opaque JSON payload plus its time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub ref_id: String,
    #[serde(default)]
    pub json: serde_json::Value,
    #[serde(default)]
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDataRequest {
    pub plugin_context: PluginContext,
    pub queries: Vec<DataQuery>,
}

/// Outcome of a single query.
///
/// An error response may still carry a frame whose metadata names the
/// query that was attempted.
#[derive(Debug, Default, Serialize)]
pub struct DataResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Frame>,
    #[serde(
        serialize_with = "error_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<SentryError>,
}

#[allow(
    clippy::ref_option,
    clippy::option_if_let_else,
    reason = "serde passes the field by reference and the serializer is consumed in either arm"
)]
fn error_message<S: Serializer>(error: &Option<SentryError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl DataResponse {
    /// A response holding `frame`.
    #[must_use]
    pub fn frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
            error: None,
        }
    }

    /// An error response; when `meta` is given it rides on an empty
    /// `"Error"` frame.
    #[must_use]
    pub fn error(error: SentryError, meta: Option<FrameMeta>) -> Self {
        let frames = meta
            .map(|meta| vec![Frame::new("Error").with_meta(meta)])
            .unwrap_or_default();
        Self {
            frames,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Responses of a batch keyed by reference id.
#[derive(Debug, Default, Serialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

/// Maps a request context to the client instance that serves it.
pub trait InstanceResolver {
    type Provider: ApiProvider;

    /// # Errors
    ///
    /// Returns an error when no usable instance exists for `ctx`.
    fn resolve(&self, ctx: &PluginContext) -> Result<Arc<Self::Provider>, SentryError>;
}

/// Resolver that serves every context with one shared instance.
#[derive(Debug)]
pub struct StaticInstance<P> {
    provider: Arc<P>,
}

impl<P> StaticInstance<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl<P: ApiProvider> InstanceResolver for StaticInstance<P> {
    type Provider = P;

    fn resolve(&self, _ctx: &PluginContext) -> Result<Arc<P>, SentryError> {
        Ok(Arc::clone(&self.provider))
    }
}

/// Run every query of `request` and collect one response per reference id.
///
/// If the instance cannot be resolved no query runs and the only entry is
/// [`ERROR_RESPONSE_KEY`].
pub async fn query_data<R: InstanceResolver>(
    resolver: &R,
    request: &QueryDataRequest,
    cancel: &CancellationToken,
) -> QueryDataResponse {
    let mut response = QueryDataResponse::default();
    let provider = match resolver.resolve(&request.plugin_context) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("instance resolution failed: {e}");
            response
                .responses
                .insert(ERROR_RESPONSE_KEY.to_owned(), DataResponse::error(e, None));
            return response;
        }
    };
    for query in &request.queries {
        let result = query_one(&*provider, query, cancel).await;
        response.responses.insert(query.ref_id.clone(), result);
    }
    response
}

/// Run a single query against `provider`.
pub async fn query_one<P: ApiProvider>(
    provider: &P,
    data_query: &DataQuery,
    cancel: &CancellationToken,
) -> DataResponse {
    let query = match get_query(data_query) {
        Ok(query) => query,
        Err(e) => return DataResponse::error(e, None),
    };
    debug!("query {}: type {:?}", data_query.ref_id, query.query_type);
    match query.query_type.as_str() {
        QUERY_TYPE_ISSUES => issues(provider, data_query, &query, cancel).await,
        _ => DataResponse::error(SentryError::UnknownQueryType, None),
    }
}

async fn issues<P: ApiProvider>(
    provider: &P,
    data_query: &DataQuery,
    query: &SentryQuery,
    cancel: &CancellationToken,
) -> DataResponse {
    if query.org_slug.trim().is_empty() {
        return DataResponse::error(SentryError::InvalidOrganizationSlug, None);
    }
    let input = GetIssuesInput {
        organization_slug: query.org_slug.clone(),
        project_ids: query.project_ids.clone(),
        environments: query.environments.clone(),
        query: query.issues_query.clone(),
        sort: query.issues_sort.clone(),
        limit: query.issues_limit,
        from: data_query.time_range.from,
        to: data_query.time_range.to,
    };
    let meta = |executed: String| FrameMeta {
        executed_query_string: executed,
        source_url: provider.base_url().as_str().to_owned(),
        custom: serde_json::to_value(query).ok(),
    };
    match provider.get_issues(&input, cancel).await {
        Ok(found) => {
            let name = format!("Issues ({})", data_query.ref_id);
            match Frame::from_records(name, &found.value) {
                Ok(frame) => DataResponse::frame(
                    frame
                        .with_ref_id(&data_query.ref_id)
                        .with_meta(meta(found.executed_query)),
                ),
                Err(e) => DataResponse::error(e, Some(meta(found.executed_query))),
            }
        }
        Err(QueryFailure {
            error,
            executed_query,
        }) => DataResponse::error(error, executed_query.map(meta)),
    }
}
