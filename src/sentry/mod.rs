//! Sentry REST client.
//!
//! [`ApiProvider`] is the capability set the dispatcher depends on: a single
//! fetch, a paginated fetch, and the typed operations built on them.
//! [`SentryClient`] implements it on top of any [`Transport`]; the binary
//! uses [`ReqwestTransport`] and tests use the scripted
//! `test_utils::RecordingTransport`.
//!
//! Every typed operation reports the path and query string it executed, on
//! success through [`Executed`] and on failure through [`QueryFailure`], so
//! callers can show what was attempted.

mod decode;
mod inputs;
mod pagination;
mod transport;
mod types;

use log::debug;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::SentryError;

pub use self::decode::{api_error, decode_response};
pub use self::inputs::{
    GetIssuesInput, GetStatsV2Input, ISSUES_PAGE_SIZE, MAX_ISSUES_LIMIT, ORGANIZATIONS_PATH,
    projects_path,
};
pub use self::pagination::{MAX_PAGES, next_link};
pub use self::transport::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HTTP_TIMEOUT, HttpRequest, HttpResponse, ReqwestTransport,
    Timeouts, Transport,
};
pub use self::types::{
    AuthToken, BaseUrl, DEFAULT_SENTRY_URL, IssueMetadata, IssueProject, OrganizationStatus,
    SentryIssue, SentryOrganization, SentryProject, StatsV2Group, StatsV2Response,
};

/// Result of a typed operation together with the path it executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed<T> {
    pub value: T,
    /// Path and query string relative to the base URL.
    pub executed_query: String,
}

/// Failure of a typed operation.
///
/// `executed_query` is `None` when the operation failed validation before
/// any request was built.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct QueryFailure {
    pub error: SentryError,
    pub executed_query: Option<String>,
}

impl From<SentryError> for QueryFailure {
    fn from(error: SentryError) -> Self {
        Self {
            error,
            executed_query: None,
        }
    }
}

fn executed<T>(result: Result<T, SentryError>, query: String) -> Result<Executed<T>, QueryFailure> {
    match result {
        Ok(value) => Ok(Executed {
            value,
            executed_query: query,
        }),
        Err(error) => Err(QueryFailure {
            error,
            executed_query: Some(query),
        }),
    }
}

/// Capabilities the query dispatcher needs from a Sentry client.
#[allow(
    async_fn_in_trait,
    reason = "implementations are consumed through generics only"
)]
pub trait ApiProvider {
    /// Base URL requests are sent to; reported as the frame's source.
    fn base_url(&self) -> &BaseUrl;

    /// Organization slug configured for this client instance.
    fn organization_slug(&self) -> &str;

    /// Fetch and decode a single resource.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, SentryError>;

    /// Fetch every page of a list resource.
    async fn fetch_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, SentryError>;

    /// <https://docs.sentry.io/api/organizations/list-your-organizations/>
    async fn get_organizations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryOrganization>>, QueryFailure>;

    /// <https://docs.sentry.io/api/organizations/list-an-organizations-projects/>
    async fn get_projects(
        &self,
        organization_slug: &str,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryProject>>, QueryFailure>;

    /// Issues of an organization within the input's time range, across pages.
    async fn get_issues(
        &self,
        input: &GetIssuesInput,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryIssue>>, QueryFailure>;

    /// Usage statistics of an organization.
    async fn get_stats_v2(
        &self,
        input: &GetStatsV2Input,
        cancel: &CancellationToken,
    ) -> Result<Executed<StatsV2Response>, QueryFailure>;
}

/// Immutable connection settings of one client instance.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: BaseUrl,
    pub organization_slug: String,
    pub auth_token: AuthToken,
    pub timeouts: Timeouts,
}

/// Production [`ApiProvider`].
///
/// Holds no per-query state, so one instance serves any number of
/// concurrent queries.
#[derive(Debug)]
pub struct SentryClient<X = ReqwestTransport> {
    config: ClientConfig,
    transport: X,
}

impl SentryClient<ReqwestTransport> {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns a [`SentryError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, SentryError> {
        let transport = ReqwestTransport::new(&config.auth_token, config.timeouts)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<X: Transport> SentryClient<X> {
    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: X) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &X {
        &self.transport
    }

    /// Issue one GET, aborting it if `cancel` fires first.
    async fn send(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, SentryError> {
        if cancel.is_cancelled() {
            return Err(SentryError::Cancelled);
        }
        debug!("GET {url}");
        cancel
            .run_until_cancelled(self.transport.execute(HttpRequest::get(url)))
            .await
            .ok_or(SentryError::Cancelled)?
    }

    /// Fetch `path` relative to the base URL and decode it as `T`.
    ///
    /// # Errors
    ///
    /// Returns transport failures unchanged, [`SentryError::Api`] for non-2xx
    /// statuses and [`SentryError::BadResponseSerde`] for undecodable bodies.
    pub async fn fetch_one<T>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, SentryError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(&self.config.base_url.join(path), cancel).await?;
        decode_response(&resp)
    }
}

impl<X: Transport> ApiProvider for SentryClient<X> {
    fn base_url(&self) -> &BaseUrl {
        &self.config.base_url
    }

    fn organization_slug(&self) -> &str {
        &self.config.organization_slug
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, SentryError> {
        self.fetch_one(path, cancel).await
    }

    async fn fetch_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, SentryError> {
        self.paginate(path, None, cancel).await
    }

    async fn get_organizations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryOrganization>>, QueryFailure> {
        let query = ORGANIZATIONS_PATH.to_string();
        executed(self.fetch_one(&query, cancel).await, query)
    }

    async fn get_projects(
        &self,
        organization_slug: &str,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryProject>>, QueryFailure> {
        let query = projects_path(organization_slug)?;
        executed(self.fetch_one(&query, cancel).await, query)
    }

    async fn get_issues(
        &self,
        input: &GetIssuesInput,
        cancel: &CancellationToken,
    ) -> Result<Executed<Vec<SentryIssue>>, QueryFailure> {
        let query = input.to_query()?;
        let cap = usize::try_from(input.effective_limit()).ok();
        executed(self.paginate(&query, cap, cancel).await, query)
    }

    async fn get_stats_v2(
        &self,
        input: &GetStatsV2Input,
        cancel: &CancellationToken,
    ) -> Result<Executed<StatsV2Response>, QueryFailure> {
        let query = input.to_query()?;
        executed(self.fetch_one(&query, cancel).await, query)
    }
}
