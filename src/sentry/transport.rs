//! HTTP transport capability and its reqwest-backed implementation.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use std::future::Future;
use std::time::Duration;

use super::types::AuthToken;
use crate::error::SentryError;

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A GET request against an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Raw response handed back by a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    /// Status line in the `"<code> <reason>"` form, e.g. `403 Forbidden`.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.status.to_string()
    }

    /// Value of the `Link` header, if present and valid UTF-8.
    #[must_use]
    pub fn link_header(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
    }
}

/// Executes a single HTTP GET.
///
/// Implementations return transport-level failures (connection, timeout) as
/// errors and every HTTP status, success or not, as a response.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, SentryError>> + Send;
}

/// Timeouts applied to the production transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: DEFAULT_HTTP_TIMEOUT,
            connect: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Build the default headers sent with every request.
///
/// The `Authorization` header is omitted for an empty token.
pub(crate) fn build_headers(token: &AuthToken) -> Result<HeaderMap, SentryError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("sentry-frames/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if !token.is_empty() {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(
            |e| SentryError::RequestContext {
                context: "build authorization header".into(),
                source: Box::new(e),
            },
        )?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Production [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport that authenticates with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SentryError::RequestContext`] when the token cannot be used as
    /// a header value or the client cannot be built.
    pub fn new(token: &AuthToken, timeouts: Timeouts) -> Result<Self, SentryError> {
        let client = reqwest::Client::builder()
            .default_headers(build_headers(token)?)
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| SentryError::RequestContext {
                context: "build client".into(),
                source: Box::new(e),
            })?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SentryError> {
        let context = |status: Option<StatusCode>| {
            status
                .map_or_else(
                    || format!("GET {}", request.url),
                    |s| format!("GET {}; status {}", request.url, s.as_u16()),
                )
                .into_boxed_str()
        };
        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| SentryError::RequestContext {
                context: context(None),
                source: Box::new(e),
            })?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| SentryError::RequestContext {
                context: context(Some(status)),
                source: Box::new(e),
            })?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
