//! Scripted transport and env helpers for tests.
//!
//! Compiled for this crate's unit tests, or for other crates with the
//! `test-utils` feature.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, LINK};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::SentryError;
use crate::sentry::{ClientConfig, HttpRequest, HttpResponse, SentryClient, Transport};

/// One scripted reaction of a [`RecordingTransport`].
#[derive(Debug)]
pub enum Scripted {
    Respond(HttpResponse),
    Fail(SentryError),
    /// Never completes; only cancellation ends the request.
    Hang,
}

/// A [`Transport`] that replays scripted responses in order and records
/// every requested URL.
///
/// Once the script is exhausted each further request fails with
/// [`SentryError::BadResponse`].
#[derive(Debug, Default)]
pub struct RecordingTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response, optionally carrying a `Link` header.
    ///
    /// # Panics
    ///
    /// Panics if `link` is not a valid header value or the script lock is
    /// poisoned.
    #[must_use]
    pub fn respond(self, status: u16, body: impl Into<String>, link: Option<&str>) -> Self {
        self.push(Scripted::Respond(json_response(status, body, link)));
        self
    }

    /// Queue a transport-level failure.
    #[must_use]
    pub fn fail(self, error: SentryError) -> Self {
        self.push(Scripted::Fail(error));
        self
    }

    /// Queue a request that only cancellation can end.
    #[must_use]
    pub fn hang(self) -> Self {
        self.push(Scripted::Hang);
        self
    }

    fn push(&self, step: Scripted) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(step);
    }

    /// URLs requested so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the request log lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request lock poisoned").clone()
    }

    /// Number of requests issued so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests().len()
    }

    /// Wrap the transport in a client pointed at `https://sentry.test`.
    #[must_use]
    pub fn into_client(self) -> SentryClient<Self> {
        SentryClient::with_transport(
            ClientConfig {
                base_url: "https://sentry.test".into(),
                organization_slug: "acme".into(),
                ..ClientConfig::default()
            },
            self,
        )
    }
}

impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SentryError> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push(request.url.clone());
        let step = self.script.lock().expect("script lock poisoned").pop_front();
        match step {
            Some(Scripted::Respond(resp)) => Ok(resp),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(SentryError::BadResponse(
                format!("no scripted response for {}", request.url).into(),
            )),
        }
    }
}

/// Build a response with a JSON body and an optional `Link` header.
///
/// # Panics
///
/// Panics if `status` is not a valid HTTP status or `link` is not a valid
/// header value.
#[must_use]
pub fn json_response(status: u16, body: impl Into<String>, link: Option<&str>) -> HttpResponse {
    let mut headers = HeaderMap::new();
    if let Some(link) = link {
        headers.insert(LINK, HeaderValue::from_str(link).expect("valid link header"));
    }
    HttpResponse {
        status: StatusCode::from_u16(status).expect("valid status"),
        headers,
        body: body.into(),
    }
}

/// A `Link` header value advertising `url` as the next page.
#[must_use]
pub fn next_page_link(url: &str) -> String {
    format!(r#"<{url}>; rel="next"; results="true"; cursor="c""#)
}

/// Set an environment variable.
///
/// # Safety
///
/// Callers serialise environment access (tests use `#[serial]`).
pub fn set_var<K: AsRef<std::ffi::OsStr>, V: AsRef<std::ffi::OsStr>>(key: K, value: V) {
    unsafe { std::env::set_var(key, value) }
}

/// Remove an environment variable.
///
/// # Safety
///
/// Callers serialise environment access (tests use `#[serial]`).
pub fn remove_var<K: AsRef<std::ffi::OsStr>>(key: K) {
    unsafe { std::env::remove_var(key) }
}
