//! Error taxonomy shared by the client, the dispatcher and the binary.

use thiserror::Error;

/// Boxed error source used for transport failures.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Every failure the adapter can surface.
///
/// Validation and dispatch variants are raised before any network call.
/// [`SentryError::Api`] carries the normalised `"<status line> <detail>"`
/// message built from a non-2xx response.
#[derive(Error, Debug)]
pub enum SentryError {
    #[error("invalid/empty organization slug")]
    InvalidOrganizationSlug,
    #[error("unknown query type")]
    UnknownQueryType,
    #[error("request failed when running {context}: {source}")]
    RequestContext {
        context: Box<str>,
        #[source]
        source: BoxedSource,
    },
    #[error("{message}")]
    Api { status: u16, message: Box<str> },
    #[error("malformed response (status {status}): {message}")]
    BadResponseSerde { status: u16, message: Box<str> },
    #[error("bad response: {0}")]
    BadResponse(Box<str>),
    #[error("invalid query: {0}")]
    InvalidQuery(#[source] serde_json::Error),
    #[error("frame conversion failed: {0}")]
    Frame(Box<str>),
    #[error("datasource instance unavailable: {0}")]
    InstanceUnavailable(Box<str>),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(Box<str>),
    #[error("request cancelled")]
    Cancelled,
}

impl SentryError {
    /// HTTP status attached to the error, when the remote produced one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::BadResponseSerde { status, .. } => Some(*status),
            _ => None,
        }
    }
}
