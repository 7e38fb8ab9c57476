//! Response decoding and error normalisation.

use serde::de::DeserializeOwned;

use super::transport::HttpResponse;
use super::types::ErrorBody;
use crate::error::SentryError;

/// Normalise a non-2xx response into [`SentryError::Api`].
///
/// The message is `"<status line> <detail>"` when the body is a JSON object
/// (a missing `detail` counts as empty), otherwise
/// `"<status line> <decode error>"`. Both forms are trimmed.
#[must_use]
pub fn api_error(resp: &HttpResponse) -> SentryError {
    let status_line = resp.status_line();
    let message = match serde_json::from_str::<ErrorBody>(&resp.body) {
        Ok(body) => format!("{status_line} {}", body.detail),
        Err(e) => format!("{status_line} {e}"),
    };
    SentryError::Api {
        status: resp.status.as_u16(),
        message: message.trim().into(),
    }
}

/// Decode a response body into `T`, or normalise the failure.
///
/// # Errors
///
/// Returns [`SentryError::Api`] for non-2xx statuses and
/// [`SentryError::BadResponseSerde`] when a successful body does not match
/// `T`; the latter names the JSON path that failed.
pub fn decode_response<T>(resp: &HttpResponse) -> Result<T, SentryError>
where
    T: DeserializeOwned,
{
    if !resp.status.is_success() {
        return Err(api_error(resp));
    }
    let de = &mut serde_json::Deserializer::from_str(&resp.body);
    serde_path_to_error::deserialize(de).map_err(|e| {
        let path = e.path().to_string();
        let inner = e.into_inner();
        let message = if path == "." {
            inner.to_string()
        } else {
            format!("{inner} at {path}")
        };
        SentryError::BadResponseSerde {
            status: resp.status.as_u16(),
            message: message.into(),
        }
    })
}
