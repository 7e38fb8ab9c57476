//! Cursor pagination driven by the `Link` response header.

use log::{debug, warn};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::SentryClient;
use super::decode::decode_response;
use super::transport::Transport;
use crate::error::SentryError;

/// Hard ceiling on followed pages, in case the remote keeps handing out
/// fresh cursors.
pub const MAX_PAGES: usize = 1000;

static LINK_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("<(https?://.*)>").expect("static regex"));

/// Find the `rel="next"` target in a `Link` header.
///
/// The header is split on commas and the first segment mentioning `next`
/// whose bracketed URL differs from `previous` wins. Segments Sentry marks
/// `results="false"` carry no data and are skipped.
///
/// # Examples
/// ```
/// use sentry_frames::sentry::next_link;
///
/// let header = r#"<https://sentry.io/api/0/x/?cursor=0:0:1>; rel="previous"; results="false", <https://sentry.io/api/0/x/?cursor=0:100:0>; rel="next"; results="true""#;
/// assert_eq!(
///     next_link(header, "https://sentry.io/api/0/x/").as_deref(),
///     Some("https://sentry.io/api/0/x/?cursor=0:100:0"),
/// );
/// ```
#[must_use]
pub fn next_link(link_header: &str, previous: &str) -> Option<String> {
    link_header
        .split(',')
        .filter(|segment| segment.contains("next"))
        .filter(|segment| !segment.contains(r#"results="false""#))
        .filter_map(|segment| LINK_URL.captures(segment)?.get(1))
        .map(|m| m.as_str())
        .find(|url| *url != previous)
        .map(str::to_owned)
}

/// Whether `link` shares scheme, host and port with `base`.
fn same_origin(base: &str, link: &str) -> bool {
    Url::parse(base)
        .ok()
        .zip(Url::parse(link).ok())
        .is_some_and(|(base, link)| base.origin() == link.origin())
}

impl<X: Transport> SentryClient<X> {
    /// Fetch `path` and every page linked from it, concatenating the items.
    ///
    /// When `cap` is set, fetching stops as soon as that many items are held
    /// and the result is truncated to it. Any failing page aborts the whole
    /// operation; items gathered so far are discarded. A next link off the
    /// base URL's origin ends pagination.
    ///
    /// # Errors
    ///
    /// Propagates transport, API and decode errors from any page, returns
    /// [`SentryError::Cancelled`] when `cancel` fires and
    /// [`SentryError::BadResponse`] after [`MAX_PAGES`] pages.
    pub async fn paginate<T>(
        &self,
        path: &str,
        cap: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, SentryError>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut url = self.config.base_url.join(path);
        for page in 1..=MAX_PAGES {
            let resp = self.send(&url, cancel).await?;
            let mut batch: Vec<T> = decode_response(&resp)?;
            debug!("page {page} of {url}: {} items", batch.len());
            items.append(&mut batch);
            if let Some(limit) = cap.filter(|limit| items.len() >= *limit) {
                items.truncate(limit);
                return Ok(items);
            }
            let Some(next) = resp.link_header().and_then(|h| next_link(h, &url)) else {
                return Ok(items);
            };
            if !same_origin(self.config.base_url.as_str(), &next) {
                warn!("not following next link to a foreign origin: {next}");
                return Ok(items);
            }
            url = next;
        }
        warn!("pagination of {path} stopped after {MAX_PAGES} pages");
        Err(SentryError::BadResponse(
            format!("pagination exceeded max pages {MAX_PAGES}").into(),
        ))
    }
}
