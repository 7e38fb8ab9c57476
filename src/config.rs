//! Configuration loading helpers.
//!
//! Wraps `ortho_config` layering and turns the merged connection settings
//! into an immutable [`ClientConfig`].

use chrono::{DateTime, Duration, Utc};
use ortho_config::{OrthoConfig, OrthoError, load_and_merge_subcommand_for};
use std::time::Duration as StdDuration;

use crate::cli_args::GlobalArgs;
use crate::error::SentryError;
use crate::sentry::{AuthToken, BaseUrl, ClientConfig, Timeouts};

/// Environment variable consulted when no token is configured.
pub const AUTH_TOKEN_ENV: &str = "SENTRY_AUTH_TOKEN";

/// Length of the default time range ending now.
pub const DEFAULT_RANGE_HOURS: i64 = 24;

/// Merge configuration file and environment values into `cli_args`.
///
/// Values present in `cli_args` win over the environment, which wins over
/// the file named by `SENTRY_CONFIG_PATH` (or a discovered `.sentry.toml`).
///
/// # Errors
///
/// Returns an [`OrthoError`] if a configuration source cannot be read or
/// does not match the section's shape.
#[expect(
    clippy::result_large_err,
    reason = "configuration loading errors can be verbose"
)]
pub fn load_section<T>(cli_args: &T) -> Result<T, OrthoError>
where
    T: OrthoConfig + serde::Serialize + Default + clap::CommandFactory,
{
    load_and_merge_subcommand_for::<T>(cli_args)
}

/// Load the `connection` section and let `cli` override it.
///
/// # Errors
///
/// See [`load_section`].
#[expect(
    clippy::result_large_err,
    reason = "configuration loading errors can be verbose"
)]
pub fn load_global(cli: GlobalArgs) -> Result<GlobalArgs, OrthoError> {
    let mut merged = load_section(&GlobalArgs::default())?;
    merged.merge(cli);
    Ok(merged)
}

/// Resolve the auth token: explicit configuration first, then
/// [`AUTH_TOKEN_ENV`]. Empty values are ignored.
#[must_use]
pub fn resolve_auth_token(global: &GlobalArgs) -> AuthToken {
    global
        .auth_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            std::env::var(AUTH_TOKEN_ENV)
                .ok()
                .filter(|token| !token.is_empty())
        })
        .map(AuthToken::from)
        .unwrap_or_default()
}

fn timeout(
    secs: Option<u64>,
    default: StdDuration,
    name: &str,
) -> Result<StdDuration, SentryError> {
    match secs {
        None => Ok(default),
        Some(0) => Err(SentryError::InvalidConfig(
            format!("{name} must be positive").into(),
        )),
        Some(secs) => Ok(StdDuration::from_secs(secs)),
    }
}

/// Build the client configuration from merged connection settings.
///
/// # Errors
///
/// Returns [`SentryError::InvalidConfig`] for a base URL that is not an
/// absolute `http(s)` URL or for a zero timeout.
pub fn client_config(global: &GlobalArgs) -> Result<ClientConfig, SentryError> {
    let base_url = BaseUrl::or_default(global.url.as_deref());
    let parsed = url::Url::parse(base_url.as_str())
        .map_err(|e| SentryError::InvalidConfig(format!("url {base_url}: {e}").into()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SentryError::InvalidConfig(
            format!("url {base_url}: unsupported scheme {}", parsed.scheme()).into(),
        ));
    }
    let defaults = Timeouts::default();
    Ok(ClientConfig {
        base_url,
        organization_slug: global.org_slug.clone().unwrap_or_default(),
        auth_token: resolve_auth_token(global),
        timeouts: Timeouts {
            request: timeout(global.http_timeout, defaults.request, "http_timeout")?,
            connect: timeout(global.connect_timeout, defaults.connect, "connect_timeout")?,
        },
    })
}

/// Parse an optional RFC 3339 timestamp.
///
/// # Errors
///
/// Returns [`SentryError::InvalidConfig`] when `value` is not RFC 3339.
pub fn parse_time(value: Option<&str>) -> Result<Option<DateTime<Utc>>, SentryError> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| SentryError::InvalidConfig(format!("time {v:?}: {e}").into()))
        })
        .transpose()
}

/// Resolve a `--from`/`--to` pair; `to` defaults to now and `from` to
/// [`DEFAULT_RANGE_HOURS`] before `to`.
///
/// # Errors
///
/// Returns [`SentryError::InvalidConfig`] for unparsable timestamps or a
/// range that ends before it starts.
pub fn time_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SentryError> {
    let to = parse_time(to)?.unwrap_or_else(Utc::now);
    let from = parse_time(from)?.unwrap_or_else(|| to - Duration::hours(DEFAULT_RANGE_HOURS));
    if from > to {
        return Err(SentryError::InvalidConfig(
            format!("time range starts after it ends ({from} > {to})").into(),
        ));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentry::DEFAULT_SENTRY_URL;
    use crate::test_utils::{remove_var, set_var};
    use rstest::rstest;
    use serial_test::serial;

    #[test]
    fn defaults_point_at_public_sentry() {
        let config = client_config(&GlobalArgs::default()).expect("config");
        assert_eq!(config.base_url.as_str(), DEFAULT_SENTRY_URL);
        assert!(config.organization_slug.is_empty());
        assert_eq!(config.timeouts, Timeouts::default());
    }

    #[test]
    fn url_override_drops_trailing_slash() {
        let global = GlobalArgs {
            url: Some("https://sentry.example.com/".into()),
            org_slug: Some("acme".into()),
            http_timeout: Some(3),
            ..GlobalArgs::default()
        };
        let config = client_config(&global).expect("config");
        assert_eq!(config.base_url.as_str(), "https://sentry.example.com");
        assert_eq!(config.organization_slug, "acme");
        assert_eq!(config.timeouts.request, StdDuration::from_secs(3));
    }

    #[rstest]
    #[case(Some("ftp://sentry.example.com"), None)]
    #[case(Some("not a url"), None)]
    #[case(None, Some(0))]
    fn rejects_invalid_settings(#[case] url: Option<&str>, #[case] http_timeout: Option<u64>) {
        let global = GlobalArgs {
            url: url.map(str::to_owned),
            http_timeout,
            ..GlobalArgs::default()
        };
        let err = client_config(&global).expect_err("invalid");
        assert!(matches!(err, SentryError::InvalidConfig(_)));
    }

    #[test]
    #[serial]
    fn token_falls_back_to_environment() {
        set_var(AUTH_TOKEN_ENV, "env-token");
        let from_env = resolve_auth_token(&GlobalArgs::default());
        let explicit = resolve_auth_token(&GlobalArgs {
            auth_token: Some("cli-token".into()),
            ..GlobalArgs::default()
        });
        let blank = resolve_auth_token(&GlobalArgs {
            auth_token: Some(String::new()),
            ..GlobalArgs::default()
        });
        remove_var(AUTH_TOKEN_ENV);

        assert_eq!(from_env.as_str(), "env-token");
        assert_eq!(explicit.as_str(), "cli-token");
        assert_eq!(blank.as_str(), "env-token");
    }

    #[test]
    #[serial]
    fn missing_token_is_empty() {
        remove_var(AUTH_TOKEN_ENV);
        assert!(resolve_auth_token(&GlobalArgs::default()).is_empty());
    }

    #[test]
    fn time_range_defaults_to_one_day() {
        let (from, to) = time_range(None, Some("2024-03-02T00:00:00Z")).expect("range");
        assert_eq!(from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-03-02T00:00:00+00:00");
    }

    #[rstest]
    #[case(Some("yesterday"), None)]
    #[case(Some("2024-03-03T00:00:00Z"), Some("2024-03-02T00:00:00Z"))]
    fn time_range_rejects_bad_input(#[case] from: Option<&str>, #[case] to: Option<&str>) {
        assert!(matches!(
            time_range(from, to),
            Err(SentryError::InvalidConfig(_))
        ));
    }
}
