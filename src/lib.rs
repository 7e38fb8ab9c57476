//! Data-retrieval adapter between a dashboard and the Sentry REST API.
//!
//! [`plugin::query_data`] receives a batch of dashboard queries and answers
//! each one with a tabular [`frame::Frame`] or an error. Remote access goes
//! through [`sentry::ApiProvider`], implemented by [`sentry::SentryClient`]
//! over a pluggable [`sentry::Transport`].

pub mod cli_args;
pub mod config;
pub mod error;
pub mod frame;
pub mod plugin;
pub mod sentry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cli_args::{GlobalArgs, IssuesArgs, ProjectsArgs, StatsArgs};
pub use error::SentryError;
pub use frame::Frame;
pub use plugin::{QueryDataRequest, QueryDataResponse, query_data};
pub use sentry::{ApiProvider, ClientConfig, SentryClient};
