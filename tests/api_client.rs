//! HTTP-level behaviour of the production client against a local server.

mod utils;

use rstest::rstest;
use sentry_frames::plugin::{DataQuery, TimeRange, query_one};
use sentry_frames::sentry::{
    ApiProvider, AuthToken, ClientConfig, DEFAULT_SENTRY_URL, GetIssuesInput, SentryClient,
};
use sentry_frames::SentryError;
use serde_json::json;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use utils::{Reply, set_sequential_responder, start_mitm};

fn client(addr: SocketAddr) -> SentryClient {
    SentryClient::new(ClientConfig {
        base_url: format!("http://{addr}/").into(),
        organization_slug: "acme".into(),
        auth_token: AuthToken::new("secret"),
        ..ClientConfig::default()
    })
    .expect("client")
}

fn issues_input() -> GetIssuesInput {
    let range = TimeRange::default();
    GetIssuesInput {
        organization_slug: "acme".into(),
        project_ids: vec!["7".into()],
        environments: Vec::new(),
        query: "is:unresolved".into(),
        sort: String::new(),
        limit: 0,
        from: range.from,
        to: range.to,
    }
}

#[tokio::test]
async fn issues_follow_link_headers_across_pages() {
    let (addr, handler, shutdown) = start_mitm().await.expect("mitm");
    let query = issues_input().to_query().expect("query");
    let second = format!("{query}&cursor=0:100:0");
    let seen = set_sequential_responder(
        &handler,
        vec![
            Reply::ok(json!([{"id": "1"}, {"id": "2"}]).to_string())
                .with_next(&format!("http://{addr}{second}")),
            Reply::ok(json!([{"id": "3"}]).to_string()),
        ],
    );

    let issues = client(addr)
        .get_issues(&issues_input(), &CancellationToken::new())
        .await
        .expect("issues");

    let ids: Vec<_> = issues.value.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(issues.executed_query, query);
    assert_eq!(*seen.lock().expect("seen"), vec![query, second]);
    shutdown.shutdown().await;
}

#[rstest]
#[case(403, r#"{"detail":"Invalid token"}"#, "403 Forbidden Invalid token")]
#[case(
    404,
    r#"{"detail":"The requested resource does not exist"}"#,
    "404 Not Found The requested resource does not exist"
)]
#[tokio::test]
async fn error_bodies_become_readable_messages(
    #[case] status: u16,
    #[case] body: &str,
    #[case] expected: &str,
) {
    let (addr, handler, shutdown) = start_mitm().await.expect("mitm");
    set_sequential_responder(
        &handler,
        vec![Reply {
            status,
            body: body.to_owned(),
            link: None,
        }],
    );

    let failure = client(addr)
        .get_organizations(&CancellationToken::new())
        .await
        .expect_err("error status");

    assert_eq!(failure.to_string(), expected);
    assert_eq!(failure.error.status(), Some(status));
    assert_eq!(failure.executed_query.as_deref(), Some("/api/0/organizations/"));
    shutdown.shutdown().await;
}

#[tokio::test]
async fn unparsable_error_body_reports_status_line() {
    let (addr, handler, shutdown) = start_mitm().await.expect("mitm");
    set_sequential_responder(
        &handler,
        vec![Reply {
            status: 502,
            body: "<html>bad gateway</html>".to_owned(),
            link: None,
        }],
    );

    let failure = client(addr)
        .get_projects("acme", &CancellationToken::new())
        .await
        .expect_err("error status");

    assert!(failure.to_string().starts_with("502 Bad Gateway "));
    shutdown.shutdown().await;
}

#[tokio::test]
async fn connection_failure_is_a_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let failure = client(addr)
        .get_organizations(&CancellationToken::new())
        .await
        .expect_err("nothing listening");

    assert!(matches!(failure.error, SentryError::RequestContext { .. }));
}

#[tokio::test]
async fn dispatcher_frames_issues_from_the_wire() {
    let (addr, handler, shutdown) = start_mitm().await.expect("mitm");
    set_sequential_responder(
        &handler,
        vec![Reply::ok(
            json!([
                {"id": "1", "title": "boom", "userCount": 4, "firstSeen": "2024-01-01T00:00:00Z"}
            ])
            .to_string(),
        )],
    );
    let client = client(addr);
    let query = DataQuery {
        ref_id: "A".into(),
        json: json!({"queryType": "issues", "orgSlug": "acme", "issuesLimit": 5}),
        time_range: TimeRange::default(),
    };

    let response = query_one(&client, &query, &CancellationToken::new()).await;

    assert!(response.error.is_none());
    let frame = response.frames.first().expect("frame");
    assert_eq!(frame.name, "Issues (A)");
    assert_eq!(frame.rows(), 1);
    let meta = frame.meta.as_ref().expect("meta");
    assert_eq!(meta.source_url, format!("http://{addr}"));
    assert!(meta.executed_query_string.contains("limit=5"));
    shutdown.shutdown().await;
}

#[test]
fn default_client_targets_public_sentry() {
    let client = SentryClient::new(ClientConfig::default()).expect("client");
    assert_eq!(client.base_url().as_str(), DEFAULT_SENTRY_URL);
}
