//! Command execution for `sentry-frames`.
//!
//! Each sub-command merges its configuration section, builds a client and
//! prints the resulting frame (or dispatcher response) as JSON on stdout.

use anyhow::{Context, anyhow};
use log::{error, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{ErrorKind, Read, Write};
use tokio_util::sync::CancellationToken;

use sentry_frames::cli_args::{
    BatchArgs, GlobalArgs, IssuesArgs, OrganizationsArgs, ProjectsArgs, StatsArgs,
};
use sentry_frames::config::{client_config, load_section, time_range};
use sentry_frames::frame::{Frame, FrameMeta};
use sentry_frames::plugin::{
    DataQuery, QUERY_TYPE_ISSUES, QueryDataRequest, SentryQuery, StaticInstance, TimeRange,
    query_data, query_one,
};
use sentry_frames::sentry::{
    ApiProvider, Executed, GetStatsV2Input, QueryFailure, SentryClient, StatsV2Group,
};

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|c| {
        c.downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::BrokenPipe)
    })
}

/// Pretty-print `value` to stdout. A closed pipe is not an error.
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let write = || -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value).context("serialise output")?;
        writeln!(out).context("write output")?;
        Ok(())
    };
    match write() {
        Err(e) if is_broken_pipe(&e) => Ok(()),
        other => other,
    }
}

fn build_client(global: &GlobalArgs) -> anyhow::Result<SentryClient> {
    let config = client_config(global).context("configuration error")?;
    if config.auth_token.is_empty() {
        warn!("Sentry auth token not set, requests will be anonymous");
    }
    SentryClient::new(config).context("create HTTP client")
}

/// Turn a typed operation's outcome into a frame, keeping the executed
/// query in the error context on failure.
#[allow(
    clippy::option_if_let_else,
    reason = "both arms consume the error"
)]
fn frame_of<T: Serialize>(
    client: &SentryClient,
    name: &str,
    result: Result<Executed<Vec<T>>, QueryFailure>,
) -> anyhow::Result<Frame> {
    let found = result.map_err(|failure| match failure.executed_query {
        Some(query) => anyhow!(failure.error).context(format!("GET {query}")),
        None => anyhow!(failure.error),
    })?;
    let frame = Frame::from_records(name, &found.value)?;
    Ok(frame.with_meta(FrameMeta {
        executed_query_string: found.executed_query,
        source_url: client.base_url().as_str().to_owned(),
        custom: None,
    }))
}

/// One record per stats group with `by`, `totals` and `series` objects.
fn stats_records(groups: &[StatsV2Group]) -> Vec<Map<String, Value>> {
    groups
        .iter()
        .map(|group| {
            let mut record = Map::new();
            record.insert("by".into(), Value::Object(group.by.clone().into_iter().collect()));
            record.insert(
                "totals".into(),
                Value::Object(group.totals.clone().into_iter().collect()),
            );
            record.insert(
                "series".into(),
                Value::Object(
                    group
                        .series
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::Array(v.clone())))
                        .collect(),
                ),
            );
            record
        })
        .collect()
}

pub async fn run_organizations(
    _args: OrganizationsArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let client = build_client(global)?;
    let result = client.get_organizations(cancel).await;
    print_json(&frame_of(&client, "Organizations", result)?)
}

pub async fn run_projects(
    args: ProjectsArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let args = load_section(&args).context("configuration error")?;
    let client = build_client(global)?;
    let org = args
        .org
        .unwrap_or_else(|| client.organization_slug().to_owned());
    let result = client.get_projects(&org, cancel).await;
    print_json(&frame_of(&client, "Projects", result)?)
}

/// Run an issues query through the dispatcher, exactly as a dashboard
/// query would be served.
pub async fn run_issues(
    args: IssuesArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let args = load_section(&args).context("configuration error")?;
    let (from, to) = time_range(args.from.as_deref(), args.to.as_deref())
        .context("configuration error")?;
    let client = build_client(global)?;
    let query = SentryQuery {
        query_type: QUERY_TYPE_ISSUES.to_owned(),
        org_slug: args
            .org
            .unwrap_or_else(|| client.organization_slug().to_owned()),
        project_ids: args.projects,
        environments: args.environments,
        issues_query: args.query.unwrap_or_default(),
        issues_sort: args.sort.unwrap_or_default(),
        issues_limit: args.limit.unwrap_or_default(),
    };
    let data_query = DataQuery {
        ref_id: "A".to_owned(),
        json: serde_json::to_value(&query)?,
        time_range: TimeRange { from, to },
    };
    let response = query_one(&client, &data_query, cancel).await;
    print_json(&response)?;
    response
        .error
        .map_or(Ok(()), |e| Err(anyhow!(e).context("issues query failed")))
}

pub async fn run_stats(
    args: StatsArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let args = load_section(&args).context("configuration error")?;
    let (from, to) = time_range(args.from.as_deref(), args.to.as_deref())
        .context("configuration error")?;
    let client = build_client(global)?;
    let input = GetStatsV2Input {
        organization_slug: args
            .org
            .unwrap_or_else(|| client.organization_slug().to_owned()),
        project_ids: args.projects,
        categories: args.categories,
        fields: args.fields,
        group_by: args.group_by,
        outcomes: args.outcomes,
        reasons: args.reasons,
        interval: args.interval.unwrap_or_default(),
        from,
        to,
    };
    let result = client
        .get_stats_v2(&input, cancel)
        .await
        .map(|found| Executed {
            value: stats_records(&found.value.groups),
            executed_query: found.executed_query,
        });
    print_json(&frame_of(&client, "Stats", result)?)
}

/// Run a JSON query request (as a dashboard would send it) and print the
/// per-query responses. Individual query failures do not fail the command.
pub async fn run_batch(
    args: BatchArgs,
    global: &GlobalArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let args = load_section(&args).context("configuration error")?;
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read standard input")?;
            buf
        }
    };
    let request: QueryDataRequest =
        serde_json::from_str(&raw).context("decode query request")?;
    let resolver = StaticInstance::new(build_client(global)?);
    let response = query_data(&resolver, &request, cancel).await;
    for (ref_id, result) in &response.responses {
        if let Some(e) = &result.error {
            error!("query {ref_id} failed: {e}");
        }
    }
    print_json(&response)
}

#[cfg(test)]
mod tests {
    use super::stats_records;
    use sentry_frames::frame::{FieldValues, Frame};
    use sentry_frames::sentry::StatsV2Group;
    use serde_json::json;

    #[test]
    fn stats_groups_flatten_into_columns() {
        let group = StatsV2Group {
            by: [("category".to_owned(), json!("error"))].into_iter().collect(),
            totals: [("sum(quantity)".to_owned(), json!(7))].into_iter().collect(),
            series: [("sum(quantity)".to_owned(), vec![json!(3), json!(4)])]
                .into_iter()
                .collect(),
        };

        let frame = Frame::from_records("Stats", &stats_records(&[group])).expect("frame");

        let names: Vec<_> = frame.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["by.category", "series.sum(quantity)", "totals.sum(quantity)"]
        );
        assert_eq!(
            frame.field("totals.sum(quantity)").map(|f| &f.values),
            Some(&FieldValues::Number(vec![Some(7.0)]))
        );
    }
}
