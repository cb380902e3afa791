use std::iter;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use panel_pull_common::run_stamp;
use twitter::endpoint::relation::{RelatedAccount, RelationKind};
use twitter::TwitterClient;

use crate::creds::CredentialPool;
use crate::fetch::with_retries;
use crate::outcome::Outcome;
use crate::worker::{self, TargetProcessor};
use crate::writer::CsvWriter;
use crate::{input, merge, partition, CommonArgs};

/// Pull the follower or friend edge set for every target, one worker per
/// credential, and merge the per-worker files.
pub async fn run(
    common: &CommonArgs,
    kind: RelationKind,
    minimal: bool,
    max_pull: i64,
) -> Result<()> {
    let pool = CredentialPool::load(&common.creds)?;
    let targets = input::apply_bounds(
        input::read_targets(&common.input, common.csv_column.as_deref())?,
        common.start_idx,
        common.end_idx,
        common.debug,
    );
    let max_pull = if max_pull < 0 { usize::MAX } else { max_pull as usize };
    tracing::info!(
        targets = targets.len(),
        credentials = pool.len(),
        relation = kind.as_str(),
        minimal,
        "starting relation pull"
    );

    let chunks = partition::assign(&targets, pool.len());
    let base = file_base(common, kind, minimal);
    let header = header(kind, minimal);

    let mut handles = Vec::new();
    let mut paths = Vec::new();
    for ((alias, client), chunk) in pool.iter().zip(chunks) {
        let path = PathBuf::from(format!("{base}_{alias}.csv"));
        let writer = CsvWriter::create(&path, &header)?;
        paths.push(path);

        let mut processor = RelationProcessor {
            client: client.clone(),
            kind,
            minimal,
            max_pull,
            writer,
        };
        let alias = alias.clone();
        handles.push(tokio::spawn(async move {
            worker::run_chunk(&alias, &chunk, &mut processor).await
        }));
    }

    for handle in join_all(handles).await {
        let report = handle??;
        tracing::info!(
            alias = %report.alias,
            processed = report.processed,
            abandoned = report.abandoned,
            "worker finished"
        );
    }

    let merged = PathBuf::from(format!("{base}_merged.csv"));
    let rows = merge::merge_csv(&paths, &merged, None)?;
    tracing::info!(rows, output = %merged.display(), "merged worker files");
    Ok(())
}

struct RelationProcessor {
    client: TwitterClient,
    kind: RelationKind,
    minimal: bool,
    max_pull: usize,
    writer: CsvWriter,
}

#[async_trait]
impl TargetProcessor for RelationProcessor {
    async fn process(&mut self, target: &str) -> Result<ControlFlow<()>> {
        let (rows, dead) = if self.minimal {
            let outcome = Outcome::from_list(
                with_retries(target, || {
                    self.client.related_ids(target, self.kind, self.max_pull)
                })
                .await,
            );
            (minimal_rows(target, &outcome), outcome.credential_dead())
        } else {
            let outcome = Outcome::from_list(
                with_retries(target, || {
                    self.client.related_accounts(target, self.kind, self.max_pull)
                })
                .await,
            );
            (full_rows(target, &outcome), outcome.credential_dead())
        };

        self.writer.write_rows(&rows)?;
        Ok(if dead {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    }
}

fn file_base(common: &CommonArgs, kind: RelationKind, minimal: bool) -> String {
    let prefix = if common.prefix.is_empty() {
        String::new()
    } else {
        format!("{}__", common.prefix)
    };
    let debug_tag = if common.debug { "DEBUG_" } else { "" };
    let minimal_tag = if minimal { "MINIMAL_" } else { "" };
    format!(
        "{prefix}{debug_tag}{minimal_tag}{}_{}__START{}_END{}",
        kind.as_str().to_uppercase(),
        run_stamp(),
        common.start_idx,
        common.end_idx,
    )
}

fn header(kind: RelationKind, minimal: bool) -> Vec<String> {
    let rel = kind.as_str();
    let mut header = vec![
        "main".to_string(),
        "status".to_string(),
        "error_code".to_string(),
    ];
    if minimal {
        header.push(format!("{rel}_id"));
    } else {
        header.extend([
            format!("{rel}_username"),
            format!("{rel}_id"),
            format!("{rel}_followers"),
            format!("{rel}_following"),
            format!("{rel}_tweet_count"),
            format!("{rel}_created_date"),
        ]);
    }
    header
}

fn sentinel_row(target: &str, status: &str, code: u16, value_cols: usize) -> Vec<String> {
    let mut row = vec![target.to_string(), status.to_string(), code.to_string()];
    row.extend(iter::repeat(String::new()).take(value_cols));
    row
}

fn minimal_rows(target: &str, outcome: &Outcome<Vec<String>>) -> Vec<Vec<String>> {
    match outcome {
        Outcome::Success(ids) => ids
            .iter()
            .map(|id| {
                vec![
                    target.to_string(),
                    "ok".to_string(),
                    "0".to_string(),
                    id.clone(),
                ]
            })
            .collect(),
        Outcome::Empty => vec![sentinel_row(target, "empty", 0, 1)],
        Outcome::Failed { code } => vec![sentinel_row(target, "error", *code, 1)],
    }
}

fn full_rows(target: &str, outcome: &Outcome<Vec<RelatedAccount>>) -> Vec<Vec<String>> {
    match outcome {
        Outcome::Success(accounts) => accounts
            .iter()
            .map(|account| {
                vec![
                    target.to_string(),
                    "ok".to_string(),
                    "0".to_string(),
                    account.username.clone(),
                    account.id.clone(),
                    account.public_metrics.followers_count.to_string(),
                    account.public_metrics.following_count.to_string(),
                    account.public_metrics.tweet_count.to_string(),
                    account.created_at.clone().unwrap_or_default(),
                ]
            })
            .collect(),
        Outcome::Empty => vec![sentinel_row(target, "empty", 0, 6)],
        Outcome::Failed { code } => vec![sentinel_row(target, "error", *code, 6)],
    }
}
