use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use panel_pull_common::run_stamp;
use serde::Serialize;
use serde_json::Value;
use twitter::endpoint::timeline::denormalize;
use twitter::TwitterClient;

use crate::creds::CredentialPool;
use crate::fetch::with_retries;
use crate::outcome::Outcome;
use crate::worker::{self, TargetProcessor};
use crate::writer::JsonlWriter;
use crate::{input, merge, partition, CommonArgs};

/// Pull each target's most recent tweets. Two parallel files per worker:
/// the raw API payloads, and the denormalized records with resolved URLs
/// and reference authors. Both share the same per-target sentinel lines.
pub async fn run(common: &CommonArgs, per_target: usize) -> Result<()> {
    let pool = CredentialPool::load(&common.creds)?;
    let targets = input::apply_bounds(
        input::read_targets(&common.input, common.csv_column.as_deref())?,
        common.start_idx,
        common.end_idx,
        common.debug,
    );
    tracing::info!(
        targets = targets.len(),
        credentials = pool.len(),
        per_target,
        "starting timeline pull"
    );

    let chunks = partition::assign(&targets, pool.len());
    let base = file_base(common);

    let mut handles = Vec::new();
    let mut raw_paths = Vec::new();
    let mut processed_paths = Vec::new();
    for ((alias, client), chunk) in pool.iter().zip(chunks) {
        let raw_path = PathBuf::from(format!("{base}_{alias}_raw.jsonl"));
        let processed_path = PathBuf::from(format!("{base}_{alias}_processed.jsonl"));
        let raw = JsonlWriter::create(&raw_path)?;
        let processed = JsonlWriter::create(&processed_path)?;
        raw_paths.push(raw_path);
        processed_paths.push(processed_path);

        let mut processor = TimelineProcessor {
            client: client.clone(),
            per_target,
            raw,
            processed,
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

    let raw_merged = PathBuf::from(format!("{base}_raw_merged.jsonl"));
    let processed_merged = PathBuf::from(format!("{base}_processed_merged.jsonl"));
    let lines = merge::merge_jsonl(&raw_paths, &raw_merged)?;
    merge::merge_jsonl(&processed_paths, &processed_merged)?;
    tracing::info!(lines, output = %raw_merged.display(), "merged worker files");
    Ok(())
}

/// One line of the raw output file.
#[derive(Serialize)]
struct RawLine<'a> {
    target_id: &'a str,
    status: &'a str,
    error_code: u16,
    data: &'a [Value],
    includes_users: &'a [Value],
    includes_tweets: &'a [Value],
}

/// One line of the processed output file.
#[derive(Serialize)]
struct ProcessedLine<'a> {
    target_id: &'a str,
    status: &'a str,
    error_code: u16,
    tweets: Vec<Value>,
}

struct TimelineProcessor {
    client: TwitterClient,
    per_target: usize,
    raw: JsonlWriter,
    processed: JsonlWriter,
}

#[async_trait]
impl TargetProcessor for TimelineProcessor {
    async fn process(&mut self, target: &str) -> Result<ControlFlow<()>> {
        let result = with_retries(target, || self.client.timeline(target, self.per_target)).await;
        let outcome = match result {
            Ok(pull) if pull.data.is_empty() => Outcome::Empty,
            Ok(pull) => Outcome::Success(pull),
            Err(code) => Outcome::Failed { code },
        };

        let status = outcome.status();
        let error_code = outcome.error_code();
        match &outcome {
            Outcome::Success(pull) => {
                self.raw.write_line(&RawLine {
                    target_id: target,
                    status,
                    error_code,
                    data: &pull.data,
                    includes_users: &pull.includes_users,
                    includes_tweets: &pull.includes_tweets,
                })?;
                let tweets = pull
                    .data
                    .iter()
                    .map(|tweet| denormalize(tweet, &pull.includes_tweets, &pull.includes_users))
                    .collect();
                self.processed.write_line(&ProcessedLine {
                    target_id: target,
                    status,
                    error_code,
                    tweets,
                })?;
            }
            _ => {
                self.raw.write_line(&RawLine {
                    target_id: target,
                    status,
                    error_code,
                    data: &[],
                    includes_users: &[],
                    includes_tweets: &[],
                })?;
                self.processed.write_line(&ProcessedLine {
                    target_id: target,
                    status,
                    error_code,
                    tweets: Vec::new(),
                })?;
            }
        }

        Ok(if outcome.credential_dead() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    }
}

fn file_base(common: &CommonArgs) -> String {
    let prefix = if common.prefix.is_empty() {
        String::new()
    } else {
        format!("{}__", common.prefix)
    };
    let debug_tag = if common.debug { "DEBUG_" } else { "" };
    format!(
        "{prefix}{debug_tag}TIMELINES_{}__START{}_END{}",
        run_stamp(),
        common.start_idx,
        common.end_idx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_lines_serialize_with_empty_payloads() {
        let line = RawLine {
            target_id: "55",
            status: "error",
            error_code: 403,
            data: &[],
            includes_users: &[],
            includes_tweets: &[],
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["target_id"], "55");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_code"], 403);
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[test]
    fn processed_line_keeps_denormalized_tweets() {
        let tweet = serde_json::json!({"id": "1", "text": "hi"});
        let line = ProcessedLine {
            target_id: "55",
            status: "ok",
            error_code: 0,
            tweets: vec![denormalize(&tweet, &[], &[])],
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["tweets"][0]["all_urls"], serde_json::json!([]));
    }
}
