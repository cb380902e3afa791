use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use futures::future::join_all;
use panel_pull_common::{chunks_of, run_stamp};
use twitter::endpoint::users::{HydratedUser, LOOKUP_BATCH};
use twitter::TwitterClient;

use crate::creds::CredentialPool;
use crate::fetch::with_retries;
use crate::worker::WorkerReport;
use crate::writer::CsvWriter;
use crate::{input, merge, partition, CommonArgs};

/// Hydrate target IDs into full account rows, one lookup batch at a
/// time. The merged file dedups by user ID since panel selection upstream
/// may oversample.
pub async fn run(common: &CommonArgs) -> Result<()> {
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
        "starting hydration"
    );

    let chunks = partition::assign(&targets, pool.len());
    let base = file_base(common);
    let header = header();

    let mut handles = Vec::new();
    let mut paths = Vec::new();
    for ((alias, client), chunk) in pool.iter().zip(chunks) {
        let path = PathBuf::from(format!("{base}_{alias}.csv"));
        let writer = CsvWriter::create(&path, &header)?;
        paths.push(path);

        let alias = alias.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            hydrate_chunk(alias, client, chunk, writer).await
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
    let rows = merge::merge_csv(&paths, &merged, Some(0))?;
    tracing::info!(rows, output = %merged.display(), "merged worker files");
    Ok(())
}

/// One worker: hydrate its chunk in lookup-sized batches, writing one row
/// per input ID whatever happens to the batch.
async fn hydrate_chunk(
    alias: String,
    client: TwitterClient,
    chunk: Vec<String>,
    mut writer: CsvWriter,
) -> Result<WorkerReport> {
    let batches = chunks_of(&chunk, LOOKUP_BATCH);
    let total = batches.len();
    let mut processed = 0;

    for (idx, batch) in batches.iter().enumerate() {
        tracing::info!(alias = %alias, batch = idx, total, "hydrating batch");
        let label = format!("lookup[{}]", batch.len());
        let result = with_retries(&label, || client.lookup_users(batch)).await;
        let (rows, dead) = batch_rows(batch, &result);
        writer.write_rows(&rows)?;
        processed += batch.len();

        if dead {
            tracing::warn!(alias = %alias, "credential unusable, abandoning rest of chunk");
            return Ok(WorkerReport {
                alias,
                processed,
                abandoned: chunk.len() - processed,
            });
        }
    }

    Ok(WorkerReport {
        alias,
        processed,
        abandoned: 0,
    })
}

/// Rows for one finished batch: hydrated accounts in API order, then an
/// empty sentinel for every ID the response skipped; a failed batch turns
/// into one error row per ID.
fn batch_rows(batch: &[String], result: &Result<Vec<HydratedUser>, u16>) -> (Vec<Vec<String>>, bool) {
    match result {
        Ok(users) => {
            let mut rows: Vec<Vec<String>> = users.iter().map(user_row).collect();
            let returned: HashSet<&str> = users.iter().map(|u| u.id_str.as_str()).collect();
            for id in batch {
                if !returned.contains(id.as_str()) {
                    rows.push(sentinel_row(id, "empty", 0));
                }
            }
            (rows, false)
        }
        Err(code) => (
            batch
                .iter()
                .map(|id| sentinel_row(id, "error", *code))
                .collect(),
            *code == 401,
        ),
    }
}

fn user_row(user: &HydratedUser) -> Vec<String> {
    let (last_tweet_date, last_tweet_id) = match &user.status {
        Some(status) => (
            status.created_at.clone().unwrap_or_default(),
            status.id_str.clone().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    vec![
        user.id_str.clone(),
        "ok".to_string(),
        "0".to_string(),
        user.screen_name.clone(),
        user.followers_count.to_string(),
        user.friends_count.to_string(),
        user.statuses_count.to_string(),
        user.created_at.clone().unwrap_or_default(),
        last_tweet_date,
        user.name.clone(),
        user.lang.clone().unwrap_or_default(),
        last_tweet_id,
    ]
}

fn sentinel_row(id: &str, status: &str, code: u16) -> Vec<String> {
    let mut row = vec![id.to_string(), status.to_string(), code.to_string()];
    row.extend(std::iter::repeat(String::new()).take(9));
    row
}

fn header() -> Vec<String> {
    [
        "user_id",
        "status",
        "error_code",
        "username",
        "follower_count",
        "following_count",
        "tweet_count",
        "account_created",
        "last_tweet_date",
        "name",
        "lang",
        "last_tweet_id",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn file_base(common: &CommonArgs) -> String {
    let prefix = if common.prefix.is_empty() {
        String::new()
    } else {
        format!("{}__", common.prefix)
    };
    let debug_tag = if common.debug { "DEBUG_" } else { "" };
    format!(
        "{prefix}{debug_tag}HYDRATED_{}__START{}_END{}",
        run_stamp(),
        common.start_idx,
        common.end_idx,
    )
}
