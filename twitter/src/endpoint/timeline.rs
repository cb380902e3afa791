use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::error::TwitterError;
use crate::rate_limit::check_rate_limit;

const TWEET_FIELDS: &str = "attachments,author_id,conversation_id,created_at,entities,geo,id,\
                            in_reply_to_user_id,lang,public_metrics,referenced_tweets,\
                            reply_settings,source,text,withheld,note_tweet";
const MEDIA_FIELDS: &str = "url,preview_image_url";
const EXPANSIONS: &str = "attachments.poll_ids,attachments.media_keys,author_id,geo.place_id,\
                          in_reply_to_user_id,referenced_tweets.id,entities.mentions.username,\
                          referenced_tweets.id.author_id";

/// One target's recent tweets plus the referenced tweets and authors the
/// API bundled alongside them. Tweets are kept as raw JSON objects so the
/// raw output file preserves every field the API returned.
#[derive(Debug, Default)]
pub struct TimelinePull {
    pub data: Vec<Value>,
    pub includes_users: Vec<Value>,
    pub includes_tweets: Vec<Value>,
}

/// Fetch the `count` most recent tweets for `target` in a single bounded
/// request.
pub(crate) async fn timeline(
    client: &Client,
    target: &str,
    count: usize,
) -> Result<TimelinePull, TwitterError> {
    #[derive(Debug, Deserialize)]
    struct TimelineResponse {
        #[serde(default)]
        data: Vec<Value>,
        #[serde(default)]
        includes: Includes,
    }

    #[derive(Debug, Default, Deserialize)]
    struct Includes {
        #[serde(default)]
        users: Vec<Value>,
        #[serde(default)]
        tweets: Vec<Value>,
    }

    let url = format!("https://api.twitter.com/2/users/{target}/tweets");
    // The endpoint accepts 5..=100 results per request
    let max_results = count.clamp(5, 100).to_string();

    loop {
        let resp = client
            .get(&url)
            .query(&[
                ("max_results", max_results.as_str()),
                ("tweet.fields", TWEET_FIELDS),
                ("media.fields", MEDIA_FIELDS),
                ("expansions", EXPANSIONS),
            ])
            .send()
            .await
            .map_err(|e| TwitterError::Request {
                target: target.to_owned(),
                source: e,
            })?;

        if let Some(duration) = check_rate_limit(&resp) {
            tracing::info!(target_id = %target, ?duration, "rate limit hit, sleeping");
            sleep(duration).await;
            continue;
        }

        if !resp.status().is_success() {
            return Err(TwitterError::Api {
                target: target.to_owned(),
                status: resp.status().as_u16(),
            });
        }

        let response: TimelineResponse = resp.json().await.map_err(|e| TwitterError::Parse {
            target: target.to_owned(),
            msg: e.to_string(),
        })?;

        return Ok(TimelinePull {
            data: response.data,
            includes_users: response.includes.users,
            includes_tweets: response.includes.tweets,
        });
    }
}

/// Attach resolved reference data inline onto one tweet: its own expanded
/// URLs, the URLs and author of every referenced tweet that the included
/// sets can resolve, and the deduplicated union of both URL lists.
/// References that cannot be resolved contribute nothing.
pub fn denormalize(tweet: &Value, included_tweets: &[Value], included_users: &[Value]) -> Value {
    let mut out = tweet.clone();

    let primary_urls = expanded_urls(tweet);
    let mut refd_urls: Vec<String> = Vec::new();
    let mut refs_out: Vec<Value> = Vec::new();

    if let Some(refs) = tweet.get("referenced_tweets").and_then(Value::as_array) {
        for reference in refs {
            let mut urls: Vec<String> = Vec::new();
            let mut author_id: Option<String> = None;
            let mut author_username: Option<String> = None;

            let ref_id = reference.get("id").and_then(Value::as_str);
            let included = ref_id.and_then(|id| {
                included_tweets
                    .iter()
                    .find(|t| t.get("id").and_then(Value::as_str) == Some(id))
            });
            if let Some(included) = included {
                urls = expanded_urls(included);
                refd_urls.extend(urls.iter().cloned());
                author_id = included
                    .get("author_id")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                if let Some(id) = author_id.as_deref() {
                    author_username = included_users
                        .iter()
                        .find(|u| u.get("id").and_then(Value::as_str) == Some(id))
                        .and_then(|u| u.get("username"))
                        .and_then(Value::as_str)
                        .map(str::to_owned);
                }
            }

            let mut enriched = reference.clone();
            if let Some(obj) = enriched.as_object_mut() {
                obj.insert("urls".to_string(), json!(urls));
                obj.insert("ref_author_id".to_string(), json!(author_id));
                obj.insert("ref_author_username".to_string(), json!(author_username));
            }
            refs_out.push(enriched);
        }
    }

    let all_urls: Vec<String> = primary_urls
        .iter()
        .chain(refd_urls.iter())
        .unique()
        .cloned()
        .collect();

    if let Some(obj) = out.as_object_mut() {
        obj.insert("primary_urls".to_string(), json!(primary_urls));
        obj.insert("refd_urls".to_string(), json!(refd_urls));
        obj.insert("all_urls".to_string(), json!(all_urls));
        obj.insert("referenced_tweets".to_string(), Value::Array(refs_out));
    }
    out
}

fn expanded_urls(tweet: &Value) -> Vec<String> {
    tweet
        .get("entities")
        .and_then(|e| e.get("urls"))
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(|u| u.get("expanded_url").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
