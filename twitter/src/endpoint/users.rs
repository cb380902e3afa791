use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;

use crate::error::TwitterError;
use crate::rate_limit::check_rate_limit;

/// The lookup endpoint accepts at most this many IDs per request.
pub const LOOKUP_BATCH: usize = 100;

/// One hydrated account from the v1.1 lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HydratedUser {
    pub id_str: String,
    pub screen_name: String,
    pub name: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    /// The account's most recent tweet, absent for accounts that never
    /// tweeted or whose tweets are hidden.
    #[serde(default)]
    pub status: Option<LastStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastStatus {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub id_str: Option<String>,
}

/// Hydrate a batch of user IDs. IDs the API does not know are simply
/// missing from the response; the caller decides what to record for them.
pub(crate) async fn lookup_users(
    client: &Client,
    ids: &[String],
) -> Result<Vec<HydratedUser>, TwitterError> {
    let batch = format!("lookup[{}]", ids.len());
    let id_param = ids.join(",");

    loop {
        let resp = client
            .post("https://api.twitter.com/1.1/users/lookup.json")
            .form(&[("user_id", id_param.as_str())])
            .send()
            .await
            .map_err(|e| TwitterError::Request {
                target: batch.clone(),
                source: e,
            })?;

        if let Some(duration) = check_rate_limit(&resp) {
            tracing::info!(target_id = %batch, ?duration, "rate limit hit, sleeping");
            sleep(duration).await;
            continue;
        }

        if !resp.status().is_success() {
            return Err(TwitterError::Api {
                target: batch.clone(),
                status: resp.status().as_u16(),
            });
        }

        return resp.json().await.map_err(|e| TwitterError::Parse {
            target: batch.clone(),
            msg: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hydrated_user_with_status() {
        let json = r#"[{
            "id": 6253282,
            "id_str": "6253282",
            "screen_name": "TwitterAPI",
            "name": "Twitter API",
            "followers_count": 6133636,
            "friends_count": 12,
            "statuses_count": 3656,
            "created_at": "Wed May 23 06:01:13 +0000 2007",
            "lang": null,
            "status": {
                "created_at": "Mon May 06 20:01:29 +0000 2019",
                "id_str": "1125490788736032770"
            }
        }]"#;
        let users: Vec<HydratedUser> = serde_json::from_str(json).unwrap();
        assert_eq!(users.len(), 1);
        let user = &users[0];
        assert_eq!(user.id_str, "6253282");
        assert_eq!(user.screen_name, "TwitterAPI");
        assert_eq!(user.followers_count, 6133636);
        let status = user.status.as_ref().unwrap();
        assert_eq!(status.id_str.as_deref(), Some("1125490788736032770"));
    }

    #[test]
    fn parse_hydrated_user_without_status() {
        let json = r#"[{
            "id_str": "99",
            "screen_name": "quiet",
            "name": "Quiet Account"
        }]"#;
        let users: Vec<HydratedUser> = serde_json::from_str(json).unwrap();
        assert!(users[0].status.is_none());
        assert_eq!(users[0].statuses_count, 0);
        assert!(users[0].created_at.is_none());
    }
}
