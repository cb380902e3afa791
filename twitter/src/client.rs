use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use tokio::time::Duration;

use crate::endpoint::relation::{related_accounts, related_ids, RelatedAccount, RelationKind};
use crate::endpoint::timeline::{timeline, TimelinePull};
use crate::endpoint::users::{lookup_users, HydratedUser};
use crate::error::TwitterError;

/// One API account's secrets, as stored in the credential file. Only the
/// bearer token is used for requests; the user-auth keys are kept so one
/// store works for every script.
#[derive(Clone, Debug, Deserialize)]
pub struct Credential {
    pub bearer_token: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_secret: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TwitterClient {
    client: Client,
}

impl TwitterClient {
    /// Create a new TwitterClient authenticated as `credential`.
    pub fn new(credential: &Credential) -> TwitterClient {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", &credential.bearer_token).parse().unwrap(),
        );

        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        TwitterClient { client }
    }

    /// Pull up to `max_pull` related accounts with full per-account fields.
    pub async fn related_accounts(
        &self,
        target: &str,
        kind: RelationKind,
        max_pull: usize,
    ) -> Result<Vec<RelatedAccount>, TwitterError> {
        related_accounts(&self.client, target, kind, max_pull).await
    }

    /// Pull up to `max_pull` related account IDs (larger pages, IDs only).
    pub async fn related_ids(
        &self,
        target: &str,
        kind: RelationKind,
        max_pull: usize,
    ) -> Result<Vec<String>, TwitterError> {
        related_ids(&self.client, target, kind, max_pull).await
    }

    /// Pull the `count` most recent tweets for `target` along with the
    /// referenced tweets and authors they mention.
    pub async fn timeline(&self, target: &str, count: usize) -> Result<TimelinePull, TwitterError> {
        timeline(&self.client, target, count).await
    }

    /// Hydrate up to 100 user IDs into full account objects.
    pub async fn lookup_users(&self, ids: &[String]) -> Result<Vec<HydratedUser>, TwitterError> {
        lookup_users(&self.client, ids).await
    }
}
