use futures::{pin_mut, TryStreamExt};
use page_turner::{PageTurner, TurnedPage, TurnedPageResult};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;

use crate::error::TwitterError;
use crate::rate_limit::check_rate_limit;

/// Page size of the v2 endpoint that returns full user objects.
const FULL_PAGE_SIZE: usize = 1000;
/// Page size of the v1.1 endpoint that returns bare IDs.
const MINIMAL_PAGE_SIZE: usize = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    Followers,
    Friends,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Followers => "followers",
            Self::Friends => "friends",
        }
    }

    fn v2_segment(&self) -> &'static str {
        match self {
            Self::Followers => "followers",
            Self::Friends => "following",
        }
    }

    fn v1_ids_endpoint(&self) -> &'static str {
        match self {
            Self::Followers => "https://api.twitter.com/1.1/followers/ids.json",
            Self::Friends => "https://api.twitter.com/1.1/friends/ids.json",
        }
    }
}

/// One related account from the full endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedAccount {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub public_metrics: PublicMetrics,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
}

#[derive(Debug, Deserialize)]
struct RelationPage {
    #[serde(default)]
    data: Vec<RelatedAccount>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    next_token: Option<String>,
}

#[derive(Clone)]
struct RelationPageRequest {
    target: String,
    pagination_token: Option<String>,
}

struct RelationPager<'a> {
    client: &'a Client,
    kind: RelationKind,
}

impl PageTurner<RelationPageRequest> for RelationPager<'_> {
    type PageItems = Vec<RelatedAccount>;
    type PageError = TwitterError;

    async fn turn_page(
        &self,
        mut request: RelationPageRequest,
    ) -> TurnedPageResult<Self, RelationPageRequest> {
        let response = self.get_page(&request).await?;
        match response.meta.next_token {
            Some(token) => {
                request.pagination_token = Some(token);
                Ok(TurnedPage::next(response.data, request))
            }
            None => Ok(TurnedPage::last(response.data)),
        }
    }
}

impl RelationPager<'_> {
    async fn get_page(&self, request: &RelationPageRequest) -> Result<RelationPage, TwitterError> {
        let url = format!(
            "https://api.twitter.com/2/users/{}/{}",
            request.target,
            self.kind.v2_segment()
        );
        let max_results = FULL_PAGE_SIZE.to_string();

        loop {
            let mut query = vec![
                ("max_results", max_results.as_str()),
                ("user.fields", "public_metrics,created_at"),
            ];
            if let Some(token) = &request.pagination_token {
                query.push(("pagination_token", token.as_str()));
            }

            let resp = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| TwitterError::Request {
                    target: request.target.clone(),
                    source: e,
                })?;

            if let Some(duration) = check_rate_limit(&resp) {
                tracing::info!(target_id = %request.target, ?duration, "rate limit hit, sleeping");
                sleep(duration).await;
                continue;
            }

            if !resp.status().is_success() {
                return Err(TwitterError::Api {
                    target: request.target.clone(),
                    status: resp.status().as_u16(),
                });
            }

            return resp.json().await.map_err(|e| TwitterError::Parse {
                target: request.target.clone(),
                msg: e.to_string(),
            });
        }
    }
}

/// Pull related accounts for one target with full per-account fields,
/// stopping once `max_pull` accounts have been kept.
pub(crate) async fn related_accounts(
    client: &Client,
    target: &str,
    kind: RelationKind,
    max_pull: usize,
) -> Result<Vec<RelatedAccount>, TwitterError> {
    let pager = RelationPager { client, kind };
    let request = RelationPageRequest {
        target: target.to_owned(),
        pagination_token: None,
    };

    let mut accounts = Vec::new();
    let pages = pager.pages(request);
    pin_mut!(pages);
    while let Some(page) = pages.try_next().await? {
        if absorb_page(&mut accounts, page, max_pull) {
            break;
        }
    }
    Ok(accounts)
}

/// Pull related account IDs for one target via the v1.1 endpoint, which
/// serves larger pages but no per-account fields.
pub(crate) async fn related_ids(
    client: &Client,
    target: &str,
    kind: RelationKind,
    max_pull: usize,
) -> Result<Vec<String>, TwitterError> {
    #[derive(Debug, Deserialize)]
    struct IdsPage {
        #[serde(default)]
        ids: Vec<String>,
        #[serde(default)]
        next_cursor: i64,
    }

    let count = MINIMAL_PAGE_SIZE.to_string();
    let mut ids = Vec::new();
    let mut cursor: i64 = -1;

    loop {
        let cursor_param = cursor.to_string();
        let resp = client
            .get(kind.v1_ids_endpoint())
            .query(&[
                ("screen_name", target),
                ("stringify_ids", "true"),
                ("count", count.as_str()),
                ("cursor", cursor_param.as_str()),
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

        let page: IdsPage = resp.json().await.map_err(|e| TwitterError::Parse {
            target: target.to_owned(),
            msg: e.to_string(),
        })?;

        let done = absorb_page(&mut ids, page.ids, max_pull);
        if done || page.next_cursor == 0 {
            break;
        }
        cursor = page.next_cursor;
    }

    Ok(ids)
}

/// Extend `acc` with one page of items, capping at `max_pull`. Returns true
/// once the ceiling is reached.
fn absorb_page<T>(acc: &mut Vec<T>, page: Vec<T>, max_pull: usize) -> bool {
    acc.extend(page);
    if acc.len() >= max_pull {
        acc.truncate(max_pull);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_page_never_exceeds_ceiling() {
        let mut acc: Vec<u32> = Vec::new();
        let pages = vec![(0..40).collect::<Vec<_>>(), (40..80).collect(), (80..120).collect()];
        let mut stopped = false;
        for page in pages {
            if absorb_page(&mut acc, page, 100) {
                stopped = true;
                break;
            }
        }
        assert!(stopped);
        assert_eq!(acc.len(), 100);
        assert_eq!(acc[99], 99);
    }

    #[test]
    fn absorb_page_keeps_partial_pages_below_ceiling() {
        let mut acc: Vec<u32> = Vec::new();
        assert!(!absorb_page(&mut acc, vec![1, 2, 3], 100));
        assert_eq!(acc, vec![1, 2, 3]);
    }

    #[test]
    fn parse_full_relation_page() {
        let json = r#"{
            "data": [
                {
                    "id": "2244994945",
                    "username": "TwitterDev",
                    "created_at": "2013-12-14T04:35:55.000Z",
                    "public_metrics": {
                        "followers_count": 507902,
                        "following_count": 1863,
                        "tweet_count": 3561,
                        "listed_count": 1550
                    }
                }
            ],
            "meta": {"result_count": 1, "next_token": "DFEDBNRFT3MHCZZZ"}
        }"#;
        let page: RelationPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].username, "TwitterDev");
        assert_eq!(page.data[0].public_metrics.followers_count, 507902);
        assert_eq!(page.meta.next_token.as_deref(), Some("DFEDBNRFT3MHCZZZ"));
    }

    #[test]
    fn parse_relation_page_without_data() {
        let json = r#"{"meta": {"result_count": 0}}"#;
        let page: RelationPage = serde_json::from_str(json).unwrap();
        assert!(page.data.is_empty());
        assert!(page.meta.next_token.is_none());
    }

    #[test]
    fn relation_kind_names() {
        assert_eq!(RelationKind::Followers.as_str(), "followers");
        assert_eq!(RelationKind::Friends.as_str(), "friends");
        assert_eq!(RelationKind::Friends.v2_segment(), "following");
    }
}
