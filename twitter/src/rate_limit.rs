use std::time::UNIX_EPOCH;

use reqwest::{Response, StatusCode};
use tokio::time::Duration;

static RESET_HEADER: &str = "x-rate-limit-reset";

/// Returns how long to sleep when `resp` is a rate-limit rejection, None
/// otherwise.
pub(crate) fn check_rate_limit(resp: &Response) -> Option<Duration> {
    if resp.status() != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let rate_reset_at = resp.headers().get(RESET_HEADER)?.to_str().ok()?;
    let reset = Duration::from_secs(rate_reset_at.parse::<u64>().ok()?);
    Some(reset.saturating_sub(UNIX_EPOCH.elapsed().ok()?))
}
