use std::future::Future;

use twitter::TwitterError;

/// How many times a whole-target fetch is attempted before a failure
/// outcome is recorded.
pub const MAX_ATTEMPTS: usize = 4;

/// Run `op` up to [`MAX_ATTEMPTS`] times. The Err value is the final
/// error's numeric code. Auth rejections bail out immediately since
/// retrying them cannot help.
pub async fn with_retries<T, F, Fut>(target: &str, mut op: F) -> Result<T, u16>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TwitterError>>,
{
    let mut code = 0;
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::info!(target_id = %target, error = %err, attempt, "fetch attempt failed");
                code = err.code();
                if code == 401 {
                    break;
                }
            }
        }
    }
    Err(code)
}
