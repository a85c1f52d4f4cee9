use std::time::Duration;

use packread_types::cancel::CancelToken;
use packread_types::error::LoadError;

use crate::RetryConfig;

/// Retry a range load on transient [`LoadError`]s with exponential backoff + jitter.
///
/// Every attempt must re-issue the identical request. Permanent errors and
/// errors after the last allowed attempt are returned as-is. No further
/// attempt is made once `cancel` fires.
pub fn retry_load<T>(
    config: &RetryConfig,
    op_name: &str,
    cancel: &CancelToken,
    mut f: impl FnMut() -> std::result::Result<T, LoadError>,
) -> std::result::Result<T, LoadError> {
    let mut delay_ms = config.retry_delay_ms;
    let mut attempt = 0;

    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if e.is_retryable() && attempt < config.max_retries && !cancel.is_cancelled() => {
                attempt += 1;
                tracing::warn!(
                    "{op_name}: transient error (attempt {attempt}/{}), retrying: {e}",
                    config.max_retries,
                );
                if delay_ms > 0 {
                    let jitter = rand::random::<u64>() % delay_ms;
                    std::thread::sleep(Duration::from_millis(delay_ms + jitter));
                }
                delay_ms = delay_ms.saturating_mul(2).min(config.retry_max_delay_ms);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Whether an I/O error is transient and worth retrying.
pub fn is_retryable_io(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
    )
}

/// Wrap an I/O error as a [`LoadError`], classified by [`is_retryable_io`].
pub fn classify_io(err: std::io::Error) -> LoadError {
    if is_retryable_io(&err) {
        LoadError::transient(err)
    } else {
        LoadError::permanent(err)
    }
}
