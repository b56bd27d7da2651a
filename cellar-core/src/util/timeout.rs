//! Bounded waits.

use std::time::Duration;

use crate::error::{Error, Result};

/// Reason carried by [`Error::Timeout`] when none is configured.
pub const DEFAULT_TIMEOUT_REASON: &str = "Timeout";

/// Sleep for `duration`, then resolve or fail.
///
/// With `throw_on_timeout` the result is [`Error::Timeout`] carrying `reason`
/// (or [`DEFAULT_TIMEOUT_REASON`]); otherwise it is `Ok(())`.
pub async fn promise_timeout(
    duration: Duration,
    throw_on_timeout: bool,
    reason: Option<&str>,
) -> Result<()> {
    tokio::time::sleep(duration).await;

    if throw_on_timeout {
        Err(Error::Timeout {
            reason: reason.unwrap_or(DEFAULT_TIMEOUT_REASON).to_string(),
        })
    } else {
        Ok(())
    }
}
