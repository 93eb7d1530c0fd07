//! Polling until an asynchronous cloud operation settles

use std::future::Future;
use std::time::Duration;

use log::debug;
use mgc_core::provider::{ProviderError, ProviderResult};
use tokio::time::Instant;

use super::errors::sdk_error;

/// How often and for how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Outcome of inspecting one polled value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Ready,
    Pending,
    Failed(String),
}

/// Fetch repeatedly until `check` reports [`Poll::Ready`]
///
/// Returns the last fetched value. SDK errors abort immediately.
pub async fn wait_for<T, F, Fut, C>(
    config: &WaitConfig,
    what: &str,
    mut fetch: F,
    check: C,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = mgc_sdk::Result<T>>,
    C: Fn(&T) -> Poll,
{
    let deadline = Instant::now() + config.timeout;
    loop {
        let value = fetch().await.map_err(sdk_error)?;
        match check(&value) {
            Poll::Ready => return Ok(value),
            Poll::Failed(reason) => {
                return Err(ProviderError::new(format!("{} failed", what)).with_detail(reason));
            }
            Poll::Pending => {}
        }
        if Instant::now() >= deadline {
            return Err(ProviderError::new(format!("Timed out waiting for {}", what))
                .with_detail(format!("still pending after {:?}", config.timeout)));
        }
        debug!("waiting for {}", what);
        tokio::time::sleep(config.interval).await;
    }
}
