//! Adapter invocation boundary.
//!
//! Every call into an exchange adapter goes through [`invoke`], which applies
//! the per-call timeout and logs the provider, method and elapsed time. A
//! failing adapter comes back as an `Err` value here; nothing above this
//! boundary has to guard against one provider aborting a multi-provider run.

use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::MarketDataError;

/// Run one adapter call under `timeout`.
pub async fn invoke<T, F>(
    provider: &str,
    method: &str,
    timeout: Duration,
    call: F,
) -> Result<T, MarketDataError>
where
    F: Future<Output = Result<T, MarketDataError>>,
{
    let started = Instant::now();
    debug!("Api: {} {}", provider, method);

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => {
            debug!(
                "Api finished @ {:?} : {} {}",
                started.elapsed(),
                provider,
                method
            );
            Ok(value)
        }
        Ok(Err(MarketDataError::Timeout { provider, method, .. })) => {
            let elapsed = started.elapsed();
            warn!("Api timed out @ {:?} : {} {}", elapsed, provider, method);
            Err(MarketDataError::Timeout {
                provider,
                method,
                elapsed,
            })
        }
        Ok(Err(e)) => {
            warn!(
                "Api failed @ {:?} : {} {} - {}",
                started.elapsed(),
                provider,
                method,
                e
            );
            Err(e)
        }
        Err(_) => {
            let elapsed = started.elapsed();
            warn!("Api timed out @ {:?} : {} {}", elapsed, provider, method);
            Err(MarketDataError::Timeout {
                provider: provider.to_string(),
                method: method.to_string(),
                elapsed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let value = invoke("exmo", "get_pricing", Duration::from_secs(1), async {
            Ok::<_, MarketDataError>(42)
        })
        .await;
        assert_eq!(value, Ok(42));
    }

    #[tokio::test]
    async fn test_slow_call_becomes_timeout() {
        let result = invoke("exmo", "get_asset_pairs", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, MarketDataError>(())
        })
        .await;

        match result {
            Err(MarketDataError::Timeout {
                provider, method, ..
            }) => {
                assert_eq!(provider, "exmo");
                assert_eq!(method, "get_asset_pairs");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_adapter_error_is_returned() {
        let result: Result<(), _> = invoke("exmo", "get_pricing", Duration::from_secs(1), async {
            Err(MarketDataError::response("exmo", "get_pricing", "No tickers returned"))
        })
        .await;
        assert!(matches!(
            result,
            Err(MarketDataError::ProviderResponse { .. })
        ));
    }
}
