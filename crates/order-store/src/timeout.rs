use std::future::Future;
use std::time::Duration;

use crate::{Result, StoreError};

/// Runs a store call, failing with [`StoreError::Timeout`] if it does not
/// finish within `duration`.
///
/// The inner future is dropped on timeout. Callers that already mutated
/// external state before the call must compensate themselves.
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("store_timeouts_total").increment(1);
            tracing::warn!(timeout_ms = duration.as_millis() as u64, "store call timed out");
            Err(StoreError::Timeout(duration))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<()> = with_timeout(Duration::from_secs(1), async {
            Err(StoreError::UnplacedOrder)
        })
        .await;
        assert!(matches!(result, Err(StoreError::UnplacedOrder)));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_millis(10)));
    }
}
