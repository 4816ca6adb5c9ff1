// Bounded execution for calls into external collaborators

use std::future::Future;
use std::time::Duration;

/// Elapsed deadline for a named dependency call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} timed out after {elapsed_ms}ms")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub elapsed_ms: u128,
}

/// Run a fallible dependency call with an upper bound on its duration
///
/// The inner error is converted into the caller's error type; an elapsed
/// deadline is converted through `From<DeadlineExceeded>`.
pub async fn bounded<T, E, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Dependency call '{}' exceeded {:?}", operation, limit);
            Err(E::from(DeadlineExceeded {
                operation,
                elapsed_ms: limit.as_millis(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Inner,
        Timeout(&'static str),
    }

    impl From<DeadlineExceeded> for TestError {
        fn from(err: DeadlineExceeded) -> Self {
            TestError::Timeout(err.operation)
        }
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result: Result<u32, TestError> =
            bounded("fast", Duration::from_millis(100), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        let result: Result<u32, TestError> =
            bounded("failing", Duration::from_millis(100), async { Err(TestError::Inner) }).await;
        assert_eq!(result, Err(TestError::Inner));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result: Result<u32, TestError> = bounded("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(1)
        })
        .await;
        assert_eq!(result, Err(TestError::Timeout("slow")));
    }
}
