//! Bounded waits on external collaborators.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use kgraph_core::KgError;

/// Await `call` for at most `limit`.
///
/// A timeout or an error is logged and replaced by `fallback()`, so the
/// caller always gets a value and never waits longer than `limit`.
pub async fn or_fallback<T, F>(
    limit: Duration,
    what: &str,
    call: F,
    fallback: impl FnOnce() -> T,
) -> T
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            let err = KgError::ExtractionFailed(format!("{:#}", err));
            warn!(what, error = %err, "Collaborator failed, using fallback");
            fallback()
        }
        Err(_) => {
            let err = KgError::ExtractionTimeout(limit);
            warn!(what, error = %err, "Collaborator timed out, using fallback");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_passes_through() {
        let out = or_fallback(Duration::from_secs(1), "test", async { Ok::<_, anyhow::Error>(7) }, || 0).await;
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_error_uses_fallback() {
        let out = or_fallback(
            Duration::from_secs(1),
            "test",
            async { Err::<i32, _>(anyhow::anyhow!("boom")) },
            || -1,
        )
        .await;
        assert_eq!(out, -1);
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback_without_waiting() {
        let started = std::time::Instant::now();
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, anyhow::Error>("late")
        };
        let out = or_fallback(Duration::from_millis(20), "test", slow, || "fallback").await;

        assert_eq!(out, "fallback");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
