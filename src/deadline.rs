//! Deadline enforcement for individual render stages.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{RenderError, Result};

/// Races `operation` against a timer of `limit`.
///
/// The operation is spawned onto the runtime, so a fired deadline abandons
/// its result rather than cancelling the work; whatever the operation was
/// doing keeps running detached and the failure path is responsible for
/// tearing down any resources it holds. The timer is released on both
/// outcomes, and guards nest freely.
pub async fn with_deadline<T, F>(
    operation: F,
    limit: Duration,
    message: impl Into<String>,
) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let mut task = tokio::spawn(operation);
    match timeout(limit, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(RenderError::engine(format!(
            "render stage aborted: {join_err}"
        ))),
        Err(_) => Err(RenderError::Timeout(message.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn returns_result_when_operation_settles_in_time() {
        let value = with_deadline(
            async { Ok::<_, RenderError>(42) },
            Duration::from_secs(1),
            "should not fire",
        )
        .await
        .unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn propagates_operation_errors_unchanged() {
        let err = with_deadline(
            async { Err::<(), _>(RenderError::engine("target crashed")) },
            Duration::from_secs(1),
            "should not fire",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RenderError::Engine(_)));
    }

    #[tokio::test]
    async fn fails_with_supplied_message_when_deadline_fires() {
        let start = Instant::now();
        let err = with_deadline(
            futures::future::pending::<Result<()>>(),
            Duration::from_millis(20),
            "content load exceeded budget",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RenderError::Timeout(_)));
        assert_eq!(format!("{}", err), "content load exceeded budget");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn timed_out_operation_keeps_running_detached() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let err = with_deadline(
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = tx.send(());
                Ok::<_, RenderError>(())
            },
            Duration::from_millis(5),
            "too slow",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));

        // The spawned operation outlives the guard and still completes.
        rx.await.expect("operation should have kept running");
    }

    #[tokio::test]
    async fn repeated_guards_do_not_interfere() {
        for _ in 0..32 {
            let value = with_deadline(
                async { Ok::<_, RenderError>("ok") },
                Duration::from_millis(50),
                "per-iteration deadline",
            )
            .await
            .unwrap();
            assert_eq!(value, "ok");
        }
    }
}
