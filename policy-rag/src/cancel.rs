//! Cooperative cancellation for gateway and store calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{PolicyError, Result};

/// Run `call` unless `cancel` has fired, aborting it as soon as `cancel` fires.
///
/// Cancellation wins over a result that becomes ready at the same time.
pub(crate) async fn run_cancellable<F, T>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(PolicyError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PolicyError::Cancelled),
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn skips_call_when_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_cancellable(&cancel, async { Ok(1) }).await;
        assert!(matches!(result, Err(PolicyError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn aborts_in_flight_call() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let result = run_cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(PolicyError::Cancelled)));
    }

    #[tokio::test]
    async fn passes_results_through() {
        let cancel = CancellationToken::new();
        assert_eq!(run_cancellable(&cancel, async { Ok(7) }).await.unwrap(), 7);
    }
}
