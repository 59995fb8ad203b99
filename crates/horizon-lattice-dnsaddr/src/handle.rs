//! Background resolutions that can be cancelled.

use std::sync::Arc;

use multiaddr::Multiaddr;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Unique identifier for a background resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolveId(u64);

impl ResolveId {
    pub(crate) fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A handle to a resolution running on the tokio runtime.
///
/// Dropping the handle does not cancel the resolution; call
/// [`cancel`](Self::cancel) for that.
#[derive(Debug)]
pub struct ResolveHandle {
    /// The unique ID of this resolution.
    pub id: ResolveId,
    cancel_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    result_rx: oneshot::Receiver<Result<Vec<Multiaddr>>>,
}

impl ResolveHandle {
    /// Spawn `resolution` and return a handle to it.
    pub(crate) fn spawn<F>(resolution: F) -> Self
    where
        F: Future<Output = Result<Vec<Multiaddr>>> + Send + 'static,
    {
        let id = ResolveId::new();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let cancel_tx = Arc::new(Mutex::new(Some(cancel_tx)));

        // The task keeps its own reference so the sender outlives the handle.
        let task_cancel_tx = Arc::clone(&cancel_tx);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = resolution => result,
                _ = cancel_rx => Err(Error::Cancelled),
            };
            task_cancel_tx.lock().take();

            if outcome.as_ref().is_err_and(|e| *e == Error::Cancelled) {
                tracing::debug!(
                    target: "horizon_lattice_dnsaddr::handle",
                    id = id.0,
                    "Resolution cancelled"
                );
            }
            let _ = result_tx.send(outcome);
        });

        Self {
            id,
            cancel_tx,
            result_rx,
        }
    }

    /// Cancel the resolution.
    ///
    /// Returns `true` if the cancellation signal was sent, `false` if the
    /// resolution has already completed or was already cancelled.
    pub fn cancel(&self) -> bool {
        if let Some(tx) = self.cancel_tx.lock().take() {
            tx.send(()).is_ok()
        } else {
            false
        }
    }

    /// Check if the resolution is still running.
    pub fn is_pending(&self) -> bool {
        self.cancel_tx.lock().is_some()
    }

    /// Wait for the resolution to finish.
    pub async fn join(self) -> Result<Vec<Multiaddr>> {
        self.result_rx.await.unwrap_or(Err(Error::Cancelled))
    }
}
