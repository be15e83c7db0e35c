//! Cancellation utilities.
//!
//! Provides first-class cancellation handles for event streams. An aborted
//! stream is a distinct terminal condition from natural completion and from
//! abrupt close, and is reported as such.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::WireError;
use crate::pipeline::EventStream;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. A wrapped stream observing this handle stops as
    /// soon as possible; dropping it releases the underlying source so the
    /// backend stops generating tokens.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Arm a guard bounding total stream duration: cancels automatically
    /// after `timeout` unless cancellation already happened.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => token.cancel(),
            }
        });
    }
}

/// Make an event stream cancellable and return its cancel handle.
///
/// On cancellation the stream yields a final `WireError::Cancelled` and ends;
/// a pending `next()` is woken immediately.
pub fn make_cancellable(stream: EventStream) -> (EventStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    yield Err(WireError::Cancelled);
                    break;
                }
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn cancel_wakes_pending_next_immediately() {
        // A stream that never yields and never ends.
        let pending: EventStream = Box::pin(futures_util::stream::pending());
        let (mut s, cancel) = make_cancellable(pending);

        let waiter = tokio::spawn(async move { (s.next().await, s.next().await) });

        // Give the task a chance to poll and block on `next()`.
        tokio::task::yield_now().await;

        cancel.cancel();

        let (first, second) = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");

        assert_eq!(first, Some(Err(WireError::Cancelled)));
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn cancel_after_fires_the_guard() {
        let pending: EventStream = Box::pin(futures_util::stream::pending());
        let (mut s, cancel) = make_cancellable(pending);
        cancel.cancel_after(Duration::from_millis(10));

        let item = tokio::time::timeout(Duration::from_millis(500), s.next())
            .await
            .expect("guard should fire");
        assert_eq!(item, Some(Err(WireError::Cancelled)));
    }
}
