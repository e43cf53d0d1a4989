// ── Reactive state stream ──
//
// Subscription over the coordinator's published `MergedState`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::MergedState;

/// A subscription to the merged state.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct StateStream {
    current: Arc<MergedState>,
    receiver: watch::Receiver<Arc<MergedState>>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<MergedState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time, or at the last `changed()`.
    pub fn current(&self) -> &Arc<MergedState> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<MergedState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<MergedState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream`. The first item is the current snapshot.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<Arc<MergedState>>,
}

impl Stream for StateWatchStream {
    type Item = Arc<MergedState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
