//! Latest-snapshot cache and state callback slot.
//!
//! The cache holds at most one [`StateSnapshot`]: the most recently received.
//! Only the receive task writes it. Every replacement is a whole-snapshot
//! swap of an `Arc`, so readers never see a half-updated state and never
//! block the writer for longer than a pointer swap.
//!
//! The cache is a `tokio::sync::watch` channel, which doubles as the
//! "new state arrived" notification used by [`crate::Session::wait_for_state`].

use std::{
    error::Error,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
};

use flightlink_proto::StateSnapshot;
use tokio::sync::watch;
use tracing::warn;

/// Error a state callback may return. Logged and otherwise ignored.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// Function invoked on the receive task for every state update.
pub type StateCallback = Arc<dyn Fn(&StateSnapshot) -> Result<(), CallbackError> + Send + Sync>;

/// Single-writer, many-reader cell holding the newest snapshot.
#[derive(Debug)]
pub struct StateCache {
    tx: watch::Sender<Option<Arc<StateSnapshot>>>,
}

impl StateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Newest snapshot, or `None` if no state has arrived yet.
    pub fn latest(&self) -> Option<Arc<StateSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Subscribe to replacements. The current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<StateSnapshot>>> {
        self.tx.subscribe()
    }

    /// Wait until the cache holds a snapshot, returning it.
    pub async fn first(&self) -> Arc<StateSnapshot> {
        let mut rx = self.subscribe();
        loop {
            if let Some(snapshot) = rx.borrow_and_update().clone() {
                return snapshot;
            }
            // The sender lives as long as `self`, so `changed` cannot fail here.
            let _ = rx.changed().await;
        }
    }

    /// Swap in a new snapshot and wake every waiter.
    pub(crate) fn replace(&self, snapshot: StateSnapshot) -> Arc<StateSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the optional state callback.
///
/// The lock is held only to clone or swap the `Arc`; the callback itself runs
/// outside it, so a slow callback never blocks `set`/`clear` for long and a
/// callback may replace itself.
#[derive(Default)]
pub(crate) struct CallbackSlot(Mutex<Option<StateCallback>>);

impl CallbackSlot {
    pub(crate) fn set(&self, callback: StateCallback) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn current(&self) -> Option<StateCallback> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Run the callback, if any. Errors and panics are logged and swallowed.
    pub(crate) fn invoke(&self, snapshot: &StateSnapshot) {
        let Some(callback) = self.current() else {
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
            Ok(Ok(())) => {},
            Ok(Err(error)) => warn!(%error, time = snapshot.time, "state callback failed"),
            Err(_) => warn!(time = snapshot.time, "state callback panicked"),
        }
    }
}

impl fmt::Debug for CallbackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self.0.lock().unwrap_or_else(PoisonError::into_inner).is_some();
        f.debug_struct("CallbackSlot").field("registered", &registered).finish()
    }
}
