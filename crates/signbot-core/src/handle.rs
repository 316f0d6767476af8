//! A cloneable handle for poking the engine from the presentation layer.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for aborting the in-flight run and checking whether
/// one is in progress.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct ChatHandle {
    cancel: Arc<Mutex<CancellationToken>>,
    is_running: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the current run. Text received so far is kept.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a turn is being processed.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Mark a turn as started with a fresh cancellation token. Running state
    /// is cleared when the guard drops, including when the turn's future is
    /// dropped mid-flight.
    pub(crate) fn begin(&self) -> (RunningGuard, CancellationToken) {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        self.is_running.store(true, Ordering::Release);
        (
            RunningGuard {
                handle: self.clone(),
            },
            token,
        )
    }
}

pub(crate) struct RunningGuard {
    handle: ChatHandle,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.handle.is_running.store(false, Ordering::Release);
    }
}
