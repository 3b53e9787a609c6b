//! Run-wide cancellation signal.
//!
//! A [`CancelToken`] is cloned into the dispatcher, every worker and the
//! signal handler. Raising it sets a flag and disconnects a message-less
//! channel, so every worker blocked in `select!` wakes at once.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
    rx: Receiver<()>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    // Never sends; dropping it disconnects every receiver clone.
    tx: Mutex<Option<Sender<()>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        }
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("Cancellation raised");
        let sender = match self.inner.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Channel that becomes ready (disconnected) once cancelled.
    ///
    /// Meant for `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_receiver_wakes_blocked_thread() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.receiver().recv().is_err());
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap(), "recv should report disconnection");
    }
}
