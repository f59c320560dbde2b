//! Cancellation shared between the caller of `init` and the worker threads.

use crossbeam_channel::{at, bounded, never, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A cloneable cancellation signal with an optional deadline.
///
/// Cancelling drops the token's internal sender, which disconnects the receiver every clone
/// holds. Workers can poll [`CancelToken::is_cancelled`] or wait on [`CancelToken::receiver`]
/// and [`CancelToken::deadline`] inside a `select!`.
#[derive(Clone, Debug)]
pub struct CancelToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
    deadline: Option<Instant>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        CancelToken {
            trigger: Arc::new(Mutex::new(Some(tx))),
            signal: rx,
            deadline: None,
        }
    }

    /// A token that also cancels itself once `timeout` has passed
    pub fn with_deadline(timeout: Duration) -> Self {
        CancelToken {
            deadline: Some(Instant::now() + timeout),
            ..Self::new()
        }
    }

    /// Cancel this token and all of its clones
    pub fn cancel(&self) {
        if let Ok(mut trigger) = self.trigger.lock() {
            trigger.take();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return true;
        }
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Disconnects when the token is cancelled
    pub fn receiver(&self) -> &Receiver<()> {
        &self.signal
    }

    /// Fires once when the deadline passes, never without one
    pub fn deadline(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => at(deadline),
            None => never(),
        }
    }
}
