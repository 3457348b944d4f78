//! Disposal contracts for host objects.
//!
//! Synchronous disposal returns its outcome directly. Asynchronous disposal
//! returns a [`DisposalTask`], a one-shot completion channel the caller may
//! wait on or detach.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};

use crate::errors::EvalError;

/// Synchronous disposal.
pub trait Dispose: Send + Sync {
    fn dispose(&self) -> Result<(), EvalError>;
}

/// Asynchronous disposal.
pub trait AsyncDispose: Send + Sync {
    /// Start disposal. The returned task completes when the object has
    /// released its resources.
    fn dispose_async(&self) -> DisposalTask;
}

/// Pending outcome of an asynchronous disposal.
#[derive(Debug)]
pub struct DisposalTask {
    rx: Receiver<Result<(), EvalError>>,
}

/// Completing side of a [`DisposalTask`].
#[derive(Debug)]
pub struct DisposalCompleter {
    tx: Sender<Result<(), EvalError>>,
}

impl DisposalTask {
    /// Create a task together with the handle that completes it.
    pub fn pending() -> (DisposalCompleter, DisposalTask) {
        let (tx, rx) = bounded(1);
        (DisposalCompleter { tx }, DisposalTask { rx })
    }

    /// A task that has already finished.
    pub fn completed(result: Result<(), EvalError>) -> DisposalTask {
        let (completer, task) = DisposalTask::pending();
        completer.complete(result);
        task
    }

    /// Non-blocking check for the outcome.
    ///
    /// Returns `None` while the task is still running.
    pub fn try_wait(&self) -> Option<Result<(), EvalError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(abandoned())),
        }
    }

    /// Block until the disposal finishes.
    pub fn wait(self) -> Result<(), EvalError> {
        self.rx.recv().unwrap_or_else(|_| Err(abandoned()))
    }

    /// True once an outcome is available.
    pub fn is_complete(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl DisposalCompleter {
    /// Publish the outcome. Dropping the completer without calling this
    /// completes the task with an error.
    pub fn complete(self, result: Result<(), EvalError>) {
        // The task may already have been detached.
        let _ = self.tx.send(result);
    }
}

#[cold]
fn abandoned() -> EvalError {
    EvalError::new("asynchronous disposal was abandoned before completing")
}
