//! Serialized execution context for host state.
//!
//! Every command the bridge receives is marshalled onto a single work queue
//! that owns the host state. Callers block on a one-shot completion channel
//! until their job has run, so the state is only ever touched by one thread
//! and jobs observe each other in enqueue order.
//!
//! The queue supports two driving modes. A host with its own main loop calls
//! [`WorkQueue::run_pending`] once per tick. A host without one hands its
//! state to [`WorkQueue::spawn`], which drains jobs on a dedicated worker
//! thread until every [`HostHandle`] has been dropped.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;
use tracing::debug;

use super::HOST_TARGET;

const WORKER_THREAD_NAME: &str = "conduit-host";

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Errors surfaced while submitting work to the host context.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The host side of the queue has gone away.
    #[error("host execution context is closed")]
    Closed,
    /// The submitted job panicked while running.
    #[error("host job panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The worker thread could not be spawned.
    #[error("failed to spawn host worker thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

/// Creates a connected submit handle and host-side queue.
#[must_use]
pub fn work_queue<S>() -> (HostHandle<S>, WorkQueue<S>) {
    let (sender, receiver) = mpsc::channel();
    (HostHandle { sender }, WorkQueue { receiver })
}

/// Submit side of the host work queue.
///
/// Handles are cheap to clone and may be shared across threads. Calling
/// [`HostHandle::call`] from inside a running job deadlocks, because the
/// queue only runs one job at a time.
pub struct HostHandle<S> {
    sender: mpsc::Sender<Job<S>>,
}

impl<S> Clone for HostHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S> std::fmt::Debug for HostHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle").finish_non_exhaustive()
    }
}

impl<S> HostHandle<S> {
    /// Runs `job` inside the host context and waits for its result.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Closed`] when the queue has been dropped
    /// before the job ran, and [`ExecutorError::Panicked`] when the job
    /// panicked. A panicking job does not take the host context down.
    pub fn call<F, R>(&self, job: F) -> Result<R, ExecutorError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (complete, completion) = mpsc::sync_channel::<Result<R, String>>(1);
        let boxed: Job<S> = Box::new(move |state: &mut S| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(state)))
                .map_err(|payload| panic_message(payload.as_ref()));
            // The caller may have given up waiting; nothing to report then.
            let _ = complete.send(outcome);
        });
        self.sender.send(boxed).map_err(|_| ExecutorError::Closed)?;
        match completion.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(ExecutorError::Panicked { message }),
            Err(_) => Err(ExecutorError::Closed),
        }
    }
}

/// Host side of the work queue.
pub struct WorkQueue<S> {
    receiver: mpsc::Receiver<Job<S>>,
}

impl<S> std::fmt::Debug for WorkQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").finish_non_exhaustive()
    }
}

impl<S> WorkQueue<S> {
    /// Runs every job queued so far without blocking.
    ///
    /// Returns the number of jobs executed.
    pub fn run_pending(&self, state: &mut S) -> usize {
        let mut executed = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job(state);
            executed += 1;
        }
        executed
    }

    /// Runs jobs until every submit handle has been dropped.
    pub fn run(self, state: &mut S) {
        for job in self.receiver {
            job(state);
        }
        debug!(target: HOST_TARGET, "host work queue drained");
    }

    /// Moves `state` onto a dedicated worker thread that drains the queue.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Spawn`] when the thread cannot be created.
    pub fn spawn(self, mut state: S) -> Result<WorkerHandle<S>, ExecutorError>
    where
        S: Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                self.run(&mut state);
                state
            })
            .map_err(|source| ExecutorError::Spawn { source })?;
        Ok(WorkerHandle { handle })
    }
}

/// Join handle for a spawned host worker.
#[derive(Debug)]
pub struct WorkerHandle<S> {
    handle: thread::JoinHandle<S>,
}

impl<S> WorkerHandle<S> {
    /// Waits for the worker to finish and returns the final host state.
    ///
    /// The worker only exits once every [`HostHandle`] has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Panicked`] if the worker thread panicked.
    pub fn join(self) -> Result<S, ExecutorError> {
        self.handle.join().map_err(|payload| ExecutorError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
