//! Single-assignment deferred values scheduled on a shared tokio runtime.
//!
//! A [`Task`] is a cloneable handle to a slot that moves from pending to
//! exactly one terminal outcome. Continuations (`transform`, `combine`,
//! `chain`) are spawned onto the same runtime and await their inputs, so
//! building a graph never blocks. Blocking is reserved for [`Task::force`]
//! and [`await_all`], which must only be called from threads that are not
//! runtime workers.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, join_all, try_join};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::{LifestyleError, Result};

type Slot<T> = Option<Result<T>>;

/// Execution substrate shared by every task in a graph.
#[derive(Clone, Debug)]
pub struct Pool {
    handle: Handle,
}

impl Pool {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Pool backed by the runtime the caller is running on.
    ///
    /// Panics when called outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Runs synchronous, possibly slow `work` on the runtime's blocking
    /// threads and returns a pending task immediately.
    pub fn schedule<T, W>(&self, label: &'static str, work: W) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
        W: FnOnce() -> Result<T> + Send + 'static,
    {
        let (completer, task) = Task::pending(label, self.clone());
        debug!(task = label, "scheduled");
        self.handle.spawn_blocking(move || completer.complete(work()));
        task
    }

    pub fn fulfilled<T>(&self, label: &'static str, value: T) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (completer, task) = Task::pending(label, self.clone());
        completer.complete(Ok(value));
        task
    }

    pub fn failed<T>(&self, label: &'static str, error: LifestyleError) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (completer, task) = Task::pending(label, self.clone());
        completer.complete(Err(error));
        task
    }

    fn continuation<T, Fut>(&self, label: &'static str, body: Fut) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (completer, task) = Task::pending(label, self.clone());
        self.handle.spawn(async move { completer.complete(body.await) });
        task
    }
}

/// Write side of a task slot. Consumed by its single write; dropping it
/// unwritten (a panicking producer) leaves readers with `Abandoned`.
struct Completer<T> {
    label: &'static str,
    tx: watch::Sender<Slot<T>>,
}

impl<T> Completer<T> {
    fn complete(self, outcome: Result<T>) {
        match &outcome {
            Ok(_) => debug!(task = self.label, "fulfilled"),
            Err(err @ LifestyleError::CombinationFailure { .. }) => {
                debug!(task = self.label, error = %err, "failed upstream")
            }
            Err(err) => warn!(task = self.label, error = %err, "failed"),
        }
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        });
    }
}

pub struct Task<T> {
    label: &'static str,
    state: watch::Receiver<Slot<T>>,
    pool: Pool,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            state: self.state.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            None => "pending",
            Some(Ok(_)) => "fulfilled",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Task")
            .field("label", &self.label)
            .field("state", &state)
            .finish()
    }
}

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn pending(label: &'static str, pool: Pool) -> (Completer<T>, Task<T>) {
        let (tx, state) = watch::channel(None);
        (Completer { label, tx }, Task { label, state, pool })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Current outcome without waiting; `None` while pending.
    pub fn peek(&self) -> Option<Result<T>> {
        (*self.state.borrow()).clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Waits for the terminal outcome without blocking the thread.
    pub async fn join(&self) -> Result<T> {
        let mut state = self.state.clone();
        let outcome = match state.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(LifestyleError::Abandoned(self.label)))
    }

    /// Waits for any terminal state, discarding the outcome.
    pub async fn settled(&self) {
        let _ = self.join().await;
    }

    /// Blocks the calling thread until the task is terminal.
    ///
    /// Never call this from work running on the task's own runtime: a
    /// blocked worker cannot drive the continuations it is waiting for.
    pub fn force(&self) -> Result<T> {
        if Handle::try_current().is_ok() {
            warn!(task = self.label, "force called from inside a runtime context");
        }
        futures::executor::block_on(self.join())
    }

    pub fn transform<U, F>(&self, label: &'static str, f: F) -> Task<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let input = self.clone();
        self.pool.continuation(label, async move {
            let value = input
                .join()
                .await
                .map_err(|err| LifestyleError::upstream(label, err))?;
            f(value)
        })
    }

    /// Joins two tasks; `f` runs only once both are fulfilled.
    pub fn combine<U, V, F>(&self, label: &'static str, other: &Task<U>, f: F) -> Task<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: FnOnce(T, U) -> Result<V> + Send + 'static,
    {
        let (left, right) = (self.clone(), other.clone());
        self.pool.continuation(label, async move {
            let (a, b) = try_join(left.join(), right.join())
                .await
                .map_err(|err| LifestyleError::upstream(label, err))?;
            f(a, b)
        })
    }

    /// Continues with a task produced from this task's value, flattening the
    /// result.
    pub fn chain<U, F>(&self, label: &'static str, f: F) -> Task<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Task<U> + Send + 'static,
    {
        let input = self.clone();
        self.pool.continuation(label, async move {
            let value = input
                .join()
                .await
                .map_err(|err| LifestyleError::upstream(label, err))?;
            f(value)
                .join()
                .await
                .map_err(|err| LifestyleError::upstream(label, err))
        })
    }

    /// Runs `observer` once the task is terminal. The observer cannot affect
    /// the task or anything downstream of it.
    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        let task = self.clone();
        self.pool.handle.spawn(async move {
            let outcome = task.join().await;
            observer(&outcome);
        });
    }
}

/// Type-erased view of a task for waiting on heterogeneous sets.
pub trait Settle {
    fn settled_boxed(&self) -> BoxFuture<'static, ()>;
}

impl<T> Settle for Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn settled_boxed(&self) -> BoxFuture<'static, ()> {
        let task = self.clone();
        async move { task.settled().await }.boxed()
    }
}

/// Blocks until every task has reached a terminal state.
///
/// Same threading rule as [`Task::force`].
pub fn await_all(tasks: &[&dyn Settle]) {
    let pending: Vec<_> = tasks.iter().map(|task| task.settled_boxed()).collect();
    futures::executor::block_on(join_all(pending));
}
