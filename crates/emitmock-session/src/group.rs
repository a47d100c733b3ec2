//! Structured fan-out/fan-in with cancellation on the first error.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A set of tasks sharing one cancellation scope.
///
/// The first task to fail records its error and cancels the scope; errors
/// arriving later are dropped. [`TaskGroup::wait`] joins every task before
/// returning, so nothing spawned here outlives it.
pub struct TaskGroup<E> {
    token: CancellationToken,
    tasks: JoinSet<()>,
    first: Arc<Mutex<Option<E>>>,
}

impl<E> TaskGroup<E>
where
    E: Send + 'static,
{
    /// Create a group whose scope is a child of `parent`.
    ///
    /// Cancelling `parent` cancels the group; the group never cancels `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: JoinSet::new(),
            first: Arc::new(Mutex::new(None)),
        }
    }

    /// The group's cancellation scope.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of tasks not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `task` inside the group.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let token = self.token.clone();
        let first = Arc::clone(&self.first);
        self.tasks.spawn(async move {
            if let Err(err) = task.await {
                let mut slot = first.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(err);
                } else {
                    debug!("dropping error reported after the first");
                }
                drop(slot);
                token.cancel();
            }
        });
    }

    /// Join every task and return the first error, if any.
    ///
    /// A panicking task is resumed on the caller once its siblings have been
    /// cancelled and joined.
    pub async fn wait(mut self) -> Result<(), E> {
        let mut panic = None;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    self.token.cancel();
                    panic.get_or_insert(err.into_panic());
                }
            }
        }
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        let first = self
            .first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
