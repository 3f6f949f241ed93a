// SPDX-License-Identifier: MIT

//! Memoized single-execution tasks
//!
//! A `SharedTask` runs its producer at most once, on its own tokio task, the
//! first time any dependent awaits it. Every dependent, including ones that
//! attach after completion, observes the same cached outcome.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;

use super::error::{ErrorKind, TaskError, TaskId};
use super::report::EventSender;

/// Outcome of a task
pub type TaskResult<T> = Result<T, TaskError>;

/// Handle to a memoized asynchronous computation
pub struct SharedTask<T> {
    id: TaskId,
    output: Shared<BoxFuture<'static, TaskResult<T>>>,
}

impl<T> SharedTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `producer` without reporting to any run.
    pub fn new<F>(id: impl Into<TaskId>, producer: F) -> Self
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        Self::build(id.into(), producer, None)
    }

    pub(crate) fn build<F>(id: TaskId, producer: F, events: Option<EventSender>) -> Self
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let job_id = id.clone();
        let job_events = events.clone();
        let job = async move {
            let outcome = producer.await.map_err(|e| e.within(&job_id));
            if let Some(events) = &job_events {
                events.task_finished(&job_id, &outcome);
            }
            outcome
        };

        let task_id = id.clone();
        let output = async move {
            // Spawning on first poll keeps the producer running when the
            // dependent that triggered it is dropped.
            match tokio::spawn(job).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Task {} aborted: {}", task_id, e);
                    let outcome = Err(TaskError::new(
                        task_id.clone(),
                        ErrorKind::Aborted,
                        e.to_string(),
                    ));
                    if let Some(events) = &events {
                        events.task_finished(&task_id, &outcome);
                    }
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        Self { id, output }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Attach as a dependent and wait for the shared outcome.
    ///
    /// The first attachment starts the producer.
    pub fn get(&self) -> Shared<BoxFuture<'static, TaskResult<T>>> {
        self.output.clone()
    }

    /// Cached outcome, if some dependent has already observed completion
    pub fn peek(&self) -> Option<TaskResult<T>> {
        self.output.peek().cloned()
    }
}

impl<T> Clone for SharedTask<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            output: self.output.clone(),
        }
    }
}

impl<T> fmt::Debug for SharedTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTask").field("id", &self.id).finish()
    }
}
