// SPDX-License-Identifier: MIT

//! Graph composition: chain, fan-out and fan-in (join)
//!
//! Every node is a `SharedTask`. A node names its upstreams explicitly and
//! receives their values as typed arguments; nothing is passed through shared
//! mutable state. A failed upstream fails every dependent with the same error
//! and the dependent's continuation never runs.

use futures::future::{try_join, try_join3, try_join4, try_join_all};
use std::future::Future;

use super::error::TaskId;
use super::report::EventSender;
use super::shared::{SharedTask, TaskResult};

/// Builder for the nodes of one workflow run
#[derive(Debug, Clone, Default)]
pub struct Graph {
    events: Option<EventSender>,
}

impl Graph {
    /// A graph whose tasks report to nobody
    pub fn detached() -> Self {
        Self { events: None }
    }

    pub(crate) fn with_events(events: EventSender) -> Self {
        Self {
            events: Some(events),
        }
    }

    /// Record a remote resource created by `task_id` in the run's log.
    pub fn record_created(&self, task_id: &TaskId, kind: &str, id: &str) {
        if let Some(events) = &self.events {
            events.resource_created(task_id, kind, id);
        }
    }

    /// Entry node with no dependencies
    pub fn task<T, F>(&self, id: impl Into<TaskId>, producer: F) -> SharedTask<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        SharedTask::build(id.into(), producer, self.events.clone())
    }

    /// Run `f` on the value of `upstream` once it succeeds
    pub fn chain<A, T, F, Fut>(
        &self,
        id: impl Into<TaskId>,
        upstream: &SharedTask<A>,
        f: F,
    ) -> SharedTask<T>
    where
        A: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let upstream = upstream.get();
        self.task(id, async move {
            let value = upstream.await?;
            f(value).await
        })
    }

    /// Feed one upstream value to several independent branches.
    ///
    /// Branches run concurrently and fail independently of each other.
    pub fn fan_out<A, T, I, Id, F, Fut>(
        &self,
        upstream: &SharedTask<A>,
        branches: I,
    ) -> Vec<SharedTask<T>>
    where
        A: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        I: IntoIterator<Item = (Id, F)>,
        Id: Into<TaskId>,
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        branches
            .into_iter()
            .map(|(id, f)| self.chain(id, upstream, f))
            .collect()
    }

    /// Run `f` once both upstreams succeed
    pub fn join2<A, B, T, F, Fut>(
        &self,
        id: impl Into<TaskId>,
        a: &SharedTask<A>,
        b: &SharedTask<B>,
        f: F,
    ) -> SharedTask<T>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce((A, B)) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let (a, b) = (a.get(), b.get());
        self.task(id, async move {
            let joined = try_join(a, b).await?;
            f(joined).await
        })
    }

    /// Run `f` once all three upstreams succeed
    pub fn join3<A, B, C, T, F, Fut>(
        &self,
        id: impl Into<TaskId>,
        a: &SharedTask<A>,
        b: &SharedTask<B>,
        c: &SharedTask<C>,
        f: F,
    ) -> SharedTask<T>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        C: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce((A, B, C)) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let (a, b, c) = (a.get(), b.get(), c.get());
        self.task(id, async move {
            let joined = try_join3(a, b, c).await?;
            f(joined).await
        })
    }

    /// Run `f` once all four upstreams succeed
    #[allow(clippy::too_many_arguments)]
    pub fn join4<A, B, C, D, T, F, Fut>(
        &self,
        id: impl Into<TaskId>,
        a: &SharedTask<A>,
        b: &SharedTask<B>,
        c: &SharedTask<C>,
        d: &SharedTask<D>,
        f: F,
    ) -> SharedTask<T>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        C: Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce((A, B, C, D)) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let (a, b, c, d) = (a.get(), b.get(), c.get(), d.get());
        self.task(id, async move {
            let joined = try_join4(a, b, c, d).await?;
            f(joined).await
        })
    }

    /// Run `f` once every upstream succeeds, with values in input order
    pub fn join_all<A, T, F, Fut>(
        &self,
        id: impl Into<TaskId>,
        upstreams: &[SharedTask<A>],
        f: F,
    ) -> SharedTask<T>
    where
        A: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Vec<A>) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let pending: Vec<_> = upstreams.iter().map(SharedTask::get).collect();
        self.task(id, async move {
            let joined = try_join_all(pending).await?;
            f(joined).await
        })
    }
}
