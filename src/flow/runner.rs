// SPDX-License-Identifier: MIT

//! Workflow runner
//!
//! Builds a fresh graph for each run, drives the terminal task to completion
//! and collects what happened along the way.

use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::error::{ErrorKind, TaskError};
use super::graph::Graph;
use super::report::{CreatedResource, EventSender, LogObserver, RunEvent, TaskObserver, TaskReport};
use super::shared::SharedTask;

/// A workflow definition: wires tasks into a graph and returns the terminal node
///
/// `build` consumes the definition, so one definition drives exactly one run.
pub trait Workflow {
    type Output: Clone + Send + Sync + 'static;

    fn build(self, graph: &Graph) -> SharedTask<Self::Output>;
}

impl<F, T> Workflow for F
where
    F: FnOnce(&Graph) -> SharedTask<T>,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn build(self, graph: &Graph) -> SharedTask<T> {
        self(graph)
    }
}

/// Everything a caller learns about a finished run
#[derive(Debug, Clone)]
pub struct RunReport<T> {
    pub run_id: Uuid,
    pub outcome: Result<T, TaskError>,
    /// Resources created during the run, in creation order
    pub created: Vec<CreatedResource>,
    /// Task completions observed before the terminal task resolved
    pub tasks: Vec<TaskReport>,
    pub elapsed: Duration,
}

impl<T> RunReport<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_result(self) -> Result<T, TaskError> {
        self.outcome
    }
}

/// Drives workflow runs and reports their outcome
#[derive(Clone)]
pub struct WorkflowRunner {
    observer: Arc<dyn TaskObserver>,
    deadline: Option<Duration>,
}

impl WorkflowRunner {
    pub fn new() -> Self {
        Self {
            observer: Arc::new(LogObserver),
            deadline: None,
        }
    }

    /// Replace the default logging observer
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fail the run with `ErrorKind::Deadline` if it takes longer than `deadline`.
    ///
    /// Remote calls already in flight are not cancelled.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the workflow on a fresh graph and drive it to its terminal outcome.
    pub async fn run<W: Workflow>(&self, workflow: W) -> RunReport<W::Output> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let (events, mut rx) = EventSender::channel();
        let events = events.with_observer(self.observer.clone());
        let terminal = workflow.build(&Graph::with_events(events));
        let terminal_id = terminal.id().clone();
        log::info!("Run {} started (terminal task: {})", run_id, terminal_id);

        let mut created = Vec::new();
        let mut tasks = Vec::new();

        let result = terminal.get();
        tokio::pin!(result);
        let deadline = self.deadline_elapsed();
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                outcome = &mut result => break outcome,
                Some(event) = rx.recv() => self.handle_event(event, &mut created, &mut tasks),
                limit = &mut deadline => {
                    break Err(TaskError::new(
                        terminal_id.clone(),
                        ErrorKind::Deadline,
                        format!("workflow did not finish within {:?}", limit),
                    ));
                }
            }
        };

        // Completions that raced the terminal task are still part of this run.
        while let Ok(event) = rx.try_recv() {
            self.handle_event(event, &mut created, &mut tasks);
        }

        let elapsed = started.elapsed();
        match &outcome {
            Ok(_) => log::info!("Run {} succeeded in {:?}", run_id, elapsed),
            Err(e) => log::error!("Run {} failed in {:?}: {}", run_id, elapsed, e),
        }

        RunReport {
            run_id,
            outcome,
            created,
            tasks,
            elapsed,
        }
    }

    fn deadline_elapsed(&self) -> impl Future<Output = Duration> {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => future::pending().await,
            }
        }
    }

    fn handle_event(
        &self,
        event: RunEvent,
        created: &mut Vec<CreatedResource>,
        tasks: &mut Vec<TaskReport>,
    ) {
        match event {
            RunEvent::TaskFinished(report) => tasks.push(report),
            RunEvent::ResourceCreated(resource) => created.push(resource),
        }
    }
}

impl Default for WorkflowRunner {
    fn default() -> Self {
        Self::new()
    }
}
