// SPDX-License-Identifier: MIT

//! Run events, task reports and the observability hook

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::error::{TaskError, TaskId};

/// How a task finished
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Succeeded,
    /// The task's own producer failed
    Failed(TaskError),
    /// The producer never ran because an upstream failed; carries the upstream error
    Skipped(TaskError),
}

/// One completed task, as seen by the observer
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub finished_at: DateTime<Utc>,
}

impl TaskReport {
    pub(crate) fn from_outcome<T>(task_id: &TaskId, outcome: &Result<T, TaskError>) -> Self {
        let status = match outcome {
            Ok(_) => TaskStatus::Succeeded,
            Err(e) if &e.task_id == task_id => TaskStatus::Failed(e.clone()),
            Err(e) => TaskStatus::Skipped(e.clone()),
        };
        Self {
            task_id: task_id.clone(),
            status,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded)
    }
}

/// A remote resource created while a run was in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub task_id: TaskId,
    pub kind: String,
    pub id: String,
}

/// Events flowing from running tasks back to the runner
#[derive(Debug, Clone)]
pub enum RunEvent {
    TaskFinished(TaskReport),
    ResourceCreated(CreatedResource),
}

/// Sending half of a run's event channel
///
/// The observer is called from the task that produced the event, so it keeps
/// firing after the runner has returned; channel sends at that point are
/// dropped silently.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<RunEvent>,
    observer: Option<Arc<dyn TaskObserver>>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, observer: None }, rx)
    }

    pub(crate) fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn task_finished<T>(&self, task_id: &TaskId, outcome: &Result<T, TaskError>) {
        let report = TaskReport::from_outcome(task_id, outcome);
        if let Some(observer) = &self.observer {
            observer.on_task_complete(&report);
        }
        let _ = self.tx.send(RunEvent::TaskFinished(report));
    }

    pub fn resource_created(&self, task_id: &TaskId, kind: &str, id: &str) {
        let resource = CreatedResource {
            task_id: task_id.clone(),
            kind: kind.to_string(),
            id: id.to_string(),
        };
        if let Some(observer) = &self.observer {
            observer.on_resource_created(&resource);
        }
        let _ = self.tx.send(RunEvent::ResourceCreated(resource));
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

/// Hook invoked once per completed task
pub trait TaskObserver: Send + Sync {
    fn on_task_complete(&self, report: &TaskReport);

    fn on_resource_created(&self, _resource: &CreatedResource) {}
}

/// Default observer that writes every completion to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TaskObserver for LogObserver {
    fn on_task_complete(&self, report: &TaskReport) {
        match &report.status {
            TaskStatus::Succeeded => log::info!("Task {} completed", report.task_id),
            TaskStatus::Failed(e) => log::error!("Task {} failed: {}", report.task_id, e),
            TaskStatus::Skipped(e) => log::warn!(
                "Task {} skipped, upstream '{}' failed",
                report.task_id,
                e.task_id
            ),
        }
    }

    fn on_resource_created(&self, resource: &CreatedResource) {
        log::info!("Created {}: {}", resource.kind, resource.id);
    }
}
