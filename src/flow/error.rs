// SPDX-License-Identifier: MIT

//! Typed error handling for the orchestration core
//!
//! Every task outcome is a first-class `Result<T, TaskError>`. `TaskError` is
//! `Clone` so a single failure can be replayed to every dependent of a shared
//! task.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identifier of a node in a workflow graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Failure categories a task can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A create/get call against the remote collaborator failed
    Request,
    /// A poll predicate was never satisfied before its deadline
    PollTimeout,
    /// A terminal check on a resolved value failed
    Validation,
    /// The tokio task driving a producer panicked or was aborted
    Aborted,
    /// The workflow-level deadline elapsed
    Deadline,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Request => "request error",
            ErrorKind::PollTimeout => "poll timeout",
            ErrorKind::Validation => "validation error",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Deadline => "deadline exceeded",
        };
        f.write_str(name)
    }
}

/// Error carried by a failed task and by every dependent of it
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("task '{task_id}' failed ({kind}): {message}")]
pub struct TaskError {
    pub task_id: TaskId,
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(task_id: impl Into<TaskId>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a request error
    pub fn request(task_id: impl Into<TaskId>, message: impl Into<String>) -> Self {
        Self::new(task_id, ErrorKind::Request, message)
    }

    /// Create a validation error
    pub fn validation(task_id: impl Into<TaskId>, message: impl Into<String>) -> Self {
        Self::new(task_id, ErrorKind::Validation, message)
    }

    /// Re-attribute an error raised by a collaborator to the task that issued the call.
    ///
    /// Errors already attributed to a named task are left untouched.
    pub fn within(mut self, task_id: &TaskId) -> Self {
        if self.task_id.as_str().is_empty() {
            self.task_id = task_id.clone();
        }
        self
    }
}

/// Errors from a single poll loop
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError<E> {
    /// No snapshot satisfied the predicate before the deadline
    #[error("condition not met within {deadline:?} after {attempts} fetches")]
    Timeout { deadline: Duration, attempts: u32 },

    /// The fetch operation itself failed
    #[error("fetch failed: {0}")]
    Fetch(E),
}

impl PollError<TaskError> {
    /// Collapse into a task error attributed to `task_id`
    pub fn into_task_error(self, task_id: &TaskId) -> TaskError {
        match self {
            PollError::Timeout { .. } => {
                TaskError::new(task_id.clone(), ErrorKind::PollTimeout, self.to_string())
            }
            PollError::Fetch(e) => e.within(task_id),
        }
    }
}

/// Invalid core configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("poll deadline must be greater than zero")]
    ZeroDeadline,
}
