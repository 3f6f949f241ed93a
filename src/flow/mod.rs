// SPDX-License-Identifier: MIT

//! Orchestration core
//!
//! This module provides the building blocks for driving a graph of remote
//! operations to completion:
//! - `poll` - re-fetch a resource until it converges or a deadline passes
//! - `SharedTask` - run a producer once and replay its outcome to every dependent
//! - `Graph` - chain, fan-out and join combinators over shared tasks
//! - `WorkflowRunner` - build a graph, drive it and report the outcome

pub mod error;
pub mod graph;
pub mod poll;
pub mod report;
pub mod resource;
pub mod runner;
pub mod shared;

pub use error::{ConfigError, ErrorKind, PollError, TaskError, TaskId};
pub use graph::Graph;
pub use poll::{poll, PollSpec};
pub use report::{CreatedResource, LogObserver, TaskObserver, TaskReport, TaskStatus};
pub use resource::{converge, wait_for, Resource, ResourceProvider};
pub use runner::{RunReport, Workflow, WorkflowRunner};
pub use shared::{SharedTask, TaskResult};
