// SPDX-License-Identifier: MIT

//! Remote resource seam
//!
//! A provider creates resources and fetches fresh snapshots of them. The
//! `converge` helper is the create-then-poll pattern every workflow step uses.

use async_trait::async_trait;

use super::error::TaskId;
use super::graph::Graph;
use super::poll::{poll, PollSpec};
use super::shared::TaskResult;

/// Snapshot of an entity owned by the remote system
pub trait Resource: Send + Sync {
    /// Human-readable kind used in logs and the created-resource log
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn state(&self) -> String;
}

/// The "create" and "get" calls of a remote collaborator
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    type Input: Send + Sync;
    type Resource: Resource;

    async fn create(&self, input: &Self::Input) -> TaskResult<Self::Resource>;

    async fn get(&self, id: &str) -> TaskResult<Self::Resource>;
}

/// Create a resource, then poll it until `predicate` holds.
///
/// The created identifier is recorded in the run's log before polling starts,
/// so it is reported even if the resource never converges.
pub async fn converge<P, F>(
    graph: &Graph,
    task_id: &TaskId,
    provider: &P,
    input: &P::Input,
    spec: &PollSpec,
    predicate: F,
) -> TaskResult<P::Resource>
where
    P: ResourceProvider + ?Sized,
    F: FnMut(&P::Resource) -> bool,
{
    let kind = <P::Resource as Resource>::KIND;
    log::info!("Creating {}...", kind);
    let created = provider
        .create(input)
        .await
        .map_err(|e| e.within(task_id))?;
    log::info!("Created {}: {} (state: {})", kind, created.id(), created.state());
    graph.record_created(task_id, kind, created.id());

    wait_for(task_id, provider, created.id(), spec, predicate).await
}

/// Poll an existing resource until `predicate` holds
pub async fn wait_for<P, F>(
    task_id: &TaskId,
    provider: &P,
    id: &str,
    spec: &PollSpec,
    predicate: F,
) -> TaskResult<P::Resource>
where
    P: ResourceProvider + ?Sized,
    F: FnMut(&P::Resource) -> bool,
{
    log::info!(
        "Waiting for {} {} (every {:?}, up to {:?})",
        <P::Resource as Resource>::KIND,
        id,
        spec.interval(),
        spec.deadline()
    );
    poll(spec, || provider.get(id), predicate)
        .await
        .map_err(|e| e.into_task_error(task_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::error::{ErrorKind, TaskError};
    use crate::flow::report::{EventSender, RunEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Thing {
        id: String,
        state: String,
    }

    impl Resource for Thing {
        const KIND: &'static str = "thing";

        fn id(&self) -> &str {
            &self.id
        }

        fn state(&self) -> String {
            self.state.clone()
        }
    }

    /// Provider that replays a scripted sequence of states on `get`
    struct ScriptedProvider {
        states: Mutex<Vec<&'static str>>,
        gets: AtomicUsize,
        fail_create: bool,
    }

    impl ScriptedProvider {
        fn new(states: Vec<&'static str>) -> Self {
            Self {
                states: Mutex::new(states),
                gets: AtomicUsize::new(0),
                fail_create: false,
            }
        }
    }

    #[async_trait]
    impl ResourceProvider for ScriptedProvider {
        type Input = ();
        type Resource = Thing;

        async fn create(&self, _input: &()) -> TaskResult<Thing> {
            if self.fail_create {
                return Err(TaskError::request("", "HTTP 422"));
            }
            Ok(Thing {
                id: "r1".to_string(),
                state: "pending".to_string(),
            })
        }

        async fn get(&self, id: &str) -> TaskResult<Thing> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let mut states = self.states.lock().unwrap();
            let state = if states.len() > 1 {
                states.remove(0)
            } else {
                states[0]
            };
            Ok(Thing {
                id: id.to_string(),
                state: state.to_string(),
            })
        }
    }

    fn spec(interval: u64, deadline: u64) -> PollSpec {
        PollSpec::new(Duration::from_secs(interval), Duration::from_secs(deadline)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_converge_creates_then_polls_until_ready() {
        let (events, mut rx) = EventSender::channel();
        let graph = Graph::with_events(events);
        let provider = ScriptedProvider::new(vec!["pending", "pending", "ready"]);
        let task_id = TaskId::new("thing");

        let thing = converge(&graph, &task_id, &provider, &(), &spec(1, 10), |t: &Thing| {
            t.state == "ready"
        })
        .await
        .unwrap();

        assert_eq!(
            thing,
            Thing {
                id: "r1".to_string(),
                state: "ready".to_string()
            }
        );
        assert_eq!(provider.gets.load(Ordering::SeqCst), 3);

        match rx.try_recv() {
            Ok(RunEvent::ResourceCreated(created)) => {
                assert_eq!(created.id, "r1");
                assert_eq!(created.kind, "thing");
                assert_eq!(created.task_id, task_id);
            }
            other => panic!("expected created event, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_converge_timeout_is_attributed_to_task() {
        let graph = Graph::detached();
        let provider = ScriptedProvider::new(vec!["pending"]);
        let task_id = TaskId::new("slow_thing");

        let err = converge(&graph, &task_id, &provider, &(), &spec(1, 5), |t: &Thing| {
            t.state == "ready"
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::PollTimeout);
        assert_eq!(err.task_id, task_id);
        assert_eq!(provider.gets.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_skips_polling() {
        let graph = Graph::detached();
        let mut provider = ScriptedProvider::new(vec!["ready"]);
        provider.fail_create = true;

        let err = converge(&graph, &TaskId::new("t"), &provider, &(), &spec(1, 5), |_: &Thing| true)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Request);
        assert_eq!(err.task_id.as_str(), "t");
        assert_eq!(provider.gets.load(Ordering::SeqCst), 0);
    }
}
