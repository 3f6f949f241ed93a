//! Integration tests for the orchestration core
//!
//! These tests drive whole runs through `WorkflowRunner` using scripted
//! resource providers and paused tokio time.

use async_trait::async_trait;
use converge_rs::flow::{
    converge, ErrorKind, Graph, PollSpec, Resource, ResourceProvider, SharedTask, TaskError,
    TaskId, TaskObserver, TaskReport, TaskResult, TaskStatus, WorkflowRunner,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Mock Components
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Job {
    id: String,
    state: String,
}

impl Resource for Job {
    const KIND: &'static str = "job";

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> String {
        self.state.clone()
    }
}

/// Provider that creates one job and replays a scripted list of states
struct ScriptedJobs {
    id: &'static str,
    states: Mutex<VecDeque<&'static str>>,
    creates: AtomicUsize,
    gets: AtomicUsize,
}

impl ScriptedJobs {
    fn new(id: &'static str, states: &[&'static str]) -> Self {
        Self {
            id,
            states: Mutex::new(states.iter().copied().collect()),
            creates: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    fn job(&self, state: &str) -> Job {
        Job {
            id: self.id.to_string(),
            state: state.to_string(),
        }
    }
}

#[async_trait]
impl ResourceProvider for ScriptedJobs {
    type Input = ();
    type Resource = Job;

    async fn create(&self, _input: &()) -> TaskResult<Job> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.job("created"))
    }

    async fn get(&self, _id: &str) -> TaskResult<Job> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        // The last scripted state sticks.
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().copied()
        };
        Ok(self.job(state.unwrap_or("pending")))
    }
}

#[derive(Default)]
struct RecordingObserver {
    reports: Mutex<Vec<TaskReport>>,
}

impl RecordingObserver {
    fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task_id.as_str() == id)
            .map(|r| r.status.clone())
    }
}

impl TaskObserver for RecordingObserver {
    fn on_task_complete(&self, report: &TaskReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

fn spec(interval_secs: u64, deadline_secs: u64) -> PollSpec {
    PollSpec::new(
        Duration::from_secs(interval_secs),
        Duration::from_secs(deadline_secs),
    )
    .unwrap()
}

fn converging_task(
    graph: &Graph,
    id: &'static str,
    provider: Arc<ScriptedJobs>,
    poll: PollSpec,
) -> SharedTask<Job> {
    let graph_handle = graph.clone();
    graph.task(id, async move {
        converge(
            &graph_handle,
            &TaskId::new(id),
            provider.as_ref(),
            &(),
            &poll,
            |j: &Job| j.state == "ready",
        )
        .await
    })
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_resource_converges_on_third_poll() {
    let provider = Arc::new(ScriptedJobs::new("r1", &["pending", "pending", "ready"]));
    let started = Instant::now();

    let report = WorkflowRunner::new()
        .run({
            let provider = provider.clone();
            move |graph: &Graph| converging_task(graph, "job", provider, spec(1, 10))
        })
        .await;

    let job = report.outcome.clone().unwrap();
    assert_eq!(job.id, "r1");
    assert_eq!(job.state, "ready");
    assert_eq!(provider.creates.load(Ordering::SeqCst), 1);
    assert_eq!(provider.gets.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].id, "r1");
    assert_eq!(report.created[0].kind, "job");
    assert_eq!(report.created[0].task_id.as_str(), "job");
}

#[tokio::test(start_paused = true)]
async fn test_resource_that_never_converges_times_out() {
    let provider = Arc::new(ScriptedJobs::new("r1", &["pending"]));
    let started = Instant::now();

    let report = WorkflowRunner::new()
        .run({
            let provider = provider.clone();
            move |graph: &Graph| converging_task(graph, "job", provider, spec(2, 7))
        })
        .await;

    let err = report.outcome.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PollTimeout);
    assert_eq!(err.task_id.as_str(), "job");
    assert_eq!(provider.gets.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    // Created before polling started, so still reported.
    assert_eq!(report.created.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shared_failure_reaches_every_dependent() {
    let observer = Arc::new(RecordingObserver::default());
    let runs = Arc::new(AtomicUsize::new(0));
    let b1_ran = Arc::new(AtomicUsize::new(0));
    let b2_ran = Arc::new(AtomicUsize::new(0));

    let report = WorkflowRunner::new()
        .with_observer(observer.clone())
        .run({
            let (runs, b1_ran, b2_ran) = (runs.clone(), b1_ran.clone(), b2_ran.clone());
            move |graph: &Graph| {
                let a: SharedTask<u32> = graph.task("a", async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Err(TaskError::request("", "HTTP 500"))
                });
                let b1 = graph.chain("b1", &a, move |v| async move {
                    b1_ran.fetch_add(1, Ordering::SeqCst);
                    Ok(v + 1)
                });
                let b2 = graph.chain("b2", &a, move |v| async move {
                    b2_ran.fetch_add(1, Ordering::SeqCst);
                    Ok(v + 2)
                });
                graph.join2("c", &b1, &b2, |(x, y)| async move { Ok(x + y) })
            }
        })
        .await;

    let err = report.outcome.unwrap_err();
    assert_eq!(err.task_id.as_str(), "a");
    assert_eq!(err.kind, ErrorKind::Request);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(b1_ran.load(Ordering::SeqCst), 0);
    assert_eq!(b2_ran.load(Ordering::SeqCst), 0);

    assert!(matches!(observer.status_of("a"), Some(TaskStatus::Failed(_))));
    assert!(matches!(
        observer.status_of("c"),
        Some(TaskStatus::Skipped(e)) if e.task_id.as_str() == "a"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_branch_failure_does_not_cancel_siblings() {
    let observer = Arc::new(RecordingObserver::default());
    let fast = Arc::new(ScriptedJobs::new("fast", &["ready"]));
    let slow = Arc::new(ScriptedJobs::new("slow", &["pending", "pending", "pending", "ready"]));

    let report = WorkflowRunner::new()
        .with_observer(observer.clone())
        .run({
            let (fast, slow) = (fast.clone(), slow.clone());
            move |graph: &Graph| {
                let root = graph.task("root", async { Ok(()) });
                let poll = spec(1, 30);
                let mut branches = graph.fan_out(
                    &root,
                    vec![
                        ("broken", None),
                        ("fast", Some(fast)),
                        ("slow", Some(slow)),
                    ]
                    .into_iter()
                    .map(|(id, provider)| {
                        let graph = graph.clone();
                        (id, move |_: ()| async move {
                            match provider {
                                Some(p) => {
                                    let task_id = TaskId::new(id);
                                    let ready = |j: &Job| j.state == "ready";
                                    converge(&graph, &task_id, p.as_ref(), &(), &poll, ready).await
                                }
                                None => Err(TaskError::validation(id, "bad branch")),
                            }
                        })
                    }),
                );
                let slow = branches.pop().unwrap();
                let fast = branches.pop().unwrap();
                let broken = branches.pop().unwrap();
                // Waits on the failing branch without failing itself.
                let drain = graph.task("drain", async move {
                    let _ = broken.get().await;
                    Ok(())
                });
                graph.join3("both", &fast, &slow, &drain, |(f, s, _)| async move {
                    Ok(vec![f.id, s.id])
                })
            }
        })
        .await;

    assert_eq!(report.outcome, Ok(vec!["fast".to_string(), "slow".to_string()]));
    assert_eq!(slow.gets.load(Ordering::SeqCst), 4);
    assert!(matches!(observer.status_of("broken"), Some(TaskStatus::Failed(_))));
    let ids: Vec<_> = report.created.iter().map(|c| c.id.as_str()).collect();
    assert!(ids.contains(&"fast") && ids.contains(&"slow"));
}
