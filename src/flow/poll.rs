// SPDX-License-Identifier: MIT

//! Poll a remote resource until it converges to an expected state
//!
//! The loop is single-flight: a new fetch is only issued once the previous one
//! has finished, and ticks missed while a fetch is outstanding are skipped.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::error::{ConfigError, PollError};

/// Cadence and deadline for a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    interval: Duration,
    deadline: Duration,
}

impl PollSpec {
    /// Both `interval` and `deadline` must be non-zero.
    pub fn new(interval: Duration, deadline: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if deadline.is_zero() {
            return Err(ConfigError::ZeroDeadline);
        }
        Ok(Self { interval, deadline })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// Cap for durations too large to add to an `Instant` (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn after(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Repeatedly call `fetch` until `predicate` accepts the snapshot.
///
/// The first fetch happens one `interval` after the call. The deadline is
/// measured from the call itself; a fetch still in flight when it passes is
/// abandoned and no further fetch is issued.
pub async fn poll<R, E, F, Fut, P>(
    spec: &PollSpec,
    mut fetch: F,
    mut predicate: P,
) -> Result<R, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    P: FnMut(&R) -> bool,
{
    let started = Instant::now();
    let deadline = after(started, spec.deadline);
    let interval = spec.interval.min(FAR_FUTURE);
    let mut ticker = time::interval_at(after(started, interval), interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut attempts: u32 = 0;
    let timed_out = |attempts| PollError::Timeout {
        deadline: spec.deadline,
        attempts,
    };

    loop {
        // Deadline wins over a tick that lands on the same instant.
        let ticked = tokio::select! {
            biased;
            _ = time::sleep_until(deadline) => false,
            _ = ticker.tick() => true,
        };
        if !ticked {
            return Err(timed_out(attempts));
        }

        attempts += 1;
        log::debug!(
            "poll attempt {} ({:?} elapsed)",
            attempts,
            started.elapsed()
        );

        let snapshot = match time::timeout_at(deadline, fetch()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => return Err(PollError::Fetch(e)),
            Err(_) => return Err(timed_out(attempts)),
        };

        if predicate(&snapshot) {
            log::debug!("poll converged after {} attempts", attempts);
            return Ok(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Snapshot {
        id: String,
        state: String,
    }

    fn snapshot(state: &str) -> Snapshot {
        Snapshot {
            id: "r1".to_string(),
            state: state.to_string(),
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_spec_rejects_zero_values() {
        assert_eq!(
            PollSpec::new(Duration::ZERO, secs(1)),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            PollSpec::new(secs(1), Duration::ZERO),
            Err(ConfigError::ZeroDeadline)
        );
        assert!(PollSpec::new(secs(1), secs(1)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_on_third_tick() {
        let spec = PollSpec::new(secs(1), secs(10)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result = poll(
            &spec,
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    let state = if n < 3 { "pending" } else { "ready" };
                    Ok::<_, String>(snapshot(state))
                }
            },
            |s: &Snapshot| s.state == "ready",
        )
        .await;

        assert_eq!(result, Ok(snapshot("ready")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= secs(3) && elapsed < secs(4), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_fetching_past_deadline() {
        let spec = PollSpec::new(secs(1), secs(10)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result = poll(
            &spec,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(snapshot("pending")) }
            },
            |s: &Snapshot| s.state == "ready",
        )
        .await;

        assert_eq!(
            result,
            Err(PollError::Timeout {
                deadline: secs(10),
                attempts: 9
            })
        );
        assert!(start.elapsed() >= secs(10));
        assert_eq!(calls.load(Ordering::SeqCst), 9);

        // Nothing keeps fetching in the background.
        time::sleep(secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_is_surfaced_immediately() {
        let spec = PollSpec::new(secs(1), secs(10)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let counter = calls.clone();
        let result: Result<Snapshot, _> = poll(
            &spec,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("HTTP 500".to_string()) }
            },
            |_: &Snapshot| true,
        )
        .await;

        assert_eq!(result, Err(PollError::Fetch("HTTP 500".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_never_overlaps() {
        let spec = PollSpec::new(secs(1), secs(10)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let (counter, active, peak) = (calls.clone(), in_flight.clone(), max_in_flight.clone());
        let result = poll(
            &spec,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    time::sleep(Duration::from_millis(2500)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(snapshot("pending"))
                }
            },
            |s: &Snapshot| s.state == "ready",
        )
        .await;

        assert!(matches!(result, Err(PollError::Timeout { .. })));
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        let fetches = calls.load(Ordering::SeqCst);
        assert!((3..=4).contains(&fetches), "fetches = {}", fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_deadline_still_polls() {
        let spec = PollSpec::new(Duration::from_millis(1), secs(u64::MAX)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result = poll(
            &spec,
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, String>(n) }
            },
            |n: &usize| *n == 2,
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_times_out_without_fetching() {
        let spec = PollSpec::new(Duration::MAX, secs(5)).unwrap();
        let started = Instant::now();

        let result = poll(&spec, || async { Ok::<_, String>(0) }, |_| true).await;

        assert_eq!(
            result,
            Err(PollError::Timeout {
                deadline: secs(5),
                attempts: 0
            })
        );
        assert_eq!(started.elapsed(), secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_sees_every_fresh_snapshot() {
        let spec = PollSpec::new(secs(1), secs(10)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut seen = Vec::new();

        let counter = calls.clone();
        let result = poll(
            &spec,
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, String>(n) }
            },
            |n: &usize| {
                seen.push(*n);
                *n == 4
            },
        )
        .await;

        assert_eq!(result, Ok(4));
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
