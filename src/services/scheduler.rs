//! Process-wide job registry for recurring background tasks.
//!
//! Each job is a named async closure with a fixed interval and an
//! in-flight guard: a tick that fires while the previous run is still
//! active is skipped (and counted), never overlapped. The guard is shared
//! with the manual HTTP triggers so an operator cannot start a second run
//! either.
//!
//! Lifecycle: `register` jobs, `start` spawns one tokio task per job,
//! `shutdown` flips a watch channel and tasks exit between runs. A run in
//! progress finishes its single atomic write (or nothing at all) before
//! the task observes the signal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use utoipa::ToSchema;

/// One week, the cadence of the retention purge job.
pub const WEEKLY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Message produced by one job run; Ok/Err both carry operator-readable text.
pub type JobResult = Result<String, String>;

type JobFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = JobResult> + Send>> + Send + Sync>;

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

/// At-most-one-execution guard for a job id. Cloned handles share the flag,
/// so the scheduler tick and the manual trigger contend on the same guard.
#[derive(Debug, Clone, Default)]
pub struct JobGuard {
    flag: Arc<AtomicBool>,
}

/// Held while a run is active; releases the guard on drop, including when
/// the run's task is cancelled or panics.
pub struct JobPermit {
    flag: Arc<AtomicBool>,
}

impl JobGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns None when a run is already in flight.
    pub fn try_acquire(&self) -> Option<JobPermit> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobPermit {
                flag: self.flag.clone(),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Registry state (shared via Arc<RwLock<>>, exposed by the status endpoint)
// ---------------------------------------------------------------------------

/// Status of a single registered job.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStatus {
    pub id: String,
    pub interval_secs: u64,
    pub in_flight: bool,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    /// "ok: …" or "failed: …" from the most recent run; None before the first.
    pub last_result: Option<String>,
    pub runs: u64,
    /// Ticks dropped because the previous run was still active.
    pub skipped: u64,
}

/// Global scheduler state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistryState {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}

pub type SharedRegistryState = Arc<RwLock<RegistryState>>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Job {
    id: &'static str,
    interval: Duration,
    guard: JobGuard,
    run: JobFn,
}

pub struct JobRegistry {
    jobs: Vec<Job>,
    state: SharedRegistryState,
    shutdown_tx: watch::Sender<bool>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            state: Arc::new(RwLock::new(RegistryState {
                running: false,
                jobs: Vec::new(),
            })),
            shutdown_tx,
        }
    }

    /// Register a recurring job. The guard is passed in (not created here)
    /// so manual triggers can share it.
    pub fn register<F, Fut>(&mut self, id: &'static str, interval: Duration, guard: JobGuard, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let run: JobFn = Arc::new(move || Box::pin(f()));
        self.jobs.push(Job {
            id,
            interval,
            guard,
            run,
        });
    }

    /// Handle to the shared status state, for the HTTP status endpoint.
    pub fn state(&self) -> SharedRegistryState {
        self.state.clone()
    }

    /// Spawn one task per registered job. The first run happens one full
    /// interval after start, not immediately.
    pub async fn start(&mut self) {
        {
            let mut s = self.state.write().await;
            s.running = true;
            s.jobs = self
                .jobs
                .iter()
                .map(|job| JobStatus {
                    id: job.id.to_string(),
                    interval_secs: job.interval.as_secs(),
                    in_flight: false,
                    last_started_at: None,
                    last_finished_at: None,
                    last_result: None,
                    runs: 0,
                    skipped: 0,
                })
                .collect();
        }

        for job in self.jobs.drain(..) {
            let state = self.state.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            tracing::info!(
                job = job.id,
                interval_secs = job.interval.as_secs(),
                "Scheduled recurring job"
            );
            tokio::spawn(run_job_loop(job, state, shutdown_rx));
        }
    }

    /// Signal all job tasks to exit. Runs already in flight complete.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut s = self.state.write().await;
        s.running = false;
        tracing::info!("Scheduler shutdown requested");
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job_loop(job: Job, state: SharedRegistryState, mut shutdown_rx: watch::Receiver<bool>) {
    let start = tokio::time::Instant::now() + job.interval;
    let mut ticker = tokio::time::interval_at(start, job.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown_rx.changed() => {
                // A dropped sender counts as shutdown too.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!(job = job.id, "Job loop stopped");
                    return;
                }
                continue;
            }
        }

        let Some(permit) = job.guard.try_acquire() else {
            tracing::warn!(job = job.id, "Skipping tick: previous run still active");
            update_status(&state, job.id, |s| s.skipped += 1).await;
            continue;
        };

        let started_at = Utc::now();
        update_status(&state, job.id, |s| {
            s.in_flight = true;
            s.last_started_at = Some(started_at);
        })
        .await;

        let result = (job.run)().await;
        drop(permit);

        let summary = match &result {
            Ok(msg) => format!("ok: {}", msg),
            Err(msg) => format!("failed: {}", msg),
        };
        match &result {
            Ok(msg) => tracing::info!(job = job.id, "Job run finished: {}", msg),
            Err(msg) => tracing::error!(job = job.id, "Job run failed: {}", msg),
        }

        update_status(&state, job.id, |s| {
            s.in_flight = false;
            s.last_finished_at = Some(Utc::now());
            s.last_result = Some(summary);
            s.runs += 1;
        })
        .await;
    }
}

async fn update_status<F>(state: &SharedRegistryState, id: &str, f: F)
where
    F: FnOnce(&mut JobStatus),
{
    let mut s = state.write().await;
    if let Some(job) = s.jobs.iter_mut().find(|j| j.id == id) {
        f(job);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    /// Give spawned job tasks enough polls to drain their await points
    /// under the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_guard_admits_one() {
        let guard = JobGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.try_acquire().is_none());
        assert!(guard.is_in_flight());
    }

    #[test]
    fn test_guard_released_on_drop() {
        let guard = JobGuard::new();
        drop(guard.try_acquire());
        assert!(!guard.is_in_flight());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guard_contention_admits_exactly_one() {
        let guard = JobGuard::new();
        let admitted = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = guard.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    if let Some(permit) = guard.try_acquire() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                        // Hold the permit long enough for every thread to try.
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        drop(permit);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_job_runs_on_interval() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut registry = JobRegistry::new();
        let guard = JobGuard::new();

        let job_counter = counter.clone();
        registry.register("tick_counter", Duration::from_secs(60), guard, move || {
            let c = job_counter.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok("ticked".to_string())
            }
        });

        let state = registry.state();
        registry.start().await;
        settle().await;

        // No run before the first interval has elapsed.
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let s = state.read().await;
        let status = &s.jobs[0];
        assert_eq!(status.id, "tick_counter");
        assert_eq!(status.runs, 2);
        assert_eq!(status.skipped, 0);
        assert_eq!(status.last_result.as_deref(), Some("ok: ticked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_job_loop() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut registry = JobRegistry::new();

        let job_counter = counter.clone();
        registry.register(
            "stoppable",
            Duration::from_secs(10),
            JobGuard::new(),
            move || {
                let c = job_counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok("ran".to_string())
                }
            },
        );

        registry.start().await;
        settle().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        registry.shutdown().await;
        settle().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1, "no runs after shutdown");
    }
}
