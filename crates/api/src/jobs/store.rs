//! Bounded in-memory job registry.
//!
//! All job mutation is store-mediated: the orchestrator and the HTTP
//! handlers call methods here instead of holding references into the
//! map, so there is exactly one writer path per job and readers always
//! see a consistent snapshot. The transition rules themselves live on
//! [`Job`].

use std::collections::HashMap;
use std::sync::Mutex;

use pencilflux_core::job::{Job, JobStatus};
use serde::Serialize;

/// Read-only view of a job for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_seconds: f64,
}

/// Registry mapping job id to [`Job`], capacity-bounded.
///
/// On insertion past capacity, the oldest terminal jobs are evicted
/// until the store is back at its ceiling. Running jobs are never
/// evicted, so the store may temporarily exceed the ceiling when
/// everything in it is still active -- correctness over a strict bound.
pub struct JobStore {
    inner: Mutex<HashMap<String, Job>>,
    capacity: usize,
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Register a new job, evicting old terminal jobs if needed.
    /// Returns the job id.
    pub fn insert(&self, job: Job) -> String {
        let id = job.id().to_string();
        let mut jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.insert(id.clone(), job);
        Self::evict_locked(&mut jobs, self.capacity);
        id
    }

    /// Remove the oldest terminal jobs until the store is back at
    /// capacity. Non-terminal jobs are never candidates.
    fn evict_locked(jobs: &mut HashMap<String, Job>, capacity: usize) {
        if jobs.len() <= capacity {
            return;
        }
        let mut terminal: Vec<(String, chrono::DateTime<chrono::Utc>)> = jobs
            .values()
            .filter(|j| j.status().is_terminal())
            .map(|j| (j.id().to_string(), j.created_at()))
            .collect();
        terminal.sort_by_key(|(_, created_at)| *created_at);

        let mut oldest = terminal.into_iter();
        while jobs.len() > capacity {
            let Some((id, _)) = oldest.next() else {
                break;
            };
            jobs.remove(&id);
            tracing::debug!(job_id = %id, "Evicted terminal job");
        }
    }

    pub fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        let jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get(id).map(|job| JobSnapshot {
            job_id: job.id().to_string(),
            status: job.status(),
            error: job.error().map(str::to_string),
            elapsed_seconds: job.elapsed_seconds(),
        })
    }

    /// Current status plus a copy of the artifact if one exists.
    pub fn result(&self, id: &str) -> Option<(JobStatus, Option<Vec<u8>>)> {
        let jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get(id)
            .map(|job| (job.status(), job.result().map(<[u8]>::to_vec)))
    }

    /// Apply a progress transition. `false` if the job is unknown or
    /// already terminal.
    pub fn advance(&self, id: &str, status: JobStatus) -> bool {
        let mut jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get_mut(id).is_some_and(|job| job.advance(status))
    }

    /// Apply a successful result. `false` if the job is unknown or
    /// terminal (a cancelled job discards its late result here).
    pub fn complete(&self, id: &str, artifact: Vec<u8>) -> bool {
        let mut jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get_mut(id).is_some_and(|job| job.complete(artifact))
    }

    /// Apply a failure. `false` if the job is unknown or terminal.
    pub fn fail(&self, id: &str, message: String) -> bool {
        let mut jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get_mut(id).is_some_and(|job| job.fail(message))
    }

    /// Cancel a job, returning its resulting status (unchanged when the
    /// job was already terminal), or `None` if unknown.
    pub fn cancel(&self, id: &str) -> Option<JobStatus> {
        let mut jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.get_mut(id).map(Job::cancel)
    }

    /// Number of jobs not yet in a terminal state.
    pub fn active_count(&self) -> usize {
        let jobs = self.inner.lock().expect("job store lock poisoned");
        jobs.values().filter(|j| !j.status().is_terminal()).count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("job store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
