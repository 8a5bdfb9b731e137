//! Generation job lifecycle state machine.
//!
//! A [`Job`] tracks one generation request from submission to a
//! terminal state. Progress transitions are driven by the backend
//! client; cancellation is cooperative. All transition rules live here
//! so the store and orchestrator cannot disagree about them.
//!
//! Cancel wins: once a job is `cancelled`, a late completion or failure
//! from the background task is discarded, never applied.

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Lifecycle states of a generation job.
///
/// Progress order is fixed:
/// `queued → uploading → submitted → processing → downloading`,
/// ending in `completed` or `failed`. `cancelled` is reachable from any
/// non-terminal state via an external cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Uploading,
    Submitted,
    Processing,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether no further transitions can occur from this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Uploading => "uploading",
            JobStatus::Submitted => "submitted",
            JobStatus::Processing => "processing",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One tracked generation request.
///
/// Fields are private: every mutation goes through a method that
/// enforces the transition rules, so `result` and `error` can never be
/// set simultaneously and terminal states are never overwritten.
#[derive(Debug)]
pub struct Job {
    id: String,
    status: JobStatus,
    result: Option<Vec<u8>>,
    error: Option<String>,
    created_at: Timestamp,
}

impl Job {
    /// Create a new job in the `queued` state with a fresh opaque id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&[u8]> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Seconds since the job was created.
    pub fn elapsed_seconds(&self) -> f64 {
        let elapsed = chrono::Utc::now() - self.created_at;
        (elapsed.num_milliseconds() as f64 / 1000.0).max(0.0)
    }

    /// Apply a progress transition reported by the backend client.
    ///
    /// Ignored (returns `false`) once the job is terminal -- in
    /// particular a cancelled job is never moved back into a progress
    /// state by a late callback. Terminal states cannot be reached this
    /// way; use [`Job::complete`], [`Job::fail`] or [`Job::cancel`].
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Terminal transition: generation succeeded.
    ///
    /// Discarded (returns `false`) if the job is already terminal, so a
    /// result arriving after a cancel is dropped rather than exposed.
    pub fn complete(&mut self, artifact: Vec<u8>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.result = Some(artifact);
        true
    }

    /// Terminal transition: generation failed with a human-readable
    /// message. Discarded if the job is already terminal.
    pub fn fail(&mut self, message: String) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(message);
        true
    }

    /// Cancel the job. On an already-terminal job this is a no-op and
    /// the existing state is returned unchanged.
    pub fn cancel(&mut self) -> JobStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        self.status = JobStatus::Cancelled;
        self.result = None;
        self.status
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_queued_with_unique_id() {
        let a = Job::new();
        let b = Job::new();
        assert_eq!(a.status(), JobStatus::Queued);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn progress_transitions_apply_in_order() {
        let mut job = Job::new();
        for status in [
            JobStatus::Uploading,
            JobStatus::Submitted,
            JobStatus::Processing,
            JobStatus::Downloading,
        ] {
            assert!(job.advance(status));
            assert_eq!(job.status(), status);
        }
    }

    #[test]
    fn advance_rejects_terminal_targets() {
        let mut job = Job::new();
        assert!(!job.advance(JobStatus::Completed));
        assert_eq!(job.status(), JobStatus::Queued);
    }

    #[test]
    fn complete_sets_result_and_no_error() {
        let mut job = Job::new();
        assert!(job.complete(vec![1, 2, 3]));
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.result(), Some(&[1u8, 2, 3][..]));
        assert!(job.error().is_none());
    }

    #[test]
    fn fail_sets_error_and_no_result() {
        let mut job = Job::new();
        assert!(job.fail("backend exploded".into()));
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error(), Some("backend exploded"));
        assert!(job.result().is_none());
    }

    #[test]
    fn late_completion_after_cancel_is_discarded() {
        let mut job = Job::new();
        job.advance(JobStatus::Processing);
        assert_eq!(job.cancel(), JobStatus::Cancelled);

        // The background task finishes afterwards.
        assert!(!job.complete(vec![0xAA]));
        assert_eq!(job.status(), JobStatus::Cancelled);
        assert!(job.result().is_none());

        assert!(!job.fail("too late".into()));
        assert!(job.error().is_none());
    }

    #[test]
    fn cancel_on_terminal_job_is_a_noop() {
        let mut job = Job::new();
        job.complete(vec![7]);
        assert_eq!(job.cancel(), JobStatus::Completed);
        assert_eq!(job.result(), Some(&[7u8][..]));
    }

    #[test]
    fn advance_after_cancel_is_ignored() {
        let mut job = Job::new();
        job.cancel();
        assert!(!job.advance(JobStatus::Downloading));
        assert_eq!(job.status(), JobStatus::Cancelled);
    }
}
