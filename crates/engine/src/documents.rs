//! Document generation.
//!
//! Documents are produced by an external service. The engine submits a job,
//! gets a tracking id back and polls the job status with [`poll_job`], a
//! bounded loop that ends either `Completed` or `Abandoned` once the policy's
//! deadline passes.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};

use crate::{CustomerId, ResultEngine};

/// Opaque handle of a document-generation job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Completed,
}

/// Job status as reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobStatus {
    /// 0–100.
    pub progress: u8,
    pub current_step: String,
    pub estimated_time_remaining: String,
    pub state: JobState,
}

impl JobStatus {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }
}

/// External document-generation collaborator.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Start generating the documents of `customer`.
    async fn submit(&self, customer: &CustomerId) -> ResultEngine<TrackingId>;

    /// Current status of a submitted job.
    async fn status(&self, id: &TrackingId) -> ResultEngine<JobStatus>;
}

/// How often and for how long to poll a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Terminal state of a poll loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(JobStatus),
    /// The deadline passed first; `last` is the last status seen, if any.
    Abandoned { last: Option<JobStatus> },
}

/// Poll `id` until it completes or `policy.max_duration` elapses.
///
/// `on_update` sees every status received. Status errors are logged and the
/// loop carries on at the next tick.
pub async fn poll_job<F>(
    service: &dyn DocumentService,
    id: &TrackingId,
    policy: PollPolicy,
    mut on_update: F,
) -> PollOutcome
where
    F: FnMut(&JobStatus) + Send,
{
    let deadline = Instant::now() + policy.max_duration;
    let mut last = None;

    loop {
        match service.status(id).await {
            Ok(status) => {
                on_update(&status);
                if status.is_completed() {
                    tracing::info!(tracking_id = %id, "document job completed");
                    return PollOutcome::Completed(status);
                }
                last = Some(status);
            }
            Err(err) => tracing::warn!(tracking_id = %id, "document status poll failed: {err}"),
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(tracking_id = %id, "document job abandoned after {:?}", policy.max_duration);
            return PollOutcome::Abandoned { last };
        }
        time::sleep(policy.interval.min(deadline - now)).await;
    }
}

/// Where a tracked job stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Running,
    Completed,
    Abandoned,
}

/// A job the engine submitted and keeps polling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentJob {
    pub tracking_id: TrackingId,
    pub customer: CustomerId,
    pub submitted_at: DateTime<Utc>,
    pub latest: Option<JobStatus>,
    pub outcome: JobOutcome,
}
