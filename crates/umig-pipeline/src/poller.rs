//! Driving remote jobs to a terminal state
//!
//! A bulk job moves `Pending -> Completed | Failed`. [`JobPoller`] reads the
//! job, and while it is still pending sleeps for the current interval before
//! reading again. The interval grows by the policy's factor up to its
//! ceiling. The poller gives up with `JobTimeout` once the next sleep would
//! take the accumulated wait past the policy's total ceiling.
//!
//! Read failures are not retried here; they surface immediately as
//! `MigrateError::Poll`.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use umig_common::{JobKind, MigrateError, Result};

use crate::types::{Job, JobStatus};

/// Default first wait between polls
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(5);

/// Default growth factor applied after every pending poll
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// Default ceiling for a single wait
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Default ceiling for the accumulated wait of one job
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Backoff schedule and wait budget for one job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    initial_interval: Duration,
    growth_factor: f64,
    max_interval: Duration,
    max_wait: Duration,
}

impl PollPolicy {
    /// Create a validated policy
    ///
    /// # Errors
    /// [`MigrateError::Config`] when an interval is zero, the growth factor
    /// is below 1 or not finite, or the initial interval exceeds the ceiling.
    pub fn new(
        initial_interval: Duration,
        growth_factor: f64,
        max_interval: Duration,
        max_wait: Duration,
    ) -> Result<Self> {
        if initial_interval.is_zero() {
            return Err(MigrateError::config("poll interval must be greater than zero"));
        }
        if !growth_factor.is_finite() || growth_factor < 1.0 {
            return Err(MigrateError::config(format!(
                "poll growth factor must be a finite number >= 1, got {}",
                growth_factor
            )));
        }
        if max_interval < initial_interval {
            return Err(MigrateError::config(format!(
                "poll interval ceiling ({:?}) is below the initial interval ({:?})",
                max_interval, initial_interval
            )));
        }
        if max_wait.is_zero() {
            return Err(MigrateError::config("poll timeout must be greater than zero"));
        }

        Ok(Self {
            initial_interval,
            growth_factor,
            max_interval,
            max_wait,
        })
    }

    /// Constant interval with a total wait ceiling
    pub fn fixed(interval: Duration, max_wait: Duration) -> Result<Self> {
        Self::new(interval, 1.0, interval, max_wait)
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Same schedule with a different total wait ceiling
    pub fn with_max_wait(self, max_wait: Duration) -> Result<Self> {
        Self::new(self.initial_interval, self.growth_factor, self.max_interval, max_wait)
    }

    /// Interval that follows `current`; never decreases, never exceeds the ceiling
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.growth_factor)
            .map(|next| next.min(self.max_interval))
            .unwrap_or(self.max_interval)
            .max(current)
    }

    /// The waits a poller makes for a job that never leaves pending
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut interval = self.initial_interval;
        let mut waited = Duration::ZERO;

        std::iter::from_fn(move || {
            if waited.saturating_add(interval) > self.max_wait {
                return None;
            }
            let current = interval;
            waited += current;
            interval = self.next_interval(current);
            Some(current)
        })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// A job that reached `Completed`, with polling statistics
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub job: Job,
    /// Number of status reads, including the final one
    pub attempts: u32,
    /// Total time spent sleeping between reads
    pub waited: Duration,
}

/// Polls one kind of job under a [`PollPolicy`]
#[derive(Debug, Clone)]
pub struct JobPoller {
    kind: JobKind,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl JobPoller {
    pub fn new(kind: JobKind, policy: PollPolicy) -> Self {
        Self {
            kind,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `job_id` through `poll_fn` until it completes, fails or times out
    ///
    /// `poll_fn` receives the job id on every tick.
    ///
    /// # Errors
    /// - [`MigrateError::Poll`] if `poll_fn` fails
    /// - [`MigrateError::JobFailed`] if the job reports `failed`
    /// - [`MigrateError::JobTimeout`] if the next wait would exceed the budget
    /// - [`MigrateError::Cancelled`] if the cancellation token fires
    pub async fn await_terminal<F, Fut>(&self, job_id: &str, mut poll_fn: F) -> Result<PollOutcome>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Job>>,
    {
        let kind = self.kind;
        let mut interval = self.policy.initial_interval;
        let mut waited = Duration::ZERO;
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(job_id));
            }

            attempts += 1;
            let job = poll_fn(job_id.to_string())
                .await
                .map_err(|e| MigrateError::Poll {
                    kind,
                    job_id: job_id.to_string(),
                    reason: e.to_string(),
                })?;

            match job.status {
                JobStatus::Completed => {
                    info!(%kind, job_id, attempts, waited_secs = waited.as_secs(), "Job completed");
                    return Ok(PollOutcome {
                        job,
                        attempts,
                        waited,
                    });
                },
                JobStatus::Failed => {
                    warn!(%kind, job_id, attempts, "Job failed");
                    return Err(MigrateError::JobFailed {
                        kind,
                        job_id: job_id.to_string(),
                        detail: job.failure_detail(),
                    });
                },
                JobStatus::Pending => {},
            }

            if waited.saturating_add(interval) > self.policy.max_wait {
                warn!(%kind, job_id, attempts, waited_secs = waited.as_secs(), "Job did not finish in time");
                return Err(MigrateError::JobTimeout {
                    kind,
                    job_id: job_id.to_string(),
                    waited,
                });
            }

            debug!(%kind, job_id, wait_ms = interval.as_millis() as u64, "Job in progress, waiting");

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(self.cancelled(job_id)),
                _ = tokio::time::sleep(interval) => {},
            }

            waited += interval;
            interval = self.policy.next_interval(interval);
        }
    }

    fn cancelled(&self, job_id: &str) -> MigrateError {
        warn!(kind = %self.kind, job_id, "Stopped waiting for job");
        MigrateError::Cancelled(format!("waiting for {} job {}", self.kind, job_id))
    }
}
