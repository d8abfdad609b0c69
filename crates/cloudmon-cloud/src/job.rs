use crate::error::{CloudError, Result};
use crate::sdk::ProviderSdk;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

pub const JOB_STATUS_SUCCESS: &str = "SUCCESS";
pub const JOB_STATUS_FAIL: &str = "FAIL";

pub const DEFAULT_JOB_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// An asynchronous vendor operation. Any status other than `SUCCESS`
/// and `FAIL` means it is still running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    #[serde(default)]
    pub job_type: String,
    pub status: String,
    #[serde(default)]
    pub fail_reason: String,
    #[serde(default)]
    pub entities: JobEntities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobEntities {
    #[serde(default)]
    pub sub_jobs: Vec<Job>,
}

impl Job {
    pub fn is_success(&self) -> bool {
        self.status == JOB_STATUS_SUCCESS
    }

    pub fn is_failed(&self) -> bool {
        self.status == JOB_STATUS_FAIL
    }

    /// The job's own fail reason followed by those of its sub-jobs, depth first.
    pub fn fail_reasons(&self) -> String {
        let mut reasons = Vec::new();
        self.collect_fail_reasons(&mut reasons);
        reasons.join("; ")
    }

    fn collect_fail_reasons(&self, out: &mut Vec<String>) {
        if !self.fail_reason.is_empty() {
            out.push(self.fail_reason.clone());
        }
        for sub in &self.entities.sub_jobs {
            sub.collect_fail_reasons(out);
        }
    }
}

/// Poll `job_id` every `interval` until it succeeds, fails or `timeout` elapses.
///
/// Returns the job on `SUCCESS`, [`CloudError::JobFailed`] on `FAIL` and
/// [`CloudError::JobTimeout`] carrying the last observed job otherwise.
pub async fn wait_job_success(
    sdk: &dyn ProviderSdk,
    cancel: &CancellationToken,
    service: &str,
    region: &str,
    job_id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<Job> {
    let deadline = Instant::now() + timeout;
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            job = sdk.get_job(service, region, job_id) => job?,
        };

        if job.is_success() {
            return Ok(job);
        }
        if job.is_failed() {
            return Err(CloudError::JobFailed {
                job_id: job_id.to_string(),
                reason: job.fail_reasons(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(CloudError::JobTimeout {
                job_id: job_id.to_string(),
                last: Box::new(job),
            });
        }

        tracing::debug!(job_id, service, region, status = %job.status, "Job still running");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            _ = sleep(interval.min(deadline - now)) => {}
        }
    }
}
