use crate::job::Job;
use cloudmon_sink::error::SinkError;

/// Errors that can occur while talking to a provider SDK or collecting metrics.
///
/// # Examples
///
/// ```rust
/// use cloudmon_cloud::error::CloudError;
///
/// let err = CloudError::NotSupported("vm_disk.used_percent".to_string());
/// assert!(err.is_not_implemented());
/// assert!(err.to_string().contains("vm_disk.used_percent"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The vendor does not publish this metric family or resource kind.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The vendor refuses this request shape for this resource.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The resource no longer exists (HTTP 404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// HTTP 429 persisted after every retry.
    #[error("API rate limited after {retries} retries: {url}")]
    RateLimited { url: String, retries: usize },

    /// Non-success status code, surfaced with the request for diagnostics.
    #[error("API HTTP error: status={status}, url={url}, params={params}, body={body}")]
    HttpError {
        status: u16,
        url: String,
        params: String,
        body: String,
    },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The polled job reached the `FAIL` state.
    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    /// The polled job did not reach a terminal state in time.
    #[error("Timed out waiting for job {job_id}, last status {}", .last.status)]
    JobTimeout { job_id: String, last: Box<Job> },

    /// The ambient cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Missing endpoints, credentials or other invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No collect driver is registered for this provider tag.
    #[error("No collect driver registered for provider {0}")]
    DriverNotFound(String),

    /// The time-series sink rejected the batch.
    #[error(transparent)]
    SinkError(#[from] SinkError),
}

impl CloudError {
    /// `NotImplemented` and `NotSupported` mean "no data here", never a failure.
    pub fn is_not_implemented(&self) -> bool {
        matches!(
            self,
            CloudError::NotImplemented(_) | CloudError::NotSupported(_)
        )
    }

    /// Metric requests yielding no data: unimplemented, unsupported or a vanished resource.
    pub fn is_no_data(&self) -> bool {
        self.is_not_implemented() || matches!(self, CloudError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
