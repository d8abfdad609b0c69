/// Errors returned by a [`crate::SinkClient`].
///
/// # Examples
///
/// ```rust
/// use cloudmon_sink::error::SinkError;
///
/// let err = SinkError::NoEndpoint;
/// assert!(err.to_string().contains("no time-series endpoint"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The caller passed an empty endpoint list.
    #[error("Sink: no time-series endpoint configured")]
    NoEndpoint,

    /// Every candidate endpoint rejected the write; this is the last rejection.
    #[error("Sink: write to {url} failed: status={status}, body={body}")]
    HttpError {
        url: String,
        status: u16,
        body: String,
    },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Sink: network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Gzip compression of the request body failed.
    #[error("Sink: compression error: {0}")]
    CompressionError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SinkError>;
