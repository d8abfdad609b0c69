use crate::error::{CloudError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// How long the client stays locked after an HTTP 429.
pub const RATE_LIMIT_HOLD: Duration = Duration::from_secs(15);
/// Granularity of the wait while the client is locked.
pub const LOCK_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_RATE_LIMIT_RETRIES: usize = 3;

/// A vendor API request, kept transport-agnostic so it can be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Query string and body rendered for error messages.
    fn params(&self) -> String {
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        match &self.body {
            Some(body) if query.is_empty() => body.to_string(),
            Some(body) => format!("{query} {body}"),
            None => query,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Raw HTTP exchange, the seam tests replace with a scripted transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest` transport with bearer-token authentication.
pub struct ReqwestTransport {
    client: Client,
    token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, token })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.query);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

#[derive(Debug)]
struct RateLimitLock {
    locked: bool,
    release_at: Instant,
}

/// Per-client throttle shared by every request issued through one [`SdkClient`].
#[derive(Debug)]
struct Throttle {
    state: Mutex<RateLimitLock>,
}

impl Throttle {
    fn new() -> Self {
        Self {
            state: Mutex::new(RateLimitLock {
                locked: false,
                release_at: Instant::now(),
            }),
        }
    }

    fn lock(&self, hold: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.locked = true;
        state.release_at = Instant::now() + hold;
    }

    /// The pending release instant, unlocking once it has passed.
    fn pending_release(&self) -> Option<Instant> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.locked {
            return None;
        }
        if state.release_at <= Instant::now() {
            state.locked = false;
            return None;
        }
        Some(state.release_at)
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        while let Some(release_at) = self.pending_release() {
            tracing::debug!(
                remaining_ms = release_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Client rate limited, waiting for release"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CloudError::Cancelled),
                _ = sleep(LOCK_CHECK_INTERVAL) => {}
            }
        }
        Ok(())
    }
}

/// JSON API client with a shared rate-limit lock.
///
/// 2xx bodies are parsed as JSON, 404 becomes [`CloudError::NotFound`],
/// 429 locks the client for [`RATE_LIMIT_HOLD`] and retries up to
/// [`MAX_RATE_LIMIT_RETRIES`] times, and any other status becomes
/// [`CloudError::HttpError`].
pub struct SdkClient {
    transport: Arc<dyn HttpTransport>,
    throttle: Throttle,
    cancel: CancellationToken,
}

impl SdkClient {
    pub fn new(transport: Arc<dyn HttpTransport>, cancel: CancellationToken) -> Self {
        Self {
            transport,
            throttle: Throttle::new(),
            cancel,
        }
    }

    pub async fn request(&self, request: &ApiRequest) -> Result<serde_json::Value> {
        let mut retries = 0;
        loop {
            self.throttle.wait(&self.cancel).await?;

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(CloudError::Cancelled),
                response = self.transport.execute(request) => response?,
            };

            match response.status {
                200..=299 => {
                    if response.body.trim().is_empty() {
                        return Ok(serde_json::Value::Null);
                    }
                    return Ok(serde_json::from_str(&response.body)?);
                }
                404 => {
                    return Err(CloudError::NotFound(format!(
                        "{} {}",
                        request.method, request.url
                    )))
                }
                429 if retries < MAX_RATE_LIMIT_RETRIES => {
                    retries += 1;
                    tracing::warn!(
                        url = %request.url,
                        retries,
                        "Rate limited, locking client for {:?}",
                        RATE_LIMIT_HOLD
                    );
                    self.throttle.lock(RATE_LIMIT_HOLD);
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(CloudError::Cancelled),
                        _ = sleep(RATE_LIMIT_HOLD) => {}
                    }
                }
                429 => {
                    self.throttle.lock(RATE_LIMIT_HOLD);
                    return Err(CloudError::RateLimited {
                        url: request.url.clone(),
                        retries,
                    })
                }
                status => {
                    return Err(CloudError::HttpError {
                        status,
                        url: request.url.clone(),
                        params: request.params(),
                        body: response.body,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Replays `responses` in order and records when each call happened.
    struct ScriptedTransport {
        responses: StdMutex<Vec<ApiResponse>>,
        calls: StdMutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|(status, body)| ApiResponse {
                            status,
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                calls: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok(self.responses.lock().unwrap().pop().unwrap_or(ApiResponse {
                status: 200,
                body: "{}".to_string(),
            }))
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> SdkClient {
        SdkClient::new(transport, CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_json_when_status_is_success() {
        let transport = ScriptedTransport::new(vec![(200, r#"{"metrics":[]}"#)]);
        let value = client(transport)
            .request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap();
        assert_eq!(value["metrics"], serde_json::json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_404_to_not_found() {
        let transport = ScriptedTransport::new(vec![(404, "gone")]);
        let err = client(transport)
            .request(&ApiRequest::get("http://sdk/v1/jobs/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_out_rate_limit_before_next_call() {
        let transport = ScriptedTransport::new(vec![(429, ""), (200, "{}")]);
        let sdk = client(Arc::clone(&transport));

        sdk.request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= RATE_LIMIT_HOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_concurrent_requests_while_locked() {
        let transport = ScriptedTransport::new(vec![(429, "")]);
        let sdk = Arc::new(client(Arc::clone(&transport)));

        let first = {
            let sdk = Arc::clone(&sdk);
            tokio::spawn(async move { sdk.request(&ApiRequest::get("http://sdk/a")).await })
        };
        // Let the first request hit the 429 and lock the client.
        sleep(Duration::from_secs(1)).await;
        sdk.request(&ApiRequest::get("http://sdk/b")).await.unwrap();
        first.await.unwrap().unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1] - calls[0] >= RATE_LIMIT_HOLD);
        assert!(calls[2] - calls[0] >= RATE_LIMIT_HOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_up_after_max_retries() {
        let transport = ScriptedTransport::new(vec![(429, ""); MAX_RATE_LIMIT_RETRIES + 1]);
        let err = client(Arc::clone(&transport))
            .request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::RateLimited { retries, .. } if retries == MAX_RATE_LIMIT_RETRIES));
        assert_eq!(transport.calls().len(), MAX_RATE_LIMIT_RETRIES + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_client_after_exhausting_retries() {
        let mut script = vec![(429, ""); MAX_RATE_LIMIT_RETRIES + 1];
        script.push((200, "{}"));
        let transport = ScriptedTransport::new(script);
        let sdk = client(Arc::clone(&transport));

        let err = sdk
            .request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::RateLimited { .. }));

        sdk.request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), MAX_RATE_LIMIT_RETRIES + 2);
        let last_429 = calls[MAX_RATE_LIMIT_RETRIES];
        let next = calls[MAX_RATE_LIMIT_RETRIES + 1];
        assert!(next - last_429 >= RATE_LIMIT_HOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_request_params_on_http_error() {
        let transport = ScriptedTransport::new(vec![(500, "boom")]);
        let request = ApiRequest::post("http://sdk/v1/metrics", serde_json::json!({"a": 1}))
            .with_query("region", "r1");
        let err = client(transport).request(&request).await.unwrap_err();

        match err {
            CloudError::HttpError {
                status,
                params,
                body,
                ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(params, r#"region=r1 {"a":1}"#);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_cancelled_when_token_already_fired() {
        let transport = ScriptedTransport::new(vec![(429, "")]);
        let cancel = CancellationToken::new();
        let sdk = SdkClient::new(transport, cancel.clone());
        cancel.cancel();

        let err = sdk
            .request(&ApiRequest::get("http://sdk/v1/metrics"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Cancelled));
    }
}
