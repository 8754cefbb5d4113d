//! Common test utilities: scripted HTTP client, controllable clock, scripted transport

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use taskdash::config::Config;
use taskdash::core::backends::TaskTransport;
use taskdash::core::network::{
    Backend, ClockTrait, FailoverProxy, HttpClientTrait, HttpMethod, HttpResponse, NetworkKind,
    NetworkProbe, Payload, Proxied, ProxyError, ProxyRequest, SendError,
};
use tempfile::TempDir;

pub const DOWNLOAD_PUBLIC: &str = "http://public.test/dv";
pub const DOWNLOAD_PRIVATE: &str = "http://private.test:3456";
pub const TRANSCRIPTION_PUBLIC: &str = "http://public.test/tv";
pub const TRANSCRIPTION_PRIVATE: &str = "http://private.test:6789";

/// Test helper to create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Default config pointed at the `*.test` hosts above
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.backends.download.public_url = DOWNLOAD_PUBLIC.to_string();
    config.backends.download.private_url = DOWNLOAD_PRIVATE.to_string();
    config.backends.transcription.public_url = TRANSCRIPTION_PUBLIC.to_string();
    config.backends.transcription.private_url = TRANSCRIPTION_PRIVATE.to_string();
    config
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub body: Vec<u8>,
    pub timeout_ms: u64,
}

#[derive(Clone)]
enum Scripted {
    Response {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Error(SendError),
}

/// HTTP client answering from a table keyed by exact URL
///
/// Unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Mutex<Option<Duration>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(&self, url: &str, status: u16, body: Value) -> &Self {
        self.insert(
            url,
            Scripted::Response {
                status,
                content_type: Some("application/json".to_string()),
                body: serde_json::to_vec(&body).unwrap(),
            },
        )
    }

    pub fn raw(&self, url: &str, status: u16, content_type: Option<&str>, body: &str) -> &Self {
        self.insert(
            url,
            Scripted::Response {
                status,
                content_type: content_type.map(str::to_string),
                body: body.as_bytes().to_vec(),
            },
        )
    }

    pub fn error(&self, url: &str, message: &str) -> &Self {
        self.insert(url, Scripted::Error(SendError::Transport(message.to_string())))
    }

    /// The client refuses to build the request for `url`
    pub fn reject(&self, url: &str, message: &str) -> &Self {
        self.insert(url, Scripted::Error(SendError::InvalidRequest(message.to_string())))
    }

    /// Every response is delayed by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.url).collect()
    }

    fn insert(&self, url: &str, scripted: Scripted) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), scripted);
        self
    }
}

#[async_trait::async_trait]
impl HttpClientTrait for MockHttpClient {
    async fn send(
        &self,
        method: HttpMethod,
        url: String,
        body: Vec<u8>,
        timeout_ms: u64,
    ) -> Result<HttpResponse, SendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.clone(),
            body,
            timeout_ms,
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().unwrap().get(&url).cloned();
        match scripted {
            Some(Scripted::Response {
                status,
                content_type,
                body,
            }) => Ok(HttpResponse {
                status_code: status,
                content_type,
                body,
                duration: Duration::from_millis(5),
            }),
            Some(Scripted::Error(error)) => Err(error),
            None => Err(SendError::Transport(format!(
                "Request failed: connection refused ({})",
                url
            ))),
        }
    }
}

/// Clock the test moves by hand
pub struct MockClock {
    now: AtomicI64,
}

impl MockClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockTrait for MockClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Probe and proxy wired to one mock client and a mock clock
pub fn build_proxy(
    config: &Config,
    client: Arc<MockHttpClient>,
    clock: Arc<MockClock>,
) -> Arc<FailoverProxy> {
    let probe = Arc::new(NetworkProbe::new(config, client.clone()).with_clock(clock));
    Arc::new(FailoverProxy::new(config, client, probe))
}

type Handler = Box<dyn Fn(&ProxyRequest) -> Option<Result<Payload, ProxyError>> + Send + Sync>;

/// Adapter transport answering from a table keyed by `"METHOD /path?query"`, then from an
/// optional handler that can look at the request body
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Result<Payload, ProxyError>>>,
    handler: Mutex<Option<Handler>>,
    requests: Mutex<Vec<(Backend, ProxyRequest)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(&self, key: &str, value: Value) -> &Self {
        self.set(key, Ok(Payload::Json(value)))
    }

    pub fn text(&self, key: &str, text: &str) -> &Self {
        self.set(key, Ok(Payload::Text(text.to_string())))
    }

    pub fn fail(&self, key: &str, error: ProxyError) -> &Self {
        self.set(key, Err(error))
    }

    pub fn set(&self, key: &str, result: Result<Payload, ProxyError>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), result);
        self
    }

    pub fn respond_with<F>(&self, handler: F)
    where
        F: Fn(&ProxyRequest) -> Option<Result<Payload, ProxyError>> + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap() = Some(Box::new(handler));
    }

    pub fn clear(&self) {
        self.responses.lock().unwrap().clear();
        *self.handler.lock().unwrap() = None;
    }

    pub fn requests(&self) -> Vec<(Backend, ProxyRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|(_, request)| request_key(request))
            .collect()
    }
}

pub fn request_key(request: &ProxyRequest) -> String {
    format!("{} {}", request.method, request.path_and_query())
}

#[async_trait::async_trait]
impl TaskTransport for MockTransport {
    async fn call(&self, backend: Backend, request: ProxyRequest) -> Result<Proxied, ProxyError> {
        let key = request_key(&request);
        let mut scripted = self.responses.lock().unwrap().get(&key).cloned();
        if scripted.is_none() {
            if let Some(handler) = self.handler.lock().unwrap().as_ref() {
                scripted = handler(&request);
            }
        }
        self.requests.lock().unwrap().push((backend, request));

        match scripted {
            Some(result) => result.map(|data| Proxied {
                data,
                network: NetworkKind::Public,
            }),
            None => Err(ProxyError::Status {
                network: NetworkKind::Public,
                status: 404,
            }),
        }
    }
}
