/*!
Failover proxy: one logical request against a named backend, hiding which physical
network served it.

## Modes

- **Fallback** (`proxy_with_fallback`): public first with the short attempt timeout,
  then private with the same timeout. A request-level failure is more authoritative
  than a cached probe verdict, so this mode never consults the probe.
- **Explicit** (`proxy_request`): a single attempt against a caller-chosen network,
  used by the health sweep and by callers that already resolved the network.
- **Probe-resolved** (`proxy_resolved`): picks the network from the [`NetworkProbe`]
  cache and issues a single attempt with the general API timeout.

## Error classification

| Outcome | Variant | Falls back |
|---|---|---|
| connection/DNS/timeout | `Network` | yes |
| URL cannot be built | `InvalidRequest` | no |
| non-2xx | `Status` | yes |
| 2xx with undecodable body | `Malformed` | no |
| both paths failed | `BothFailed` | n/a |
*/

use crate::config::{BackendsConfig, Config};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::client::{HttpClientTrait, HttpResponse, SendError};
use crate::core::network::probe::NetworkProbe;
use crate::core::network::types::{
    Backend, HealthReport, HttpMethod, NetworkKind, PathHealth, Payload, Proxied, ProxyError,
    ProxyRequest,
};
use std::sync::Arc;
use url::Url;

pub struct FailoverProxy {
    backends: BackendsConfig,
    http_client: Arc<dyn HttpClientTrait>,
    probe: Arc<NetworkProbe>,
    attempt_timeout_ms: u64,
    api_timeout_ms: u64,
}

impl FailoverProxy {
    pub fn new(
        config: &Config,
        http_client: Arc<dyn HttpClientTrait>,
        probe: Arc<NetworkProbe>,
    ) -> Self {
        Self {
            backends: config.backends.clone(),
            http_client,
            probe,
            attempt_timeout_ms: config.timeouts.proxy_attempt_ms,
            api_timeout_ms: config.timeouts.api_request_ms,
        }
    }

    pub fn probe(&self) -> &Arc<NetworkProbe> {
        &self.probe
    }

    /// Full URL of `request` on the given network
    ///
    /// Existing percent escapes are kept as-is; characters not valid in a URL are escaped.
    pub fn build_url(
        &self,
        backend: Backend,
        network: NetworkKind,
        request: &ProxyRequest,
    ) -> Result<String, ProxyError> {
        let base = self.backends.endpoint(backend).base_url(network);
        let mut url = Url::parse(base).map_err(|e| {
            ProxyError::InvalidRequest(format!("invalid base URL {}: {}", base, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(ProxyError::InvalidRequest(format!(
                "base URL cannot carry a path: {}",
                base
            )));
        }

        let path = format!("{}{}", url.path().trim_end_matches('/'), request.path);
        url.set_path(&path);
        url.set_query(request.query.as_deref());
        Ok(url.into())
    }

    /// Public first, private on network failure or non-2xx
    pub async fn proxy_with_fallback(
        &self,
        backend: Backend,
        request: &ProxyRequest,
    ) -> Result<Proxied, ProxyError> {
        validate_request(request)?;
        let logger = get_debug_logger();

        let public_error = match self
            .attempt(backend, NetworkKind::Public, request, self.attempt_timeout_ms)
            .await
        {
            Ok(data) => {
                return Ok(Proxied {
                    data,
                    network: NetworkKind::Public,
                })
            }
            Err(e) if !e.triggers_fallback() => {
                logger.proxy_failed(&backend.to_string(), &request.path, &e.to_string());
                return Err(e);
            }
            Err(e) => e,
        };

        logger.proxy_fallback(&backend.to_string(), &request.path, &public_error.to_string());

        match self
            .attempt(backend, NetworkKind::Private, request, self.attempt_timeout_ms)
            .await
        {
            Ok(data) => Ok(Proxied {
                data,
                network: NetworkKind::Private,
            }),
            Err(private_error) => {
                let error = if private_error.triggers_fallback() {
                    ProxyError::BothFailed {
                        public: Box::new(public_error),
                        private: Box::new(private_error),
                    }
                } else {
                    private_error
                };
                logger.proxy_failed(&backend.to_string(), &request.path, &error.to_string());
                Err(error)
            }
        }
    }

    /// Single attempt on an explicitly chosen network, no fallback
    pub async fn proxy_request(
        &self,
        backend: Backend,
        network: NetworkKind,
        request: &ProxyRequest,
    ) -> Result<Proxied, ProxyError> {
        validate_request(request)?;
        let data = self
            .attempt(backend, network, request, self.api_timeout_ms)
            .await?;
        Ok(Proxied { data, network })
    }

    /// Single attempt on the network currently recommended by the probe
    pub async fn proxy_resolved(
        &self,
        backend: Backend,
        request: &ProxyRequest,
    ) -> Result<Proxied, ProxyError> {
        let network = self.probe.selected_network(backend).await;
        self.proxy_request(backend, network, request).await
    }

    /// Whether `GET {base}/` on the given path answers 2xx within the attempt timeout
    pub async fn check_health(&self, backend: Backend, network: NetworkKind) -> bool {
        let url = format!("{}/", self.backends.endpoint(backend).base_url(network));
        match self
            .http_client
            .send(HttpMethod::Get, url, Vec::new(), self.attempt_timeout_ms)
            .await
        {
            Ok(response) => response.is_success(),
            Err(_) => false,
        }
    }

    /// Probe every backend/network combination independently
    pub async fn health_report(&self) -> HealthReport {
        let (tv_public, tv_private, dv_public, dv_private) = tokio::join!(
            self.check_health(Backend::Transcription, NetworkKind::Public),
            self.check_health(Backend::Transcription, NetworkKind::Private),
            self.check_health(Backend::Download, NetworkKind::Public),
            self.check_health(Backend::Download, NetworkKind::Private),
        );

        HealthReport {
            tv: PathHealth {
                public: tv_public,
                private: tv_private,
            },
            dv: PathHealth {
                public: dv_public,
                private: dv_private,
            },
        }
    }

    async fn attempt(
        &self,
        backend: Backend,
        network: NetworkKind,
        request: &ProxyRequest,
        timeout_ms: u64,
    ) -> Result<Payload, ProxyError> {
        let url = self.build_url(backend, network, request)?;
        get_debug_logger().proxy_attempt(
            &backend.to_string(),
            &network.to_string(),
            request.method.as_str(),
            &request.path_and_query(),
        );

        let response = self
            .http_client
            .send(request.method, url, request.body_bytes(), timeout_ms)
            .await
            .map_err(|e| match e {
                SendError::InvalidRequest(message) => ProxyError::InvalidRequest(message),
                SendError::Transport(message) => ProxyError::Network { network, message },
            })?;

        if !response.is_success() {
            return Err(ProxyError::Status {
                network,
                status: response.status_code,
            });
        }

        decode_payload(network, response)
    }
}

/// Interpret a 2xx body: plain text is passed through, everything else must be JSON
pub fn decode_payload(network: NetworkKind, response: HttpResponse) -> Result<Payload, ProxyError> {
    let content_type = response.content_type.as_deref().unwrap_or("");

    if content_type.starts_with("text/") && !content_type.starts_with("text/html") {
        return Ok(Payload::Text(String::from_utf8_lossy(&response.body).into_owned()));
    }

    if response.body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Payload::Json(serde_json::Value::Null));
    }

    serde_json::from_slice(&response.body)
        .map(Payload::Json)
        .map_err(|e| ProxyError::Malformed {
            network,
            message: format!("expected JSON body ({}): {}", content_type_label(content_type), e),
        })
}

fn content_type_label(content_type: &str) -> &str {
    if content_type.is_empty() {
        "no content type"
    } else {
        content_type
    }
}

/// Reject requests that could escape the configured base URL
fn validate_request(request: &ProxyRequest) -> Result<(), ProxyError> {
    if request.path.contains("://") {
        return Err(ProxyError::InvalidRequest(format!(
            "path must be relative to the backend: {}",
            request.path
        )));
    }
    if request.path.split('/').any(is_parent_segment) {
        return Err(ProxyError::InvalidRequest(format!(
            "path traversal is not allowed: {}",
            request.path
        )));
    }
    if request.path.chars().any(char::is_whitespace) {
        return Err(ProxyError::InvalidRequest(format!(
            "path contains whitespace: {:?}",
            request.path
        )));
    }
    Ok(())
}

/// `..`, including its percent-encoded spellings
fn is_parent_segment(segment: &str) -> bool {
    segment.to_ascii_lowercase().replace("%2e", ".") == ".."
}
