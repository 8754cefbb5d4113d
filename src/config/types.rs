use crate::core::network::types::{Backend, NetworkKind};
use serde::{Deserialize, Serialize};

/// Effective gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backends: BackendsConfig,
    pub timeouts: TimeoutConfig,
    pub network: NetworkConfig,
    pub polling: PollingConfig,
    /// Log-viewer registry shown on the logs page
    pub logs: Vec<LogServer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:3000`
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub download: EndpointConfig,
    pub transcription: EndpointConfig,
}

impl BackendsConfig {
    pub fn endpoint(&self, backend: Backend) -> &EndpointConfig {
        match backend {
            Backend::Download => &self.download,
            Backend::Transcription => &self.transcription,
        }
    }

    pub fn endpoint_mut(&mut self, backend: Backend) -> &mut EndpointConfig {
        match backend {
            Backend::Download => &mut self.download,
            Backend::Transcription => &mut self.transcription,
        }
    }
}

/// Public and private base URLs of one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub name: String,
    pub public_url: String,
    pub private_url: String,
}

impl EndpointConfig {
    /// Base URL for the given network, without trailing slash
    pub fn base_url(&self, network: NetworkKind) -> &str {
        let url = match network {
            NetworkKind::Public => &self.public_url,
            NetworkKind::Private => &self.private_url,
        };
        url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Network probe GET timeout
    pub health_check_ms: u64,
    /// Timeout of each failover attempt and of per-path health checks
    pub proxy_attempt_ms: u64,
    /// Timeout of general API calls (probe-resolved mode)
    pub api_request_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// How long a probe verdict is reused without a new probe
    pub cache_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Recent tasks kept per backend in the dashboard snapshot
    pub recent_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogServer {
    pub name: String,
    pub url: String,
}
