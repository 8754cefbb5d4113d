use super::types::{
    BackendsConfig, Config, EndpointConfig, LogServer, NetworkConfig, PollingConfig,
    ServerConfig, TimeoutConfig,
};

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            backends: BackendsConfig::default(),
            timeouts: TimeoutConfig::default(),
            network: NetworkConfig::default(),
            polling: PollingConfig::default(),
            logs: vec![
                LogServer {
                    name: "Download service".to_string(),
                    url: "http://127.0.0.1:3456/logs".to_string(),
                },
                LogServer {
                    name: "Transcription service".to_string(),
                    url: "http://127.0.0.1:6789/logs".to_string(),
                },
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            download: EndpointConfig {
                name: "Download service".to_string(),
                public_url: "http://127.0.0.1:8686/dv".to_string(),
                private_url: "http://127.0.0.1:3456".to_string(),
            },
            transcription: EndpointConfig {
                name: "Transcription service".to_string(),
                public_url: "http://127.0.0.1:8686/tv".to_string(),
                private_url: "http://127.0.0.1:6789".to_string(),
            },
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        BackendsConfig::default().download
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            health_check_ms: 3_000,
            proxy_attempt_ms: 5_000,
            api_request_ms: 30_000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cache_interval_ms: 30_000,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            recent_tasks: 5,
        }
    }
}
