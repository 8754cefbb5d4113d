// Core types for the dual-network gateway
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Remote services fronted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Video download service (routes under `/api/dv`)
    Download,
    /// Speech-to-text service (routes under `/api/tv`)
    Transcription,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Download, Backend::Transcription];

    /// Short route/JSON key used by the dashboard (`dv` / `tv`)
    pub fn route_key(&self) -> &'static str {
        match self {
            Backend::Download => "dv",
            Backend::Transcription => "tv",
        }
    }

    pub fn from_route_key(key: &str) -> Option<Self> {
        match key {
            "dv" => Some(Backend::Download),
            "tv" => Some(Backend::Transcription),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Download => write!(f, "download"),
            Backend::Transcription => write!(f, "transcription"),
        }
    }
}

/// The two physical paths to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Public,
    Private,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Public => write!(f, "public"),
            NetworkKind::Private => write!(f, "private"),
        }
    }
}

/// HTTP methods forwarded by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and HEAD never carry a request body
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "HEAD" => Some(HttpMethod::Head),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical request against a backend, independent of the network that serves it
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: HttpMethod,
    /// Path relative to the backend base URL, always starting with `/`
    pub path: String,
    /// Already-serialized query string without the leading `?`
    pub query: Option<String>,
    pub body: Option<Value>,
}

impl ProxyRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            query: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a raw query string (as received from a client); empty strings are ignored
    pub fn with_raw_query(mut self, query: Option<&str>) -> Self {
        self.query = query
            .map(|q| q.trim_start_matches('?'))
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        self
    }

    /// Serialize query pairs, skipping empty values
    pub fn with_query_pairs<K, V, I>(mut self, pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in pairs {
            if value.as_ref().is_empty() {
                continue;
            }
            serializer.append_pair(key.as_ref(), value.as_ref());
            any = true;
        }
        self.query = if any { Some(serializer.finish()) } else { None };
        self
    }

    /// Path plus query string, as appended to a base URL
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Body bytes to send; always empty for GET/HEAD
    pub fn body_bytes(&self) -> Vec<u8> {
        if !self.method.allows_body() {
            return Vec::new();
        }
        match &self.body {
            Some(body) => serde_json::to_vec(body).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

/// Parsed body of a successful backend response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }
}

/// Successful proxied call tagged with the network that served it
#[derive(Debug, Clone, PartialEq)]
pub struct Proxied {
    pub data: Payload,
    pub network: NetworkKind,
}

/// Failover proxy errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyError {
    /// Connection refused, DNS failure, timeout
    #[error("{network} network unreachable: {message}")]
    Network {
        network: NetworkKind,
        message: String,
    },
    #[error("{network} network request failed with status {status}")]
    Status { network: NetworkKind, status: u16 },
    /// Backend answered 2xx but the body is not what it claims to be
    #[error("malformed response from {network} network: {message}")]
    Malformed {
        network: NetworkKind,
        message: String,
    },
    #[error("Both public and private networks failed: public: {public}; private: {private}")]
    BothFailed {
        public: Box<ProxyError>,
        private: Box<ProxyError>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    /// Whether this failure should send the request to the other network
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, ProxyError::Network { .. } | ProxyError::Status { .. })
    }
}

/// Per-path reachability of both backends, as returned by `/api/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathHealth {
    pub public: bool,
    pub private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    /// Transcription backend
    pub tv: PathHealth,
    /// Download backend
    pub dv: PathHealth,
}

impl HealthReport {
    pub fn for_backend(&self, backend: Backend) -> PathHealth {
        match backend {
            Backend::Download => self.dv,
            Backend::Transcription => self.tv,
        }
    }

    /// Effective network mode: public when every public path is healthy, private when every
    /// private path is, otherwise `None` (keep the current mode)
    pub fn preferred_mode(&self) -> Option<NetworkKind> {
        if self.tv.public && self.dv.public {
            Some(NetworkKind::Public)
        } else if self.tv.private && self.dv.private {
            Some(NetworkKind::Private)
        } else {
            None
        }
    }
}

/// Read-only view of a backend's cached probe verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub is_public_available: bool,
    /// Epoch milliseconds of the last completed probe (0 = never)
    pub last_checked: i64,
    pub cache_expiry: i64,
    pub mode: NetworkKind,
}

/// Current epoch time in milliseconds
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate standardized local timezone ISO-8601 timestamp
pub fn get_local_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Gateway setup errors
#[derive(Debug)]
pub enum NetworkError {
    HttpError(String),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}
