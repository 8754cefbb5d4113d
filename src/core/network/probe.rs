/*!
Network probe: is the public path to a backend reachable right now?

Each backend owns a [`StatusStore`], an injectable state object exposing `get()` and
`refresh()`. The probe reuses a verdict for the configured cache window and guards
each store with a best-effort single-flight flag: a caller arriving while a check is
in flight gets the last known verdict instead of starting a second probe.

Probe failures never surface as errors. Timeouts, connection errors and non-2xx
responses all degrade to "public unavailable", which routes traffic to the private
base URL.
*/

use crate::config::{BackendsConfig, Config};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::client::HttpClientTrait;
use crate::core::network::types::{epoch_millis, Backend, HttpMethod, NetworkKind, NetworkSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Clock abstraction for dependency injection and testing
pub trait ClockTrait: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_millis(&self) -> i64;
}

/// Production clock implementation using system time
#[derive(Default)]
pub struct SystemClock;

impl ClockTrait for SystemClock {
    fn now_millis(&self) -> i64 {
        epoch_millis()
    }
}

/// Cached probe verdict for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStatus {
    pub is_public_available: bool,
    /// Epoch milliseconds of the last probe, `None` until the first one
    pub last_checked: Option<i64>,
}

impl NetworkStatus {
    pub fn is_fresh(&self, now: i64, window_ms: u64) -> bool {
        match self.last_checked {
            Some(checked) => now.saturating_sub(checked) < window_ms as i64,
            None => false,
        }
    }
}

/// Process-wide state object for one backend's probe verdict
#[derive(Debug, Default)]
pub struct StatusStore {
    status: Mutex<NetworkStatus>,
    check_in_progress: AtomicBool,
}

/// Clears the in-progress flag when the probe finishes or its future is dropped
struct CheckGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a verdict
    pub fn with_status(status: NetworkStatus) -> Self {
        Self {
            status: Mutex::new(status),
            check_in_progress: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> NetworkStatus {
        self.status.lock().map(|status| *status).unwrap_or_default()
    }

    pub fn refresh(&self, is_public_available: bool, checked_at: i64) {
        if let Ok(mut status) = self.status.lock() {
            status.is_public_available = is_public_available;
            status.last_checked = Some(checked_at);
        }
    }

    pub fn check_in_progress(&self) -> bool {
        self.check_in_progress.load(Ordering::Acquire)
    }

    fn try_begin_check(&self) -> Option<CheckGuard<'_>> {
        self.check_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CheckGuard {
                flag: &self.check_in_progress,
            })
    }
}

/// Public-path reachability cache for both backends
pub struct NetworkProbe {
    backends: BackendsConfig,
    download: Arc<StatusStore>,
    transcription: Arc<StatusStore>,
    http_client: Arc<dyn HttpClientTrait>,
    clock: Arc<dyn ClockTrait>,
    timeout_ms: u64,
    cache_window_ms: u64,
}

impl NetworkProbe {
    pub fn new(config: &Config, http_client: Arc<dyn HttpClientTrait>) -> Self {
        Self {
            backends: config.backends.clone(),
            download: Arc::new(StatusStore::new()),
            transcription: Arc::new(StatusStore::new()),
            http_client,
            clock: Arc::new(SystemClock),
            timeout_ms: config.timeouts.health_check_ms,
            cache_window_ms: config.network.cache_interval_ms,
        }
    }

    /// Configure with custom clock (for testing)
    pub fn with_clock(mut self, clock: Arc<dyn ClockTrait>) -> Self {
        self.clock = clock;
        self
    }

    /// Substitute the state object of one backend
    pub fn with_store(mut self, backend: Backend, store: Arc<StatusStore>) -> Self {
        match backend {
            Backend::Download => self.download = store,
            Backend::Transcription => self.transcription = store,
        }
        self
    }

    pub fn store(&self, backend: Backend) -> &Arc<StatusStore> {
        match backend {
            Backend::Download => &self.download,
            Backend::Transcription => &self.transcription,
        }
    }

    pub fn cache_window_ms(&self) -> u64 {
        self.cache_window_ms
    }

    /// Whether the public path of `backend` is reachable
    ///
    /// Returns the cached verdict while it is fresh or while another caller is probing;
    /// otherwise performs one bounded GET against the public base URL.
    pub async fn check_public_network(&self, backend: Backend) -> bool {
        let store = self.store(backend);
        let now = self.clock.now_millis();

        let cached = store.get();
        if cached.is_fresh(now, self.cache_window_ms) {
            return cached.is_public_available;
        }

        let _guard = match store.try_begin_check() {
            Some(guard) => guard,
            None => return cached.is_public_available,
        };

        let url = self
            .backends
            .endpoint(backend)
            .base_url(NetworkKind::Public)
            .to_string();
        let logger = get_debug_logger();
        logger.probe_start(&backend.to_string(), &url, self.timeout_ms);

        let (available, detail, duration_ms) = match self
            .http_client
            .send(HttpMethod::Get, url, Vec::new(), self.timeout_ms)
            .await
        {
            Ok(response) => (
                response.is_success(),
                format!("HTTP {}", response.status_code),
                response.duration.as_millis() as u64,
            ),
            Err(e) => (false, e.to_string(), 0),
        };

        store.refresh(available, now);
        logger.probe_end(&backend.to_string(), available, &detail, duration_ms);

        available
    }

    /// Network the probe currently recommends for `backend`
    pub async fn selected_network(&self, backend: Backend) -> NetworkKind {
        if self.check_public_network(backend).await {
            NetworkKind::Public
        } else {
            NetworkKind::Private
        }
    }

    /// Public base URL when reachable, private otherwise
    pub async fn api_base_url(&self, backend: Backend) -> String {
        let network = self.selected_network(backend).await;
        self.backends.endpoint(backend).base_url(network).to_string()
    }

    /// Cached verdict without probing
    pub fn status(&self, backend: Backend) -> NetworkSnapshot {
        let status = self.store(backend).get();
        let last_checked = status.last_checked.unwrap_or(0);
        NetworkSnapshot {
            is_public_available: status.is_public_available,
            last_checked,
            cache_expiry: last_checked + self.cache_window_ms as i64,
            mode: if status.is_public_available {
                NetworkKind::Public
            } else {
                NetworkKind::Private
            },
        }
    }
}
