//! Structured JSON-Lines debug logging for the gateway.
//!
//! Every silently-degraded failure (probe error, suppressed public attempt, failed poll)
//! is recorded here so it can be diagnosed without being shown to dashboard users.

use std::collections::HashMap;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: usize = 5;
const ROTATION_CHECK_INTERVAL: u32 = 200;

const ENV_DEBUG: &str = "TASKDASH_DEBUG";
const ENV_LOG_PATH: &str = "TASKDASH_LOG_PATH";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    /// DEBUG, ERROR, NETWORK, PROXY, POLL
    pub level: String,
    pub component: String,
    pub event: String,
    pub message: String,
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, Value>,
}

struct RotatingLogger {
    log_path: PathBuf,
    write_count: AtomicU32,
}

impl RotatingLogger {
    fn new(log_path: PathBuf) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        Self {
            log_path,
            write_count: AtomicU32::new(0),
        }
    }

    fn append(&self, json_line: &str) -> Result<(), std::io::Error> {
        if self.write_count.fetch_add(1, Ordering::Relaxed) % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_needed();
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", json_line)
    }

    fn rotate_if_needed(&self) -> Result<(), std::io::Error> {
        if !self.needs_rotation()? {
            return Ok(());
        }

        // Another process holding the lock is already rotating
        let lock_path = self.log_path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Ok(());
        }

        let result = if self.needs_rotation()? {
            self.rotate()
        } else {
            Ok(())
        };
        let _ = std::fs::remove_file(&lock_path);
        result
    }

    fn needs_rotation(&self) -> Result<bool, std::io::Error> {
        if !self.log_path.exists() {
            return Ok(false);
        }
        let metadata = std::fs::metadata(&self.log_path)?;
        Ok(metadata.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024)
    }

    fn archive_stem(&self) -> String {
        self.log_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "taskdash-debug".to_string())
    }

    fn log_dir(&self) -> PathBuf {
        self.log_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn rotate(&self) -> Result<(), std::io::Error> {
        let archive_name = format!(
            "{}.{}.gz",
            self.archive_stem(),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let archive_path = self.log_dir().join(archive_name);

        let temp_path = self.log_path.with_extension("rotating");
        std::fs::rename(&self.log_path, &temp_path)?;

        let source = File::open(&temp_path)?;
        let mut encoder = GzEncoder::new(File::create(&archive_path)?, Compression::default());
        std::io::copy(&mut BufReader::new(source), &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&temp_path)?;

        let _ = self.prune_archives();
        Ok(())
    }

    fn prune_archives(&self) -> Result<(), std::io::Error> {
        let prefix = format!("{}.", self.archive_stem());

        let mut archives = Vec::new();
        for entry in std::fs::read_dir(self.log_dir())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }

        archives.sort_by_key(|(_, modified)| *modified);
        if archives.len() > MAX_ARCHIVES {
            let excess = archives.len() - MAX_ARCHIVES;
            for (path, _) in archives.iter().take(excess) {
                let _ = std::fs::remove_file(path);
            }
        }
        Ok(())
    }
}

pub struct EnhancedDebugLogger {
    enabled: bool,
    sink: Option<Mutex<RotatingLogger>>,
    session_id: String,
    redaction_patterns: Vec<Regex>,
}

impl EnhancedDebugLogger {
    /// Logger configured from `TASKDASH_DEBUG` / `TASKDASH_LOG_PATH`
    pub fn new() -> Self {
        let enabled = Self::parse_debug_enabled();
        let path = if enabled { Some(Self::log_path()) } else { None };
        Self::build(path)
    }

    /// Logger writing to an explicit file, regardless of environment
    pub fn with_path(log_path: PathBuf) -> Self {
        Self::build(Some(log_path))
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self::build(None)
    }

    fn build(log_path: Option<PathBuf>) -> Self {
        Self {
            enabled: log_path.is_some(),
            sink: log_path.map(|path| Mutex::new(RotatingLogger::new(path))),
            session_id: Uuid::new_v4().to_string()[..8].to_string(),
            redaction_patterns: Self::compile_redaction_patterns(),
        }
    }

    /// Accepts true/false, 1/0, yes/no, on/off (case insensitive)
    fn parse_debug_enabled() -> bool {
        env::var(ENV_DEBUG)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(false)
    }

    fn log_path() -> PathBuf {
        if let Ok(path) = env::var(ENV_LOG_PATH) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".taskdash")
            .join("taskdash-debug.log")
    }

    fn compile_redaction_patterns() -> Vec<Regex> {
        [
            r"(?i)authorization[:\s]+[^\s\n]+",
            r"(?i)bearer[:\s]+[^\s\n]+",
            r"(?i)token[:=\s]+[^\s\n&]+",
            r"(?i)password[:=\s]+[^\s\n&]+",
            r"(?i)api[_-]?key[:=\s]+[^\s\n&]+",
            r"(?i)secret[:=\s]+[^\s\n&]+",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    }

    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for regex in &self.redaction_patterns {
            redacted = regex.replace_all(&redacted, "[REDACTED]").to_string();
        }
        redacted
    }

    fn log(
        &self,
        level: &str,
        component: &str,
        event: &str,
        message: &str,
        correlation_id: Option<String>,
        fields: HashMap<String, Value>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            component: component.to_string(),
            event: event.to_string(),
            message: self.redact(message),
            correlation_id: correlation_id.or_else(|| Some(self.session_id.clone())),
            fields,
        };

        if let Some(sink) = &self.sink {
            if let (Ok(sink), Ok(line)) = (sink.lock(), serde_json::to_string(&entry)) {
                let _ = sink.append(&line);
            }
        }
    }

    pub fn debug(&self, component: &str, event: &str, message: &str) {
        self.log("DEBUG", component, event, message, None, HashMap::new());
    }

    pub fn error(&self, component: &str, event: &str, message: &str) {
        self.log("ERROR", component, event, message, None, HashMap::new());
    }

    // Network probe

    pub fn probe_start(&self, backend: &str, url: &str, timeout_ms: u64) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));
        fields.insert("timeout_ms".to_string(), Value::from(timeout_ms));

        self.log(
            "NETWORK",
            "NetworkProbe",
            "probe_start",
            &format!("Probing public path {}", url),
            None,
            fields,
        );
    }

    pub fn probe_end(&self, backend: &str, available: bool, detail: &str, duration_ms: u64) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));
        fields.insert("public_available".to_string(), Value::Bool(available));
        fields.insert("duration_ms".to_string(), Value::from(duration_ms));

        self.log(
            "NETWORK",
            "NetworkProbe",
            "probe_end",
            &format!("Probe completed: {} ({}ms)", detail, duration_ms),
            None,
            fields,
        );
    }

    // Failover proxy

    pub fn proxy_attempt(&self, backend: &str, network: &str, method: &str, path: &str) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));
        fields.insert("network".to_string(), Value::from(network));
        fields.insert("method".to_string(), Value::from(method));

        self.log(
            "PROXY",
            "FailoverProxy",
            "proxy_attempt",
            &format!("{} {}", method, path),
            None,
            fields,
        );
    }

    pub fn proxy_fallback(&self, backend: &str, path: &str, cause: &str) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));
        fields.insert("path".to_string(), Value::from(path));

        self.log(
            "PROXY",
            "FailoverProxy",
            "proxy_fallback",
            &format!("Public attempt suppressed, trying private: {}", cause),
            None,
            fields,
        );
    }

    pub fn proxy_failed(&self, backend: &str, path: &str, cause: &str) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));
        fields.insert("path".to_string(), Value::from(path));

        self.log("ERROR", "FailoverProxy", "proxy_failed", cause, None, fields);
    }

    // Adapters and polling

    pub fn adapter_normalize(&self, backend: &str, detail: &str) {
        let mut fields = HashMap::new();
        fields.insert("backend".to_string(), Value::from(backend));

        self.log("DEBUG", "BackendAdapter", "adapter_normalize", detail, None, fields);
    }

    pub fn poll_failed(&self, part: &str, cause: &str) {
        let mut fields = HashMap::new();
        fields.insert("part".to_string(), Value::from(part));

        self.log(
            "POLL",
            "Poller",
            "poll_failed",
            &format!("{} refresh failed, keeping previous value: {}", part, cause),
            None,
            fields,
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Default for EnhancedDebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide logger, configured from the environment on first use
pub fn get_debug_logger() -> &'static EnhancedDebugLogger {
    static LOGGER: OnceLock<EnhancedDebugLogger> = OnceLock::new();
    LOGGER.get_or_init(EnhancedDebugLogger::new)
}
