/*!
Dashboard poller

A [`Poller`] refreshes a shared [`DashboardSnapshot`] on a fixed interval. The loop runs on
a tokio task owned by a [`PollHandle`]; calling `stop()` or dropping the handle ends it, so
whoever started polling also controls its lifetime.

Each cycle fans out every part concurrently. A part that fails keeps its previous value
and emits a `poll_failed` event; stale data is preferred over an empty dashboard.
*/

use crate::core::backends::{
    AdapterError, DownloadAdapter, DownloadQuery, QueueStatus, Task, TaskStats,
    TranscriptionAdapter, TranscriptionQuery,
};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::{epoch_millis, FailoverProxy, HealthReport, NetworkKind};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub download_stats: Option<TaskStats>,
    pub transcription_stats: Option<TaskStats>,
    pub recent_downloads: Vec<Task>,
    pub recent_transcriptions: Vec<Task>,
    pub queue_status: Option<QueueStatus>,
    pub health: Option<HealthReport>,
    pub mode: NetworkKind,
    /// Epoch milliseconds of the last completed cycle
    pub last_updated: Option<i64>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            download_stats: None,
            transcription_stats: None,
            recent_downloads: Vec::new(),
            recent_transcriptions: Vec::new(),
            queue_status: None,
            health: None,
            mode: NetworkKind::Public,
            last_updated: None,
        }
    }
}

/// Sources and current value of the dashboard
pub struct DashboardState {
    download: Arc<DownloadAdapter>,
    transcription: Arc<TranscriptionAdapter>,
    proxy: Arc<FailoverProxy>,
    recent_tasks: u32,
    snapshot: RwLock<DashboardSnapshot>,
}

impl DashboardState {
    pub fn new(
        download: Arc<DownloadAdapter>,
        transcription: Arc<TranscriptionAdapter>,
        proxy: Arc<FailoverProxy>,
        recent_tasks: u32,
    ) -> Self {
        Self {
            download,
            transcription,
            proxy,
            recent_tasks: recent_tasks.max(1),
            snapshot: RwLock::new(DashboardSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot
            .read()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default()
    }

    /// Run one poll cycle and merge whatever succeeded into the snapshot
    pub async fn refresh_once(&self) -> DashboardSnapshot {
        let download_query = DownloadQuery {
            limit: self.recent_tasks,
            ..DownloadQuery::default()
        };
        let transcription_query = TranscriptionQuery {
            page_size: self.recent_tasks,
            ..TranscriptionQuery::default()
        };

        let (download_stats, transcription_stats, downloads, transcriptions, queue, health) =
            tokio::join!(
                self.download.stats(),
                self.transcription.stats(),
                self.download.list_tasks(&download_query),
                self.transcription.list_tasks(&transcription_query),
                self.transcription.queue_status(),
                self.proxy.health_report(),
            );

        let mut next = self.snapshot();
        if let Some(stats) = keep("download_stats", download_stats) {
            next.download_stats = Some(stats);
        }
        if let Some(stats) = keep("transcription_stats", transcription_stats) {
            next.transcription_stats = Some(stats);
        }
        if let Some(page) = keep("recent_downloads", downloads) {
            next.recent_downloads = page.data;
        }
        if let Some(page) = keep("recent_transcriptions", transcriptions) {
            next.recent_transcriptions = page.data;
        }
        if let Some(queue) = keep("queue_status", queue) {
            next.queue_status = Some(queue);
        }
        if let Some(mode) = health.preferred_mode() {
            next.mode = mode;
        }
        next.health = Some(health);
        next.last_updated = Some(epoch_millis());

        if let Ok(mut snapshot) = self.snapshot.write() {
            *snapshot = next.clone();
        }
        next
    }
}

fn keep<T>(part: &str, result: Result<T, AdapterError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            get_debug_logger().poll_failed(part, &e.to_string());
            None
        }
    }
}

/// Handle to a running poll loop; dropping it stops the loop
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Signal the loop to stop and wait until it has exited
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

pub struct Poller {
    state: Arc<DashboardState>,
    interval: Duration,
}

impl Poller {
    pub fn new(state: Arc<DashboardState>, interval: Duration) -> Self {
        Self { state, interval }
    }

    /// Start polling: one cycle immediately, then one per interval
    pub fn start(self) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let Poller { state, interval } = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        state.refresh_once().await;
                    }
                }
            }
        });

        PollHandle {
            stop_tx,
            task: Some(task),
        }
    }
}
