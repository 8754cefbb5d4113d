use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskdash::core::network::{
    Backend, NetworkKind, NetworkProbe, NetworkStatus, StatusStore,
};

use crate::common::{
    test_config, MockClock, MockHttpClient, DOWNLOAD_PRIVATE, DOWNLOAD_PUBLIC,
    TRANSCRIPTION_PUBLIC,
};

const START: i64 = 1_700_000_000_000;

fn probe_with(client: Arc<MockHttpClient>, clock: Arc<MockClock>) -> NetworkProbe {
    NetworkProbe::new(&test_config(), client).with_clock(clock)
}

#[tokio::test]
async fn test_fresh_verdict_is_reused_without_probing() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({"ok": true}));
    let clock = Arc::new(MockClock::new(START));
    let probe = probe_with(client.clone(), clock.clone());

    assert!(probe.check_public_network(Backend::Download).await);
    clock.advance(10_000);
    assert!(probe.check_public_network(Backend::Download).await);
    clock.advance(19_999);
    assert!(probe.check_public_network(Backend::Download).await);

    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_stale_verdict_triggers_new_probe() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({}));
    let clock = Arc::new(MockClock::new(START));
    let probe = probe_with(client.clone(), clock.clone());

    assert!(probe.check_public_network(Backend::Download).await);
    clock.advance(30_000);

    // Public path went down since the last probe
    client.error(DOWNLOAD_PUBLIC, "connection reset");
    assert!(!probe.check_public_network(Backend::Download).await);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_probe_failure_degrades_to_private() {
    let client = Arc::new(MockHttpClient::new());
    client.error(DOWNLOAD_PUBLIC, "Request failed: timeout");
    let probe = probe_with(client.clone(), Arc::new(MockClock::new(START)));

    assert!(!probe.check_public_network(Backend::Download).await);
    assert_eq!(probe.selected_network(Backend::Download).await, NetworkKind::Private);
    assert_eq!(probe.api_base_url(Backend::Download).await, DOWNLOAD_PRIVATE);
    // Still a single probe: the failed verdict is cached too
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_non_success_status_counts_as_unavailable() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 502, json!({"error": "bad gateway"}));
    let probe = probe_with(client, Arc::new(MockClock::new(START)));

    assert!(!probe.check_public_network(Backend::Download).await);
}

#[tokio::test]
async fn test_api_base_url_prefers_public_when_reachable() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({}));
    let probe = probe_with(client, Arc::new(MockClock::new(START)));

    assert_eq!(probe.api_base_url(Backend::Download).await, DOWNLOAD_PUBLIC);
}

#[tokio::test]
async fn test_probe_uses_health_check_timeout_and_get() {
    let client = Arc::new(MockHttpClient::new());
    client.json(TRANSCRIPTION_PUBLIC, 200, json!({}));
    let probe = probe_with(client.clone(), Arc::new(MockClock::new(START)));

    probe.check_public_network(Backend::Transcription).await;

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, TRANSCRIPTION_PUBLIC);
    assert_eq!(calls[0].timeout_ms, 3_000);
    assert!(calls[0].body.is_empty());
}

#[tokio::test]
async fn test_backends_are_cached_independently() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({}));
    let probe = probe_with(client.clone(), Arc::new(MockClock::new(START)));

    assert!(probe.check_public_network(Backend::Download).await);
    assert!(!probe.check_public_network(Backend::Transcription).await);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_probe() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({}));
    client.set_delay(Duration::from_millis(50));
    let probe = probe_with(client.clone(), Arc::new(MockClock::new(START)));

    let (first, second) = tokio::join!(
        probe.check_public_network(Backend::Download),
        probe.check_public_network(Backend::Download),
    );

    assert!(first);
    // The second caller got the last known verdict instead of probing again
    assert!(!second);
    assert_eq!(client.call_count(), 1);
    assert!(!probe.store(Backend::Download).check_in_progress());
}

#[tokio::test]
async fn test_injected_store_seeds_the_verdict() {
    let client = Arc::new(MockHttpClient::new());
    let store = Arc::new(StatusStore::with_status(NetworkStatus {
        is_public_available: true,
        last_checked: Some(START),
    }));
    let probe = probe_with(client.clone(), Arc::new(MockClock::new(START + 1_000)))
        .with_store(Backend::Download, store.clone());

    assert!(probe.check_public_network(Backend::Download).await);
    assert_eq!(client.call_count(), 0);

    store.refresh(false, START + 1_000);
    assert_eq!(probe.selected_network(Backend::Download).await, NetworkKind::Private);
}

#[tokio::test]
async fn test_status_snapshot_reports_probe_start_time() {
    let client = Arc::new(MockHttpClient::new());
    client.json(DOWNLOAD_PUBLIC, 200, json!({}));
    let probe = probe_with(client, Arc::new(MockClock::new(START)));

    let before = probe.status(Backend::Download);
    assert!(!before.is_public_available);
    assert_eq!(before.last_checked, 0);

    probe.check_public_network(Backend::Download).await;
    let after = probe.status(Backend::Download);
    assert!(after.is_public_available);
    assert_eq!(after.last_checked, START);
    assert_eq!(after.cache_expiry, START + 30_000);
    assert_eq!(after.mode, NetworkKind::Public);

    let value = serde_json::to_value(&after).unwrap();
    assert_eq!(value["isPublicAvailable"], json!(true));
    assert_eq!(value["cacheExpiry"], json!(START + 30_000));
}

#[test]
fn test_network_status_freshness_window() {
    let status = NetworkStatus {
        is_public_available: true,
        last_checked: Some(1_000),
    };
    assert!(status.is_fresh(1_000, 30_000));
    assert!(status.is_fresh(30_999, 30_000));
    assert!(!status.is_fresh(31_000, 30_000));
    assert!(!NetworkStatus::default().is_fresh(0, 30_000));
}
