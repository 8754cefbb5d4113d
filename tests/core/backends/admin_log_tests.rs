use std::sync::Arc;

use serde_json::json;
use taskdash::core::backends::{AdapterError, AdminLogClient, CreateAdminLog, UpdateAdminLog};
use taskdash::core::network::{Backend, HttpMethod};

use crate::common::MockTransport;

fn setup() -> (Arc<MockTransport>, AdminLogClient) {
    let transport = Arc::new(MockTransport::new());
    let client = AdminLogClient::new(transport.clone());
    (transport, client)
}

#[tokio::test]
async fn test_list_targets_transcription_backend() {
    let (transport, client) = setup();
    transport.json(
        "GET /admin-log",
        json!([
            {
                "id": "1",
                "name": "download",
                "address": "http://10.0.0.2:3456/logs",
                "created_at": "2024-01-01"
            },
            {"id": 2, "name": "tts", "address": "http://10.0.0.3:6789/logs"}
        ]),
    );

    let logs = client.list().await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].id, "2");
    assert_eq!(logs[1].created_at, "");
    assert_eq!(transport.requests()[0].0, Backend::Transcription);
}

#[tokio::test]
async fn test_create_requires_name_and_address() {
    let (transport, client) = setup();

    let missing_name = CreateAdminLog {
        name: " ".into(),
        address: "http://x".into(),
    };
    assert!(matches!(
        client.create(&missing_name).await.unwrap_err(),
        AdapterError::Validation(_)
    ));
    assert!(transport.requests().is_empty());

    transport.json(
        "POST /admin-log",
        json!({"data": {"id": "9", "name": "tts", "address": "http://x", "created_at": "now"}}),
    );
    let created = client
        .create(&CreateAdminLog {
            name: "tts".into(),
            address: "http://x".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "9");
}

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    let (transport, client) = setup();
    transport.json(
        "PUT /admin-log/9",
        json!({"id": "9", "name": "renamed", "address": "http://x", "created_at": "now"}),
    );

    let updated = client
        .update(
            "9",
            &UpdateAdminLog {
                name: Some("renamed".into()),
                address: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");

    let request = &transport.requests()[0].1;
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.body, Some(json!({"name": "renamed"})));

    let error = client.update("9", &UpdateAdminLog::default()).await.unwrap_err();
    assert!(matches!(error, AdapterError::Validation(_)));
}

#[tokio::test]
async fn test_delete() {
    let (transport, client) = setup();
    transport.json("DELETE /admin-log/9", json!({"success": true}));

    client.delete("9").await.unwrap();
    assert_eq!(transport.keys(), vec!["DELETE /admin-log/9".to_string()]);
}
