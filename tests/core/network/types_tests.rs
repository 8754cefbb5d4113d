use serde_json::json;
use taskdash::core::network::{
    Backend, HealthReport, HttpMethod, NetworkKind, PathHealth, Payload, ProxyRequest,
};

#[test]
fn test_backend_route_keys() {
    assert_eq!(Backend::Download.route_key(), "dv");
    assert_eq!(Backend::Transcription.route_key(), "tv");
    assert_eq!(Backend::from_route_key("tv"), Some(Backend::Transcription));
    assert_eq!(Backend::from_route_key("xx"), None);
}

#[test]
fn test_request_path_gets_leading_slash() {
    let request = ProxyRequest::get("tts/models");
    assert_eq!(request.path, "/tts/models");
    assert_eq!(request.path_and_query(), "/tts/models");
}

#[test]
fn test_query_pairs_skip_empty_values_and_encode() {
    let request = ProxyRequest::get("/tts/tasks").with_query_pairs([
        ("page", "2"),
        ("status", ""),
        ("location", "a b&c"),
    ]);
    assert_eq!(request.path_and_query(), "/tts/tasks?page=2&location=a+b%26c");

    let empty = ProxyRequest::get("/tts/tasks").with_query_pairs([("status", "")]);
    assert_eq!(empty.query, None);
}

#[test]
fn test_raw_query_is_kept_verbatim() {
    let request = ProxyRequest::get("/tts/srt-to-txt").with_raw_query(Some("file=a%20b.srt"));
    assert_eq!(request.path_and_query(), "/tts/srt-to-txt?file=a%20b.srt");
    assert_eq!(ProxyRequest::get("/x").with_raw_query(Some("")).query, None);
}

#[test]
fn test_body_bytes_only_for_body_methods() {
    let body = json!({"name": "x"});
    assert!(ProxyRequest::get("/x").with_body(body.clone()).body_bytes().is_empty());
    assert!(!ProxyRequest::new(HttpMethod::Put, "/x").with_body(body).body_bytes().is_empty());
    assert!(ProxyRequest::delete("/x").body_bytes().is_empty());
}

#[test]
fn test_http_method_parse() {
    assert_eq!(HttpMethod::parse("patch"), Some(HttpMethod::Patch));
    assert_eq!(HttpMethod::parse("TRACE"), None);
    assert!(!HttpMethod::Head.allows_body());
}

#[test]
fn test_preferred_mode() {
    let all_up = PathHealth { public: true, private: true };
    let public_only = PathHealth { public: true, private: false };
    let private_only = PathHealth { public: false, private: true };

    let report = HealthReport { tv: all_up, dv: public_only };
    assert_eq!(report.preferred_mode(), Some(NetworkKind::Public));

    let report = HealthReport { tv: private_only, dv: all_up };
    assert_eq!(report.preferred_mode(), Some(NetworkKind::Private));

    let report = HealthReport { tv: public_only, dv: private_only };
    assert_eq!(report.preferred_mode(), None);
    assert_eq!(report.for_backend(Backend::Download), private_only);
}

#[test]
fn test_payload_serializes_untagged() {
    assert_eq!(serde_json::to_value(Payload::Json(json!({"a": 1}))).unwrap(), json!({"a": 1}));
    assert_eq!(serde_json::to_value(Payload::Text("hi".into())).unwrap(), json!("hi"));
    assert_eq!(Payload::Text("hi".into()).into_json(), json!("hi"));
}
