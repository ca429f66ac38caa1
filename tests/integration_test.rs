//! Integration test: config load, storage round-trip, capture buffers, remote reply classification.

mod common;

use common::{store_refusing_meta, typed};
use std::path::Path;
use typeprint::capture::{CaptureSource, FieldId, KeyPhase, KeystrokeEvent, RecordedCapture};
use typeprint::config::{AuthConfig, LabelPolicy, TransportFailurePolicy, VerifierConfig, VerifierMode};
use typeprint::features::FeatureExtractor;
use typeprint::logging::{AuditEvent, StructuredLogger};
use typeprint::profile::{ProfileBundle, ProfileTrainer, VoiceProfile};
use typeprint::storage::{ProfileStore, SecureStore, UserRecord};
use typeprint::verifier::{classify_register, classify_verify, ApiError, RegisterOutcome, RemoteVerifier, VerifyOutcome, VerifyResponse};

fn bundle(user: &str) -> ProfileBundle {
    let v = FeatureExtractor::default().extract(&typed("hunter2", 90.0, 120.0));
    let profile = ProfileTrainer::new(100).train(&[v.clone(), v], "label-digest").unwrap();
    ProfileBundle::new(
        user,
        profile,
        VoiceProfile {
            passphrase: "I'll Always Choose You".to_string(),
            samples: Vec::new(),
        },
    )
}

#[test]
fn config_load_default() {
    let c = AuthConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.enrollment.keystroke_samples, 5);
    assert_eq!(c.enrollment.voice_samples, 3);
    assert_eq!(c.enrollment.label_policy, LabelPolicy::Digest);
    assert_eq!(c.login.min_confidence, 0.85);
    assert_eq!(c.login.max_keystroke_attempts, 2);
    assert_eq!(c.login.max_voice_attempts, 4);
    assert_eq!(c.login.transport_failure_policy, TransportFailurePolicy::ConsumeAttempt);
    assert_eq!(c.features.feature_dim, 100);
    assert!(!c.features.reserve_summary_stats);
    assert_eq!(c.scoring.distance_divisor, 10.0);
    assert_eq!(c.scoring.std_epsilon, 1e-4);
    assert_eq!(c.verifier.mode, VerifierMode::Local);
}

#[test]
fn config_load_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeprint.json");
    std::fs::write(
        &path,
        r#"{"login": {"max_voice_attempts": 2, "transport_failure_policy": "retry_free"}, "log": {"json": false}}"#,
    )
    .unwrap();
    let c = AuthConfig::load(&path);
    assert_eq!(c.login.max_voice_attempts, 2);
    assert_eq!(c.login.max_keystroke_attempts, 2);
    assert_eq!(c.login.transport_failure_policy, TransportFailurePolicy::RetryFree);
    assert!(!c.log.json);
    assert_eq!(c.log.level, "info");
}

#[test]
fn config_load_invalid_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeprint.json");
    std::fs::write(&path, "{not json").unwrap();
    assert_eq!(AuthConfig::load(&path).login.max_voice_attempts, 4);
}

#[test]
fn config_out_of_range_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeprint.json");
    std::fs::write(&path, r#"{"features": {"feature_dim": 0}}"#).unwrap();
    assert_eq!(AuthConfig::load(&path).features.feature_dim, 100);
}

#[test]
fn config_validation_names_the_bad_key() {
    assert!(AuthConfig::default().validate().is_ok());

    let mut c = AuthConfig::default();
    c.scoring.distance_divisor = 0.0;
    assert_eq!(c.validate().unwrap_err().key, "scoring.distance_divisor");

    let mut c = AuthConfig::default();
    c.login.min_confidence = 1.5;
    assert_eq!(c.validate().unwrap_err().key, "login.min_confidence");

    let mut c = AuthConfig::default();
    c.login.max_voice_attempts = 0;
    assert_eq!(c.validate().unwrap_err().key, "login.max_voice_attempts");
}

#[test]
fn commit_registration_writes_bundle_and_current_user() {
    let store = SecureStore::open_in_memory(b"test-secret").unwrap();
    let user = UserRecord::new("alice");
    store.commit_registration(&bundle("alice"), &user).unwrap();
    assert!(store.load_bundle("alice").unwrap().is_some());
    assert_eq!(store.current_user().unwrap(), Some(user));
}

#[test]
fn commit_registration_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_refusing_meta(&dir);
    let result = store.commit_registration(&bundle("alice"), &UserRecord::new("alice"));
    assert!(matches!(result, Err(typeprint::StoreError::Sqlite(_))));
    assert!(store.load_bundle("alice").unwrap().is_none());
    assert!(store.current_user().unwrap().is_none());
}

#[test]
fn storage_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.db");
    let store = SecureStore::open(&path, b"test-secret").unwrap();
    let b = bundle("alice");
    store.save_bundle(&b).unwrap();

    let out = store.load_bundle("alice").unwrap().unwrap();
    assert_eq!(out, b);
    assert!(store.load_bundle("bob").unwrap().is_none());

    let raw = std::fs::read(&path).unwrap();
    let needle = b"label-digest";
    assert!(!raw.windows(needle.len()).any(|w| w == needle));

    assert!(store.delete_bundle("alice").unwrap());
    assert!(store.load_bundle("alice").unwrap().is_none());
}

#[test]
fn storage_wrong_secret_cannot_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.db");
    SecureStore::open(&path, b"right").unwrap().save_bundle(&bundle("alice")).unwrap();
    let other = SecureStore::open(&path, b"wrong").unwrap();
    assert!(matches!(other.load_bundle("alice"), Err(typeprint::StoreError::Cipher)));
}

#[test]
fn current_user_session() {
    let store = SecureStore::open_in_memory(b"test-secret").unwrap();
    assert!(store.current_user().unwrap().is_none());
    let user = UserRecord::new("alice");
    store.set_current_user(&user).unwrap();
    assert_eq!(store.current_user().unwrap(), Some(user));
    store.clear_current_user().unwrap();
    assert!(store.current_user().unwrap().is_none());
}

#[test]
fn recorded_capture_read_and_clear() {
    let mut capture = RecordedCapture::new();
    let field = FieldId::new("pw");
    assert!(!capture.record(&field, KeystrokeEvent::press("a", 0.0)));

    let handle = capture.start_capture(&field);
    assert!(capture.record(&field, KeystrokeEvent::press("a", 0.0)));
    assert!(capture.record_now(&field, "a", KeyPhase::Release));
    let events = capture.read_and_clear(&handle);
    assert_eq!(events.len(), 2);
    assert!(events[1].offset_ms >= 0.0);
    assert!(capture.read_and_clear(&handle).is_empty());

    capture.stop(&handle);
    assert!(!capture.is_capturing(&field));
}

#[test]
fn stale_handle_does_not_drain_new_capture() {
    let mut capture = RecordedCapture::new();
    let field = FieldId::new("pw");
    let old = capture.start_capture(&field);
    let new = capture.start_capture(&field);
    capture.record(&field, KeystrokeEvent::press("a", 0.0));
    assert!(capture.read_and_clear(&old).is_empty());
    capture.stop(&old);
    assert!(capture.is_capturing(&field));
    assert_eq!(capture.read_and_clear(&new).len(), 1);
}

#[test]
fn key_events_accept_browser_names() {
    let events: Vec<KeystrokeEvent> = serde_json::from_str(
        r#"[{"key":"a","phase":"keydown","timestamp":0},{"key":"a","phase":"release","offset_ms":95.5}]"#,
    )
    .unwrap();
    assert_eq!(events[0].phase, KeyPhase::Press);
    assert_eq!(events[1].offset_ms, 95.5);
}

#[test]
fn remote_reply_classification() {
    let accepted = VerifyResponse {
        success: true,
        confidence: Some(0.9),
        ..Default::default()
    };
    assert_eq!(classify_verify(&accepted), VerifyOutcome::Accepted { confidence: 0.9 });

    let rejected = VerifyResponse {
        success: false,
        confidence: Some(0.3),
        ..Default::default()
    };
    assert_eq!(classify_verify(&rejected), VerifyOutcome::Rejected { confidence: Some(0.3) });

    let network = VerifyResponse {
        error: Some(ApiError {
            code: "NETWORK_ERROR".to_string(),
            message: "Failed to authenticate".to_string(),
        }),
        ..Default::default()
    };
    assert_eq!(classify_verify(&network), VerifyOutcome::network("Failed to authenticate"));
    assert!(matches!(classify_register(&network), RegisterOutcome::NetworkError { .. }));

    let registered: VerifyResponse = serde_json::from_str(r#"{"success":true,"user":{"id":"u1","username":"alice"}}"#).unwrap();
    match classify_register(&registered) {
        RegisterOutcome::Registered { user: Some(u) } => assert_eq!(u.username, "alice"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn remote_verifier_needs_endpoint() {
    assert!(RemoteVerifier::new(&VerifierConfig::default()).is_none());
    let config = VerifierConfig {
        mode: VerifierMode::Remote,
        endpoint: Some("https://verify.example.com/".to_string()),
        ..Default::default()
    };
    let remote = RemoteVerifier::new(&config).unwrap();
    assert_eq!(remote.base_url(), "https://verify.example.com");
}

#[test]
fn audit_line_is_single_json_object() {
    let mut audit = AuditEvent::new("info", "session finished");
    audit.user = Some("alice");
    audit.outcome = Some("authenticated");
    audit.confidence = Some(0.97);
    let mut buf = Vec::new();
    StructuredLogger::emit_json(&audit, &mut buf).unwrap();
    let line = String::from_utf8(buf).unwrap();
    assert_eq!(line.lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["outcome"], "authenticated");
    assert!(value.get("error").is_none());
}

#[test]
fn tracing_sink_remembers_termination() {
    use typeprint::presentation::{Notice, PresentationSink, TracingSink};
    let sink = TracingSink::new();
    sink.notify(Notice::info("Typing verification active"));
    assert!(!sink.terminated());
    sink.terminate_session();
    assert!(sink.terminated());
}
