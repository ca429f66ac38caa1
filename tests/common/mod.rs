//! Shared fakes for orchestrator tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use typeprint::capture::{FieldId, KeystrokeEvent, RecordedCapture};
use typeprint::config::AuthConfig;
use typeprint::error::ValidationError;
use typeprint::features::FeatureVector;
use typeprint::orchestrator::{Collaborators, Orchestrator};
use typeprint::presentation::{Notice, PresentationSink};
use typeprint::profile::ProfileBundle;
use typeprint::replay::{ScriptedVoice, VoiceReply};
use typeprint::storage::{SecureStore, UserRecord};
use typeprint::verifier::{RegisterOutcome, Verifier, VerifyOutcome};
use typeprint::voice::{VoiceCapture, VoiceModality, VoicePrompt};

/// Types `word` with a fixed hold time and gap between keys, starting at 0 ms.
pub fn typed(word: &str, dwell: f64, gap: f64) -> Vec<KeystrokeEvent> {
    let mut t = 0.0;
    let mut out = Vec::new();
    for c in word.chars() {
        let key = c.to_string();
        out.push(KeystrokeEvent::press(&key, t));
        out.push(KeystrokeEvent::release(&key, t + dwell));
        t += dwell + gap;
    }
    out
}

#[derive(Default)]
pub struct RecordingSink {
    pub notices: Mutex<Vec<Notice>>,
    pub terminations: AtomicUsize,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl PresentationSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    fn terminate_session(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers from queues; empty queues reject.
pub struct FakeVerifier {
    pub keystroke: Mutex<VecDeque<VerifyOutcome>>,
    pub voice: Mutex<VecDeque<VerifyOutcome>>,
    pub register: RegisterOutcome,
    pub keystroke_calls: AtomicUsize,
    pub voice_calls: AtomicUsize,
    pub registered: Mutex<Vec<ProfileBundle>>,
}

impl FakeVerifier {
    pub fn new(keystroke: Vec<VerifyOutcome>, voice: Vec<VerifyOutcome>) -> Self {
        Self {
            keystroke: Mutex::new(keystroke.into()),
            voice: Mutex::new(voice.into()),
            register: RegisterOutcome::Registered { user: None },
            keystroke_calls: AtomicUsize::new(0),
            voice_calls: AtomicUsize::new(0),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn keystroke_calls(&self) -> usize {
        self.keystroke_calls.load(Ordering::SeqCst)
    }

    pub fn voice_calls(&self) -> usize {
        self.voice_calls.load(Ordering::SeqCst)
    }
}

impl Verifier for FakeVerifier {
    fn verify_keystroke(&self, _user: &str, _features: &FeatureVector) -> Result<VerifyOutcome, ValidationError> {
        self.keystroke_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .keystroke
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VerifyOutcome::Rejected { confidence: None }))
    }

    fn verify_voice(&self, _user: &str, _sample: &typeprint::voice::VoiceSample) -> VerifyOutcome {
        self.voice_calls.fetch_add(1, Ordering::SeqCst);
        self.voice
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VerifyOutcome::Rejected { confidence: None })
    }

    fn register(&self, bundle: &ProfileBundle) -> RegisterOutcome {
        self.registered.lock().unwrap().push(bundle.clone());
        self.register.clone()
    }

    fn unregister(&self, user: &str) {
        self.registered.lock().unwrap().retain(|b| b.user != user);
    }
}

/// Scripted voice that also counts prompts.
pub struct CountingVoice {
    inner: ScriptedVoice,
    pub prompts: Arc<Mutex<Vec<VoicePrompt>>>,
}

impl CountingVoice {
    pub fn new(replies: Vec<VoiceReply>) -> Self {
        Self {
            inner: ScriptedVoice::new(replies),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl VoiceModality for CountingVoice {
    fn collect_sample(&mut self, prompt: &VoicePrompt) -> VoiceCapture {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.inner.collect_sample(prompt)
    }
}

pub fn captured(confidence: f64) -> VoiceReply {
    VoiceReply::Captured {
        match_confidence: Some(confidence),
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub capture: RecordedCapture,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<SecureStore>,
    pub prompts: Arc<Mutex<Vec<VoicePrompt>>>,
    pub field: FieldId,
}

impl Harness {
    pub fn new(config: &AuthConfig, verifier: Arc<dyn Verifier>, voice: Vec<VoiceReply>) -> Self {
        let store = Arc::new(SecureStore::open_in_memory(b"test-secret").unwrap());
        Self::with_store(config, verifier, voice, store)
    }

    pub fn with_store(
        config: &AuthConfig,
        verifier: Arc<dyn Verifier>,
        voice: Vec<VoiceReply>,
        store: Arc<SecureStore>,
    ) -> Self {
        let capture = RecordedCapture::new();
        let sink = Arc::new(RecordingSink::default());
        let voice = CountingVoice::new(voice);
        let prompts = voice.prompts.clone();
        let field = FieldId::new("password");
        let collab = Collaborators {
            capture: Box::new(capture.clone()),
            verifier,
            voice: Box::new(voice),
            sink: sink.clone(),
            store: store.clone(),
        };
        let orchestrator = Orchestrator::new(field.clone(), "alice", config, collab);
        Self {
            orchestrator,
            capture,
            sink,
            store,
            prompts,
            field,
        }
    }

    /// Type a sample into the field and commit it.
    pub fn type_and_submit(&mut self, events: Vec<KeystrokeEvent>) -> typeprint::orchestrator::Step {
        assert!(self.capture.record_all(&self.field, events));
        self.orchestrator.submit().unwrap()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

pub fn user(name: &str) -> UserRecord {
    UserRecord::new(name)
}

/// On-disk store whose `meta` table refuses writes, so the current-user half
/// of a registration commit fails after the profile row went in.
pub fn store_refusing_meta(dir: &tempfile::TempDir) -> Arc<SecureStore> {
    let path = dir.path().join("profiles.db");
    let store = SecureStore::open(&path, b"test-secret").unwrap();
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER refuse_meta BEFORE INSERT ON meta BEGIN SELECT RAISE(ABORT, 'meta is read-only'); END;",
    )
    .unwrap();
    Arc::new(store)
}
