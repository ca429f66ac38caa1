//! Replays a recorded session (keystroke samples plus scripted voice replies)
//! through an orchestrator.

use crate::capture::{KeystrokeEvent, RecordedCapture};
use crate::error::Result;
use crate::orchestrator::{Orchestrator, Stage, Step};
use crate::voice::{VoiceCapture, VoiceModality, VoicePrompt, VoiceSample};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Registration,
    Login,
}

/// One scripted answer from the voice collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum VoiceReply {
    Captured {
        #[serde(default)]
        match_confidence: Option<f64>,
    },
    Skipped,
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScript {
    pub user: String,
    #[serde(default)]
    pub secret: String,
    /// One entry per commit
    #[serde(default)]
    pub keystrokes: Vec<Vec<KeystrokeEvent>>,
    #[serde(default)]
    pub voice: Vec<VoiceReply>,
}

impl SessionScript {
    pub fn load(path: &Path) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Voice collaborator answering from a script; answers `Skipped` once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedVoice {
    replies: VecDeque<VoiceReply>,
    prompts: Vec<VoicePrompt>,
}

impl ScriptedVoice {
    pub fn new(replies: impl IntoIterator<Item = VoiceReply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            prompts: Vec::new(),
        }
    }

    pub fn prompts(&self) -> &[VoicePrompt] {
        &self.prompts
    }
}

impl VoiceModality for ScriptedVoice {
    fn collect_sample(&mut self, prompt: &VoicePrompt) -> VoiceCapture {
        self.prompts.push(prompt.clone());
        match self.replies.pop_front() {
            Some(VoiceReply::Captured { match_confidence }) => VoiceCapture::Captured(VoiceSample {
                id: Uuid::new_v4().to_string(),
                passphrase: prompt.text.clone(),
                audio: Vec::new(),
                match_confidence,
            }),
            Some(VoiceReply::Failed { reason }) => VoiceCapture::Failed(reason),
            Some(VoiceReply::Skipped) | None => VoiceCapture::Skipped,
        }
    }
}

/// Drive `orchestrator` until it finishes or the keystroke samples run out.
pub fn replay(
    orchestrator: &mut Orchestrator,
    capture: &RecordedCapture,
    script: &SessionScript,
    flow: Flow,
) -> Result<Vec<Step>> {
    match flow {
        Flow::Registration => orchestrator.begin_registration(&script.secret)?,
        Flow::Login => orchestrator.begin_login()?,
    }

    let mut samples = script.keystrokes.iter();
    let mut steps = Vec::new();
    loop {
        match orchestrator.stage() {
            Stage::Registering { .. } | Stage::KeystrokeAttempt { .. } => {
                let Some(sample) = samples.next() else { break };
                capture.record_all(orchestrator.field(), sample.iter().cloned());
                debug!(field = %orchestrator.field(), buffered = capture.buffered(orchestrator.field()), "sample typed");
            }
            Stage::VoiceEnrolling { .. } | Stage::VoiceAttempt { .. } => {}
            Stage::Idle | Stage::Finished(_) => break,
        }
        let step = orchestrator.submit()?;
        debug!(step = ?step, "replayed");
        steps.push(step);
    }
    Ok(steps)
}
