//! Voice fallback seam. Audio acquisition and voice matching live outside the
//! engine; it only exchanges one request/response per attempt.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicePurpose {
    Enrollment,
    Login,
}

/// What the voice collaborator is asked to do for a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePrompt {
    pub text: String,
    pub purpose: VoicePurpose,
    /// 1-based
    pub attempt: u32,
    pub attempts_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSample {
    pub id: String,
    pub passphrase: String,
    #[serde(serialize_with = "encode_audio", deserialize_with = "decode_audio", default)]
    pub audio: Vec<u8>,
    /// Match confidence computed by the voice collaborator, when it has one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub match_confidence: Option<f64>,
}

fn encode_audio<S: Serializer>(audio: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&BASE64.encode(audio))
}

fn decode_audio<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(d)?;
    BASE64.decode(encoded).map_err(serde::de::Error::custom)
}

/// Result of one voice collection.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceCapture {
    Captured(VoiceSample),
    /// User declined or dismissed the prompt
    Skipped,
    /// Device or transport failure
    Failed(String),
}

pub trait VoiceModality: Send {
    fn collect_sample(&mut self, prompt: &VoicePrompt) -> VoiceCapture;
}
