//! Remote verifier: posts samples to the verification service and classifies replies.

use super::{RegisterOutcome, Verifier, VerifyOutcome};
use crate::config::VerifierConfig;
use crate::error::ValidationError;
use crate::features::FeatureVector;
use crate::profile::ProfileBundle;
use crate::storage::UserRecord;
use crate::voice::VoiceSample;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

#[derive(Serialize)]
struct KeystrokeRequest<'a> {
    user: &'a str,
    keystroke_data: &'a FeatureVector,
}

#[derive(Serialize)]
struct VoiceRequest<'a> {
    user: &'a str,
    voice_data: &'a VoiceSample,
}

#[derive(Serialize)]
struct UnregisterRequest<'a> {
    user: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    biometrics: &'a ProfileBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Reply shape shared by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl VerifyResponse {
    fn is_network_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.code == NETWORK_ERROR_CODE)
    }
}

/// Map a decoded reply onto the tagged outcome.
pub fn classify_verify(response: &VerifyResponse) -> VerifyOutcome {
    if response.is_network_error() {
        let reason = response
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        return VerifyOutcome::network(reason);
    }
    if response.success {
        VerifyOutcome::Accepted {
            confidence: response.confidence.unwrap_or(0.0),
        }
    } else {
        VerifyOutcome::Rejected {
            confidence: response.confidence,
        }
    }
}

pub fn classify_register(response: &VerifyResponse) -> RegisterOutcome {
    let reason = response
        .error
        .as_ref()
        .map(|e| format!("{}: {}", e.code, e.message))
        .unwrap_or_else(|| "registration refused".to_string());
    if response.is_network_error() {
        RegisterOutcome::NetworkError { reason }
    } else if response.success {
        RegisterOutcome::Registered {
            user: response.user.clone(),
        }
    } else {
        RegisterOutcome::Rejected { reason }
    }
}

pub struct RemoteVerifier {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteVerifier {
    /// Returns None when no endpoint is configured or the client cannot be built.
    pub fn new(config: &VerifierConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_ref()?.trim_end_matches('/');
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            client,
            base_url: endpoint.to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Any transport, status or decoding failure comes back as Err.
    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<VerifyResponse, String> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().unwrap_or_default();
            return Err(format!("{} {}", status, text));
        }
        res.json::<VerifyResponse>().map_err(|e| e.to_string())
    }

    fn verify(&self, path: &str, body: &impl Serialize) -> VerifyOutcome {
        match self.post(path, body) {
            Ok(response) => classify_verify(&response),
            Err(e) => {
                warn!(path, error = %e, "verifier unreachable");
                VerifyOutcome::network(e)
            }
        }
    }
}

impl Verifier for RemoteVerifier {
    fn verify_keystroke(&self, user: &str, features: &FeatureVector) -> Result<VerifyOutcome, ValidationError> {
        let body = KeystrokeRequest {
            user,
            keystroke_data: features,
        };
        Ok(self.verify("/api/v1/auth/verify/keystroke", &body))
    }

    fn verify_voice(&self, user: &str, sample: &VoiceSample) -> VerifyOutcome {
        let body = VoiceRequest {
            user,
            voice_data: sample,
        };
        self.verify("/api/v1/auth/verify/voice", &body)
    }

    fn register(&self, bundle: &ProfileBundle) -> RegisterOutcome {
        let body = RegisterRequest {
            kind: "register",
            biometrics: bundle,
        };
        match self.post("/api/v1/auth/register", &body) {
            Ok(response) => {
                let outcome = classify_register(&response);
                if matches!(outcome, RegisterOutcome::Registered { .. }) {
                    info!(user = %bundle.user, "remote registration accepted");
                }
                outcome
            }
            Err(e) => {
                warn!(user = %bundle.user, error = %e, "remote registration failed");
                RegisterOutcome::NetworkError { reason: e }
            }
        }
    }

    /// Best effort: the service may already have dropped the pending profile.
    fn unregister(&self, user: &str) {
        match self.post("/api/v1/auth/unregister", &UnregisterRequest { user }) {
            Ok(response) if response.success => info!(user, "remote registration withdrawn"),
            Ok(response) => warn!(user, error = ?response.error, "remote registration not withdrawn"),
            Err(e) => warn!(user, error = %e, "remote registration not withdrawn"),
        }
    }
}
