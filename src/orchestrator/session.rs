//! Orchestrator implementation. Stage data (samples, budgets) lives inside the
//! phase so that leaving a phase drops whatever it buffered.

use super::{AbandonReason, AttemptState, Modality, SessionOutcome, Stage, Step};
use crate::capture::{CaptureHandle, CaptureSource, FieldId, KeystrokeEvent};
use crate::config::{AuthConfig, EnrollmentConfig, LoginConfig, TransportFailurePolicy};
use crate::error::{AuthError, Result};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::presentation::{Notice, PresentationSink};
use crate::profile::{label_for, BiometricProfile, ProfileBundle, ProfileTrainer, VoiceProfile};
use crate::storage::{ProfileStore, UserRecord};
use crate::verifier::{RegisterOutcome, Verifier, VerifyOutcome};
use crate::voice::{VoiceCapture, VoiceModality, VoicePrompt, VoicePurpose, VoiceSample};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// External parties the state machine calls out to.
pub struct Collaborators {
    pub capture: Box<dyn CaptureSource>,
    pub verifier: Arc<dyn Verifier>,
    pub voice: Box<dyn VoiceModality>,
    pub sink: Arc<dyn PresentationSink>,
    pub store: Arc<dyn ProfileStore>,
}

enum Phase {
    Idle,
    Registering {
        label: String,
        samples: Vec<FeatureVector>,
    },
    VoiceEnrolling {
        profile: BiometricProfile,
        samples: Vec<VoiceSample>,
    },
    KeystrokeAttempt(AttemptState),
    VoiceAttempt(AttemptState),
    Done(SessionOutcome),
}

pub struct Orchestrator {
    field: FieldId,
    user: String,
    enrollment: EnrollmentConfig,
    login: LoginConfig,
    extractor: FeatureExtractor,
    trainer: ProfileTrainer,
    collab: Collaborators,
    capture: Option<CaptureHandle>,
    phase: Phase,
}

fn percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

impl Orchestrator {
    pub fn new(field: FieldId, user: impl Into<String>, config: &AuthConfig, collab: Collaborators) -> Self {
        Self {
            field,
            user: user.into(),
            enrollment: config.enrollment.clone(),
            login: config.login.clone(),
            extractor: FeatureExtractor::new(config.features.clone()),
            trainer: ProfileTrainer::new(config.features.feature_dim),
            collab,
            capture: None,
            phase: Phase::Idle,
        }
    }

    pub fn field(&self) -> &FieldId {
        &self.field
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn stage(&self) -> Stage {
        match &self.phase {
            Phase::Idle => Stage::Idle,
            Phase::Registering { samples, .. } => Stage::Registering {
                collected: samples.len(),
            },
            Phase::VoiceEnrolling { samples, .. } => Stage::VoiceEnrolling {
                collected: samples.len(),
            },
            Phase::KeystrokeAttempt(a) => Stage::KeystrokeAttempt {
                failures: a.consecutive_failures,
            },
            Phase::VoiceAttempt(a) => Stage::VoiceAttempt {
                failures: a.consecutive_failures,
            },
            Phase::Done(o) => Stage::Finished(*o),
        }
    }

    pub fn attempts(&self) -> Option<AttemptState> {
        match &self.phase {
            Phase::KeystrokeAttempt(a) | Phase::VoiceAttempt(a) => Some(*a),
            _ => None,
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.phase {
            Phase::Idle => Ok(()),
            Phase::Done(o) => Err(AuthError::Terminal(*o)),
            _ => Err(AuthError::AlreadyStarted),
        }
    }

    /// Start enrollment. `secret` is only used to derive the profile label.
    pub fn begin_registration(&mut self, secret: &str) -> Result<()> {
        self.ensure_idle()?;
        let label = label_for(secret, self.enrollment.label_policy);
        self.start_capture();
        self.phase = Phase::Registering {
            label,
            samples: Vec::with_capacity(self.enrollment.keystroke_samples),
        };
        let total = self.enrollment.keystroke_samples;
        info!(field = %self.field, user = %self.user, samples = total, "registration started");
        self.notify(
            Notice::info("Typing enrollment active")
                .with_detail(format!("Type your password {} times", total))
                .with_progress(0, total),
        );
        Ok(())
    }

    pub fn begin_login(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.start_capture();
        self.phase = Phase::KeystrokeAttempt(AttemptState::enter(Modality::Keystroke));
        info!(field = %self.field, user = %self.user, "login started");
        self.notify(Notice::info("Typing verification active").with_detail("Type your password naturally"));
        Ok(())
    }

    /// Resolve one commit: the buffered keystrokes, or one voice exchange once
    /// the machine has moved to voice.
    pub fn submit(&mut self) -> Result<Step> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Err(AuthError::NotStarted),
            Phase::Done(outcome) => {
                self.phase = Phase::Done(outcome);
                Err(AuthError::Terminal(outcome))
            }
            Phase::Registering { label, samples } => self.enroll_keystroke(label, samples),
            Phase::VoiceEnrolling { profile, samples } => self.enroll_voice(profile, samples),
            Phase::KeystrokeAttempt(attempts) => self.attempt_keystroke(attempts),
            Phase::VoiceAttempt(attempts) => self.attempt_voice(attempts),
        }
    }

    /// Host tore the field down: stop capture and drop everything buffered.
    /// Returns true when this ended a live session.
    pub fn detach(&mut self) -> bool {
        self.stop_capture();
        if matches!(self.phase, Phase::Done(_)) {
            return false;
        }
        let live = !matches!(self.phase, Phase::Idle);
        self.phase = Phase::Done(SessionOutcome::Abandoned);
        if live {
            let reason = AbandonReason::Detached;
            info!(field = %self.field, reason = %reason, "session abandoned");
        }
        live
    }

    fn enroll_keystroke(&mut self, label: String, mut samples: Vec<FeatureVector>) -> Result<Step> {
        let events = self.drain_capture();
        samples.push(self.extractor.extract(&events));
        let collected = samples.len();
        let required = self.enrollment.keystroke_samples;
        debug!(field = %self.field, collected, required, events = events.len(), "enrollment sample");

        if collected < required {
            self.phase = Phase::Registering { label, samples };
            self.notify(
                Notice::info("Typing enrollment active")
                    .with_detail("Type your password again")
                    .with_progress(collected, required),
            );
            return Ok(Step::SampleRecorded { collected, required });
        }

        let profile = match self.trainer.train(&samples, label.clone()) {
            Ok(p) => p,
            Err(e) => {
                self.phase = Phase::Registering { label, samples };
                return Err(e.into());
            }
        };
        self.stop_capture();
        let voice_total = self.enrollment.voice_samples;
        self.phase = Phase::VoiceEnrolling {
            profile,
            samples: Vec::with_capacity(voice_total),
        };
        info!(field = %self.field, samples = collected, "keystroke profile trained");
        self.notify(
            Notice::info("Keystroke samples complete!")
                .with_detail(format!(
                    "Say \"{}\" {} times",
                    self.enrollment.voice_passphrase, voice_total
                ))
                .with_progress(collected, required),
        );
        Ok(Step::KeystrokeEnrolled { samples: collected })
    }

    fn enroll_voice(&mut self, profile: BiometricProfile, mut samples: Vec<VoiceSample>) -> Result<Step> {
        let required = self.enrollment.voice_samples;
        if samples.len() >= required {
            return self.finish_registration(profile, samples);
        }
        let prompt = VoicePrompt {
            text: self.enrollment.voice_passphrase.clone(),
            purpose: VoicePurpose::Enrollment,
            attempt: samples.len() as u32 + 1,
            attempts_remaining: required.saturating_sub(samples.len()) as u32,
        };
        match self.collab.voice.collect_sample(&prompt) {
            VoiceCapture::Captured(sample) => {
                samples.push(sample);
                let collected = samples.len();
                if collected < required {
                    self.phase = Phase::VoiceEnrolling { profile, samples };
                    self.notify(
                        Notice::info("Voice enrollment")
                            .with_detail("Say the phrase again")
                            .with_progress(collected, required),
                    );
                    Ok(Step::VoiceSampleRecorded { collected, required })
                } else {
                    self.finish_registration(profile, samples)
                }
            }
            VoiceCapture::Skipped => Ok(self.abandon(AbandonReason::VoiceSkipped)),
            VoiceCapture::Failed(reason) => Ok(self.abandon(AbandonReason::VoiceFailed(reason))),
        }
    }

    fn finish_registration(&mut self, profile: BiometricProfile, samples: Vec<VoiceSample>) -> Result<Step> {
        let voice = VoiceProfile {
            passphrase: self.enrollment.voice_passphrase.clone(),
            samples,
        };
        let bundle = ProfileBundle::new(&self.user, profile, voice);

        let user = match self.collab.verifier.register(&bundle) {
            RegisterOutcome::Registered { user } => user.unwrap_or_else(|| UserRecord::new(&self.user)),
            RegisterOutcome::Rejected { reason } | RegisterOutcome::NetworkError { reason } => {
                return Ok(self.abandon(AbandonReason::RegistrationRefused(reason)));
            }
        };

        if let Err(e) = self.collab.store.commit_registration(&bundle, &user) {
            self.collab.verifier.unregister(&self.user);
            self.phase = Phase::Done(SessionOutcome::Abandoned);
            warn!(field = %self.field, user = %self.user, error = %e, "profile not persisted; registration withdrawn");
            self.notify(Notice::error("Registration failed").with_detail("Profile could not be saved"));
            return Err(e.into());
        }

        self.phase = Phase::Done(SessionOutcome::Registered);
        info!(field = %self.field, user = %self.user, bundle_id = %bundle.id, "registered");
        self.notify(Notice::success("Registration complete!").with_detail("Profile saved"));
        Ok(Step::Registered { user })
    }

    fn attempt_keystroke(&mut self, mut attempts: AttemptState) -> Result<Step> {
        let events = self.drain_capture();
        let features = self.extractor.extract(&events);
        let outcome = match self.collab.verifier.verify_keystroke(&self.user, &features) {
            Ok(o) => o,
            Err(e) => {
                self.phase = Phase::KeystrokeAttempt(attempts);
                return Err(e.into());
            }
        };
        debug!(field = %self.field, confidence = ?outcome.confidence(), "keystroke verified");

        let transport = match outcome {
            VerifyOutcome::Accepted { confidence } if confidence >= self.login.min_confidence => {
                return Ok(self.authenticate(Modality::Keystroke, confidence));
            }
            VerifyOutcome::NetworkError { reason } => {
                if self.login.transport_failure_policy == TransportFailurePolicy::RetryFree {
                    self.phase = Phase::KeystrokeAttempt(attempts);
                    return Ok(self.transport_retry(Modality::Keystroke, reason));
                }
                true
            }
            VerifyOutcome::Accepted { .. } | VerifyOutcome::Rejected { .. } => false,
        };

        let max = self.login.max_keystroke_attempts;
        let failures = attempts.record_failure();
        info!(field = %self.field, failures, max, transport, "keystroke attempt failed");
        if failures >= max {
            self.stop_capture();
            self.phase = Phase::VoiceAttempt(AttemptState::enter(Modality::Voice));
            self.notify(
                Notice::warning(format!("Keystroke verification failed ({}/{})", failures, max))
                    .with_detail("Voice verification required"),
            );
            return Ok(Step::Escalated);
        }

        self.phase = Phase::KeystrokeAttempt(attempts);
        let message = if transport {
            "Verification service unreachable"
        } else {
            "Authentication failed"
        };
        self.notify(Notice::warning(message).with_detail(format!("Attempt {}/{} - Try again", failures, max)));
        Ok(Step::Retry {
            modality: Modality::Keystroke,
            failures,
            remaining: max - failures,
        })
    }

    fn attempt_voice(&mut self, mut attempts: AttemptState) -> Result<Step> {
        let max = self.login.max_voice_attempts;
        let prompt = VoicePrompt {
            text: self.enrollment.voice_passphrase.clone(),
            purpose: VoicePurpose::Login,
            attempt: attempts.consecutive_failures + 1,
            attempts_remaining: max.saturating_sub(attempts.consecutive_failures),
        };
        let outcome = match self.collab.voice.collect_sample(&prompt) {
            VoiceCapture::Captured(sample) => self.collab.verifier.verify_voice(&self.user, &sample),
            VoiceCapture::Skipped => VerifyOutcome::Rejected { confidence: None },
            VoiceCapture::Failed(reason) => VerifyOutcome::network(reason),
        };

        let transport = match outcome {
            VerifyOutcome::Accepted { confidence } => {
                return Ok(self.authenticate(Modality::Voice, confidence));
            }
            VerifyOutcome::NetworkError { reason } => {
                if self.login.transport_failure_policy == TransportFailurePolicy::RetryFree {
                    self.phase = Phase::VoiceAttempt(attempts);
                    return Ok(self.transport_retry(Modality::Voice, reason));
                }
                true
            }
            VerifyOutcome::Rejected { .. } => false,
        };

        let failures = attempts.record_failure();
        info!(field = %self.field, failures, max, transport, "voice attempt failed");
        if failures >= max {
            return Ok(self.lock_out());
        }

        self.phase = Phase::VoiceAttempt(attempts);
        let remaining = max - failures;
        self.notify(
            Notice::error("Voice verification failed").with_detail(format!("Attempts remaining: {}", remaining)),
        );
        Ok(Step::Retry {
            modality: Modality::Voice,
            failures,
            remaining,
        })
    }

    fn authenticate(&mut self, modality: Modality, confidence: f64) -> Step {
        self.stop_capture();
        self.phase = Phase::Done(SessionOutcome::Authenticated);
        info!(field = %self.field, user = %self.user, %modality, confidence, "authenticated");
        let notice = match modality {
            Modality::Keystroke => {
                Notice::success("Authenticated!").with_detail(format!("Confidence: {}%", percent(confidence)))
            }
            Modality::Voice => {
                Notice::success("Voice authenticated!").with_detail(format!("Similarity: {}%", percent(confidence)))
            }
        };
        self.notify(notice);
        Step::Authenticated { modality, confidence }
    }

    fn transport_retry(&mut self, modality: Modality, reason: String) -> Step {
        warn!(field = %self.field, %modality, reason = %reason, "verifier unreachable; attempt not counted");
        self.notify(Notice::warning("Verification service unreachable").with_detail("Try again"));
        Step::TransportRetry { modality, reason }
    }

    fn lock_out(&mut self) -> Step {
        self.stop_capture();
        self.phase = Phase::Done(SessionOutcome::LockedOut);
        warn!(field = %self.field, user = %self.user, "locked out");
        self.notify(Notice::error("Too many failed authentication attempts"));
        self.collab.sink.terminate_session();
        Step::LockedOut
    }

    fn abandon(&mut self, reason: AbandonReason) -> Step {
        self.stop_capture();
        self.phase = Phase::Done(SessionOutcome::Abandoned);
        info!(field = %self.field, user = %self.user, reason = %reason, "registration abandoned");
        self.notify(Notice::warning("Registration abandoned").with_detail(reason.to_string()));
        Step::Abandoned { reason }
    }

    fn notify(&self, notice: Notice) {
        self.collab.sink.notify(notice);
    }

    fn start_capture(&mut self) {
        self.stop_capture();
        self.capture = Some(self.collab.capture.start_capture(&self.field));
    }

    fn drain_capture(&mut self) -> Vec<KeystrokeEvent> {
        match &self.capture {
            Some(handle) => self.collab.capture.read_and_clear(handle),
            None => Vec::new(),
        }
    }

    fn stop_capture(&mut self) {
        if let Some(handle) = self.capture.take() {
            self.collab.capture.stop(&handle);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
