//! Typeprint CLI: replays recorded registration/login sessions through the
//! escalation engine and manages the local profile store.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use typeprint::{
    capture::{FieldId, KeystrokeEvent, RecordedCapture},
    config::{AuthConfig, VerifierMode},
    features::FeatureExtractor,
    logging::{AuditEvent, StructuredLogger},
    orchestrator::{Collaborators, Orchestrator, Step},
    presentation::TracingSink,
    replay::{replay, Flow, ScriptedVoice, SessionScript},
    scoring::SimilarityScorer,
    storage::{ProfileStore, SecureStore, UserRecord},
    verifier::{LocalVerifier, RemoteVerifier, Verifier},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "typeprint", version, about = "Keystroke-rhythm authentication with voice escalation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll a user from a recorded session script
    Register {
        #[arg(long)]
        script: PathBuf,
    },
    /// Authenticate a user from a recorded session script
    Login {
        #[arg(long)]
        script: PathBuf,
    },
    /// Print the feature vector for a JSON array of key events
    Extract {
        #[arg(long)]
        events: PathBuf,
    },
    /// Show the current user
    Whoami,
    /// Forget the current user
    Logout,
}

fn build_verifier(config: &AuthConfig, store: &SecureStore, user: &str) -> Result<Arc<dyn Verifier>, BoxError> {
    match config.verifier.mode {
        VerifierMode::Remote => {
            let remote = RemoteVerifier::new(&config.verifier).ok_or("remote verifier needs an endpoint")?;
            info!(endpoint = remote.base_url(), "remote verifier");
            Ok(Arc::new(remote))
        }
        VerifierMode::Local => {
            let scorer = SimilarityScorer::new(config.scoring.clone(), config.features.feature_dim);
            let local = LocalVerifier::new(scorer, config.login.min_confidence);
            match store.load_bundle(user)? {
                Some(bundle) => local.load(bundle),
                None => warn!(user, "no stored profile"),
            }
            Ok(Arc::new(local))
        }
    }
}

fn run_session(config: &AuthConfig, store: Arc<SecureStore>, script_path: &Path, flow: Flow) -> Result<(), BoxError> {
    let script = SessionScript::load(script_path)?;
    let verifier = build_verifier(config, &store, &script.user)?;
    let capture = RecordedCapture::new();
    let sink = Arc::new(TracingSink::new());
    let collab = Collaborators {
        capture: Box::new(capture.clone()),
        verifier,
        voice: Box::new(ScriptedVoice::new(script.voice.clone())),
        sink: sink.clone(),
        store: store.clone(),
    };
    let field = FieldId::new("password");
    let mut orchestrator = Orchestrator::new(field.clone(), &script.user, config, collab);

    let steps = replay(&mut orchestrator, &capture, &script, flow)?;
    let stage = orchestrator.stage();

    let mut modality = None;
    let mut confidence = None;
    if let Some(Step::Authenticated {
        modality: m,
        confidence: c,
    }) = steps.last()
    {
        modality = Some(m.to_string());
        confidence = Some(*c);
        let mut record = store
            .current_user()?
            .filter(|u| u.username == script.user)
            .unwrap_or_else(|| UserRecord::new(&script.user));
        record.last_login = Some(chrono::Utc::now());
        store.set_current_user(&record)?;
    }

    let mut audit = AuditEvent::new("info", "session finished");
    audit.user = Some(script.user.as_str());
    audit.field = Some(field.as_str());
    audit.outcome = Some(stage.outcome().map(|o| o.as_str()).unwrap_or("incomplete"));
    audit.modality = modality.as_deref();
    audit.confidence = confidence;
    audit.error = sink.terminated().then_some("session terminated");
    StructuredLogger::emit_json(&audit, &mut std::io::stdout())?;
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config_path = std::env::var("TYPEPRINT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("typeprint.json"));
    let config = AuthConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    if let Command::Extract { events } = &cli.command {
        let data = std::fs::read_to_string(events)?;
        let events: Vec<KeystrokeEvent> = serde_json::from_str(&data)?;
        let vector = FeatureExtractor::new(config.features.clone()).extract(&events);
        println!("{}", serde_json::to_string(&vector)?);
        return Ok(());
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let store_path = config.data_dir.join("profiles.db");
    // In production: from Secure Enclave / Keystore
    let secret = std::env::var("TYPEPRINT_DEVICE_SECRET").unwrap_or_else(|_| "device-secret-placeholder".to_string());
    let store = Arc::new(SecureStore::open(&store_path, secret.as_bytes())?);
    info!(data_dir = ?config.data_dir, "typeprint starting");

    match cli.command {
        Command::Register { script } => run_session(&config, store, &script, Flow::Registration)?,
        Command::Login { script } => run_session(&config, store, &script, Flow::Login)?,
        Command::Whoami => match store.current_user()? {
            Some(user) => println!("{}", serde_json::to_string(&user)?),
            None => println!("null"),
        },
        Command::Logout => {
            store.clear_current_user()?;
            info!("current user cleared");
        }
        Command::Extract { .. } => {}
    }

    Ok(())
}
