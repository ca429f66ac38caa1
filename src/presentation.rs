//! Presentation seam: fire-and-forget notices and session termination.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            progress: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_progress(mut self, current: usize, total: usize) -> Self {
        self.progress = Some(Progress { current, total });
        self
    }
}

pub trait PresentationSink: Send + Sync {
    fn notify(&self, notice: Notice);
    fn terminate_session(&self);
}

/// Sink for headless hosts: every notice becomes a log line.
#[derive(Default)]
pub struct TracingSink {
    terminated: AtomicBool,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::Relaxed)
    }
}

impl PresentationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        let detail = notice.detail.as_deref().unwrap_or("");
        let (current, total) = notice
            .progress
            .map(|p| (p.current, p.total))
            .unwrap_or((0, 0));
        match notice.kind {
            NoticeKind::Info | NoticeKind::Success => {
                info!(kind = ?notice.kind, detail, current, total, "{}", notice.message)
            }
            NoticeKind::Warning => warn!(detail, "{}", notice.message),
            NoticeKind::Error => error!(detail, "{}", notice.message),
        }
    }

    fn terminate_session(&self) {
        self.terminated.store(true, Ordering::Relaxed);
        warn!("session terminated");
    }
}
