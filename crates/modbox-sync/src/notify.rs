//! # Notification Sink
//!
//! The one channel through which the sync engine talks to a human.
//!
//! ```text
//! CatalogStore / SyncCoordinator ──notify(kind, title, description)──► sink
//!                                                                       │
//!                         desktop toast, console line, test recorder ◄──┘
//! ```
//!
//! Every failed `Outcome` is shown exactly once, by the component that
//! received it.

use std::fmt;

use modbox_core::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Neutral status, e.g. a clean session summary.
    Info,
    /// Non-fatal condition caught before calling the backend.
    Warning,
    /// A backend fault or an item failure.
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::Info => write!(f, "info"),
            NoticeKind::Warning => write!(f, "warning"),
            NoticeKind::Error => write!(f, "error"),
        }
    }
}

/// Trait for surfacing notices (implemented by the presentation layer).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str);

    /// Shows each diagnostic as its own error notice.
    fn notify_diagnostics(&self, diagnostics: &[Diagnostic]) {
        for d in diagnostics {
            self.notify(NoticeKind::Error, &d.code, &d.description);
        }
    }
}

/// No-op sink for embedding without a UI.
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn notify(&self, _kind: NoticeKind, _title: &str, _description: &str) {}
}

/// Sink that writes notices to the tracing subscriber.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        match kind {
            NoticeKind::Info => info!(title = %title, "{}", description),
            NoticeKind::Warning => warn!(title = %title, "{}", description),
            NoticeKind::Error => error!(title = %title, "{}", description),
        }
    }
}
