//! # Sync Coordinator
//!
//! Runs one batch sync session at a time over the catalog's eligible tasks.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──refresh──► Listing ──► Ready ──start_sync──► Syncing          │
//! │                                   ▲                     │    │          │
//! │                                   │            all items│    │cancel()  │
//! │                                   │                     ▼    ▼          │
//! │                                   └──refresh──── Completed  Cancelled   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Per-Item Execution
//! ```text
//! for each eligible task, in catalog order:
//!     select! {
//!         session token cancelled  ──► wait for the in-flight call, stop
//!         bridge::invoke_with(sync_module, item token)
//!             bounded by item timeout ──► record result under the lock
//!     }
//! ```
//!
//! The item token is a child of the session token and is cancelled when
//! the item is abandoned (session cancel, timeout, or the session future
//! itself being dropped), so backend work spawned off the async task stops
//! too.
//!
//! `cancel()` resets the visible session at once, but the session keeps
//! the backend slot (`CatalogState::active`) until its in-flight call has
//! returned. A new session cannot start while the old one drains.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use modbox_core::{
    CatalogSnapshot, Diagnostic, ItemFailure, Outcome, Phase, SessionReport, SyncSession,
    PROGRESS_DONE,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge;
use crate::catalog::{CatalogStore, RefreshStatus};
use crate::notify::NoticeKind;

/// Diagnostic code for items that exceeded the per-item timeout.
pub const TIMEOUT_CODE: &str = "timeout";

// =============================================================================
// Rejections
// =============================================================================

/// Why `start_sync` did not start a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    /// The catalog holds no tasks.
    EmptyCatalog,
    /// Every module is already synced.
    NothingToSync,
    /// Another session is processing, or a cancelled one is still draining.
    AlreadySyncing,
}

impl StartRejected {
    fn title(&self) -> &'static str {
        match self {
            StartRejected::EmptyCatalog => "Catalog is empty",
            StartRejected::NothingToSync => "Nothing to sync",
            StartRejected::AlreadySyncing => "Sync in progress",
        }
    }
}

impl fmt::Display for StartRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartRejected::EmptyCatalog => {
                write!(f, "No modules are listed; refresh the catalog first")
            }
            StartRejected::NothingToSync => write!(f, "Every listed module is already synced"),
            StartRejected::AlreadySyncing => {
                write!(f, "A sync session is already running or stopping")
            }
        }
    }
}

impl std::error::Error for StartRejected {}

// =============================================================================
// Session plan
// =============================================================================

struct PlannedItem {
    id: String,
    title: String,
}

struct SessionPlan {
    id: Uuid,
    token: CancellationToken,
    items: Vec<PlannedItem>,
}

/// Resets the store if a session future is dropped before it finishes.
struct AbandonGuard<'a> {
    store: &'a CatalogStore,
    session_id: Uuid,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let session_id = self.session_id;
        let abandoned = self.store.transact(|s| {
            if s.session.id != Some(session_id) || !s.session.processing {
                return Err(());
            }
            s.stop_session(Phase::Cancelled);
            Ok(())
        });
        self.store.release_session(session_id);
        if abandoned.is_ok() {
            warn!(session = %session_id, "Sync session dropped before finishing");
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Drives sync sessions against the catalog store.
pub struct SyncCoordinator {
    store: Arc<CatalogStore>,
    item_timeout: Option<Duration>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        SyncCoordinator {
            store,
            item_timeout: None,
        }
    }

    /// Bounds every `sync_module` call; `None` waits indefinitely.
    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.store.subscribe()
    }

    pub async fn refresh(&self) -> RefreshStatus {
        self.store.refresh().await
    }

    /// Runs `start_sync` on the tokio runtime and returns its handle.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<Result<SessionReport, StartRejected>> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.start_sync().await })
    }

    /// Syncs every eligible task and returns the session report.
    ///
    /// Rejected without any state change when the catalog is empty, when
    /// nothing is eligible, or when another session is processing.
    pub async fn start_sync(&self) -> Result<SessionReport, StartRejected> {
        let plan = match self.begin() {
            Ok(plan) => plan,
            Err(reason) => {
                warn!(reason = %reason, "Sync not started");
                self.store
                    .sink()
                    .notify(NoticeKind::Warning, reason.title(), &reason.to_string());
                return Err(reason);
            }
        };

        info!(session = %plan.id, items = plan.items.len(), "Sync session started");
        let mut guard = AbandonGuard {
            store: &self.store,
            session_id: plan.id,
            armed: true,
        };

        let mut report = SessionReport::begin(plan.id, plan.items.len());
        let token = plan.token;

        for item in plan.items {
            if token.is_cancelled() {
                break;
            }

            let Some(outcome) = self.sync_item(&item.id, &token).await else {
                break;
            };

            let causes = outcome.causes().to_vec();
            let applied = self.store.transact(|s| {
                if token.is_cancelled() {
                    return Err(());
                }
                s.session.current += 1;
                if let Some(task) = s.tasks.iter_mut().find(|t| t.module.id == item.id) {
                    task.syncing = false;
                    if causes.is_empty() {
                        task.progress = PROGRESS_DONE;
                        task.module.synced = true;
                    } else {
                        task.failures = causes.clone();
                    }
                }
                Ok(())
            });
            if applied.is_err() {
                break;
            }

            if causes.is_empty() {
                debug!(module = %item.id, "Module synced");
                report.succeeded += 1;
            } else {
                warn!(module = %item.id, causes = causes.len(), "Module sync failed");
                report.failed.push(ItemFailure {
                    id: item.id,
                    title: item.title,
                    causes,
                });
            }
        }

        let finished = self.store.transact(|s| {
            if token.is_cancelled() {
                return Err(());
            }
            s.session.processing = false;
            s.cancel = None;
            s.active = None;
            s.phase = Phase::Completed;
            Ok(())
        });
        if finished.is_err() {
            self.store.release_session(plan.id);
        }
        guard.armed = false;

        report.cancelled = finished.is_err();
        report.finished_at = chrono::Utc::now();
        self.announce(&report);
        Ok(report)
    }

    /// Cancels the processing session.
    ///
    /// Returns `false` (with a warning notice) when nothing is processing.
    pub fn cancel(&self) -> bool {
        let cancelled = self.store.transact(|s| {
            if !s.session.processing {
                return Err(());
            }
            let session_id = s.session.id;
            s.stop_session(Phase::Cancelled);
            Ok(session_id)
        });

        match cancelled {
            Ok(session_id) => {
                info!(session = ?session_id, "Sync session cancelled");
                self.store.sink().notify(
                    NoticeKind::Warning,
                    "Sync cancelled",
                    "Remaining modules were not synced",
                );
                true
            }
            Err(()) => {
                self.store.sink().notify(
                    NoticeKind::Warning,
                    "Nothing to cancel",
                    "No sync session is running",
                );
                false
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Entry guard and transition to `Syncing`, in one critical section.
    fn begin(&self) -> Result<SessionPlan, StartRejected> {
        self.store.transact(|s| {
            if s.session.processing || s.active.is_some() {
                return Err(StartRejected::AlreadySyncing);
            }
            if s.tasks.is_empty() {
                return Err(StartRejected::EmptyCatalog);
            }
            if !s.tasks.iter().any(|t| t.is_eligible()) {
                return Err(StartRejected::NothingToSync);
            }

            let mut items = Vec::new();
            for task in s.tasks.iter_mut().filter(|t| t.is_eligible()) {
                task.syncing = true;
                task.progress = 0;
                task.failures.clear();
                items.push(PlannedItem {
                    id: task.module.id.clone(),
                    title: task.module.title.clone(),
                });
            }

            let id = Uuid::new_v4();
            let token = CancellationToken::new();
            s.session = SyncSession {
                id: Some(id),
                total: items.len(),
                current: 0,
                processing: true,
            };
            s.cancel = Some(token.clone());
            s.active = Some(id);
            s.phase = Phase::Syncing;

            Ok(SessionPlan { id, token, items })
        })
    }

    /// Runs one item. `None` means the session was cancelled first.
    ///
    /// On cancel the in-flight call is awaited, not dropped, so backend
    /// work never outlives the session that started it.
    async fn sync_item(&self, id: &str, session: &CancellationToken) -> Option<Outcome<()>> {
        let backend = self.store.backend();
        let item_token = session.child_token();
        let _abandon = item_token.clone().drop_guard();

        let call = bridge::invoke_with(|cancel| backend.sync_module(id, cancel), item_token);
        let bounded = async {
            match self.item_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => Outcome::failed([Diagnostic::new(
                        TIMEOUT_CODE,
                        format!("{} did not finish within {}s", id, limit.as_secs()),
                    )]),
                },
                None => call.await,
            }
        };
        tokio::pin!(bounded);

        tokio::select! {
            biased;
            _ = session.cancelled() => {
                debug!(module = %id, "Waiting for the cancelled item to stop");
                let _ = (&mut bounded).await;
                None
            }
            outcome = &mut bounded => Some(outcome),
        }
    }

    fn announce(&self, report: &SessionReport) {
        let sink = self.store.sink();
        if report.cancelled {
            info!(
                session = %report.session_id,
                summary = %report.summary(),
                "Sync session stopped"
            );
            return;
        }

        info!(
            session = %report.session_id,
            summary = %report.summary(),
            "Sync session finished"
        );
        if report.is_clean() {
            sink.notify(
                NoticeKind::Info,
                "Sync complete",
                &format!("{} modules synced", report.succeeded),
            );
            return;
        }

        sink.notify(NoticeKind::Warning, "Sync finished with failures", &report.summary());
        for failure in &report.failed {
            sink.notify_diagnostics(&failure.causes);
        }
    }
}
