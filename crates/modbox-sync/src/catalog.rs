//! # Module Catalog Store
//!
//! Owns the last-fetched module list and the sync session, and publishes a
//! snapshot after every change.
//!
//! ## State Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CatalogStore                                     │
//! │                                                                         │
//! │   Mutex<CatalogState>                 watch::Sender<CatalogSnapshot>    │
//! │   ───────────────────                 ──────────────────────────────    │
//! │   loading, phase                      version bumped per mutation       │
//! │   tasks: Vec<SyncTask>     ──clone──► subscribers (presentation)        │
//! │   session: SyncSession                                                  │
//! │   cancel token (active session)                                         │
//! │                                                                         │
//! │   Mutation happens only inside `transact`, which never spans an await. │
//! │   External code sees clones, never references into the state.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refresh Flow
//! ```text
//! refresh() ──► processing? ──yes──► warn "sync in progress", no change
//!                   │no
//!                   ▼
//!       loading=true, tasks=[], session={0,0,false}, phase=Listing
//!                   │
//!                   ▼  bridge::invoke(list_modules)
//!       loading=false, phase=Ready
//!       ├── success: validate, wrap each module as SyncTask
//!       └── failure: every diagnostic to the notification sink
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use modbox_core::validation::validate_catalog;
use modbox_core::{CatalogSnapshot, Phase, SyncSession, SyncTask};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::ModuleBackend;
use crate::bridge;
use crate::notify::{NoticeKind, NotificationSink};

// =============================================================================
// Internal State
// =============================================================================

/// Mutable catalog state. Only reachable through [`CatalogStore::transact`].
#[derive(Debug, Default)]
pub(crate) struct CatalogState {
    pub(crate) version: u64,
    pub(crate) phase: Phase,
    pub(crate) loading: bool,
    pub(crate) tasks: Vec<SyncTask>,
    pub(crate) session: SyncSession,
    /// Token of the processing session; cancelled under the state lock.
    pub(crate) cancel: Option<CancellationToken>,
    /// Session that still owns the backend. Outlives `session.processing`
    /// after a cancel until the in-flight item has returned.
    pub(crate) active: Option<Uuid>,
    /// Bumped per refresh so a stale listing never overwrites a newer one.
    refresh_generation: u64,
}

impl CatalogState {
    /// Cancels the active token, clears every `syncing` flag and resets the
    /// session to `{0, 0, false}`.
    pub(crate) fn stop_session(&mut self, phase: Phase) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        for task in &mut self.tasks {
            task.syncing = false;
        }
        self.session.reset();
        self.phase = phase;
    }

    fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            version: self.version,
            phase: self.phase,
            loading: self.loading,
            tasks: self.tasks.clone(),
            session: self.session.clone(),
        }
    }
}

/// Result of a [`CatalogStore::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The catalog now holds this many tasks.
    Listed(usize),
    /// The backend failed; diagnostics went to the notification sink.
    Failed,
    /// A sync session is processing; nothing changed.
    Refused,
    /// A newer refresh started while this one was in flight; its listing
    /// was discarded, its failures were still reported.
    Superseded,
}

// =============================================================================
// Catalog Store
// =============================================================================

/// Process-wide catalog of workshop modules and their sync status.
pub struct CatalogStore {
    backend: Arc<dyn ModuleBackend>,
    sink: Arc<dyn NotificationSink>,
    state: Mutex<CatalogState>,
    snapshot_tx: watch::Sender<CatalogSnapshot>,
}

impl CatalogStore {
    /// Creates an empty store in the `Idle` phase.
    pub fn new(backend: Arc<dyn ModuleBackend>, sink: Arc<dyn NotificationSink>) -> Self {
        let (snapshot_tx, _) = watch::channel(CatalogSnapshot::default());
        CatalogStore {
            backend,
            sink,
            state: Mutex::new(CatalogState::default()),
            snapshot_tx,
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Re-lists modules from the backend, discarding all tasks.
    ///
    /// Refused while a sync session is processing: a refresh must never
    /// interrupt an active sync.
    pub async fn refresh(&self) -> RefreshStatus {
        let started = self.transact(|s| {
            if s.session.processing {
                return Err(());
            }
            s.refresh_generation += 1;
            s.loading = true;
            s.tasks.clear();
            s.session.reset();
            s.phase = Phase::Listing;
            Ok(s.refresh_generation)
        });

        let Ok(generation) = started else {
            warn!("Refresh refused while a sync session is processing");
            self.sink.notify(
                NoticeKind::Warning,
                "Sync in progress",
                "The catalog cannot be refreshed while modules are syncing",
            );
            return RefreshStatus::Refused;
        };

        debug!(generation, "Listing workshop modules");
        let backend = Arc::clone(&self.backend);
        let outcome = bridge::invoke(|| backend.list_modules()).await;

        if outcome.is_failure() {
            let causes = outcome.causes().to_vec();
            let applied = self.transact(|s| {
                if s.refresh_generation != generation {
                    return Err(());
                }
                s.loading = false;
                s.phase = Phase::Ready;
                Ok(())
            });
            warn!(generation, causes = causes.len(), "Module listing failed");
            self.sink.notify_diagnostics(&causes);
            return match applied {
                Ok(()) => RefreshStatus::Failed,
                Err(()) => RefreshStatus::Superseded,
            };
        }

        let (modules, rejected) = validate_catalog(outcome.value());
        let tasks: Vec<SyncTask> = modules.into_iter().map(SyncTask::new).collect();
        let count = tasks.len();

        let applied = self.transact(|s| {
            if s.refresh_generation != generation {
                return Err(());
            }
            s.loading = false;
            s.tasks = tasks;
            s.phase = Phase::Ready;
            Ok(())
        });
        if applied.is_err() {
            debug!(generation, "Discarding listing of a superseded refresh");
            return RefreshStatus::Superseded;
        }

        for reason in &rejected {
            self.sink
                .notify(NoticeKind::Warning, "Module skipped", &reason.to_string());
        }

        info!(modules = count, skipped = rejected.len(), "Catalog refreshed");
        RefreshStatus::Listed(count)
    }

    // =========================================================================
    // Crate-internal access for the coordinator
    // =========================================================================

    pub(crate) fn backend(&self) -> Arc<dyn ModuleBackend> {
        Arc::clone(&self.backend)
    }

    pub(crate) fn sink(&self) -> &dyn NotificationSink {
        self.sink.as_ref()
    }

    /// Runs `f` against the state under the lock.
    ///
    /// On `Ok` the version is bumped and a snapshot is published; on `Err`
    /// the state must be left untouched and nothing is published.
    pub(crate) fn transact<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut CatalogState) -> Result<R, E>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state)?;
        state.version += 1;
        self.snapshot_tx.send_replace(state.snapshot());
        Ok(result)
    }

    /// Frees the backend slot held by `session_id`.
    ///
    /// `active` is not part of the snapshot, so nothing is published.
    pub(crate) fn release_session(&self, session_id: Uuid) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.active == Some(session_id) {
            state.active = None;
        }
    }
}
