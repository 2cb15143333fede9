//! Test doubles shared by the store and coordinator tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use modbox_core::{Failures, WorkshopModule};
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendResult, ModuleBackend};
use crate::notify::{NoticeKind, NotificationSink};

pub(crate) fn module(id: &str, synced: bool) -> WorkshopModule {
    WorkshopModule::new(id, format!("Module {}", id)).with_synced(synced)
}

// =============================================================================
// Recording Sink
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: NoticeKind) -> Vec<Notice> {
        self.notices().into_iter().filter(|n| n.kind == kind).collect()
    }

    pub fn warnings(&self) -> Vec<Notice> {
        self.of_kind(NoticeKind::Warning)
    }

    pub fn errors(&self) -> Vec<Notice> {
        self.of_kind(NoticeKind::Error)
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        self.notices.lock().unwrap().push(Notice {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        });
    }
}

// =============================================================================
// Scripted Backend
// =============================================================================

/// Backend whose answers are set up by the test.
///
/// Listings are served from a queue; the last one is sticky. Sync calls
/// succeed unless the id was marked failing or blocking. A blocking call
/// parks until its token is cancelled; its work runs on a spawned task, so
/// dropping the call does not stop it. A lingering id keeps that work alive
/// after the cancel until `release_lingering` is called.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    listings: Mutex<VecDeque<BackendResult<Vec<WorkshopModule>>>>,
    list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    failing: Mutex<HashMap<String, Failures>>,
    blocking: Mutex<HashSet<String>>,
    lingering: Mutex<HashSet<String>>,
    release: CancellationToken,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    calls: Mutex<Vec<String>>,
    tokens: Mutex<HashMap<String, CancellationToken>>,
    pub started: Notify,
}

impl ScriptedBackend {
    pub fn new(modules: Vec<WorkshopModule>) -> Self {
        let backend = ScriptedBackend::default();
        backend.queue_listing(Ok(modules));
        backend
    }

    /// Replaces every queued listing with `listing`.
    pub fn set_listing(&self, listing: BackendResult<Vec<WorkshopModule>>) {
        let mut listings = self.listings.lock().unwrap();
        listings.clear();
        listings.push_back(listing);
    }

    pub fn queue_listing(&self, listing: BackendResult<Vec<WorkshopModule>>) {
        self.listings.lock().unwrap().push_back(listing);
    }

    /// Holds the next `list_modules` call until the returned sender fires.
    pub fn gate_next_listing(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn fail(&self, id: &str, failures: Failures) {
        self.failing.lock().unwrap().insert(id.to_string(), failures);
    }

    pub fn block(&self, id: &str) {
        self.blocking.lock().unwrap().insert(id.to_string());
    }

    pub fn unblock(&self, id: &str) {
        self.blocking.lock().unwrap().remove(id);
    }

    pub fn linger(&self, id: &str) {
        self.lingering.lock().unwrap().insert(id.to_string());
    }

    pub fn release_lingering(&self) {
        self.release.cancel();
    }

    /// Sync work currently running, including work whose call was dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest `in_flight` seen so far.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    /// Ids passed to `sync_module`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The token the coordinator handed to the `sync_module` call for `id`.
    pub fn token_for(&self, id: &str) -> Option<CancellationToken> {
        self.tokens.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ModuleBackend for ScriptedBackend {
    async fn list_modules(&self) -> BackendResult<Vec<WorkshopModule>> {
        let gate = self.list_gate.lock().unwrap().take();
        let listing = {
            let mut listings = self.listings.lock().unwrap();
            if listings.len() > 1 {
                listings.pop_front()
            } else {
                listings.front().cloned()
            }
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        listing.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn sync_module(&self, id: &str, cancel: CancellationToken) -> BackendResult<()> {
        self.calls.lock().unwrap().push(id.to_string());
        self.tokens
            .lock()
            .unwrap()
            .insert(id.to_string(), cancel.clone());

        self.enter();
        let blocks = self.blocking.lock().unwrap().contains(id);
        if blocks {
            let lingers = self.lingering.lock().unwrap().contains(id);
            let release = self.release.clone();
            let in_flight = Arc::clone(&self.in_flight);
            let work = tokio::spawn(async move {
                cancel.cancelled().await;
                if lingers {
                    release.cancelled().await;
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
            self.started.notify_one();
            let _ = work.await;
            return Err(Failures::failed("cancelled", id));
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let failure = self.failing.lock().unwrap().get(id).cloned();
        match failure {
            Some(failures) => Err(failures),
            None => Ok(()),
        }
    }
}
