//! # modbox-sync: Workshop Sync Engine for ModBox Lite
//!
//! This crate owns every call into the backend and all mutable catalog
//! state: it lists workshop modules, tracks which are installed locally,
//! and runs cancellable batch sync sessions.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 Presentation (desktop UI, modbox CLI)            │  │
//! │  │   refresh() / start_sync() / cancel()       snapshots, notices   │  │
//! │  └───────────────┬──────────────────────────────────▲───────────────┘  │
//! │                  │                                  │                  │
//! │  ┌───────────────▼────────────────┐  ┌──────────────┴───────────────┐  │
//! │  │ SyncCoordinator                │  │ CatalogStore                 │  │
//! │  │                                │  │                              │  │
//! │  │ Entry guard (check-and-set)    │─►│ Mutex<state> + watch channel │  │
//! │  │ Sequential items, cancel token │  │ version bumped per mutation  │  │
//! │  └───────────────┬────────────────┘  └──────────────┬───────────────┘  │
//! │                  │                                  │                  │
//! │  ┌───────────────▼──────────────────────────────────▼───────────────┐  │
//! │  │ bridge: invoke / invoke_with                                     │  │
//! │  │ Err(text) / panic ──► Outcome::failed(diagnostics)               │  │
//! │  └───────────────┬──────────────────────────────────────────────────┘  │
//! │                  │                                                     │
//! │  ┌───────────────▼──────────────────────────────────────────────────┐  │
//! │  │ ModuleBackend (trait)          WorkshopBackend (filesystem)      │  │
//! │  │ list_modules, sync_module      project.xml, staged installs      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  NOTICES (to the NotificationSink):                                    │
//! │  • warnings for refused intents (sync in progress, nothing to sync)   │
//! │  • one error per backend diagnostic                                    │
//! │  • session summary when a sync session finishes                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`backend`] - `ModuleBackend` trait
//! - [`bridge`] - Fault normalization into `Outcome`
//! - [`catalog`] - `CatalogStore` (module list, session, snapshots)
//! - [`config`] - Configuration (paths, sync limits)
//! - [`coordinator`] - `SyncCoordinator` (sessions and cancellation)
//! - [`error`] - Sync error types
//! - [`notify`] - `NotificationSink` and stock sinks
//! - [`workshop`] - Filesystem `WorkshopBackend`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use modbox_sync::{BoxConfig, CatalogStore, LogSink, SyncCoordinator, WorkshopBackend};
//!
//! let config = BoxConfig::load_or_default(None);
//! let backend = WorkshopBackend::from_config(&config)?;
//! let store = Arc::new(CatalogStore::new(Arc::new(backend), Arc::new(LogSink)));
//! let coordinator = Arc::new(SyncCoordinator::new(store));
//!
//! coordinator.refresh().await;
//! let session = coordinator.spawn_sync();
//! // ... later, from the UI
//! coordinator.cancel();
//! let report = session.await??;
//! println!("{}", report.summary());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod workshop;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{BackendResult, ModuleBackend};
pub use catalog::{CatalogStore, RefreshStatus};
pub use config::{BoxConfig, PathSettings, SyncSettings};
pub use coordinator::{StartRejected, SyncCoordinator};
pub use error::{BoxError, BoxResult};
pub use notify::{LogSink, NoOpSink, NoticeKind, NotificationSink};
pub use workshop::WorkshopBackend;

// Cancellation is part of the backend contract.
pub use tokio_util::sync::CancellationToken;
