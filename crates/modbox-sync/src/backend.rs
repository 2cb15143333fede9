//! # Backend Contract
//!
//! Operations the privileged backend process exposes to the sync engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ModuleBackend                                    │
//! │                                                                         │
//! │  list_modules()            nullary, idempotent, side-effect free       │
//! │      → Vec<WorkshopModule>                                             │
//! │                                                                         │
//! │  sync_module(id, token)    unary, cooperatively cancellable            │
//! │      → ()                  must stop soon after `token` is cancelled   │
//! │                                                                         │
//! │  Both fail with `Failures` (a JSON-rendering diagnostic list).         │
//! │  Callers never use these directly: every call goes through `bridge`.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use modbox_core::{Failures, WorkshopModule};
use tokio_util::sync::CancellationToken;

/// Result type of a raw backend call, before the bridge normalizes it.
pub type BackendResult<T> = Result<T, Failures>;

/// Backend operations consumed by the catalog store and the coordinator.
#[async_trait]
pub trait ModuleBackend: Send + Sync {
    /// Lists the workshop modules currently available.
    async fn list_modules(&self) -> BackendResult<Vec<WorkshopModule>>;

    /// Brings one module into the local mods installation.
    ///
    /// Implementations check `cancel` between units of work and return
    /// promptly once it is cancelled, leaving no partial install behind.
    async fn sync_module(&self, id: &str, cancel: CancellationToken) -> BackendResult<()>;
}
