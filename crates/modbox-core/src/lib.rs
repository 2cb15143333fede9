//! # modbox-core: Pure Types for ModBox Lite
//!
//! This crate holds the data model every other layer speaks: the `Outcome`
//! returned by each backend call, the workshop module catalog, and the
//! per-session sync bookkeeping. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ModBox Lite Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Presentation (external collaborator)              │   │
//! │  │      renders snapshots, forwards refresh / sync / cancel        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     modbox-sync: SyncCoordinator ─► CatalogStore ─► bridge      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ modbox-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────────┐  ┌────────────┐             │   │
//! │  │   │  outcome  │  │    types      │  │ validation │             │   │
//! │  │   │  Outcome  │  │ WorkshopModule│  │  catalog   │             │   │
//! │  │   │Diagnostic │  │ SyncSession   │  │  checks    │             │   │
//! │  │   └───────────┘  └───────────────┘  └────────────┘             │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO BACKEND CALLS • PURE FUNCTIONS                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`outcome`] - `Outcome<T>`, `Diagnostic`, `Failures`
//! - [`types`] - Domain types (WorkshopModule, Version, SyncTask, SyncSession)
//! - [`error`] - Domain error types
//! - [`validation`] - Catalog validation
//!
//! ## Example Usage
//!
//! ```rust
//! use modbox_core::{Diagnostic, Outcome};
//!
//! let ok = Outcome::succeed(3);
//! assert!(ok.is_success());
//! assert_eq!(ok.value(), 3);
//!
//! let bad: Outcome<u32> = Outcome::failed([Diagnostic::new("workshop", "not found")]);
//! assert!(bad.is_failure());
//! assert_eq!(bad.causes()[0].code, "workshop");
//! // A failed outcome still hands out a harmless default.
//! assert_eq!(bad.value(), 0);
//! ```

pub mod error;
pub mod outcome;
pub mod types;
pub mod validation;

// These allow users to do `use modbox_core::Outcome` instead of
// `use modbox_core::outcome::Outcome`
pub use error::{CoreError, ValidationError};
pub use outcome::{Diagnostic, Failures, Outcome};
pub use types::*;

/// Steam application id of the game whose workshop content is managed.
pub const WORKSHOP_APP_ID: &str = "262060";

/// Progress value of a task whose sync finished successfully.
pub const PROGRESS_DONE: u8 = 100;
