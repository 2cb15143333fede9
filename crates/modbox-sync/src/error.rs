//! # Sync Error Types
//!
//! Error types for configuration, workshop listing and module installs.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Workshop     │  │      Install            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  WorkshopUnav.  │  │  ModuleNotFound         │ │
//! │  │  ConfigLoad     │  │  ProjectRead    │  │  InstallFailed          │ │
//! │  │  ConfigSave     │  │  ProjectParse   │  │  Cancelled              │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  At the backend boundary every BoxError becomes a Failures list with   │
//! │  a stable code, so the bridge only ever sees diagnostics.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use modbox_core::{Diagnostic, Failures};
use thiserror::Error;

/// Result type alias for sync operations.
pub type BoxResult<T> = Result<T, BoxError>;

/// Error type covering configuration, listing and install failures.
#[derive(Debug, Error)]
pub enum BoxError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Workshop Errors
    // =========================================================================
    /// Workshop directory exists but cannot be read.
    #[error("Failed to load workshop: {0}")]
    WorkshopUnavailable(String),

    /// A `project.xml` could not be read.
    #[error("Failed to read {entry}: {reason}")]
    ProjectRead { entry: String, reason: String },

    /// A `project.xml` could not be parsed.
    #[error("Failed to parse project.xml of {entry}: {reason}")]
    ProjectParse { entry: String, reason: String },

    // =========================================================================
    // Install Errors
    // =========================================================================
    /// No workshop entry is known for the id.
    #[error("Module {0} not found in workshop")]
    ModuleNotFound(String),

    /// Copying the module into the mods directory failed.
    #[error("Failed to install {id}: {reason}")]
    InstallFailed { id: String, reason: String },

    /// The operation observed a cancellation request.
    #[error("Operation cancelled")]
    Cancelled,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Generic I/O failure outside the categories above.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (e.g. a blocking worker died).
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for BoxError {
    fn from(err: std::io::Error) -> Self {
        BoxError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for BoxError {
    fn from(err: toml::de::Error) -> Self {
        BoxError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for BoxError {
    fn from(err: toml::ser::Error) -> Self {
        BoxError::ConfigSaveFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BoxError {
    fn from(err: tokio::task::JoinError) -> Self {
        BoxError::Internal(err.to_string())
    }
}

impl From<BoxError> for Failures {
    fn from(err: BoxError) -> Self {
        Failures::from(Diagnostic::new(err.code(), err.to_string()))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl BoxError {
    /// Stable diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BoxError::InvalidConfig(_)
            | BoxError::ConfigLoadFailed(_)
            | BoxError::ConfigSaveFailed(_) => "config",
            BoxError::WorkshopUnavailable(_) => "workshop",
            BoxError::ProjectRead { .. } | BoxError::ProjectParse { .. } => "project",
            BoxError::ModuleNotFound(_) => "module",
            BoxError::InstallFailed { .. } => "install",
            BoxError::Cancelled => "cancelled",
            BoxError::Io(_) => "io",
            BoxError::Internal(_) => "internal",
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BoxError::InvalidConfig(_)
                | BoxError::ConfigLoadFailed(_)
                | BoxError::ConfigSaveFailed(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BoxError::Cancelled)
    }
}
