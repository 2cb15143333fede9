//! # Validation Module
//!
//! Catalog validation for modules returned by the backend.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Backend listing                                              │
//! │  └── project.xml parsing, tag trimming                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Catalog store refresh                                        │
//! │  └── THIS MODULE: id rules, duplicate ids                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Install                                                      │
//! │  └── the id names the target directory under the mods root             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Module ids double as directory names in the mods installation, so they
//! must never contain path separators or start with a dot.
//!
//! ## Usage
//! ```rust
//! use modbox_core::validation::validate_module_id;
//!
//! assert!(validate_module_id("1684738412").is_ok());
//! assert!(validate_module_id("../escape").is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::WorkshopModule;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum accepted length of a module id.
pub const MAX_MODULE_ID_LEN: usize = 64;

/// Validates a module id.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No `/`, `\`, or leading `.`
pub fn validate_module_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > MAX_MODULE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_MODULE_ID_LEN,
        });
    }

    if id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must not contain path separators or start with '.'".to_string(),
        });
    }

    Ok(())
}

/// Validates a single module.
pub fn validate_module(module: &WorkshopModule) -> ValidationResult<()> {
    validate_module_id(&module.id)
}

/// Splits a listing into accepted modules and the reasons others were dropped.
///
/// Listing order is preserved. For duplicate ids the first occurrence wins.
/// A module with a blank title gets its id as title.
pub fn validate_catalog(
    modules: Vec<WorkshopModule>,
) -> (Vec<WorkshopModule>, Vec<ValidationError>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut accepted = Vec::with_capacity(modules.len());
    let mut rejected = Vec::new();

    for mut module in modules {
        if let Err(e) = validate_module(&module) {
            rejected.push(e);
            continue;
        }

        if !seen.insert(module.id.clone()) {
            rejected.push(ValidationError::Duplicate {
                field: "id".to_string(),
                value: module.id,
            });
            continue;
        }

        if module.title.trim().is_empty() {
            module.title = module.id.clone();
        }

        accepted.push(module);
    }

    (accepted, rejected)
}
