//! # Domain Types
//!
//! Core domain types used throughout ModBox Lite.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ WorkshopModule  │   │    SyncTask     │   │  SyncSession    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (stable)    │◄──│  module         │   │  id (UUID)      │       │
//! │  │  title, icon    │   │  syncing        │   │  total          │       │
//! │  │  synced         │   │  progress (%)   │   │  current        │       │
//! │  │  version, tags  │   │  failures       │   │  processing     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Version      │   │ CatalogSnapshot │   │ SessionReport   │       │
//! │  │  major.minor.   │   │  what the UI    │   │  post-session   │       │
//! │  │  patch (Ord)    │   │  renders        │   │  summary        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `SyncTask` and `SyncSession` are owned by the catalog store in
//! modbox-sync. Everything outside the store only ever sees clones inside a
//! `CatalogSnapshot`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::outcome::Diagnostic;
use crate::PROGRESS_DONE;

// =============================================================================
// Version
// =============================================================================

/// Module version as an ordered `major.minor.patch` triple.
///
/// Field order makes the derived `Ord` lexicographic, so `0.2.1 > 0.1.9`.
///
/// ## Example
/// ```rust
/// use modbox_core::Version;
///
/// let v: Version = "v1.4.2".parse().unwrap();
/// assert_eq!(v, Version::new(1, 4, 2));
/// assert!(v > Version::new(1, 3, 9));
/// assert_eq!(v.to_string(), "v1.4.2");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Creates a version from its parts.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Creates a version from signed parts as found in `project.xml`.
    ///
    /// Negative values clamp to zero.
    pub fn from_signed(major: i64, minor: i64, patch: i64) -> Self {
        let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        Version::new(clamp(major), clamp(minor), clamp(patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let invalid = |reason: &str| CoreError::InvalidVersion {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if body.is_empty() {
            return Err(invalid("empty"));
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for piece in body.split('.') {
            if count == parts.len() {
                return Err(invalid("more than three components"));
            }
            parts[count] = piece
                .parse::<u32>()
                .map_err(|_| invalid("components must be non-negative integers"))?;
            count += 1;
        }

        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

// =============================================================================
// Workshop Module
// =============================================================================

/// A distributable content package from the workshop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkshopModule {
    /// Stable identifier (the workshop published file id).
    pub id: String,

    /// Display title.
    pub title: String,

    /// Opaque image reference, resolved by the presentation layer.
    #[serde(default)]
    pub icon: String,

    /// True when the local mods installation already holds this item.
    #[serde(default)]
    pub synced: bool,

    #[serde(default)]
    pub version: Version,

    /// Display tags in insertion order, without blanks or duplicates.
    #[serde(default)]
    #[serde(deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

impl WorkshopModule {
    /// Creates an unsynced module with no icon and no tags.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        WorkshopModule {
            id: id.into(),
            title: title.into(),
            icon: String::new(),
            synced: false,
            version: Version::default(),
            tags: Vec::new(),
        }
    }

    /// Sets the synced flag, builder style.
    pub fn with_synced(mut self, synced: bool) -> Self {
        self.synced = synced;
        self
    }

    /// Replaces the tags with their normalized form.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// Trims tags and drops blanks and repeats, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in tags {
        let tag = raw.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

// The backend encodes an empty tag list as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(normalize_tags(tags.unwrap_or_default()))
}

// =============================================================================
// Sync Task
// =============================================================================

/// One module inside the current catalog snapshot plus its sync progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncTask {
    pub module: WorkshopModule,

    /// True while this item is queued or running in the active session.
    pub syncing: bool,

    /// Percent complete; 0 until the item finished, 100 after success.
    pub progress: u8,

    /// Diagnostics recorded for this item in the latest session.
    pub failures: Vec<Diagnostic>,
}

impl SyncTask {
    /// Wraps a freshly listed module.
    pub fn new(module: WorkshopModule) -> Self {
        SyncTask {
            module,
            syncing: false,
            progress: 0,
            failures: Vec::new(),
        }
    }

    /// An eligible task is one whose module is not yet synced.
    pub fn is_eligible(&self) -> bool {
        !self.module.synced
    }

    pub fn is_done(&self) -> bool {
        self.progress == PROGRESS_DONE
    }
}

// =============================================================================
// Sync Session
// =============================================================================

/// The active or most recent batch sync.
///
/// ## Invariants
/// - `current <= total`
/// - `processing == false`: quiescent, a new session may start
/// - `processing == true`: no other session may start, `total` is frozen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncSession {
    #[ts(as = "Option<String>")]
    pub id: Option<Uuid>,
    pub total: usize,
    pub current: usize,
    pub processing: bool,
}

impl SyncSession {
    /// Resets to the quiescent `{0, 0, false}` shape.
    pub fn reset(&mut self) {
        *self = SyncSession::default();
    }

    pub fn is_quiescent(&self) -> bool {
        !self.processing
    }

    /// True once every selected item was processed.
    pub fn is_complete(&self) -> bool {
        !self.processing && self.total > 0 && self.current == self.total
    }
}

// =============================================================================
// Phase
// =============================================================================

/// Position of the catalog in its lifecycle.
///
/// ```text
/// Idle ──► Listing ──► Ready ──► Syncing ──► Completed ──┐
///             ▲          ▲                └─► Cancelled ─┤
///             └──────────┴──────── refresh / start ◄─────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing listed yet.
    #[default]
    Idle,
    /// A module listing is in flight.
    Listing,
    /// Catalog listed (possibly empty) and no session running.
    Ready,
    /// A sync session is processing.
    Syncing,
    /// The last session ran to the end.
    Completed,
    /// The last session was cancelled.
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Listing => write!(f, "listing"),
            Phase::Ready => write!(f, "ready"),
            Phase::Syncing => write!(f, "syncing"),
            Phase::Completed => write!(f, "completed"),
            Phase::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// Read-only view of the catalog store handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    /// Change counter; bumped on every store mutation.
    pub version: u64,
    pub phase: Phase,
    pub loading: bool,
    pub tasks: Vec<SyncTask>,
    pub session: SyncSession,
}

impl CatalogSnapshot {
    /// Looks up a task by module id.
    pub fn task(&self, id: &str) -> Option<&SyncTask> {
        self.tasks.iter().find(|t| t.module.id == id)
    }

    /// Number of tasks a new session would pick up.
    pub fn eligible_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_eligible()).count()
    }

    /// Number of tasks currently flagged as syncing.
    pub fn syncing_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.syncing).count()
    }
}

// =============================================================================
// Session Report
// =============================================================================

/// Diagnostics of one item that failed to sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemFailure {
    pub id: String,
    pub title: String,
    pub causes: Vec<Diagnostic>,
}

/// Post-session summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    #[ts(as = "String")]
    pub session_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<ItemFailure>,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    /// Starts an empty report for a session of `total` items.
    pub fn begin(session_id: Uuid, total: usize) -> Self {
        let now = Utc::now();
        SessionReport {
            session_id,
            total,
            succeeded: 0,
            failed: Vec::new(),
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Items that ran to a result (success or failure).
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }

    /// One-line summary such as `2 succeeded, 1 failed`.
    pub fn summary(&self) -> String {
        let mut line = format!("{} succeeded, {} failed", self.succeeded, self.failed.len());
        if self.cancelled {
            let skipped = self.total.saturating_sub(self.processed());
            line.push_str(&format!(", {} skipped (cancelled)", skipped));
        }
        line
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
