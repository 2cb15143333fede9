//! # Outcome Model
//!
//! The typed result of every call that crosses into the backend process.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Outcome<T>                                     │
//! │                                                                         │
//! │   Success(T)                        Failure([Diagnostic, ...])          │
//! │   ──────────                        ───────────────────────────         │
//! │   value()  → T                      value()  → T::default()             │
//! │   causes() → []                     causes() → ordered diagnostics      │
//! │                                                                         │
//! │   Exactly one side is ever populated. A failure always carries at      │
//! │   least one diagnostic.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! The backend reports failures as a JSON array of objects whose code field
//! is named `error`:
//! ```json
//! [{"error": "workshop", "description": "failed to load workshop"}]
//! ```
//! [`Failures`] renders itself in exactly that form through `Display`, so a
//! failure that crosses the process boundary as plain text parses back into
//! the same list.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Code used when a failure is constructed without any diagnostic.
pub const UNKNOWN_CODE: &str = "unknown";

// =============================================================================
// Diagnostic
// =============================================================================

/// One cause of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Diagnostic {
    /// Short machine-readable code (shown as the notification title).
    #[serde(rename = "error")]
    pub code: String,

    /// Human-readable detail.
    #[serde(default)]
    pub description: String,
}

impl Diagnostic {
    /// Creates a diagnostic from a code and a description.
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Diagnostic {
            code: code.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

// =============================================================================
// Failures
// =============================================================================

/// Ordered list of diagnostics, used as the backend error type.
///
/// ## Example
/// ```rust
/// use modbox_core::Failures;
///
/// let failures = Failures::failed("workshop", "failed to read 1001")
///     .append("project.xml", "unexpected end of file");
/// assert_eq!(failures.len(), 2);
///
/// let text = failures.to_string();
/// assert_eq!(Failures::parse(&text).unwrap(), failures);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Failures(Vec<Diagnostic>);

impl Failures {
    /// Creates an empty list.
    pub fn new() -> Self {
        Failures(Vec::new())
    }

    /// Creates a list holding a single diagnostic.
    pub fn failed(code: impl Into<String>, description: impl Into<String>) -> Self {
        Failures(vec![Diagnostic::new(code, description)])
    }

    /// Appends a diagnostic, builder style.
    pub fn append(mut self, code: impl Into<String>, description: impl Into<String>) -> Self {
        self.0.push(Diagnostic::new(code, description));
        self
    }

    /// Appends a diagnostic in place.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Consumes the list and returns the diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// Renders the list as its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parses a wire payload.
    ///
    /// Accepts a JSON array of diagnostics or a single diagnostic object.
    /// An empty array is rejected: it carries no cause to report.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let text = text.trim();

        if let Ok(list) = serde_json::from_str::<Vec<Diagnostic>>(text) {
            if list.is_empty() {
                return Err(CoreError::InvalidDiagnostics("empty list".to_string()));
            }
            return Ok(Failures(list));
        }

        serde_json::from_str::<Diagnostic>(text)
            .map(|d| Failures(vec![d]))
            .map_err(|e| CoreError::InvalidDiagnostics(e.to_string()))
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl std::error::Error for Failures {}

impl Deref for Failures {
    type Target = [Diagnostic];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Diagnostic> for Failures {
    fn from(diagnostic: Diagnostic) -> Self {
        Failures(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for Failures {
    fn from(list: Vec<Diagnostic>) -> Self {
        Failures(list)
    }
}

impl IntoIterator for Failures {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Diagnostic> for Failures {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Failures(iter.into_iter().collect())
    }
}

// =============================================================================
// Outcome
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Repr<T> {
    Success(T),
    Failure(Vec<Diagnostic>),
}

/// Success-with-value or failure-with-diagnostics.
///
/// The representation is private so the one-side-only and
/// at-least-one-cause invariants cannot be bypassed.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    repr: Repr<T>,
}

impl<T> Outcome<T> {
    /// Wraps a value as a success.
    pub fn succeed(value: T) -> Self {
        Outcome {
            repr: Repr::Success(value),
        }
    }

    /// Builds a failure from an ordered sequence of diagnostics.
    ///
    /// A single cause is passed as `[diagnostic]`. An empty sequence is
    /// replaced by one [`UNKNOWN_CODE`] diagnostic.
    pub fn failed<I>(causes: I) -> Self
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        let mut causes: Vec<Diagnostic> = causes.into_iter().collect();
        if causes.is_empty() {
            causes.push(Diagnostic::new(UNKNOWN_CODE, "operation failed without a cause"));
        }
        Outcome {
            repr: Repr::Failure(causes),
        }
    }

    /// Returns true for a success.
    pub fn is_success(&self) -> bool {
        matches!(self.repr, Repr::Success(_))
    }

    /// Returns true for a failure.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Diagnostics of a failure; empty on success.
    pub fn causes(&self) -> &[Diagnostic] {
        match &self.repr {
            Repr::Success(_) => &[],
            Repr::Failure(causes) => causes.as_slice(),
        }
    }

    /// Borrows the value if this is a success.
    pub fn value_ref(&self) -> Option<&T> {
        match &self.repr {
            Repr::Success(value) => Some(value),
            Repr::Failure(_) => None,
        }
    }

    /// Returns the value, or `T::default()` on failure.
    pub fn value(self) -> T
    where
        T: Default,
    {
        match self.repr {
            Repr::Success(value) => value,
            Repr::Failure(_) => T::default(),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, Failures> {
        match self.repr {
            Repr::Success(value) => Ok(value),
            Repr::Failure(causes) => Err(Failures::from(causes)),
        }
    }

    /// Maps the success value, keeping diagnostics untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self.repr {
            Repr::Success(value) => Outcome::succeed(f(value)),
            Repr::Failure(causes) => Outcome {
                repr: Repr::Failure(causes),
            },
        }
    }
}

impl<T> From<Result<T, Failures>> for Outcome<T> {
    fn from(result: Result<T, Failures>) -> Self {
        match result {
            Ok(value) => Outcome::succeed(value),
            Err(failures) => Outcome::failed(failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeed_is_not_failure() {
        for v in [0, 1, -7, i64::MAX] {
            let outcome = Outcome::succeed(v);
            assert!(!outcome.is_failure());
            assert!(outcome.is_success());
            assert!(outcome.causes().is_empty());
            assert_eq!(outcome.value(), v);
        }
    }

    #[test]
    fn test_failed_keeps_causes_in_order() {
        let causes = vec![
            Diagnostic::new("workshop", "failed to load"),
            Diagnostic::new("project.xml", "bad tag"),
        ];
        let outcome: Outcome<Vec<String>> = Outcome::failed(causes.clone());
        assert!(!outcome.is_success());
        assert!(outcome.is_failure());
        assert_eq!(outcome.causes(), causes.as_slice());
        assert!(outcome.value().is_empty());
    }

    #[test]
    fn test_failed_single_cause() {
        let outcome: Outcome<()> = Outcome::failed([Diagnostic::new("E", "D")]);
        assert_eq!(outcome.causes(), &[Diagnostic::new("E", "D")]);
    }

    #[test]
    fn test_failed_without_causes_gets_unknown() {
        let outcome: Outcome<u8> = Outcome::failed(Vec::new());
        assert!(outcome.is_failure());
        assert_eq!(outcome.causes().len(), 1);
        assert_eq!(outcome.causes()[0].code, UNKNOWN_CODE);
    }

    #[test]
    fn test_into_result_and_map() {
        let ok = Outcome::succeed(2).map(|v| v * 10);
        assert_eq!(ok.into_result().unwrap(), 20);

        let err: Outcome<u32> = Outcome::failed([Diagnostic::new("E", "D")]);
        let err = err.map(|v| v + 1).into_result().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].code, "E");
    }

    #[test]
    fn test_value_ref() {
        let ok = Outcome::succeed("x".to_string());
        assert_eq!(ok.value_ref().map(String::as_str), Some("x"));
        let err: Outcome<String> = Outcome::failed([Diagnostic::new("E", "D")]);
        assert!(err.value_ref().is_none());
    }

    #[test]
    fn test_diagnostic_wire_names() {
        let d = Diagnostic::new("E", "D");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"error":"E","description":"D"}"#);
    }

    #[test]
    fn test_failures_parse_forms() {
        let list = Failures::parse(r#"[{"error":"E","description":"D"}]"#).unwrap();
        assert_eq!(list.into_vec(), vec![Diagnostic::new("E", "D")]);

        let single = Failures::parse(r#" {"error":"E"} "#).unwrap();
        assert_eq!(single[0], Diagnostic::new("E", ""));

        assert!(Failures::parse("[]").is_err());
        assert!(Failures::parse("disk full").is_err());
    }

    #[test]
    fn test_failures_display_is_json() {
        let failures = Failures::failed("E", "D");
        assert_eq!(failures.to_string(), r#"[{"error":"E","description":"D"}]"#);
    }

    #[test]
    fn test_outcome_from_result() {
        let outcome: Outcome<u8> = Err(Failures::failed("E", "D")).into();
        assert!(outcome.is_failure());
        let outcome: Outcome<u8> = Ok(4).into();
        assert_eq!(outcome.value(), 4);
    }
}
