//! # RPC Bridge
//!
//! The single place where backend faults are turned into data.
//!
//! ## Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      invoke / invoke_with                               │
//! │                                                                         │
//! │  operation resolves Ok(v) ───────────────────────► Outcome::succeed(v)  │
//! │                                                                         │
//! │  operation resolves Err(e)                                              │
//! │     text = e.to_string()                                                │
//! │     ├── text is a JSON diagnostic list/object ──► Outcome::failed(list) │
//! │     └── anything else ──────────────────────────► failed([rpc: text])   │
//! │                                                                         │
//! │  operation panics ──────────────────────────────► failed([panic: msg])  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend binding generates two call shapes: zero-argument operations
//! and one-argument operations. The caller picks [`invoke`] or
//! [`invoke_with`] depending on whether it holds a parameter.
//!
//! ## Example
//! ```rust
//! use modbox_sync::bridge;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let outcome = bridge::invoke_with(
//!     |n: u32| async move {
//!         Err::<u32, _>(format!(r#"[{{"error":"E","description":"{}"}}]"#, n))
//!     },
//!     7,
//! )
//! .await;
//! assert!(outcome.is_failure());
//! assert_eq!(outcome.causes()[0].description, "7");
//! # });
//! ```

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use modbox_core::{Diagnostic, Failures, Outcome};
use tracing::debug;

/// Code for faults whose text is not a diagnostic payload.
pub const RPC_CODE: &str = "rpc";

/// Code for operations that panicked.
pub const PANIC_CODE: &str = "panic";

/// Invokes a zero-argument operation and normalizes its outcome.
pub async fn invoke<R, E, F, Fut>(operation: F) -> Outcome<R>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    // The call happens inside the guarded future so a panic while building
    // the operation's future is caught as well.
    let guarded = AssertUnwindSafe(async move { operation().await }).catch_unwind();

    match guarded.await {
        Ok(Ok(value)) => Outcome::succeed(value),
        Ok(Err(fault)) => {
            let failures = fault_to_failures(&fault.to_string());
            debug!(causes = failures.len(), fault = %failures, "Backend call failed");
            Outcome::failed(failures)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            debug!(message = %message, "Backend call panicked");
            Outcome::failed([Diagnostic::new(PANIC_CODE, message)])
        }
    }
}

/// Invokes a one-argument operation and normalizes its outcome.
pub async fn invoke_with<P, R, E, F, Fut>(operation: F, param: P) -> Outcome<R>
where
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    invoke(move || operation(param)).await
}

/// Parses fault text as a diagnostic payload, falling back to one `rpc`
/// diagnostic carrying the text.
pub fn fault_to_failures(text: &str) -> Failures {
    Failures::parse(text).unwrap_or_else(|_| Failures::failed(RPC_CODE, text))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
