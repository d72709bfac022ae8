//! Process-wide default registry
//!
//! An application constructs and populates an [`ErrorRegistry`] during
//! start-up, then installs it here exactly once; the slot is read-only for
//! the rest of the process lifetime. The free functions mirror
//! [`ErrorRegistry::resolve`] for call sites without access to the instance
//! and fall back to the default response while nothing is installed. Tests
//! should use their own registry instances instead of this slot.

use std::error::Error;
use std::sync::OnceLock;

use http::Extensions;

use crate::registry::ErrorRegistry;
use crate::response::ErrorResponse;

static REGISTRY: OnceLock<ErrorRegistry> = OnceLock::new();

/// Error returned when a process-wide registry is already installed
#[derive(Debug, thiserror::Error)]
#[error("a process-wide error registry is already installed")]
pub struct InstallError;

/// Install the process-wide registry
///
/// Call once during start-up, after all handlers are registered.
///
/// # Errors
///
/// Returns [`InstallError`] if a registry was already installed.
pub fn install(registry: ErrorRegistry) -> Result<(), InstallError> {
    REGISTRY.set(registry).map_err(|_registry| InstallError)
}

/// Access the installed registry, if any
#[must_use]
pub fn installed() -> Option<&'static ErrorRegistry> {
    REGISTRY.get()
}

/// Resolve an error against the process-wide registry
///
/// Returns the default response (500, no body) while no registry is
/// installed.
#[must_use]
pub fn resolve<E>(cx: &Extensions, err: &E) -> ErrorResponse
where
    E: Error + 'static,
{
    match REGISTRY.get() {
        Some(registry) => registry.resolve(cx, err),
        None => ErrorResponse::default(),
    }
}

/// Trait-object form of [`resolve`]
#[must_use]
pub fn resolve_dyn(cx: &Extensions, err: &(dyn Error + 'static)) -> ErrorResponse {
    match REGISTRY.get() {
        Some(registry) => registry.resolve_dyn(cx, err),
        None => ErrorResponse::default(),
    }
}
