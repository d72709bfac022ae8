//! Registry-based mapping from application errors to HTTP responses
//!
//! Associates error identities (concrete types or sentinel messages) with
//! handler closures producing a status code and an opaque JSON payload.
//! Dispatch walks the error's `source` chain, so handlers match errors even
//! when intermediate layers wrapped them, and unmatched errors fall back to
//! a configurable default instead of leaking internal detail to callers.
//!
//! ```
//! use errmap::{ErrorRegistry, ErrorResponse};
//! use http::{Extensions, StatusCode};
//! use serde_json::json;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("input validation failed")]
//! struct ValidationError;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("database overloaded")]
//! struct OverloadedError;
//!
//! // The wrapping an intermediate layer adds around a sentinel
//! #[derive(Debug, thiserror::Error)]
//! #[error("could not reach database: {source}")]
//! struct DbError {
//!     #[source]
//!     source: OverloadedError,
//! }
//!
//! let mut registry = ErrorRegistry::new();
//! registry.register(|_cx: &Extensions, err: &ValidationError| {
//!     ErrorResponse::new(StatusCode::BAD_REQUEST).with_body(json!({ "error": err.to_string() }))
//! });
//! registry.register_message("database overloaded", |_cx, _err| {
//!     ErrorResponse::new(StatusCode::BAD_GATEWAY).with_body(json!({ "error": "try again later" }))
//! });
//!
//! let cx = Extensions::new();
//!
//! let response = registry.resolve(&cx, &ValidationError);
//! assert_eq!(response.status, StatusCode::BAD_REQUEST);
//!
//! // The wrapped sentinel still dispatches to its handler
//! let response = registry.resolve(&cx, &DbError { source: OverloadedError });
//! assert_eq!(response.status, StatusCode::BAD_GATEWAY);
//!
//! // Unregistered errors surface nothing
//! let response = registry.resolve(&cx, &std::fmt::Error);
//! assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
//! assert!(response.body.is_none());
//! ```

pub mod global;
mod registry;
mod response;

pub use registry::ErrorRegistry;
pub use response::ErrorResponse;
