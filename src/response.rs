//! Status and payload pair produced for a handled error

use http::StatusCode;
use serde_json::Value;

/// Response produced for a handled error
///
/// Carries the HTTP status code and an opaque JSON body. Handlers construct
/// it; the dispatcher returns it verbatim and never inspects the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// HTTP status code for the response
    pub status: StatusCode,
    /// Response body, absent by default
    pub body: Option<Value>,
}

impl ErrorResponse {
    /// Create a response with the given status and no body
    #[must_use]
    pub const fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// Attach a response body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl Default for ErrorResponse {
    /// Internal server error with no body
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<StatusCode> for ErrorResponse {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}
