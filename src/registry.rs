//! Error registry and dispatch
//!
//! Associates error identities with handler closures and resolves arbitrary
//! errors to responses. Two identity tiers exist: concrete error types, keyed
//! by [`TypeId`] at registration, and exact display messages for errors that
//! carry no distinguishable type. Dispatch walks the error's `source` chain,
//! so handlers match errors wrapped by intermediate layers.

use std::any::TypeId;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use http::Extensions;

use crate::response::ErrorResponse;

/// Type-erased handler for a registered error type
///
/// Yields `None` when the link does not downcast to the registered type,
/// which cannot happen for links selected by the matching probe.
type TypedHandlerFn = Box<dyn Fn(&Extensions, &(dyn Error + 'static)) -> Option<ErrorResponse> + Send + Sync>;

/// Handler invoked with a matched chain link, or with the original error
/// when used as the fallback
type DynHandlerFn = Box<dyn Fn(&Extensions, &(dyn Error + 'static)) -> ErrorResponse + Send + Sync>;

struct TypedEntry {
    /// Diagnostic name for traces and `Debug` output, never used for matching
    type_name: &'static str,
    /// Exact dynamic-type check for chain links
    probe: Box<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>,
    handler: TypedHandlerFn,
}

/// Winning candidate for a dispatched error
enum Matched<'r, 'e> {
    Typed(&'r TypedEntry, &'e (dyn Error + 'static)),
    Message(&'r DynHandlerFn, &'e (dyn Error + 'static)),
}

/// Registry of error handlers plus a fallback policy for unmatched errors
///
/// Registration takes `&mut self` and is meant to happen during start-up;
/// [`resolve`](Self::resolve) takes `&self` and is safe to call from any
/// number of threads afterwards. All stored handlers are `Send + Sync`, so a
/// populated registry can be shared through an `Arc` or installed
/// process-wide via [`global::install`](crate::global::install).
///
/// A fresh registry resolves every error to the default response: status 500
/// with no body, so unmatched internal errors surface nothing to callers.
pub struct ErrorRegistry {
    typed: HashMap<TypeId, TypedEntry>,
    messages: HashMap<String, DynHandlerFn>,
    default_handler: Option<DynHandlerFn>,
    default_response: ErrorResponse,
}

impl ErrorRegistry {
    /// Create an empty registry with the default fallback (500, no body)
    #[must_use]
    pub fn new() -> Self {
        Self {
            typed: HashMap::new(),
            messages: HashMap::new(),
            default_handler: None,
            default_response: ErrorResponse::default(),
        }
    }

    /// Register a handler for the concrete error type `E`
    ///
    /// The handler receives the request context and the matched error, which
    /// may be a link anywhere in a dispatched error's `source` chain.
    /// Registering the same type again replaces the previous handler.
    pub fn register<E, H>(&mut self, handler: H)
    where
        E: Error + 'static,
        H: Fn(&Extensions, &E) -> ErrorResponse + Send + Sync + 'static,
    {
        let entry = TypedEntry {
            type_name: std::any::type_name::<E>(),
            probe: Box::new(|link: &(dyn Error + 'static)| link.is::<E>()),
            handler: Box::new(move |cx: &Extensions, link: &(dyn Error + 'static)| {
                link.downcast_ref::<E>().map(|err| handler(cx, err))
            }),
        };
        self.typed.insert(TypeId::of::<E>(), entry);
    }

    /// Register a handler keyed by an error's exact display message
    ///
    /// For errors without a distinguishable type, such as ad hoc message
    /// errors from libraries. The handler receives the chain link whose
    /// message matched, not the outer error that arrived. Registering the
    /// same message again replaces the previous handler.
    pub fn register_message<H>(&mut self, message: impl Into<String>, handler: H)
    where
        H: Fn(&Extensions, &(dyn Error + 'static)) -> ErrorResponse + Send + Sync + 'static,
    {
        self.messages.insert(message.into(), Box::new(handler));
    }

    /// Install a fallback handler for unmatched errors
    ///
    /// The handler receives the original error as dispatched. While set, it
    /// supersedes the static default response.
    pub fn set_default_handler<H>(&mut self, handler: H)
    where
        H: Fn(&Extensions, &(dyn Error + 'static)) -> ErrorResponse + Send + Sync + 'static,
    {
        self.default_handler = Some(Box::new(handler));
    }

    /// Set the static response returned for unmatched errors
    ///
    /// Not consulted while a default handler is set; the handler wins.
    pub fn set_default_response(&mut self, response: ErrorResponse) {
        self.default_response = response;
    }

    /// Resolve an error to its registered response
    ///
    /// Walks the error's `source` chain and dispatches to the best matching
    /// handler. The innermost matching link wins; on the same link, a message
    /// match takes precedence over a typed match, value identity being the
    /// more specific of the two. The winning handler is invoked with the
    /// matched link itself, so a handler registered for a wrapped sentinel
    /// receives exactly that sentinel rather than the outer error. Unmatched
    /// errors go to the default handler if one is set, else the static
    /// default response.
    ///
    /// Never fails: every error resolves to some response.
    #[must_use]
    pub fn resolve<E>(&self, cx: &Extensions, err: &E) -> ErrorResponse
    where
        E: Error + 'static,
    {
        self.dispatch(cx, err, Some(TypeId::of::<E>()))
    }

    /// Resolve a trait-object error
    ///
    /// Same algorithm as [`resolve`](Self::resolve), for errors only
    /// available behind `dyn Error`, such as boxed errors or `anyhow` chains.
    #[must_use]
    pub fn resolve_dyn(&self, cx: &Extensions, err: &(dyn Error + 'static)) -> ErrorResponse {
        self.dispatch(cx, err, None)
    }

    fn dispatch(&self, cx: &Extensions, top: &(dyn Error + 'static), top_id: Option<TypeId>) -> ErrorResponse {
        let mut best = None;
        let mut link: Option<&(dyn Error + 'static)> = Some(top);
        // Only the outermost link has a statically known type
        let mut type_id = top_id;
        while let Some(current) = link {
            if let Some(matched) = self.match_link(current, type_id) {
                best = Some(matched);
            }
            link = current.source();
            type_id = None;
        }

        match best {
            Some(Matched::Typed(entry, matched)) => {
                tracing::debug!(handler = entry.type_name, "matched typed error handler");
                match (entry.handler)(cx, matched) {
                    Some(response) => response,
                    None => self.fallback(cx, top),
                }
            }
            Some(Matched::Message(handler, matched)) => {
                tracing::debug!(error = %matched, "matched message error handler");
                handler(cx, matched)
            }
            None => self.fallback(cx, top),
        }
    }

    /// Candidate match for one chain link; message identity is tried first
    fn match_link<'r, 'e>(
        &'r self,
        link: &'e (dyn Error + 'static),
        type_id: Option<TypeId>,
    ) -> Option<Matched<'r, 'e>> {
        if let Some(handler) = self.message_match(link) {
            return Some(Matched::Message(handler, link));
        }

        let entry = match type_id {
            // Statically known type: direct lookup
            Some(id) => self.typed.get(&id),
            // Inner links surface only as `dyn Error`, which exposes no
            // `TypeId`; exact-type probes cannot match more than one entry
            None => self.typed.values().find(|entry| (entry.probe)(link)),
        };

        entry.map(|entry| Matched::Typed(entry, link))
    }

    fn message_match(&self, link: &(dyn Error + 'static)) -> Option<&DynHandlerFn> {
        // Rendering the message allocates; skip it while the tier is unused
        if self.messages.is_empty() {
            return None;
        }
        self.messages.get(&link.to_string())
    }

    fn fallback(&self, cx: &Extensions, err: &(dyn Error + 'static)) -> ErrorResponse {
        if let Some(handler) = &self.default_handler {
            tracing::trace!("no handler matched, invoking default handler");
            return handler(cx, err);
        }
        tracing::trace!("no handler matched, returning default response");
        self.default_response.clone()
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRegistry")
            .field("typed", &self.typed.values().map(|entry| entry.type_name).collect::<Vec<_>>())
            .field("messages", &self.messages.keys().collect::<Vec<_>>())
            .field("default_handler", &self.default_handler.is_some())
            .field("default_response", &self.default_response)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("record not found")]
    struct NotFound;

    #[derive(Debug, thiserror::Error)]
    #[error("permission denied")]
    struct Denied;

    #[test]
    fn empty_registry_falls_back_to_internal_server_error() {
        let registry = ErrorRegistry::new();
        let response = registry.resolve(&Extensions::new(), &NotFound);
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.is_none());
    }

    #[test]
    fn re_registration_replaces_the_previous_handler() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_cx: &Extensions, _err: &NotFound| ErrorResponse::new(StatusCode::NOT_FOUND));
        registry.register(|_cx: &Extensions, _err: &NotFound| ErrorResponse::new(StatusCode::GONE));

        let response = registry.resolve(&Extensions::new(), &NotFound);
        assert_eq!(response.status, StatusCode::GONE);
    }

    #[test]
    fn message_re_registration_replaces_the_previous_handler() {
        let mut registry = ErrorRegistry::new();
        registry.register_message("record not found", |_cx, _err| ErrorResponse::new(StatusCode::NOT_FOUND));
        registry.register_message("record not found", |_cx, _err| ErrorResponse::new(StatusCode::GONE));

        let response = registry.resolve(&Extensions::new(), &NotFound);
        assert_eq!(response.status, StatusCode::GONE);
    }

    #[test]
    fn registries_do_not_share_handlers() {
        let mut populated = ErrorRegistry::new();
        populated.register(|_cx: &Extensions, _err: &NotFound| ErrorResponse::new(StatusCode::NOT_FOUND));
        let fresh = ErrorRegistry::new();

        let cx = Extensions::new();
        assert_eq!(populated.resolve(&cx, &NotFound).status, StatusCode::NOT_FOUND);
        assert_eq!(fresh.resolve(&cx, &NotFound).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn default_handler_supersedes_static_response() {
        let mut registry = ErrorRegistry::new();
        registry.set_default_handler(|_cx, _err| ErrorResponse::new(StatusCode::BAD_GATEWAY));
        registry.set_default_response(ErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE).with_body(json!("unavailable")));

        let response = registry.resolve(&Extensions::new(), &Denied);
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert!(response.body.is_none());
    }

    #[test]
    fn static_default_response_applies_without_default_handler() {
        let mut registry = ErrorRegistry::new();
        registry.set_default_response(ErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE).with_body(json!("unavailable")));

        let response = registry.resolve(&Extensions::new(), &Denied);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, Some(json!("unavailable")));
    }

    #[test]
    fn debug_output_names_registered_handlers() {
        let mut registry = ErrorRegistry::new();
        registry.register(|_cx: &Extensions, _err: &NotFound| ErrorResponse::new(StatusCode::NOT_FOUND));
        registry.register_message("permission denied", |_cx, _err| ErrorResponse::new(StatusCode::FORBIDDEN));

        let rendered = format!("{registry:?}");
        assert!(rendered.contains("NotFound"));
        assert!(rendered.contains("permission denied"));
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ErrorRegistry>();
    }
}
