//! On-demand trigger: RPC seam, fetch handler, and method registry
//!
//! The RPC transport itself (framing, delivery, authentication) is an
//! external collaborator. This module owns the seam it plugs into:
//! - [`RpcResponder`] — the capability to answer one request, consumed on
//!   first use so a second response is unrepresentable;
//! - [`FetchHandler`] — the `http_fetch_handler` method body, validating the
//!   argument payload and starting a fetch session;
//! - [`RpcDispatcher`] — a name → handler registry the transport drives;
//! - [`ChannelResponder`] — a oneshot-backed responder for embedders that
//!   bridge responses onto a channel (and for tests).

use crate::engine::HttpEngine;
use crate::error::{Error, ToRpcCode};
use crate::report::RpcReport;
use crate::session::FetchSession;
use crate::sink::FileSink;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Method name the fetch handler registers under
pub const FETCH_METHOD: &str = "http_fetch_handler";

/// Argument payload for the on-demand fetch method
///
/// Missing fields decode as empty strings and are rejected by validation,
/// matching the "present and non-empty" rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchArgs {
    /// Source resource URL
    #[serde(default)]
    pub url: String,
    /// Destination file path
    #[serde(default)]
    pub file: String,
}

/// Capability to answer exactly one RPC request
///
/// Consuming `self` makes double-responding a type error; the fetch session's
/// single close transition guarantees the response is sent at all.
#[async_trait]
pub trait RpcResponder: Send {
    /// Send a structured success response
    async fn send_success(self: Box<Self>, result: Value);

    /// Send an error response with a numeric code and optional message
    async fn send_error(self: Box<Self>, code: i32, message: Option<String>);
}

/// Outcome of an RPC call as observed through a [`ChannelResponder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcOutcome {
    /// The call succeeded with this result payload
    Success(Value),
    /// The call failed
    Error {
        /// Numeric error code (terminal HTTP status, or 500 for
        /// trigger-phase failures)
        code: i32,
        /// Optional human-readable message
        message: Option<String>,
    },
}

/// Responder that forwards the outcome over a oneshot channel
pub struct ChannelResponder {
    tx: oneshot::Sender<RpcOutcome>,
}

impl ChannelResponder {
    /// Create a responder and the receiver its outcome arrives on
    pub fn new() -> (Box<Self>, oneshot::Receiver<RpcOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Box::new(Self { tx }), rx)
    }
}

#[async_trait]
impl RpcResponder for ChannelResponder {
    async fn send_success(self: Box<Self>, result: Value) {
        if self.tx.send(RpcOutcome::Success(result)).is_err() {
            warn!("RPC outcome receiver dropped before response");
        }
    }

    async fn send_error(self: Box<Self>, code: i32, message: Option<String>) {
        if self.tx.send(RpcOutcome::Error { code, message }).is_err() {
            warn!("RPC outcome receiver dropped before response");
        }
    }
}

/// Handler for the on-demand `http_fetch_handler` method
///
/// Validation order is fixed: argument fields, then destination file, then
/// connection initiation. Failures before initiation answer immediately with
/// code 500 and touch nothing further; after a successful initiation the
/// handler returns without blocking and the session answers at finalization.
#[derive(Debug, Clone)]
pub struct FetchHandler {
    engine: HttpEngine,
}

impl FetchHandler {
    /// Create a handler backed by `engine`
    pub fn new(engine: HttpEngine) -> Self {
        Self { engine }
    }

    /// Handle one decoded request
    pub async fn handle(&self, args: Value, responder: Box<dyn RpcResponder>) {
        info!("fetch handler invoked");

        let args: FetchArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(_) => {
                let e = Error::Validation;
                responder.send_error(e.rpc_code(), Some(e.to_string())).await;
                return;
            }
        };
        if args.url.is_empty() || args.file.is_empty() {
            let e = Error::Validation;
            responder.send_error(e.rpc_code(), Some(e.to_string())).await;
            return;
        }

        let sink = match FileSink::create(&args.file).await {
            Ok(sink) => sink,
            Err(e) => {
                warn!(file = %args.file, error = %e, "destination not opened");
                responder.send_error(e.rpc_code(), Some(e.to_string())).await;
                return;
            }
        };

        // URL validation happens before the responder moves into the
        // session, so initiation failures can still be answered here. The
        // sink is dropped on this path, leaving the file closed and empty.
        let url = match HttpEngine::parse_url(&args.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %args.url, error = %e, "connection not initiated");
                responder.send_error(e.rpc_code(), Some(e.to_string())).await;
                return;
            }
        };

        info!(url = %args.url, file = %args.file, "fetching");
        let session = FetchSession::new(sink, RpcReport::new(responder));
        // Detached: the session answers through the responder at finalization.
        let _ = self.engine.initiate(url, session);
    }
}

/// Handler function stored in the dispatcher
type HandlerFn =
    Arc<dyn Fn(Value, Box<dyn RpcResponder>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Name → handler registry driven by the external RPC transport
///
/// The transport decodes a frame to a method name and argument payload,
/// wraps its reply path in an [`RpcResponder`], and calls
/// [`RpcDispatcher::dispatch`].
#[derive(Clone, Default)]
pub struct RpcDispatcher {
    handlers: HashMap<String, HandlerFn>,
}

impl RpcDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a method name
    pub fn register<F>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value, Box<dyn RpcResponder>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Dispatch one request to its registered handler.
    ///
    /// An unknown method is answered with code 404.
    pub async fn dispatch(&self, method: &str, args: Value, responder: Box<dyn RpcResponder>) {
        match self.handlers.get(method) {
            Some(handler) => handler(args, responder).await,
            None => {
                warn!(method, "RPC method not found");
                responder
                    .send_error(404, Some(format!("method {method} not found")))
                    .await;
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn missing_file_field_is_rejected_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let would_be_dest = dir.path().join("never-created");

        let handler = FetchHandler::new(HttpEngine::new());
        let (responder, rx) = ChannelResponder::new();
        handler
            .handle(json!({ "url": "http://example.test/ok" }), responder)
            .await;

        let outcome = rx.await.unwrap();
        assert_eq!(
            outcome,
            RpcOutcome::Error {
                code: 500,
                message: Some("expecting url or file".into())
            }
        );
        assert!(!would_be_dest.exists());
    }

    #[tokio::test]
    async fn empty_url_field_is_rejected() {
        let handler = FetchHandler::new(HttpEngine::new());
        let (responder, rx) = ChannelResponder::new();
        handler
            .handle(json!({ "url": "", "file": "/tmp/out" }), responder)
            .await;

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, RpcOutcome::Error { code: 500, .. }));
    }

    #[tokio::test]
    async fn unopenable_destination_reports_io_error_without_network() {
        let server = MockServer::start().await;
        // Any request arriving would violate the zero-side-effects property.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let bad_path = dir.path().join("no-such-dir").join("out");

        let handler = FetchHandler::new(HttpEngine::new());
        let (responder, rx) = ChannelResponder::new();
        handler
            .handle(
                json!({ "url": format!("{}/ok", server.uri()), "file": bad_path }),
                responder,
            )
            .await;

        let outcome = rx.await.unwrap();
        match outcome {
            RpcOutcome::Error { code, message } => {
                assert_eq!(code, 500);
                assert!(message.unwrap().starts_with("cannot open"));
            }
            other => panic!("expected error outcome, got {other:?}"),
        }

        // Give a stray request time to arrive before wiremock verifies.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn malformed_url_reports_transport_error_and_leaves_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        let handler = FetchHandler::new(HttpEngine::new());
        let (responder, rx) = ChannelResponder::new();
        handler
            .handle(json!({ "url": "not a url", "file": dest.clone() }), responder)
            .await;

        let outcome = rx.await.unwrap();
        match outcome {
            RpcOutcome::Error { code, message } => {
                assert_eq!(code, 500);
                assert!(message.unwrap().starts_with("malformed URL"));
            }
            other => panic!("expected error outcome, got {other:?}"),
        }
        // The file was opened (and truncated) before URL validation, then
        // closed empty when the sink dropped.
        let contents = tokio::fs::read(&dest).await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn successful_fetch_answers_with_written_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"hello world"[..]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out1");

        let handler = FetchHandler::new(HttpEngine::new());
        let (responder, rx) = ChannelResponder::new();
        handler
            .handle(
                json!({ "url": format!("{}/ok", server.uri()), "file": dest.clone() }),
                responder,
            )
            .await;

        // The handler returned without blocking; the response arrives when
        // the session finalizes.
        let outcome = rx.await.unwrap();
        assert_eq!(outcome, RpcOutcome::Success(json!({ "written": 11 })));
        let contents = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn dispatcher_routes_registered_method() {
        let handler = FetchHandler::new(HttpEngine::new());
        let mut dispatcher = RpcDispatcher::new();
        let handler = Arc::new(handler);
        dispatcher.register(FETCH_METHOD, move |args, responder| {
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler.handle(args, responder).await })
        });

        let (responder, rx) = ChannelResponder::new();
        dispatcher.dispatch(FETCH_METHOD, json!({}), responder).await;

        // Empty args fail validation, proving the fetch handler ran.
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, RpcOutcome::Error { code: 500, .. }));
    }

    #[tokio::test]
    async fn dispatcher_rejects_unknown_method() {
        let dispatcher = RpcDispatcher::new();
        let (responder, rx) = ChannelResponder::new();
        dispatcher.dispatch("no_such_method", json!({}), responder).await;

        let outcome = rx.await.unwrap();
        assert_eq!(
            outcome,
            RpcOutcome::Error {
                code: 404,
                message: Some("method no_such_method not found".into())
            }
        );
    }
}
