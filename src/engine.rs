//! HTTP connection engine
//!
//! [`HttpEngine`] adapts a [`reqwest::Client`] into the ordered event
//! sequence a [`FetchSession`] consumes: `Connect`, a `Chunk` per streamed
//! body fragment, `Reply` once the body completes, and a terminal `Close`.
//! Connection mechanics (DNS, reconnection, timeouts, chunked transfer
//! decoding) stay inside reqwest; this module only translates outcomes.
//!
//! URL validation happens synchronously in [`HttpEngine::parse_url`], before
//! any session exists, so a malformed URL never produces network side
//! effects. Once a session is handed to [`HttpEngine::initiate`] the engine
//! task owns it outright and drops it after the close transition — the
//! exactly-once-release invariant falls out of ownership.

use crate::error::{Error, Result};
use crate::report::ReportSink;
use crate::session::{EngineDirective, FetchSession, SessionEvent};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use url::Url;

/// Connect-phase status supplied when the connection cannot be established.
///
/// The session only needs a non-200 marker here; 599 is the conventional
/// network-connect-error pseudo-status.
pub const CONNECT_FAILURE_STATUS: i32 = 599;

/// Connect-phase status supplied when the connection is established
const CONNECT_OK_STATUS: i32 = 0;

/// Event source driving fetch sessions over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpEngine {
    client: reqwest::Client,
}

impl HttpEngine {
    /// Create an engine with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a URL string before initiating a connection.
    ///
    /// Fails with [`Error::Transport`] so triggers can reject malformed URLs
    /// synchronously, before a session is constructed.
    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::Transport(e.to_string()))
    }

    /// Start the transfer for `session`, delivering lifecycle events until
    /// the terminal close.
    ///
    /// Returns immediately; the spawned task owns the session and releases it
    /// after the close transition runs.
    pub fn initiate<R>(&self, url: Url, session: FetchSession<R>) -> JoinHandle<()>
    where
        R: ReportSink + 'static,
    {
        let client = self.client.clone();
        tokio::spawn(drive(client, url, session))
    }
}

/// Pump one HTTP transfer through a session in wire order.
async fn drive<R: ReportSink>(client: reqwest::Client, url: Url, mut session: FetchSession<R>) {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %url, error = %e, "connection failed");
            deliver(
                &mut session,
                SessionEvent::Connect {
                    status: CONNECT_FAILURE_STATUS,
                },
            )
            .await;
            deliver(&mut session, SessionEvent::Close).await;
            return;
        }
    };

    let status = response.status().as_u16();
    debug!(url = %url, status, "connection established");
    deliver(
        &mut session,
        SessionEvent::Connect {
            status: CONNECT_OK_STATUS,
        },
    )
    .await;

    let mut stream = response.bytes_stream();
    let mut complete = true;
    while let Some(next) = stream.next().await {
        match next {
            Ok(data) => {
                match deliver(&mut session, SessionEvent::Chunk { data }).await {
                    EngineDirective::Continue => {}
                    EngineDirective::CloseConnection => {
                        complete = false;
                        break;
                    }
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "body stream interrupted");
                complete = false;
                break;
            }
        }
    }
    drop(stream);

    // Reply fires only for a fully delivered response, as on the wire.
    if complete {
        deliver(&mut session, SessionEvent::Reply { status }).await;
    }
    deliver(&mut session, SessionEvent::Close).await;
}

/// Hand one event to the session, logging the (defect-level) refusal case.
async fn deliver<R: ReportSink>(
    session: &mut FetchSession<R>,
    event: SessionEvent,
) -> EngineDirective {
    match session.handle_event(event).await {
        Ok(directive) => directive,
        Err(e) => {
            error!(error = %e, "event refused by session");
            EngineDirective::CloseConnection
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportSink;
    use crate::sink::FileSink;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Reported {
        Success { status: i32, written: u64 },
        Failure { status: i32 },
    }

    #[derive(Clone, Default)]
    struct RecordingReport {
        reports: Arc<Mutex<Vec<Reported>>>,
    }

    #[async_trait]
    impl ReportSink for RecordingReport {
        async fn success(&mut self, status: i32, written: u64) {
            self.reports
                .lock()
                .unwrap()
                .push(Reported::Success { status, written });
        }

        async fn failure(&mut self, status: i32) {
            self.reports.lock().unwrap().push(Reported::Failure { status });
        }
    }

    #[test]
    fn parse_url_rejects_malformed_input() {
        let err = HttpEngine::parse_url("not a url").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        HttpEngine::parse_url("http://example.test/ok").unwrap();
    }

    #[tokio::test]
    async fn streams_successful_body_to_sink() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"hello world"[..]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let sink = FileSink::create(&out).await.unwrap();
        let report = RecordingReport::default();
        let session = FetchSession::new(sink, report.clone());

        let engine = HttpEngine::new();
        let url = HttpEngine::parse_url(&format!("{}/ok", server.uri())).unwrap();
        engine.initiate(url, session).await.unwrap();

        assert_eq!(
            report.reports.lock().unwrap().clone(),
            vec![Reported::Success {
                status: 200,
                written: 11
            }]
        );
        let contents = tokio::fs::read(&out).await.unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn non_200_reply_reports_failure_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path().join("out")).await.unwrap();
        let report = RecordingReport::default();
        let session = FetchSession::new(sink, report.clone());

        let engine = HttpEngine::new();
        let url = HttpEngine::parse_url(&format!("{}/missing", server.uri())).unwrap();
        engine.initiate(url, session).await.unwrap();

        assert_eq!(
            report.reports.lock().unwrap().clone(),
            vec![Reported::Failure { status: 404 }]
        );
    }

    #[tokio::test]
    async fn unreachable_host_reaches_close_with_connect_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let sink = FileSink::create(&out).await.unwrap();
        let report = RecordingReport::default();
        let session = FetchSession::new(sink, report.clone());

        // Port 1 is reserved and closed; the connection is refused.
        let engine = HttpEngine::new();
        let url = HttpEngine::parse_url("http://127.0.0.1:1/").unwrap();
        engine.initiate(url, session).await.unwrap();

        assert_eq!(
            report.reports.lock().unwrap().clone(),
            vec![Reported::Failure {
                status: CONNECT_FAILURE_STATUS
            }]
        );
        // The destination exists, is empty, and was closed by finalization.
        let contents = tokio::fs::read(&out).await.unwrap();
        assert!(contents.is_empty());
    }
}
