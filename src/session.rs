//! Fetch session state machine
//!
//! A [`FetchSession`] is created per initiated connection and consumes the
//! ordered lifecycle events the connection engine delivers: `Connect`, zero
//! or more `Chunk`s, `Reply`, and a single terminal `Close`. Body fragments
//! are appended to the owned [`FileSink`] as they arrive; the session never
//! holds more of the response in memory than the chunk currently in hand.
//!
//! At `Close` the session finalizes exactly once: it reports its disposition
//! through the [`ReportSink`] chosen by the originating trigger, closes the
//! sink, and is then dropped by the engine task that owns it. Events after
//! finalization are refused with [`Error::SessionFinalized`] — they indicate
//! a defective event source, not a benign race.

use crate::error::{Error, Result};
use crate::report::ReportSink;
use crate::sink::FileSink;
use bytes::Bytes;
use tracing::{debug, info, warn};

/// Status code treated as a successful transfer
pub const SUCCESS_STATUS: i32 = 200;

/// Fixed failure status recorded when a chunk write comes up short
pub const WRITE_FAILURE_STATUS: i32 = 500;

/// One connection-lifecycle event, delivered in wire order
#[derive(Debug)]
pub enum SessionEvent {
    /// Connection established (or refused); carries the engine's
    /// connect-phase result code
    Connect {
        /// Provisional status supplied by the connection engine
        status: i32,
    },
    /// One fragment of the response body
    Chunk {
        /// The delivered bytes; dropped as soon as the transition returns
        data: Bytes,
    },
    /// Response head/trailer fully received; carries the final status code
    Reply {
        /// Final HTTP status code of the completed response
        status: u16,
    },
    /// Terminal event; the session finalizes and must not be used again
    Close,
}

/// Instruction returned to the connection engine after each event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineDirective {
    /// Keep delivering events
    Continue,
    /// Tear the connection down now (write failure or completed reply)
    CloseConnection,
}

/// State machine for one in-flight download
///
/// Generic over the reporting strategy so the scheduled and on-demand
/// triggers share one implementation.
pub struct FetchSession<R: ReportSink> {
    /// Disposition reporter supplied by the originating trigger
    reporter: R,
    /// Owned destination file; moved out exactly once at finalization
    sink: Option<FileSink>,
    /// Last status-bearing value observed (authoritative at finalization)
    status: i32,
    /// Monotonically increasing count of bytes persisted
    written: u64,
    /// Once set, later Reply events cannot change `status`
    write_failed: bool,
    /// Set at the Close transition; no events are accepted afterwards
    finalized: bool,
}

impl<R: ReportSink> FetchSession<R> {
    /// Create a session around an already-opened sink.
    ///
    /// The sink must have been opened successfully before this point; a
    /// session never exists without one.
    pub fn new(sink: FileSink, reporter: R) -> Self {
        Self {
            reporter,
            sink: Some(sink),
            status: 0,
            written: 0,
            write_failed: false,
            finalized: false,
        }
    }

    /// Bytes persisted so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Last recorded status value
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Whether the terminal Close transition has run
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Apply one lifecycle event, returning the directive for the engine.
    ///
    /// Events delivered after [`SessionEvent::Close`] fail with
    /// [`Error::SessionFinalized`].
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<EngineDirective> {
        if self.finalized {
            return Err(Error::SessionFinalized);
        }
        match event {
            SessionEvent::Connect { status } => {
                self.status = status;
                Ok(EngineDirective::Continue)
            }
            SessionEvent::Chunk { data } => self.on_chunk(&data).await,
            SessionEvent::Reply { status } => {
                // A recorded write failure outranks the reply status.
                if !self.write_failed {
                    self.status = i32::from(status);
                }
                info!(status, "finished fetching");
                Ok(EngineDirective::CloseConnection)
            }
            SessionEvent::Close => self.finalize().await,
        }
    }

    async fn on_chunk(&mut self, data: &[u8]) -> Result<EngineDirective> {
        let sink = self.sink.as_mut().ok_or(Error::SessionFinalized)?;
        // A write error persists nothing; fold it into the short-write rule.
        let n = match sink.write(data).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "chunk write failed");
                0
            }
        };
        let mut directive = EngineDirective::Continue;
        if n != data.len() {
            warn!(
                persisted = n,
                offered = data.len(),
                "short write, closing connection"
            );
            self.status = WRITE_FAILURE_STATUS;
            self.write_failed = true;
            directive = EngineDirective::CloseConnection;
        }
        self.written += n as u64;
        debug!(bytes = n, total = self.written, "chunk persisted");
        Ok(directive)
    }

    async fn finalize(&mut self) -> Result<EngineDirective> {
        self.finalized = true;
        info!(status = self.status, bytes = self.written, "session closed");
        if self.status == SUCCESS_STATUS {
            self.reporter.success(self.status, self.written).await;
        } else {
            self.reporter.failure(self.status).await;
        }
        let sink = self.sink.take().ok_or(Error::SessionFinalized)?;
        if let Err(e) = sink.close().await {
            // The disposition is already reported; the close error is only
            // diagnostic at this point.
            warn!(error = %e, "sink close failed");
        }
        Ok(EngineDirective::CloseConnection)
    }
}
