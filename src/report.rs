//! Reporting strategies for session dispositions
//!
//! A fetch session reports its final disposition exactly once, through
//! whichever [`ReportSink`] the trigger that created it supplied:
//! - [`LogReport`] for the scheduled path (tracing output plus an append-only
//!   diagnostic log file),
//! - [`RpcReport`] for the on-demand path (one structured RPC response).

use crate::rpc::RpcResponder;
use async_trait::async_trait;
use chrono::Local;
use serde_json::json;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Destination for a session's final disposition
///
/// Implementations must tolerate being called exactly once per session; the
/// session's single close transition is the only caller.
#[async_trait]
pub trait ReportSink: Send {
    /// Report a completed transfer with status 200
    async fn success(&mut self, status: i32, written: u64);

    /// Report a failed transfer with the recorded non-200 status
    async fn failure(&mut self, status: i32);
}

/// Logging strategy used by the scheduled trigger
///
/// Emits tracing records and appends one human-readable line per outcome to
/// the configured log file. The log file is opened in append mode for each
/// line and closed again, so concurrent sessions interleave whole lines.
#[derive(Debug, Clone)]
pub struct LogReport {
    /// Append-only diagnostic log file
    log_path: PathBuf,
}

impl LogReport {
    /// Create a logging reporter writing to `log_path`
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    async fn append_line(&self, line: &str) {
        let open = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await;
        match open {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!(path = %self.log_path.display(), error = %e, "log line not written");
                }
            }
            Err(e) => {
                warn!(path = %self.log_path.display(), error = %e, "log file not opened");
            }
        }
    }
}

#[async_trait]
impl ReportSink for LogReport {
    async fn success(&mut self, status: i32, written: u64) {
        info!(status, bytes = written, "scheduled fetch succeeded");
        let line = format!(
            "{} fetch succeeded: status {} bytes {}\n",
            Local::now().to_rfc3339(),
            status,
            written
        );
        self.append_line(&line).await;
    }

    async fn failure(&mut self, status: i32) {
        error!(status, "scheduled fetch failed");
        let line = format!(
            "{} fetch failed: status {}\n",
            Local::now().to_rfc3339(),
            status
        );
        self.append_line(&line).await;
    }
}

/// Responding strategy used by the on-demand trigger
///
/// Owns the originating request's responder handle and sends exactly one
/// structured response: `{"written": n}` on success, or the recorded status
/// as the error code on failure. The responder is consumed on first use, so a
/// second send is unrepresentable; a missing responder (already taken) is a
/// defect and is logged.
pub struct RpcReport {
    /// Responder for the originating request, taken on first report
    responder: Option<Box<dyn RpcResponder>>,
}

impl RpcReport {
    /// Create a responding reporter for one on-demand request
    pub fn new(responder: Box<dyn RpcResponder>) -> Self {
        Self {
            responder: Some(responder),
        }
    }
}

#[async_trait]
impl ReportSink for RpcReport {
    async fn success(&mut self, status: i32, written: u64) {
        info!(status, bytes = written, "on-demand fetch succeeded");
        match self.responder.take() {
            Some(responder) => responder.send_success(json!({ "written": written })).await,
            None => error!("success reported after response was already sent"),
        }
    }

    async fn failure(&mut self, status: i32) {
        warn!(status, "on-demand fetch failed");
        match self.responder.take() {
            Some(responder) => responder.send_error(status, None).await,
            None => error!("failure reported after response was already sent"),
        }
    }
}
