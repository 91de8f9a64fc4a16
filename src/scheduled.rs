//! Scheduled trigger task
//!
//! [`ScheduledFetchTask`] runs the fixed-URL download on every tick the
//! external schedule evaluator delivers. Cron-expression parsing and timer
//! management belong to that evaluator; the task only consumes a tick
//! channel, so anything capable of sending `()` on a schedule can drive it.
//!
//! Outcomes are observed through logging alone: each tick either dispatches
//! a session reporting through [`LogReport`], or logs why it could not and
//! waits for the next tick. Nothing is returned to the evaluator.
//!
//! # Example
//!
//! ```no_run
//! use http_fetch_agent::config::ScheduleConfig;
//! use http_fetch_agent::engine::HttpEngine;
//! use http_fetch_agent::scheduled::ScheduledFetchTask;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let (ticks_tx, ticks_rx) = tokio::sync::mpsc::channel(1);
//! let shutdown = CancellationToken::new();
//! let task = ScheduledFetchTask::new(
//!     ScheduleConfig::default(),
//!     HttpEngine::new(),
//!     ticks_rx,
//!     shutdown.clone(),
//! );
//!
//! // Hand `ticks_tx` to the cron evaluator, then run until shutdown.
//! tokio::spawn(async move { task.run().await });
//! # }
//! ```

use crate::config::ScheduleConfig;
use crate::engine::HttpEngine;
use crate::report::LogReport;
use crate::session::FetchSession;
use crate::sink::FileSink;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Tick-driven task that fires the fixed scheduled download
pub struct ScheduledFetchTask {
    /// Immutable scheduled-trigger settings, captured at construction
    config: ScheduleConfig,

    /// Engine used to initiate each transfer
    engine: HttpEngine,

    /// Ticks from the external schedule evaluator
    ticks: mpsc::Receiver<()>,

    /// Cooperative shutdown signal
    shutdown: CancellationToken,
}

impl ScheduledFetchTask {
    /// Create a scheduled fetch task
    pub fn new(
        config: ScheduleConfig,
        engine: HttpEngine,
        ticks: mpsc::Receiver<()>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            engine,
            ticks,
            shutdown,
        }
    }

    /// Run until the tick channel closes or shutdown is requested.
    ///
    /// Each received tick fires one download of the configured URL to the
    /// configured destination. The task never blocks a tick on the transfer
    /// it started; sessions run to completion on their own.
    pub async fn run(mut self) {
        info!(cron = %self.config.cron, url = %self.config.url, "scheduled fetch task started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("scheduled fetch task shutting down");
                    break;
                }
                tick = self.ticks.recv() => match tick {
                    Some(()) => self.fire().await,
                    None => {
                        info!("tick source closed, scheduled fetch task stopping");
                        break;
                    }
                },
            }
        }
        info!("scheduled fetch task stopped");
    }

    /// Fire one scheduled download.
    ///
    /// Failures to open the destination or initiate the connection are
    /// logged and abort this tick only; the task stays alive for the next.
    pub async fn fire(&self) {
        let sink = match FileSink::create(&self.config.destination).await {
            Ok(sink) => sink,
            Err(e) => {
                error!(
                    path = %self.config.destination.display(),
                    error = %e,
                    "scheduled fetch aborted: destination not opened"
                );
                return;
            }
        };

        let url = match HttpEngine::parse_url(&self.config.url) {
            Ok(url) => url,
            Err(e) => {
                // The sink drops here, leaving the destination truncated and
                // closed, as the on-demand path does for the same failure.
                error!(url = %self.config.url, error = %e, "scheduled fetch aborted");
                return;
            }
        };

        info!(url = %self.config.url, path = %self.config.destination.display(), "fetching");
        let reporter = LogReport::new(self.config.log_path.clone());
        let session = FetchSession::new(sink, reporter);
        // Detached: the outcome lands in the log when the session finalizes.
        let _ = self.engine.initiate(url, session);
        debug!("scheduled fetch dispatched");
    }
}
