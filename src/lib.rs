//! # http-fetch-agent
//!
//! Embeddable agent that downloads a remote resource over HTTP and streams
//! its body to local storage, triggered either on a fixed schedule or on
//! demand via RPC.
//!
//! ## Design Philosophy
//!
//! - **Streaming-first** - body fragments go to disk as they arrive; the
//!   full response is never held in memory
//! - **Exactly-once by ownership** - each session owns its file sink and is
//!   released at its single close transition, on every path
//! - **Library-first** - no CLI or daemon, purely a Rust crate for embedding
//! - **Thin seams** - cron evaluation and RPC transport stay in the host;
//!   the agent consumes ticks and decoded requests
//!
//! ## Quick Start
//!
//! ```no_run
//! use http_fetch_agent::{Config, FetchAgent, RpcDispatcher};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = FetchAgent::new(Config::default())?;
//!
//!     // On-demand trigger: the host's RPC transport drives the dispatcher.
//!     let mut dispatcher = RpcDispatcher::new();
//!     agent.register_rpc(&mut dispatcher);
//!
//!     // Scheduled trigger: the host's cron evaluator fires ticks for
//!     // `agent.cron_expression()`; cancelling the token winds the task down.
//!     let (ticks_tx, ticks_rx) = tokio::sync::mpsc::channel(1);
//!     let shutdown = CancellationToken::new();
//!     let task = agent.scheduled_task(ticks_rx, shutdown.clone());
//!     tokio::spawn(async move { task.run().await });
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Agent facade wiring configuration, engine, and triggers
pub mod agent;
/// Configuration types
pub mod config;
/// HTTP connection engine
pub mod engine;
/// Error types
pub mod error;
/// Reporting strategies for session dispositions
pub mod report;
/// On-demand trigger: RPC seam, fetch handler, and method registry
pub mod rpc;
/// Scheduled trigger task
pub mod scheduled;
/// Fetch session state machine
pub mod session;
/// File sink for streamed download bodies
pub mod sink;

// Re-export commonly used types
pub use agent::FetchAgent;
pub use config::{Config, ScheduleConfig};
pub use engine::HttpEngine;
pub use error::{Error, Result, ToRpcCode};
pub use report::{LogReport, ReportSink, RpcReport};
pub use rpc::{ChannelResponder, FetchArgs, FetchHandler, RpcDispatcher, RpcOutcome, RpcResponder, FETCH_METHOD};
pub use scheduled::ScheduledFetchTask;
pub use session::{EngineDirective, FetchSession, SessionEvent, SUCCESS_STATUS, WRITE_FAILURE_STATUS};
pub use sink::FileSink;
