//! Agent facade wiring configuration, engine, and triggers
//!
//! [`FetchAgent`] is the embedding surface: construct it once from a
//! validated [`Config`], register the on-demand handler into the host's RPC
//! dispatcher, and hand the cron expression plus a tick channel to the host's
//! schedule evaluator. The agent owns nothing long-running itself; both
//! triggers run on tasks the host spawns.
//!
//! # Example
//!
//! ```no_run
//! use http_fetch_agent::{Config, FetchAgent, RpcDispatcher};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> http_fetch_agent::Result<()> {
//! let agent = FetchAgent::new(Config::default())?;
//!
//! // On-demand trigger: plug into the host's RPC transport.
//! let mut dispatcher = RpcDispatcher::new();
//! agent.register_rpc(&mut dispatcher);
//!
//! // Scheduled trigger: the host's cron evaluator sends ticks for
//! // `agent.cron_expression()` into `ticks_tx`.
//! let (ticks_tx, ticks_rx) = tokio::sync::mpsc::channel(1);
//! let shutdown = CancellationToken::new();
//! let task = agent.scheduled_task(ticks_rx, shutdown.clone());
//! tokio::spawn(async move { task.run().await });
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::engine::HttpEngine;
use crate::error::Result;
use crate::rpc::{FetchHandler, RpcDispatcher, FETCH_METHOD};
use crate::scheduled::ScheduledFetchTask;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Embedding facade for the fetch agent
#[derive(Debug, Clone)]
pub struct FetchAgent {
    /// Immutable configuration captured at construction
    config: Config,
    /// Shared HTTP engine behind both triggers
    engine: HttpEngine,
}

impl FetchAgent {
    /// Create an agent from a configuration, validating it first
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine: HttpEngine::new(),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Six-field cron expression to hand to the external schedule evaluator
    pub fn cron_expression(&self) -> &str {
        &self.config.schedule.cron
    }

    /// Build the on-demand fetch handler
    pub fn fetch_handler(&self) -> FetchHandler {
        FetchHandler::new(self.engine.clone())
    }

    /// Register the on-demand handler under its method name
    pub fn register_rpc(&self, dispatcher: &mut RpcDispatcher) {
        let handler = Arc::new(self.fetch_handler());
        dispatcher.register(FETCH_METHOD, move |args, responder| {
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler.handle(args, responder).await })
        });
        info!(method = FETCH_METHOD, "RPC handler registered");
    }

    /// Build the scheduled trigger task, driven by `ticks` until `shutdown`
    pub fn scheduled_task(
        &self,
        ticks: mpsc::Receiver<()>,
        shutdown: CancellationToken,
    ) -> ScheduledFetchTask {
        ScheduledFetchTask::new(
            self.config.schedule.clone(),
            self.engine.clone(),
            ticks,
            shutdown,
        )
    }
}
