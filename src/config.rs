//! Configuration types for http-fetch-agent

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level agent configuration
///
/// Captured once at construction and treated as immutable afterwards; the
/// scheduled trigger reads its fixed URL, destination, and cron expression
/// from here and no code path mutates them later.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scheduled-trigger configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Validate the configuration, returning a [`Error::Config`] naming the
    /// offending key on failure.
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()
    }
}

/// Scheduled-trigger configuration (fixed URL, destination, cron expression)
///
/// The cron expression uses six whitespace-separated fields (seconds,
/// minutes, hours, day-of-month, month, day-of-week). It is carried as an
/// opaque string: parsing and timer management belong to the external
/// schedule evaluator, which receives the expression at registration time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression (default: every minute)
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Fixed URL fetched on every scheduled tick
    #[serde(default = "default_url")]
    pub url: String,

    /// Destination file for the downloaded body (truncated on each tick)
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Append-only diagnostic log file for scheduled outcomes.
    ///
    /// Must differ from `destination`: sharing one path would make each run
    /// overwrite the previous download with log text.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            url: default_url(),
            destination: default_destination(),
            log_path: default_log_path(),
        }
    }
}

impl ScheduleConfig {
    /// Validate the scheduled-trigger settings
    pub fn validate(&self) -> Result<()> {
        let fields = self.cron.split_whitespace().count();
        if fields != 6 {
            return Err(Error::Config {
                message: format!("cron expression must have 6 fields, got {fields}"),
                key: Some("schedule.cron".into()),
            });
        }
        if self.url.is_empty() {
            return Err(Error::Config {
                message: "scheduled fetch URL must not be empty".into(),
                key: Some("schedule.url".into()),
            });
        }
        if self.destination.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "scheduled destination path must not be empty".into(),
                key: Some("schedule.destination".into()),
            });
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "scheduled log path must not be empty".into(),
                key: Some("schedule.log_path".into()),
            });
        }
        if self.destination == self.log_path {
            return Err(Error::Config {
                message: "destination and log path must be distinct files".into(),
                key: Some("schedule.log_path".into()),
            });
        }
        Ok(())
    }
}

fn default_cron() -> String {
    "0 */1 * * * *".to_string()
}

fn default_url() -> String {
    "http://info.cern.ch".to_string()
}

fn default_destination() -> PathBuf {
    PathBuf::from("download.bin")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("fetch-agent.log")
}
