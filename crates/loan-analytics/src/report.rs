//! Status reporting between the execution facade and its presenters.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a reported status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusLevel::Success => "success",
            StatusLevel::Info => "info",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// One observable outcome of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Status {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }
}

/// Receives statuses as they are reported.
pub trait StatusSink: Send + Sync {
    fn report(&self, status: Status);
}

/// Forwards every status to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn report(&self, status: Status) {
        match status.level {
            StatusLevel::Success | StatusLevel::Info => tracing::info!("{}", status.message),
            StatusLevel::Warning => tracing::warn!("{}", status.message),
            StatusLevel::Error => tracing::error!("{}", status.message),
        }
    }
}

/// Keeps every status in memory, for presenters that show them after the fact.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    statuses: Arc<Mutex<Vec<Status>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected statuses.
    pub fn statuses(&self) -> Vec<Status> {
        match self.statuses.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Take every collected status, leaving the sink empty.
    pub fn drain(&self) -> Vec<Status> {
        match self.statuses.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn has_level(&self, level: StatusLevel) -> bool {
        self.statuses().iter().any(|s| s.level == level)
    }
}

impl StatusSink for CollectingSink {
    fn report(&self, status: Status) {
        tracing::debug!("status {}: {}", status.level, status.message);
        match self.statuses.lock() {
            Ok(mut guard) => guard.push(status),
            Err(poisoned) => poisoned.into_inner().push(status),
        }
    }
}
