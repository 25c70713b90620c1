//! Run event stream: log lines and progress updates emitted by the
//! orchestrator, suitable for driving any front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Level {
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Ok => "ok",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// `completed / total` counter for the current batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RunEvent {
    Log(LogEvent),
    Progress(Progress),
}

impl RunEvent {
    pub fn info(message: impl Into<String>) -> Self {
        RunEvent::Log(LogEvent::new(Level::Info, message))
    }

    pub fn ok(message: impl Into<String>) -> Self {
        RunEvent::Log(LogEvent::new(Level::Ok, message))
    }

    pub fn warn(message: impl Into<String>) -> Self {
        RunEvent::Log(LogEvent::new(Level::Warn, message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        RunEvent::Log(LogEvent::new(Level::Error, message))
    }

    pub fn progress(completed: usize, total: usize) -> Self {
        RunEvent::Progress(Progress { completed, total })
    }
}

/// Lifecycle of a single batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled)
    }
}
