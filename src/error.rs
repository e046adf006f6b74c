//! Error types for the monitor.
//!
//! - [`ConfigError`]: the configuration document could not be loaded
//! - [`ProviderError`]: a call to the metrics or notification provider failed
//! - [`MonitorError`]: the outcome of a unit of work, tagged with an [`ErrorKind`]
//!   that decides what the caller does with it

use std::fmt::Display;

use thiserror::Error;

/// Configuration errors. Any of these stops the process before startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by provider calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("undecodable provider response: {0}")]
    Decode(String),

    /// The provider refused the operation.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Startup cannot continue; the process exits.
    Fatal,

    /// The current job run aborts; the scheduler keeps going.
    TickFailure,

    /// A single (instance, stat) item failed; recorded as absent.
    ItemRecoverable,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{context}: {source}")]
    Fatal {
        context: String,
        #[source]
        source: ProviderError,
    },

    #[error("{context}: {reason}")]
    TickFailure { context: String, reason: String },

    #[error("error getting metric statistics for {stat} on {instance_id}: {reason}")]
    ItemRecoverable {
        instance_id: String,
        stat: String,
        reason: String,
    },
}

impl MonitorError {
    pub fn fatal(context: impl Into<String>, source: ProviderError) -> Self {
        MonitorError::Fatal {
            context: context.into(),
            source,
        }
    }

    pub fn tick(context: impl Into<String>, reason: impl Display) -> Self {
        MonitorError::TickFailure {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub fn item(instance_id: &str, stat: &str, reason: impl Display) -> Self {
        MonitorError::ItemRecoverable {
            instance_id: instance_id.to_string(),
            stat: stat.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MonitorError::Fatal { .. } => ErrorKind::Fatal,
            MonitorError::TickFailure { .. } => ErrorKind::TickFailure,
            MonitorError::ItemRecoverable { .. } => ErrorKind::ItemRecoverable,
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
