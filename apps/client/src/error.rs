use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::domain::Phase;

type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Failures talking to the game-state server.
///
/// Every variant belongs to the `NetworkFailure` category: the action that
/// produced it is treated as not having happened and its guard is released.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network failure during {action}: {detail}")]
    Network {
        action: &'static str,
        detail: String,
        #[source]
        source: Option<BoxedSource>,
    },
    #[error("Timed out after {timeout:?} during {action}")]
    Timeout {
        action: &'static str,
        timeout: Duration,
    },
    #[error("Unexpected HTTP status {status} during {action}")]
    Status { action: &'static str, status: u16 },
    #[error("Server rejected {action}: {detail}")]
    Rejected { action: &'static str, detail: String },
    #[error("Malformed response for {action}: {detail}")]
    Decode {
        action: &'static str,
        detail: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl ClientError {
    pub fn network(action: &'static str, detail: impl Into<String>) -> Self {
        Self::Network {
            action,
            detail: detail.into(),
            source: None,
        }
    }

    pub fn rejected(action: &'static str, detail: impl Into<String>) -> Self {
        Self::Rejected {
            action,
            detail: detail.into(),
        }
    }

    pub fn decode(action: &'static str, detail: impl Into<String>) -> Self {
        Self::Decode {
            action,
            detail: detail.into(),
            source: None,
        }
    }

    /// Name of the call that failed.
    pub fn action(&self) -> &'static str {
        match self {
            ClientError::Network { action, .. }
            | ClientError::Timeout { action, .. }
            | ClientError::Status { action, .. }
            | ClientError::Rejected { action, .. }
            | ClientError::Decode { action, .. } => action,
        }
    }

    /// Stable SCREAMING_SNAKE_CASE code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Network { .. } => "NETWORK_FAILURE",
            ClientError::Timeout { .. } => "TIMEOUT",
            ClientError::Status { .. } => "UNEXPECTED_STATUS",
            ClientError::Rejected { .. } => "REJECTED",
            ClientError::Decode { .. } => "DECODE_ERROR",
        }
    }

    pub(crate) fn from_reqwest(action: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { action, timeout };
        }
        if err.is_decode() {
            return Self::Decode {
                action,
                detail: err.to_string(),
                source: Some(Box::new(err)),
            };
        }
        if let Some(status) = err.status() {
            return Self::Status {
                action,
                status: status.as_u16(),
            };
        }
        Self::Network {
            action,
            detail: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Precondition violations and collaborator failures of `submit_vote`.
#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Invalid vote target '{target}': {reason}")]
    InvalidTarget { target: String, reason: &'static str },
    #[error("A vote is already being processed")]
    AlreadyVoting,
    #[error("Vote submission failed: {0}")]
    Network(#[from] ClientError),
}

impl VoteError {
    pub(crate) fn invalid(target: &str, reason: &'static str) -> Self {
        Self::InvalidTarget {
            target: target.to_string(),
            reason,
        }
    }
}

/// Rejections of free-text or numeric input, surfaced to the user.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("It is not your turn to speak during the {phase} phase")]
    NotYourTurn { phase: Phase },
    #[error("Enter a number between 1 and {max}")]
    InvalidVoteNumber { max: usize },
    #[error("Invalid player name: {reason}")]
    InvalidName { reason: &'static str },
    #[error("Not connected to the game server")]
    NotConnected,
    #[error("No game in progress")]
    NoSession,
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {detail}")]
    InvalidVar { var: &'static str, detail: String },
}
