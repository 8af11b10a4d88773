//! Error taxonomy of the state bridge.
//!
//! Two layers:
//! - `TransportError`: the connection to the host failed or spoke garbage.
//! - `BridgeError`: what a facade operation returns to the contract engine.
//!
//! Absence is never an error (it is `Option::None`). Domain rejections are
//! recoverable by contract logic and become [`ResultKind`]s when they end a
//! callee. Transport failures and protocol violations are fatal to the whole
//! top-level execution.

use statebridge_primitives::{CodecError, ResultKind, Ticket};

/// Failure of the connection to the host.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("host disconnected")]
    Disconnected,

    /// The transport has nothing to deliver and never will without new
    /// requests. Only in-memory transports report this.
    #[error("no host message available")]
    Idle,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The host answered a ticket with an error instead of a result.
    #[error("host failed request {ticket}: {reason}")]
    Host { ticket: Ticket, reason: String },
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Error returned by bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    // ── Domain rejections ──
    #[error("{operation} is not allowed in read-only mode")]
    ReadOnly { operation: &'static str },

    #[error("step limit exceeded: {requested} requested, limit {limit}")]
    StepLimitExceeded { limit: u64, requested: u64 },

    #[error("reverted with code {code}: {message}")]
    Reverted { code: u32, message: String },

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("contract failure: {0}")]
    Failure(String),

    // ── Fatal ──
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("execution aborted: {0}")]
    Aborted(String),
}

impl BridgeError {
    /// Create a protocol-violation error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a revert with a user code.
    pub fn revert(code: u32, message: impl Into<String>) -> Self {
        Self::Reverted {
            code,
            message: message.into(),
        }
    }

    /// Returns true for errors that abort the whole top-level execution.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Protocol(_) | Self::Aborted(_)
        )
    }

    /// Result kind reported to the caller when this error ends a callee.
    pub fn result_kind(&self) -> ResultKind {
        match self {
            Self::ReadOnly { .. } => ResultKind::ReadOnlyViolation,
            Self::StepLimitExceeded { .. } => ResultKind::StepLimitExceeded,
            Self::Reverted { code, .. } => ResultKind::Reverted(*code),
            Self::MethodNotFound(_) => ResultKind::MethodNotFound,
            Self::Failure(_) => ResultKind::UnknownFailure,
            Self::Transport(_) => ResultKind::TransportFailure,
            Self::Protocol(_) | Self::Aborted(_) => ResultKind::UnknownFailure,
        }
    }
}
