//! Error types for the client scheduling and capability layer.
//!
//! This module defines the error taxonomy used across the crate: invalid
//! future-state transitions, task-level failures (timeout, cancellation,
//! generic callback errors), configuration problems, and handler errors
//! surfaced through message dispatch.

use std::rc::Rc;

use thiserror::Error;

/// Convenience type alias for Results using [`SessionError`].
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Attempted transition on an already-terminal future.
///
/// Carries the name of the state the future was already in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state: future is already {0}")]
pub struct InvalidStateError(pub &'static str);

/// The error a failed future carries, and the error a scheduled callback may
/// return to the scheduler.
///
/// `Cancelled` is the distinguished cooperative-cancellation signal: every
/// scheduling primitive re-raises it and treats the task as cancelled rather
/// than failed. Any other variant is reported at the task boundary and never
/// crashes the reactor.
///
/// The generic variant shares its payload so that a failed future can hand
/// the same error to every subscriber.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The future did not settle within its guard window.
    #[error("future timed out before yielding a result")]
    Timeout,

    /// Cooperative cancellation; always re-raised, never swallowed.
    #[error("task was cancelled")]
    Cancelled,

    /// Any other error raised inside a scheduled callback.
    #[error("{0}")]
    Failed(Rc<anyhow::Error>),
}

impl TaskError {
    /// Wrap an arbitrary error as a generic task failure.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(Rc::new(err.into()))
    }

    /// Whether this is the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::failed(err)
    }
}

/// Malformed proxy or capability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Proxy version was not SOCKS4 or SOCKS5.
    #[error("proxy version must be 4 or 5, got {0}")]
    InvalidProxyVersion(u8),

    /// Capability mutation after the one-shot negotiation phase closed.
    #[error("capability negotiation already finished")]
    NegotiationClosed,
}

/// Errors raised inside message handlers.
///
/// The dispatch driver does not catch these; they propagate to its caller so
/// the user directory is never left partially updated for the current
/// message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// A handler received a message it could not act on.
    #[error("malformed {command} message: {reason}")]
    MalformedMessage {
        /// The raw command name.
        command: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Configuration problem surfaced during negotiation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Any other handler error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SessionError {
    /// Build a malformed-message error.
    pub fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
