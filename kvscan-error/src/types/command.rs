use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Failures of a command issued through the client core.
///
/// None of these is retried inside the core. They reach the immediate caller
/// (or the failure side of a completion handle) unchanged.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// A scan was issued with a finished cursor, or the store rejected the
    /// cursor token.
    #[error("Invalid cursor: {reason}")]
    InvalidCursor { reason: String },
    /// The request could not be completed by the transport.
    #[error("Transport failure: {reason}")]
    TransportFailure { reason: String },
    /// The streaming channel failed while accepting the element at
    /// `position` (zero-based, within the page).
    #[error("Streaming channel fault at element {position}: {reason}")]
    ChannelFault { position: u64, reason: String },
    /// The reply does not have the shape expected for `command`.
    #[error("Malformed reply to {command}: {reason}")]
    MalformedReply {
        command: &'static str,
        reason: String,
    },
    /// The store answered with an error reply.
    #[error("Server error: {message}")]
    ServerError { message: String },
    /// The store reported that the key holds another data type.
    #[error("Wrong type: {message}")]
    WrongType { message: String },
    /// Arguments rejected before anything was sent.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl CommandError {
    pub fn malformed(
        command: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedReply {
            command,
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::TransportFailure {
            reason: reason.into(),
        }
    }
}

impl ErrorExt for CommandError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCursor { .. } => StatusCode::InvalidCursor,
            Self::TransportFailure { .. } => StatusCode::TransportFailure,
            Self::ChannelFault { .. } => StatusCode::ChannelFault,
            Self::MalformedReply { .. } => StatusCode::MalformedReply,
            Self::ServerError { .. } => StatusCode::ServerError,
            Self::WrongType { .. } => StatusCode::WrongType,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::MalformedReply { command, .. } => format!("Unexpected reply to {command}"),
            Self::TransportFailure { .. } => "Transport failure".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (
                CommandError::InvalidCursor {
                    reason: "x".into(),
                },
                StatusCode::InvalidCursor,
            ),
            (CommandError::transport("x"), StatusCode::TransportFailure),
            (
                CommandError::ChannelFault {
                    position: 0,
                    reason: "x".into(),
                },
                StatusCode::ChannelFault,
            ),
            (CommandError::malformed("HSCAN", "x"), StatusCode::MalformedReply),
            (CommandError::invalid_argument("x"), StatusCode::InvalidArgs),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code(), code, "{err}");
        }
    }

    /// Transport details stay out of the caller-facing message.
    #[test]
    fn test_transport_client_message_hides_reason() {
        let err = CommandError::transport("10.0.0.7:6379 reset by peer");
        assert!(!err.client_message().contains("10.0.0.7"));
        assert!(err.to_string().contains("10.0.0.7"));
    }

    #[test]
    fn test_channel_fault_keeps_position() {
        let err = CommandError::ChannelFault {
            position: 3,
            reason: "full".into(),
        };
        assert!(err.to_string().contains('3'));
        assert_eq!(err.client_message(), err.to_string());
    }
}
