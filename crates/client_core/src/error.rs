//! Error taxonomy for workflow operations. Every variant renders as
//! user-facing text; none of them are fatal to the session.

use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Local guard failure; no request was sent.
    #[error("{0}")]
    Validation(String),
    /// No response reached the client.
    #[error("Network error: Unable to reach the server ({0})")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// The backend answered successfully but reported an `error` field.
    #[error("{0}")]
    Rejected(String),
    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    /// Builds a server error from whatever the body offered, falling back to
    /// the status line and finally a generic message.
    pub fn server(status: u16, body_message: Option<String>, reason: Option<&str>) -> Self {
        let message = match (body_message, reason) {
            (Some(message), _) => message,
            (None, Some(reason)) => format!("Server error: {status} {reason}"),
            (None, None) if status != 0 => format!("Server error: {status}"),
            (None, None) => GENERIC_ERROR_MESSAGE.to_string(),
        };
        ClientError::Server { status, message }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
