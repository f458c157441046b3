//! Client error types.

use mazewire_wire::WireError;
use thiserror::Error;

/// Notification shown when a request never reached the server.
pub const CONNECTIVITY_MESSAGE: &str =
    "Your request could not be made. Please check your internet connection.";

/// Errors raised below the HTTP status line: nothing came back from the server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timeout")]
    Timeout,

    /// The status line arrived but the body could not be read.
    #[error("{0}")]
    BodyRead(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The transport failed without any further detail.
    #[error("")]
    Unreachable,
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

/// Errors returned by [`crate::Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to encode request payload: {0}")]
    Encode(#[source] WireError),

    #[error("An error occurred reading the response: {0}")]
    Decode(#[source] WireError),

    #[error("authentication was abandoned")]
    AuthAbandoned,

    /// The server answered with a status other than 200 or 403.
    #[error("{message}")]
    Application { status: u16, message: String },

    /// The response body could not be read after the status arrived.
    #[error("An error occurred. ({0})")]
    Body(String),

    #[error("{}", connectivity_message(.0))]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Returns whether the operator declined to log in.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::AuthAbandoned)
    }

    /// Returns whether the request never reached the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Returns the HTTP status for application errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn connectivity_message(err: &TransportError) -> String {
    let detail = err.to_string();
    if detail.is_empty() {
        CONNECTIVITY_MESSAGE.to_string()
    } else {
        format!("{} ({})", CONNECTIVITY_MESSAGE, detail)
    }
}
