//! Client error types.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not be connected.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The pre-login/LOGIN7 handshake did not reach `authenticated`.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// Sending an outbound message failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading an inbound message failed.
    #[error("recv failed: {0}")]
    RecvFailed(String),

    /// A malformed token or packet was encountered.
    #[error("protocol error: {0}")]
    ProtocolError(#[from] tds_protocol::ProtocolError),

    /// A value could not be converted to or from its TDS wire representation.
    #[error("type error: {0}")]
    Type(#[from] tds_types::TypeError),

    /// The receive buffer could not hold a message.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// An `execute_*` call was made on a session that has not completed
    /// LOGIN7. The type-state `Session<Authenticated>` bound prevents this
    /// at compile time for callers who keep the typed handle; this variant
    /// exists for callers that store a session behind a non-generic handle.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// Server returned an ERROR token (class >= 14) or an INFO/ERROR token
    /// otherwise surfaced to the caller.
    #[error("server error {number}: {message}")]
    Server {
        /// Error number.
        number: i32,
        /// Error class/severity (0-25).
        class: u8,
        /// Error state.
        state: u8,
        /// Error message.
        message: String,
        /// Server name where error occurred.
        server: Option<String>,
        /// Stored procedure name (if applicable).
        procedure: Option<String>,
        /// Line number in the SQL batch or procedure.
        line: u32,
    },

    /// A configuration value was invalid (e.g. packet size out of range).
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying transport reported an I/O error (wrapped in `Arc`
    /// for `Clone` support).
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<tds_transport::TransportError> for Error {
    fn from(e: tds_transport::TransportError) -> Self {
        match e {
            tds_transport::TransportError::ConnectFailed { .. }
            | tds_transport::TransportError::AlreadyConnected
            | tds_transport::TransportError::NotConnected => Error::ConnectFailed(e.to_string()),
            tds_transport::TransportError::SendFailed(_) => Error::SendFailed(e.to_string()),
            tds_transport::TransportError::RecvFailed(_) => Error::RecvFailed(e.to_string()),
            tds_transport::TransportError::MixedPacketType { .. } => {
                Error::ProtocolError(tds_protocol::ProtocolError::InvalidField {
                    field: "packet_type",
                    reason: e.to_string(),
                })
            }
            tds_transport::TransportError::Protocol(inner) => Error::ProtocolError(inner),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl Error {
    /// Check if this is a server error with a specific number.
    #[must_use]
    pub fn is_server_error(&self, number: i32) -> bool {
        matches!(self, Self::Server { number: n, .. } if *n == number)
    }

    /// Get the error class/severity if this is a server error.
    ///
    /// SQL Server error classes range from 0-25:
    /// - 0-10: Informational
    /// - 11-16: User errors
    /// - 17-19: Resource/hardware errors
    /// - 20-25: System errors (connection terminating)
    #[must_use]
    pub fn class(&self) -> Option<u8> {
        match self {
            Self::Server { class, .. } => Some(*class),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
