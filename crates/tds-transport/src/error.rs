//! Errors raised by the transport façade and PDU framer.

/// Errors surfaced while driving a [`crate::Transport`] or [`crate::Framer`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `connect` was called on a transport that is already connected.
    #[error("transport already connected")]
    AlreadyConnected,

    /// `disconnect` was called on a transport that is not connected.
    #[error("transport not connected")]
    NotConnected,

    /// The underlying connect attempt failed.
    #[error("connect to {host}:{port} failed: {source}")]
    ConnectFailed {
        /// Host that was being connected to.
        host: String,
        /// Port that was being connected to.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A send of outbound packet bytes failed partway through.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// A `recv_exact` call failed before the requested byte count arrived.
    #[error("recv failed: {0}")]
    RecvFailed(#[source] std::io::Error),

    /// A logical message mixed packet types, which is a protocol violation.
    #[error("packet type changed mid-message: expected {expected:?}, got {actual:?}")]
    MixedPacketType {
        /// Packet type of the first packet in the logical message.
        expected: tds_protocol::PacketType,
        /// Packet type of the packet that broke the run.
        actual: tds_protocol::PacketType,
    },

    /// A malformed packet header or body was encountered while reassembling.
    #[error(transparent)]
    Protocol(#[from] tds_protocol::ProtocolError),
}
