//! Error types produced while decoding and encoding TDS wire structures.

use crate::prelude::*;

/// Errors raised by the packet, token, and handshake codecs in this crate.
///
/// This type carries no transport or I/O concerns — it describes malformed
/// or truncated wire data only. [`crate::packet::PacketHeader`] decoding,
/// [`crate::token::TokenParser`] token decoding, and the PRELOGIN/LOGIN7
/// builders all report through it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A fixed-size structure was truncated.
    #[error("incomplete data: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Number of bytes the structure requires.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },

    /// The buffer ran out while decoding a variable-length field.
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// An unrecognized TDS packet type byte was encountered in a packet header.
    #[error("invalid packet type: 0x{0:02X}")]
    InvalidPacketType(u8),

    /// An unrecognized combination of packet status bits was encountered.
    #[error("invalid packet status: 0x{0:02X}")]
    InvalidPacketStatus(u8),

    /// An unrecognized PRELOGIN option token was encountered.
    #[error("invalid PRELOGIN option: 0x{0:02X}")]
    InvalidPreloginOption(u8),

    /// An unrecognized response token type byte was encountered.
    #[error("invalid token type: 0x{0:02X}")]
    InvalidTokenType(u8),

    /// A variable-length-prefixed string contained invalid UTF-16.
    #[cfg(feature = "std")]
    #[error("string encoding error: {0}")]
    StringEncoding(String),

    /// A variable-length-prefixed string contained invalid UTF-16.
    #[cfg(not(feature = "std"))]
    #[error("string encoding error: {0}")]
    StringEncoding(&'static str),

    /// A field held a value outside its valid range.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value was rejected.
        reason: String,
    },

    /// `next_token` was asked to decode a row against a column table that
    /// has not been established yet (no preceding `COLMETADATA`).
    #[error("no column metadata available for row-shaped token")]
    MissingColumnMetadata,
}
