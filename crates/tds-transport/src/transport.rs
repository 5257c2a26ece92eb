//! The byte-transport seam between a TDS session and the network.

use std::io::IoSlice;

use crate::error::TransportError;

/// A synchronous, object-safe transport over which TDS PDUs are exchanged.
///
/// Implementations own a socket (or, for tests, an in-memory byte queue)
/// and never expose partial reads or writes to the framer: `send` either
/// writes every byte across all slices or fails, and `recv_exact` either
/// fills `buf` completely or fails. There is no async variant — per this
/// crate's design, suspension happens only inside these two calls, and a
/// caller that wants a timeout closes the transport from another thread,
/// which unblocks the in-flight `recv_exact` with an error.
///
/// No implementation in this crate performs TLS. The pre-login handshake
/// always advertises `ENCRYPT_NOT_SUP`; a server that mandates encryption
/// is a login failure, not a negotiation this trait participates in.
pub trait Transport {
    /// Establish the underlying connection to `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Tear down the underlying connection.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Write every byte of `bufs`, in order, as a single logical send.
    fn send(&mut self, bufs: &[IoSlice<'_>]) -> Result<(), TransportError>;

    /// Block until `buf` is filled completely.
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

#[cfg(feature = "std")]
mod tcp {
    use std::io::{IoSlice, Read, Write};
    use std::net::TcpStream;

    use super::Transport;
    use crate::error::TransportError;

    /// A [`Transport`] backed by a plain (unencrypted) `TcpStream`.
    #[derive(Debug)]
    pub struct TcpTransport {
        stream: Option<TcpStream>,
    }

    impl TcpTransport {
        /// Create a transport with no underlying connection yet.
        #[must_use]
        pub fn new() -> Self {
            Self { stream: None }
        }

        fn stream_mut(&mut self) -> Result<&mut TcpStream, TransportError> {
            self.stream.as_mut().ok_or(TransportError::NotConnected)
        }
    }

    impl Default for TcpTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for TcpTransport {
        fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
            if self.stream.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let stream =
                TcpStream::connect((host, port)).map_err(|source| TransportError::ConnectFailed {
                    host: host.to_string(),
                    port,
                    source,
                })?;
            stream.set_nodelay(true).map_err(TransportError::SendFailed)?;
            tracing::info!(host, port, "tds-transport: connected");
            self.stream = Some(stream);
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), TransportError> {
            self.stream.take().ok_or(TransportError::NotConnected)?;
            Ok(())
        }

        fn send(&mut self, bufs: &[IoSlice<'_>]) -> Result<(), TransportError> {
            let stream = self.stream_mut()?;
            for buf in bufs {
                stream.write_all(buf).map_err(TransportError::SendFailed)?;
            }
            Ok(())
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
            let stream = self.stream_mut()?;
            stream.read_exact(buf).map_err(TransportError::RecvFailed)
        }
    }
}

#[cfg(feature = "std")]
pub use tcp::TcpTransport;
