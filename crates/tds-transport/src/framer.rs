//! PDU framer: splits outbound messages into packets and reassembles
//! inbound packets into logical messages.

use std::io::IoSlice;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tds_protocol::{PacketHeader, PacketStatus, PacketType, PACKET_HEADER_SIZE};

use crate::error::TransportError;
use crate::transport::Transport;

/// Splits outbound payloads into TDS packets and reassembles inbound
/// packets into logical messages, over a generic [`Transport`].
///
/// A logical message is the run of packets sharing one `PacketType` up to
/// and including the packet with `END_OF_MESSAGE` set. The framer tracks
/// an outbound packet-number counter (wrapping at `u8`, reset to 1 at the
/// start of each new message) and the negotiated packet size, which an
/// `ENVCHANGE` `packet_size` token may update mid-session.
pub struct Framer<T: Transport> {
    transport: T,
    packet_size: usize,
    packet_number: u8,
    outbound: BytesMut,
    outbound_type: Option<PacketType>,
    /// Residual bytes left over from a previous `receive_message`/
    /// `receive_at_least` call that belong to the *next* logical message.
    residual: BytesMut,
}

impl<T: Transport> Framer<T> {
    /// Wrap a transport with the default negotiated packet size (4096).
    pub fn new(transport: T) -> Self {
        Self::with_packet_size(transport, tds_protocol::DEFAULT_PACKET_SIZE)
    }

    /// Wrap a transport with an explicit negotiated packet size.
    pub fn with_packet_size(transport: T, packet_size: usize) -> Self {
        Self {
            transport,
            packet_size,
            packet_number: 1,
            outbound: BytesMut::new(),
            outbound_type: None,
            residual: BytesMut::new(),
        }
    }

    /// Current negotiated packet size (applies to outbound packets only).
    #[must_use]
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// Update the negotiated packet size, as observed from an `ENVCHANGE`
    /// `packet_size` token.
    pub fn set_packet_size(&mut self, packet_size: usize) {
        self.packet_size = packet_size;
    }

    /// Borrow the underlying transport (for `disconnect`, diagnostics, etc).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Begin a new outbound logical message of the given packet type,
    /// discarding any partially-built payload from a prior call.
    pub fn begin_message(&mut self, packet_type: PacketType) {
        self.outbound.clear();
        self.outbound_type = Some(packet_type);
    }

    /// Append bytes to the in-progress outbound payload.
    pub fn append(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    /// Split the accumulated payload into packets of at most
    /// `packet_size - PACKET_HEADER_SIZE` bytes, set `END_OF_MESSAGE` on
    /// the last one, and send them in order.
    pub fn finalize_and_send(&mut self) -> Result<(), TransportError> {
        let packet_type = self
            .outbound_type
            .expect("finalize_and_send called without begin_message");
        let max_payload = self.packet_size.saturating_sub(PACKET_HEADER_SIZE).max(1);

        let payload = std::mem::take(&mut self.outbound);
        let mut offset = 0usize;
        let total = payload.len();

        loop {
            let remaining = total - offset;
            let chunk_len = remaining.min(max_payload);
            let is_last = remaining <= max_payload;
            let chunk = &payload[offset..offset + chunk_len];

            let status = if is_last {
                PacketStatus::END_OF_MESSAGE
            } else {
                PacketStatus::NORMAL
            };
            let header = PacketHeader::new(packet_type, status, (PACKET_HEADER_SIZE + chunk_len) as u16)
                .with_packet_id(self.packet_number);

            let header_bytes = header.encode_to_bytes();
            tracing::trace!(
                packet_type = ?packet_type,
                length = header.length,
                is_eom = is_last,
                packet_number = self.packet_number,
                "tds-transport: sending packet"
            );
            self.transport
                .send(&[IoSlice::new(&header_bytes), IoSlice::new(chunk)])?;

            self.packet_number = self.packet_number.wrapping_add(1);
            offset += chunk_len;

            if is_last {
                break;
            }
        }

        self.outbound_type = None;
        self.packet_number = 1;
        Ok(())
    }

    /// Read packets until one arrives with `END_OF_MESSAGE` set, returning
    /// the concatenated payload of the logical message.
    pub fn receive_message(&mut self) -> Result<Bytes, TransportError> {
        let mut message = BytesMut::new();
        message.extend_from_slice(&self.residual);
        self.residual.clear();

        let mut expected_type: Option<PacketType> = None;
        loop {
            let mut header_buf = [0u8; PACKET_HEADER_SIZE];
            self.transport.recv_exact(&mut header_buf)?;
            let header = PacketHeader::decode(&mut &header_buf[..])?;

            match expected_type {
                None => expected_type = Some(header.packet_type),
                Some(expected) if expected != header.packet_type => {
                    return Err(TransportError::MixedPacketType {
                        expected,
                        actual: header.packet_type,
                    });
                }
                Some(_) => {}
            }

            let payload_len = header.payload_length();
            let mut payload = vec![0u8; payload_len];
            self.transport.recv_exact(&mut payload)?;
            tracing::trace!(
                packet_type = ?header.packet_type,
                length = header.length,
                is_eom = header.is_end_of_message(),
                "tds-transport: received packet"
            );
            message.extend_from_slice(&payload);

            if header.is_end_of_message() {
                break;
            }
        }

        Ok(message.freeze())
    }

    /// Ensure the front of an in-progress logical message holds at least
    /// `n` more bytes than have already been consumed, reading further
    /// packets as needed. `consumed` is everything the caller's parser has
    /// already taken from a prior `receive_message`/`receive_at_least`
    /// result; this call returns the full buffer (consumed + new bytes)
    /// so the caller can re-slice from `consumed` onward.
    pub fn receive_at_least(
        &mut self,
        buffered: &mut BytesMut,
        n: usize,
    ) -> Result<(), TransportError> {
        while buffered.remaining() < n {
            let mut header_buf = [0u8; PACKET_HEADER_SIZE];
            self.transport.recv_exact(&mut header_buf)?;
            let header = PacketHeader::decode(&mut &header_buf[..])?;
            let payload_len = header.payload_length();
            let mut payload = vec![0u8; payload_len];
            self.transport.recv_exact(&mut payload)?;
            buffered.put_slice(&payload);

            if header.is_end_of_message() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct MemTransport {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl MemTransport {
        fn new(inbound: Vec<u8>) -> Self {
            Self {
                inbound: inbound.into(),
                outbound: Vec::new(),
            }
        }
    }

    impl Transport for MemTransport {
        fn connect(&mut self, _host: &str, _port: u16) -> Result<(), TransportError> {
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn send(&mut self, bufs: &[IoSlice<'_>]) -> Result<(), TransportError> {
            for buf in bufs {
                self.outbound.extend_from_slice(buf);
            }
            Ok(())
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
            if self.inbound.len() < buf.len() {
                return Err(TransportError::RecvFailed(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "not enough bytes",
                )));
            }
            for slot in buf.iter_mut() {
                *slot = self.inbound.pop_front().expect("checked length above");
            }
            Ok(())
        }
    }

    #[test]
    fn single_packet_round_trip() {
        let mut framer = Framer::new(MemTransport::new(Vec::new()));
        framer.begin_message(PacketType::SqlBatch);
        framer.append(b"SELECT 1");
        framer.finalize_and_send().unwrap();

        let sent = framer.transport_mut().outbound.clone();
        assert_eq!(sent.len(), PACKET_HEADER_SIZE + 8);
        let header = PacketHeader::decode(&mut &sent[..]).unwrap();
        assert!(header.is_end_of_message());
        assert_eq!(&sent[PACKET_HEADER_SIZE..], b"SELECT 1");
    }

    #[test]
    fn large_message_splits_into_multiple_packets() {
        let mut framer = Framer::with_packet_size(MemTransport::new(Vec::new()), 16);
        framer.begin_message(PacketType::SqlBatch);
        framer.append(&[0xAB; 40]);
        framer.finalize_and_send().unwrap();

        let sent = framer.transport_mut().outbound.clone();
        let mut cursor = &sent[..];
        let mut packets = 0;
        let mut total_payload = 0;
        while !cursor.is_empty() {
            let header = PacketHeader::decode(&mut cursor).unwrap();
            let payload_len = header.payload_length();
            cursor = &cursor[payload_len..];
            total_payload += payload_len;
            packets += 1;
            if header.is_end_of_message() {
                break;
            }
        }
        assert_eq!(total_payload, 40);
        assert!(packets > 1);
    }

    #[test]
    fn receive_message_reassembles_packets() {
        let mut first = PacketHeader::new(PacketType::TabularResult, PacketStatus::NORMAL, 12)
            .encode_to_bytes()
            .to_vec();
        first.extend_from_slice(b"hello ");
        let mut second = PacketHeader::new(
            PacketType::TabularResult,
            PacketStatus::END_OF_MESSAGE,
            14,
        )
        .encode_to_bytes()
        .to_vec();
        second.extend_from_slice(b"world!");

        let mut inbound = first;
        inbound.extend_from_slice(&second);

        let mut framer = Framer::new(MemTransport::new(inbound));
        let message = framer.receive_message().unwrap();
        assert_eq!(&message[..], b"hello world!");
    }

    #[test]
    fn mixed_packet_type_is_fatal() {
        let mut first = PacketHeader::new(PacketType::TabularResult, PacketStatus::NORMAL, 9)
            .encode_to_bytes()
            .to_vec();
        first.push(b'a');
        let mut second = PacketHeader::new(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 9)
            .encode_to_bytes()
            .to_vec();
        second.push(b'b');

        let mut inbound = first;
        inbound.extend_from_slice(&second);

        let mut framer = Framer::new(MemTransport::new(inbound));
        assert!(matches!(
            framer.receive_message(),
            Err(TransportError::MixedPacketType { .. })
        ));
    }
}
