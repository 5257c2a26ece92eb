#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::PacketHeader;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Bytes::copy_from_slice(data);
    let _ = PacketHeader::decode(&mut cursor);
});
