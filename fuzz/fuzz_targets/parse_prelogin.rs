#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::PreLogin;

fuzz_target!(|data: &[u8]| {
    // Security-critical: PRELOGIN is the first message parsed from an
    // unauthenticated peer.
    let bytes = Bytes::copy_from_slice(data);
    let _ = PreLogin::decode(bytes);
});
