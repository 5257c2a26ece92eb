#![no_main]

use bytes::{BufMut, Bytes, BytesMut};
use libfuzzer_sys::fuzz_target;
use tds_protocol::token::{ColumnTable, ParseOutcome, TokenParser};

fuzz_target!(|data: &[u8]| {
    // Frame arbitrary data as an ENVCHANGE token so the parser exercises
    // that branch instead of bailing on an unrecognized type byte.
    let mut framed = BytesMut::with_capacity(data.len() + 1);
    framed.put_u8(0xE3); // TokenType::EnvChange
    framed.extend_from_slice(data);

    let mut parser = TokenParser::new(framed.freeze());
    let columns = ColumnTable::default();

    loop {
        match parser.next_token(&columns) {
            Ok(ParseOutcome::Token(_)) => continue,
            Ok(ParseOutcome::NeedMoreData | ParseOutcome::EndOfStream) | Err(_) => break,
        }
    }
});
