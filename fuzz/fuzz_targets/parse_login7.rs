#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::{ColumnTable, ParseOutcome, TokenParser};

fuzz_target!(|data: &[u8]| {
    // A LOGIN7 reply is an ordinary token stream: LOGINACK/ENVCHANGE/ERROR/DONE.
    let bytes = Bytes::copy_from_slice(data);
    let mut parser = TokenParser::new(bytes);
    let columns = ColumnTable::default();

    loop {
        match parser.next_token(&columns) {
            Ok(ParseOutcome::Token(_)) => continue,
            Ok(ParseOutcome::NeedMoreData | ParseOutcome::EndOfStream) | Err(_) => break,
        }
    }
});
