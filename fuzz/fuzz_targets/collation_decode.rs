#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_types::decode::{decode_value, Collation, TypeInfo};

/// Arbitrary collation data for fuzzing NVARCHAR/VARCHAR decoding.
#[derive(Debug, Arbitrary)]
struct FuzzCollationInput {
    lcid: u32,
    sort_id: u8,
    string_data: Vec<u8>,
}

fuzz_target!(|input: FuzzCollationInput| {
    let collation = Collation {
        lcid: input.lcid,
        sort_id: input.sort_id,
    };

    let type_info = TypeInfo {
        type_id: 0xE7, // NVARCHARTYPE
        length: Some(8000),
        scale: None,
        precision: None,
        collation: Some(collation),
        is_plp: false,
    };

    let mut bytes = Bytes::from(input.string_data);
    let _ = decode_value(&mut bytes, &type_info);
});
