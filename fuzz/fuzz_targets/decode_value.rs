#![no_main]

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use bytes::Bytes;

/// Arbitrary type info for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzTypeInfo {
    type_id: u8,
    length: Option<u32>,
    scale: Option<u8>,
    precision: Option<u8>,
    is_plp: bool,
}

/// Fuzz input combining type info with raw bytes.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    type_info: FuzzTypeInfo,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let type_info = tds_types::decode::TypeInfo {
        type_id: input.type_info.type_id,
        length: input.type_info.length,
        scale: input.type_info.scale,
        precision: input.type_info.precision,
        collation: None,
        is_plp: input.type_info.is_plp,
    };

    let mut bytes = Bytes::from(input.data);
    let _ = tds_types::decode_value(&mut bytes, &type_info);
});
