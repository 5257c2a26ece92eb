//! Conversion from [`SqlValue`] into wire-ready RPC parameters.
//!
//! `sp_executesql` parameters are typed: every [`SqlValue`] variant maps to
//! the `TYPE_INFO` SQL Server expects for the matching SQL type, encoded the
//! same way [`tds_types::encode`] encodes row values, just without the
//! length prefixes [`tds_protocol::rpc::RpcParam::encode`] adds itself.

use bytes::{BufMut, BytesMut};

use tds_protocol::rpc::{RpcParam, TypeInfo};
use tds_types::SqlValue;

/// Convert a named value into an `RpcParam` ready for [`tds_protocol::rpc::RpcRequest`].
///
/// `name` is the bare parameter name (no `@` prefix).
pub(crate) fn sql_value_to_rpc_param(name: &str, value: &SqlValue) -> RpcParam {
    let name = format!("@{name}");
    match value {
        SqlValue::Null => RpcParam::null(name, TypeInfo::nvarchar(1)),
        SqlValue::Bool(b) => {
            let mut buf = BytesMut::with_capacity(1);
            buf.put_u8(u8::from(*b));
            RpcParam::new(name, TypeInfo::bit(), buf.freeze())
        }
        SqlValue::TinyInt(v) => {
            let mut buf = BytesMut::with_capacity(1);
            buf.put_u8(*v);
            RpcParam::new(name, TypeInfo::tinyint(), buf.freeze())
        }
        SqlValue::SmallInt(v) => {
            let mut buf = BytesMut::with_capacity(2);
            buf.put_i16_le(*v);
            RpcParam::new(name, TypeInfo::smallint(), buf.freeze())
        }
        SqlValue::Int(v) => RpcParam::int(name, *v),
        SqlValue::BigInt(v) => RpcParam::bigint(name, *v),
        SqlValue::Float(v) => {
            let mut buf = BytesMut::with_capacity(4);
            buf.put_f32_le(*v);
            RpcParam::new(name, TypeInfo::real(), buf.freeze())
        }
        SqlValue::Double(v) => {
            let mut buf = BytesMut::with_capacity(8);
            buf.put_f64_le(*v);
            RpcParam::new(name, TypeInfo::float(), buf.freeze())
        }
        SqlValue::String(s) => RpcParam::nvarchar(name, s),
        SqlValue::Binary(b) => {
            let type_info = if b.len() > 8000 {
                TypeInfo {
                    type_id: 0xA5,
                    max_length: Some(0xFFFF),
                    precision: None,
                    scale: None,
                    collation: None,
                    tvp_type_name: None,
                }
            } else {
                TypeInfo::varbinary(b.len().max(1) as u16)
            };
            RpcParam::new(name, type_info, b.clone())
        }
        #[cfg(feature = "decimal")]
        SqlValue::Decimal(d) => {
            let mut buf = BytesMut::with_capacity(17);
            tds_types::encode::encode_decimal(*d, &mut buf);
            // sp_executesql only needs a precision wide enough to hold the
            // value; 38 is the SQL Server maximum and always valid alongside
            // the value's own scale.
            RpcParam::new(name, TypeInfo::decimal(38, d.scale() as u8), buf.freeze())
        }
        #[cfg(feature = "uuid")]
        SqlValue::Uuid(u) => {
            let mut buf = BytesMut::with_capacity(16);
            tds_types::encode::encode_uuid(*u, &mut buf);
            RpcParam::new(name, TypeInfo::uniqueidentifier(), buf.freeze())
        }
        #[cfg(feature = "chrono")]
        SqlValue::Date(d) => {
            let mut buf = BytesMut::with_capacity(3);
            tds_types::encode::encode_date(*d, &mut buf);
            RpcParam::new(name, TypeInfo::date(), buf.freeze())
        }
        #[cfg(feature = "chrono")]
        SqlValue::Time(t) => {
            let mut buf = BytesMut::with_capacity(5);
            tds_types::encode::encode_time(*t, &mut buf);
            RpcParam::new(name, time_type_info(), buf.freeze())
        }
        #[cfg(feature = "chrono")]
        SqlValue::DateTime(dt) => {
            let mut buf = BytesMut::with_capacity(8);
            tds_types::encode::encode_datetime2(*dt, &mut buf);
            RpcParam::new(name, TypeInfo::datetime2(7), buf.freeze())
        }
        #[cfg(feature = "chrono")]
        SqlValue::DateTimeOffset(dto) => {
            let mut buf = BytesMut::with_capacity(10);
            tds_types::encode::encode_datetimeoffset(*dto, &mut buf);
            RpcParam::new(name, datetimeoffset_type_info(), buf.freeze())
        }
        #[cfg(feature = "json")]
        SqlValue::Json(j) => RpcParam::nvarchar(name, &j.to_string()),
        SqlValue::Xml(x) => RpcParam::nvarchar(name, x),
    }
}

#[cfg(feature = "chrono")]
fn time_type_info() -> TypeInfo {
    TypeInfo {
        type_id: 0x29, // TIMETYPE
        max_length: None,
        precision: None,
        scale: Some(7),
        collation: None,
        tvp_type_name: None,
    }
}

#[cfg(feature = "chrono")]
fn datetimeoffset_type_info() -> TypeInfo {
    TypeInfo {
        type_id: 0x2B, // DATETIMEOFFSETTYPE
        max_length: None,
        precision: None,
        scale: Some(7),
        collation: None,
        tvp_type_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_param_uses_nvarchar_placeholder() {
        let param = sql_value_to_rpc_param("p1", &SqlValue::Null);
        let mut buf = BytesMut::new();
        param.encode(&mut buf);
        // name length byte, name utf16, status byte, then type info + NULL marker
        assert!(!buf.is_empty());
    }

    #[test]
    fn int_param_round_trips_through_encode() {
        let param = sql_value_to_rpc_param("id", &SqlValue::Int(42));
        let mut buf = BytesMut::new();
        param.encode(&mut buf);
        assert!(buf.len() > 4);
    }

    #[test]
    fn string_param_uses_nvarchar() {
        let param = sql_value_to_rpc_param("name", &SqlValue::String("Alice".to_string()));
        assert_eq!(param.type_info.type_id, 0xE7);
    }

    #[test]
    fn binary_param_over_8000_bytes_uses_max_type() {
        let big = vec![0xABu8; 9000];
        let param = sql_value_to_rpc_param("blob", &SqlValue::Binary(big.into()));
        assert_eq!(param.type_info.max_length, Some(0xFFFF));
    }
}
