//! Boundary-condition tests for rows, columns, and configuration that don't
//! need a live connection.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use bytes::Bytes;
use tds_client::{ColMetaData, Column, ColumnSlice, Config, Row};
use tds_types::SqlValue;

const INT4TYPE: u8 = 0x38;
const NVARCHARTYPE: u8 = 0xE7;

// ============================================================================
// Row boundary conditions
// ============================================================================

#[test]
fn test_row_with_no_columns() {
    let row = Row::from_values(Vec::new(), Vec::new());
    assert_eq!(row.len(), 0);
    assert!(row.is_empty());
    assert!(row.get_raw(0).is_none());
}

#[test]
fn test_row_out_of_bounds_index() {
    let row = Row::from_values(vec![Column::new("a", 0, INT4TYPE)], vec![SqlValue::Int(1)]);
    assert!(row.get::<i32>(5).is_err());
    assert!(row.try_get::<i32>(5).is_none());
    assert!(row.get_raw(5).is_none());
}

#[test]
fn test_row_get_by_missing_name() {
    let row = Row::from_values(vec![Column::new("a", 0, INT4TYPE)], vec![SqlValue::Int(1)]);
    assert!(row.get_by_name::<i32>("missing").is_err());
    assert!(row.try_get_by_name::<i32>("missing").is_none());
    assert!(row.get_raw_by_name("missing").is_none());
}

#[test]
fn test_row_null_value_get_errors_but_try_get_is_none() {
    let row = Row::from_values(vec![Column::new("a", 0, INT4TYPE)], vec![SqlValue::Null]);
    assert!(row.get::<i32>(0).is_err());
    assert!(row.try_get::<i32>(0).is_none());
    assert!(row.is_null(0));
}

#[test]
fn test_row_slice_past_buffer_end_is_treated_as_absent() {
    let buffer = Arc::new(Bytes::from_static(b"ab"));
    // Length claims 10 bytes but the buffer only holds 2.
    let slices: Arc<[ColumnSlice]> = vec![ColumnSlice::new(0, 10, false)].into();
    let meta = Arc::new(ColMetaData::new(vec![Column::new("x", 0, NVARCHARTYPE)]));
    let row = Row::new(buffer, slices, meta);

    assert!(row.get_bytes(0).is_none());
    assert!(row.get_raw(0).is_none());
}

#[test]
fn test_row_zero_length_value_is_not_null() {
    let buffer = Arc::new(Bytes::from_static(b""));
    let slices: Arc<[ColumnSlice]> = vec![ColumnSlice::new(0, 0, false)].into();
    let meta = Arc::new(ColMetaData::new(vec![Column::new("x", 0, NVARCHARTYPE)]));
    let row = Row::new(buffer, slices, meta);

    assert!(!row.is_null(0));
    assert_eq!(row.get_bytes(0), Some(&[][..]));
}

#[test]
fn test_row_iteration_over_values() {
    let row = Row::from_values(
        vec![Column::new("a", 0, INT4TYPE), Column::new("b", 1, INT4TYPE)],
        vec![SqlValue::Int(1), SqlValue::Int(2)],
    );

    let values: Vec<SqlValue> = (&row).into_iter().collect();
    assert_eq!(values, vec![SqlValue::Int(1), SqlValue::Int(2)]);
}

#[test]
fn test_row_clone_shares_metadata() {
    let row = Row::from_values(vec![Column::new("a", 0, INT4TYPE)], vec![SqlValue::Int(7)]);
    let cloned = row.clone();
    assert_eq!(cloned.get::<i32>(0).unwrap(), 7);
    assert!(Arc::ptr_eq(row.metadata(), cloned.metadata()));
}

// ============================================================================
// Column metadata edge cases
// ============================================================================

#[test]
fn test_column_name_lookup_is_case_insensitive_with_mixed_case_columns() {
    let meta = ColMetaData::new(vec![
        Column::new("UserId", 0, INT4TYPE),
        Column::new("userName", 1, NVARCHARTYPE),
    ]);

    assert_eq!(meta.find_by_name("userid"), Some(0));
    assert_eq!(meta.find_by_name("USERNAME"), Some(1));
}

#[test]
fn test_column_metadata_empty() {
    let meta = ColMetaData::new(Vec::new());
    assert!(meta.is_empty());
    assert_eq!(meta.len(), 0);
    assert!(meta.get(0).is_none());
}

#[test]
fn test_column_max_length_absent_by_default() {
    let col = Column::new("id", 0, INT4TYPE);
    assert_eq!(col.max_length, None);
    assert!(col.nullable);
    assert!(!col.is_plp);
}

#[test]
fn test_column_to_type_info_round_trips_plp_flag() {
    let col = Column::new("data", 0, NVARCHARTYPE).with_plp(true);
    let info = col.to_type_info();
    assert!(info.is_plp);
    assert_eq!(info.type_id, NVARCHARTYPE);
}

// ============================================================================
// Config edge cases
// ============================================================================

#[test]
fn test_config_default_has_localhost_and_default_packet_size() {
    let config = Config::default();
    assert_eq!(config.server_name, "localhost");
    assert_eq!(config.packet_size, 4096);
}

#[test]
fn test_config_from_connection_string_preserves_unset_database() {
    let config = Config::from_connection_string("Server=localhost;").unwrap();
    assert_eq!(config.database, None);
}

#[test]
fn test_config_packet_size_builder_rejects_out_of_range() {
    let config = Config::default();
    assert!(config.clone().packet_size(511).is_err());
    assert!(config.clone().packet_size(32768).is_err());
    assert!(config.packet_size(4096).is_ok());
}

#[test]
fn test_config_credentials_builder_sets_both_fields() {
    let config = Config::default().credentials("sa", "hunter2");
    assert_eq!(config.user_name, "sa");
    assert_eq!(config.password, "hunter2");
}
