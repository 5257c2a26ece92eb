//! Connection string handling around timeout-related keys.
//!
//! This driver talks to the server over plain blocking I/O and exposes no
//! connect/command timeout knobs (that's left to callers wrapping the
//! underlying socket). Unrecognized connection-string keys, including the
//! classic `Connect Timeout`/`Command Timeout` pair, are accepted and
//! silently ignored rather than rejected, so existing connection strings
//! copied from other drivers keep working.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::Config;

#[test]
fn test_connect_timeout_key_is_ignored_without_error() {
    let config = Config::from_connection_string(
        "Server=localhost;Database=master;User Id=sa;Password=pass;Connect Timeout=5",
    )
    .expect("unknown keys are ignored, not rejected");

    assert_eq!(config.server_name, "localhost");
    assert_eq!(config.database.as_deref(), Some("master"));
    assert_eq!(config.user_name, "sa");
}

#[test]
fn test_command_timeout_key_is_ignored_without_error() {
    let config = Config::from_connection_string(
        "Server=localhost;Database=master;User Id=sa;Password=pass;Command Timeout=30",
    )
    .expect("unknown keys are ignored, not rejected");

    assert_eq!(config.database.as_deref(), Some("master"));
}

#[test]
fn test_zero_and_short_timeout_values_are_still_just_ignored() {
    for value in ["0", "1", "999999"] {
        let conn_str = format!(
            "Server=localhost;Connect Timeout={value};Command Timeout={value}"
        );
        let config = Config::from_connection_string(&conn_str)
            .expect("timeout value itself is never validated since the key is unknown");
        assert_eq!(config.server_name, "localhost");
    }
}

#[test]
fn test_unrecognized_keys_alongside_recognized_ones_do_not_disturb_parsing() {
    let config = Config::from_connection_string(
        "Server=db.example.com;Connect Timeout=5;Port=1533;Command Timeout=10;User Id=app",
    )
    .expect("valid string");

    assert_eq!(config.server_name, "db.example.com");
    assert_eq!(config.port, 1533);
    assert_eq!(config.user_name, "app");
}
