//! Connection string parsing edge case tests.
//!
//! Tests edge cases that users commonly encounter with connection strings.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::Config;

// ============================================================================
// Basic Parsing Tests
// ============================================================================

#[test]
fn test_empty_connection_string() {
    // Empty string should parse to defaults
    let config = Config::from_connection_string("");
    assert!(config.is_ok());
    let config = config.unwrap();
    assert_eq!(config.server_name, "localhost");
}

#[test]
fn test_whitespace_only_connection_string() {
    let config = Config::from_connection_string("   \t\n  ");
    assert!(config.is_ok());
}

#[test]
fn test_single_semicolon() {
    let config = Config::from_connection_string(";");
    assert!(config.is_ok());
}

#[test]
fn test_multiple_semicolons() {
    let config = Config::from_connection_string(";;;");
    assert!(config.is_ok());
}

// ============================================================================
// Key-Value Edge Cases
// ============================================================================

#[test]
fn test_key_without_value() {
    let result = Config::from_connection_string("Server=");
    // Empty value should be treated as empty string
    assert!(result.is_ok());
    let config = result.unwrap();
    assert_eq!(config.server_name, "");
}

#[test]
fn test_missing_equals_sign() {
    let result = Config::from_connection_string("Serverlocalhost;");
    // Should fail - no equals sign
    assert!(result.is_err());
}

#[test]
fn test_multiple_equals_in_value() {
    // Password with equals sign; `split_once` on the first '=' means everything
    // after it (including further '='s) becomes the value.
    let config =
        Config::from_connection_string("Server=localhost;Password=pass=word=with=equals;")
            .unwrap();

    assert_eq!(config.password, "pass=word=with=equals");
}

#[test]
fn test_case_insensitive_keys() {
    let config1 = Config::from_connection_string("SERVER=host1;").unwrap();
    let config2 = Config::from_connection_string("server=host1;").unwrap();
    let config3 = Config::from_connection_string("Server=host1;").unwrap();

    assert_eq!(config1.server_name, config2.server_name);
    assert_eq!(config2.server_name, config3.server_name);
}

#[test]
fn test_alternative_key_names() {
    // "Data Source" and "Host" are aliases for "Server".
    let config1 = Config::from_connection_string("Server=host1;").unwrap();
    let config2 = Config::from_connection_string("Data Source=host1;").unwrap();
    let config3 = Config::from_connection_string("Host=host1;").unwrap();

    assert_eq!(config1.server_name, "host1");
    assert_eq!(config2.server_name, "host1");
    assert_eq!(config3.server_name, "host1");

    // "Initial Catalog" is an alternative to "Database"
    let config4 = Config::from_connection_string("Database=db1;").unwrap();
    let config5 = Config::from_connection_string("Initial Catalog=db1;").unwrap();

    assert_eq!(config4.database, config5.database);

    // User Id alternatives - just verify they parse correctly
    let config6 = Config::from_connection_string("User Id=user1;").unwrap();
    let config7 = Config::from_connection_string("UID=user1;").unwrap();
    let config8 = Config::from_connection_string("User=user1;").unwrap();
    assert_eq!(config6.user_name, "user1");
    assert_eq!(config7.user_name, "user1");
    assert_eq!(config8.user_name, "user1");

    // Password alternatives - just verify they parse correctly
    let config9 = Config::from_connection_string("Password=pass1;").unwrap();
    let config10 = Config::from_connection_string("PWD=pass1;").unwrap();
    assert_eq!(config9.password, "pass1");
    assert_eq!(config10.password, "pass1");
}

// ============================================================================
// Server Address Formats
// ============================================================================

#[test]
fn test_server_with_port() {
    let config = Config::from_connection_string("Server=myserver,1434;").unwrap();
    assert_eq!(config.server_name, "myserver");
    assert_eq!(config.port, 1434);
}

#[test]
fn test_server_ipv4() {
    let config = Config::from_connection_string("Server=192.168.1.100;").unwrap();
    assert_eq!(config.server_name, "192.168.1.100");
}

#[test]
fn test_server_ipv4_with_port() {
    let config = Config::from_connection_string("Server=192.168.1.100,1434;").unwrap();
    assert_eq!(config.server_name, "192.168.1.100");
    assert_eq!(config.port, 1434);
}

#[test]
fn test_azure_server_name() {
    let config = Config::from_connection_string("Server=myserver.database.windows.net;").unwrap();
    assert_eq!(config.server_name, "myserver.database.windows.net");
}

#[test]
fn test_invalid_port_number() {
    let result = Config::from_connection_string("Server=localhost,abc;");
    assert!(result.is_err());
}

#[test]
fn test_port_overflow() {
    let result = Config::from_connection_string("Server=localhost,999999;");
    assert!(result.is_err());
}

// ============================================================================
// Packet Size Parsing
// ============================================================================

#[test]
fn test_packet_size_parsing() {
    let config = Config::from_connection_string("Packet Size=8192;").unwrap();
    assert_eq!(config.packet_size, 8192);
}

#[test]
fn test_invalid_packet_size() {
    let result = Config::from_connection_string("Packet Size=invalid;");
    assert!(result.is_err());
}

#[test]
fn test_packet_size_out_of_range() {
    // Below the 512-byte floor and above the 32767-byte ceiling both reject.
    assert!(Config::from_connection_string("Packet Size=256;").is_err());
    assert!(Config::from_connection_string("Packet Size=40000;").is_err());
}

// ============================================================================
// TDS Version Parsing
// ============================================================================

#[test]
fn test_tds_version_parsing() {
    let config = Config::from_connection_string("Server=localhost;TDSVersion=7.4;").unwrap();
    assert_eq!(config.tds_version, tds_client::TdsVersion::V7_4);
}

#[test]
fn test_invalid_tds_version() {
    let result = Config::from_connection_string("TDSVersion=invalid;");
    assert!(result.is_err());
}

// ============================================================================
// Special Character Handling
// ============================================================================

#[test]
fn test_whitespace_in_values() {
    let config = Config::from_connection_string("Server=  localhost  ;").unwrap();
    // Whitespace should be trimmed
    assert_eq!(config.server_name, "localhost");
}

#[test]
fn test_whitespace_around_equals() {
    let config = Config::from_connection_string("Server = localhost ;").unwrap();
    assert_eq!(config.server_name, "localhost");
}

// ============================================================================
// Unknown Keys (Forward Compatibility)
// ============================================================================

#[test]
fn test_unknown_keys_ignored() {
    // Unknown keys should be ignored for forward compatibility
    let config = Config::from_connection_string(
        "Server=localhost;UnknownOption=value;FutureFeature=enabled;",
    );
    assert!(config.is_ok());
}

// ============================================================================
// Complex Connection Strings
// ============================================================================

#[test]
fn test_full_connection_string() {
    let conn_str = "Server=myserver.database.windows.net;\
                    Database=mydb;\
                    User Id=admin;\
                    Password=P@ssw0rd!;\
                    Packet Size=8192;\
                    Application Name=MyApp;";

    let config = Config::from_connection_string(conn_str).unwrap();

    assert_eq!(config.server_name, "myserver.database.windows.net");
    assert_eq!(config.database, Some("mydb".to_string()));
    assert_eq!(config.user_name, "admin");
    assert_eq!(config.password, "P@ssw0rd!");
    assert_eq!(config.packet_size, 8192);
    assert_eq!(config.app_name, "MyApp");
}

#[test]
fn test_connection_string_without_trailing_semicolon() {
    let config = Config::from_connection_string("Server=localhost;Database=test").unwrap();

    assert_eq!(config.server_name, "localhost");
    assert_eq!(config.database, Some("test".to_string()));
}

#[test]
fn test_repeated_keys_last_wins() {
    // When a key appears multiple times, the last value should win
    let config =
        Config::from_connection_string("Server=first;Server=second;Server=third;").unwrap();

    assert_eq!(config.server_name, "third");
}
