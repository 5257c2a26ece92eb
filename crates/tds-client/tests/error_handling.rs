//! Error handling path tests for tds-client.
//!
//! Tests for error creation, conversion, categorization, and display.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::approx_constant
)]

use std::sync::Arc;
use tds_client::Error;

// =============================================================================
// Error Display Tests
// =============================================================================

#[test]
fn test_connect_failed_display() {
    let err = Error::ConnectFailed("network unreachable".into());
    let msg = err.to_string();
    assert!(msg.contains("connect failed"));
    assert!(msg.contains("network unreachable"));
}

#[test]
fn test_login_failed_display() {
    let err = Error::LoginFailed("bad credentials".into());
    let msg = err.to_string();
    assert!(msg.contains("login failed"));
    assert!(msg.contains("bad credentials"));
}

#[test]
fn test_send_recv_failed_display() {
    let send = Error::SendFailed("broken pipe".into());
    assert!(send.to_string().contains("send failed"));

    let recv = Error::RecvFailed("reset by peer".into());
    assert!(recv.to_string().contains("recv failed"));
}

#[test]
fn test_server_error_display() {
    let err = Error::Server {
        number: 8134,
        class: 16,
        state: 1,
        message: "Divide by zero error encountered.".into(),
        server: Some("SQLSERVER01".into()),
        procedure: Some("sp_calculate".into()),
        line: 42,
    };
    let msg = err.to_string();
    assert!(msg.contains("8134"));
    assert!(msg.contains("Divide by zero"));
}

#[test]
fn test_server_error_without_optional_fields() {
    let err = Error::Server {
        number: 102,
        class: 15,
        state: 1,
        message: "Syntax error".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    let msg = err.to_string();
    assert!(msg.contains("102"));
    assert!(msg.contains("Syntax error"));
}

#[test]
fn test_config_error_display() {
    let err = Error::Config("invalid port number".into());
    let msg = err.to_string();
    assert!(msg.contains("configuration error"));
    assert!(msg.contains("invalid port number"));
}

#[test]
fn test_not_authenticated_display() {
    assert_eq!(
        Error::NotAuthenticated.to_string(),
        "session is not authenticated"
    );
}

#[test]
fn test_buffer_too_small_display() {
    let err = Error::BufferTooSmall {
        needed: 128,
        available: 64,
    };
    let msg = err.to_string();
    assert!(msg.contains("128"));
    assert!(msg.contains("64"));
}

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = Error::Io(Arc::new(io_err));
    let msg = err.to_string();
    assert!(msg.contains("IO error"));
    assert!(msg.contains("refused"));
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected");
    let err: Error = io_err.into();

    match err {
        Error::Io(arc_err) => {
            assert_eq!(arc_err.kind(), std::io::ErrorKind::NotConnected);
        }
        _ => panic!("Expected IO error"),
    }
}

#[test]
fn test_io_error_is_clone_via_arc() {
    let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
    let err: Error = io_err.into();

    if let Error::Io(arc1) = &err {
        let arc2 = Arc::clone(arc1);
        assert_eq!(arc1.kind(), arc2.kind());
    }
}

#[test]
fn test_transport_error_conversion() {
    let e: Error = tds_transport::TransportError::NotConnected.into();
    assert!(matches!(e, Error::ConnectFailed(_)));

    let e: Error = tds_transport::TransportError::SendFailed("broken pipe".into()).into();
    assert!(matches!(e, Error::SendFailed(_)));

    let e: Error = tds_transport::TransportError::RecvFailed("eof".into()).into();
    assert!(matches!(e, Error::RecvFailed(_)));
}

#[test]
fn test_protocol_error_conversion() {
    let proto_err = tds_protocol::ProtocolError::UnexpectedEof;
    let err: Error = proto_err.into();
    assert!(matches!(err, Error::ProtocolError(_)));
}

// =============================================================================
// Error Categorization Tests
// =============================================================================

#[test]
fn test_is_server_error() {
    let err = Error::Server {
        number: 102,
        class: 16,
        state: 1,
        message: "test".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    assert!(err.is_server_error(102));
    assert!(!err.is_server_error(103));
    assert!(!Error::NotAuthenticated.is_server_error(102));
}

#[test]
fn test_class_only_present_on_server_errors() {
    let err = Error::Server {
        number: 547,
        class: 16,
        state: 0,
        message: "Constraint violation".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    assert_eq!(err.class(), Some(16));

    assert!(Error::NotAuthenticated.class().is_none());
    assert!(Error::Config("x".into()).class().is_none());
    assert!(Error::ConnectFailed("x".into()).class().is_none());
}

#[test]
fn test_error_class_severity_ranges() {
    // Informational (0-10)
    let info = Error::Server {
        number: 0,
        class: 5,
        state: 0,
        message: "Info".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    assert!(info.class().unwrap() <= 10);

    // User error (11-16)
    let user_err = Error::Server {
        number: 102,
        class: 15,
        state: 1,
        message: "Syntax error".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    assert!((11..=16).contains(&user_err.class().unwrap()));

    // Fatal error (>= 14), the threshold the driver uses to abort a command
    let fatal = Error::Server {
        number: 2627,
        class: 14,
        state: 1,
        message: "Violation of UNIQUE KEY constraint".into(),
        server: None,
        procedure: None,
        line: 1,
    };
    assert!(fatal.class().unwrap() >= 14);
}

// =============================================================================
// Error Debug Implementation Tests
// =============================================================================

#[test]
fn test_error_debug_format() {
    let err = Error::Server {
        number: 102,
        class: 15,
        state: 1,
        message: "Syntax error".into(),
        server: Some("SERVER".into()),
        procedure: Some("sp_test".into()),
        line: 42,
    };

    let debug = format!("{:?}", err);
    assert!(debug.contains("Server"));
    assert!(debug.contains("102"));
    assert!(debug.contains("Syntax error"));
}

#[test]
fn test_all_error_variants_are_debug_and_display() {
    let errors: Vec<Error> = vec![
        Error::ConnectFailed("test".into()),
        Error::LoginFailed("test".into()),
        Error::SendFailed("test".into()),
        Error::RecvFailed("test".into()),
        Error::BufferTooSmall {
            needed: 1,
            available: 0,
        },
        Error::NotAuthenticated,
        Error::Server {
            number: 1,
            class: 1,
            state: 1,
            message: "test".into(),
            server: None,
            procedure: None,
            line: 1,
        },
        Error::Config("test".into()),
        Error::Io(Arc::new(std::io::Error::other("test"))),
    ];

    for err in errors {
        let _ = format!("{:?}", err);
        let _ = format!("{}", err);
    }
}

// =============================================================================
// Error Source Chain Tests
// =============================================================================

#[test]
fn test_io_error_source() {
    use std::error::Error as StdError;

    let io_err = std::io::Error::other("inner error");
    let err = Error::Io(Arc::new(io_err));

    // thiserror's #[error] derive doesn't set a `source` for a bare tuple
    // variant unless annotated with #[source]; just make sure the call
    // doesn't panic.
    let _ = err.source();
}
