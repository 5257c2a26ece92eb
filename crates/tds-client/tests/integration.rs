//! Full session-lifecycle integration tests against the in-process mock
//! TDS server: connect, authenticate, run batches and parameterized
//! statements, manage transactions, and handle errors — all without a
//! live SQL Server.
//!
//! `prepare`/`execute_prepared` are deliberately not exercised end to end
//! here: the mock server never emits the `RETURNVALUE` token a real
//! `sp_prepare` response carries the statement handle in, so there is no
//! way to drive that path without a live server. `prepare` is still unit
//! tested (see `statement_cache` tests) for its cache-hit short circuit.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, IsolationLevel, Session};
use tds_testing::mock_server::{MockColumn, MockResponse, MockTdsServer, ScalarValue};
use tds_transport::TcpTransport;

fn connect(server: &MockTdsServer) -> Session<TcpTransport, tds_client::Connected> {
    let config = Config::default()
        .server_name("127.0.0.1")
        .port(server.port())
        .credentials("sa", "whatever")
        .database("integration_db");

    Session::connect(config, TcpTransport::new()).expect("tcp connect succeeds")
}

fn authenticated(server: &MockTdsServer) -> Session<TcpTransport, tds_client::Authenticated> {
    connect(server).login().expect("login succeeds")
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[test]
fn test_connect_login_disconnect_round_trip() {
    let server = MockTdsServer::builder()
        .with_database("integration_db")
        .build()
        .expect("server starts");

    let session = authenticated(&server);
    assert_eq!(session.current_database(), Some("integration_db"));
    assert!(session.server_tds_version().is_some());

    session.disconnect().expect("disconnect succeeds");
    server.stop();
}

#[test]
fn test_connecting_to_a_closed_port_fails_with_connect_error() {
    // Nothing is listening on this port.
    let result = Session::connect(
        Config::default().server_name("127.0.0.1").port(1),
        TcpTransport::new(),
    );
    assert!(matches!(result, Err(Error::ConnectFailed(_))));
}

#[test]
fn test_config_round_trips_through_a_connected_session() {
    let server = MockTdsServer::builder().build().expect("server starts");
    let session = authenticated(&server);

    assert_eq!(session.config().server_name, "127.0.0.1");
    assert_eq!(session.config().port, server.port());
    assert_eq!(session.config().user_name, "sa");

    session.disconnect().unwrap();
    server.stop();
}

// ============================================================================
// Batches and parameterized statements
// ============================================================================

#[test]
fn test_batch_returns_rows_and_row_count() {
    let columns = vec![MockColumn::int("id"), MockColumn::nvarchar("label", 30)];
    let rows = vec![
        vec![ScalarValue::Int(1), ScalarValue::String("first".into())],
        vec![ScalarValue::Int(2), ScalarValue::String("second".into())],
    ];

    let server = MockTdsServer::builder()
        .with_response("SELECT id, label FROM items", MockResponse::rows(columns, rows))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    let result = session
        .batch("SELECT id, label FROM items")
        .expect("batch succeeds");
    assert_eq!(result.rows().len(), 2);
    assert_eq!(result.rows()[1].get_by_name::<String>("label").unwrap(), "second");

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_query_wrapper_returns_plain_rows() {
    let server = MockTdsServer::builder()
        .with_default_response(MockResponse::scalar_int(99))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    let rows = session
        .query("SELECT @p1 AS value", &[])
        .expect("query succeeds");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<i32>(0).unwrap(), 99);

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_execute_wrapper_returns_rows_affected() {
    let server = MockTdsServer::builder()
        .with_default_response(MockResponse::affected(5))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    let affected = session
        .execute("DELETE FROM items WHERE id = @p1", &[])
        .expect("execute succeeds");
    assert_eq!(affected, 5);

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_sequential_batches_with_different_responses() {
    let server = MockTdsServer::builder()
        .with_response("SELECT 1", MockResponse::scalar_int(1))
        .with_response("SELECT 2", MockResponse::scalar_int(2))
        .with_response("SELECT 3", MockResponse::scalar_int(3))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    for expected in 1..=3 {
        let result = session
            .batch(&format!("SELECT {expected}"))
            .expect("batch succeeds");
        assert_eq!(result.rows()[0].get::<i32>(0).unwrap(), expected);
    }

    session.disconnect().unwrap();
    server.stop();
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_transaction_commit_round_trip() {
    let server = MockTdsServer::builder().build().expect("server starts");
    let mut session = authenticated(&server);

    {
        let _tx = session
            .begin_transaction(IsolationLevel::ReadCommitted)
            .expect("begin succeeds");
        session
            .execute("INSERT INTO items (id) VALUES (1)", &[])
            .expect("insert succeeds");
    }
    session.commit_transaction().expect("commit succeeds");

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_transaction_rollback_round_trip() {
    let server = MockTdsServer::builder().build().expect("server starts");
    let mut session = authenticated(&server);

    let _tx = session
        .begin_transaction(IsolationLevel::Serializable)
        .expect("begin succeeds");
    session
        .execute("INSERT INTO items (id) VALUES (1)", &[])
        .expect("insert succeeds");
    session.rollback_transaction().expect("rollback succeeds");

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_savepoint_partial_rollback() {
    let server = MockTdsServer::builder().build().expect("server starts");
    let mut session = authenticated(&server);

    let _tx = session
        .begin_transaction(IsolationLevel::ReadCommitted)
        .expect("begin succeeds");
    session.execute("INSERT INTO items (id) VALUES (1)", &[]).unwrap();
    let save_point = session.save_point("before_second_insert").expect("savepoint set");
    session.execute("INSERT INTO items (id) VALUES (2)", &[]).unwrap();
    session.rollback_to(&save_point).expect("rollback to savepoint");
    session.commit_transaction().expect("commit succeeds");

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_each_isolation_level_produces_distinct_sql() {
    for level in [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
        IsolationLevel::Snapshot,
    ] {
        assert!(level.as_sql().starts_with("SET TRANSACTION ISOLATION LEVEL"));
    }
}

// ============================================================================
// Error propagation
// ============================================================================

#[test]
fn test_server_error_surfaces_as_error_server_variant() {
    let server = MockTdsServer::builder()
        .with_response("SELECT 1/0", MockResponse::error(8134, "Divide by zero error"))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    let err = session.batch("SELECT 1/0").unwrap_err();
    match err {
        Error::Server { number, message, .. } => {
            assert_eq!(number, 8134);
            assert!(message.contains("Divide by zero"));
        }
        other => panic!("expected Error::Server, got {other:?}"),
    }

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_server_error_message_is_also_delivered_to_handler_before_failing() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let server = MockTdsServer::builder()
        .with_response("SELECT 1/0", MockResponse::error(8134, "Divide by zero error"))
        .build()
        .expect("server starts");
    let mut session = authenticated(&server);

    let seen = Rc::new(RefCell::new(false));
    let seen_clone = seen.clone();
    session.on_message(move |msg| {
        if msg.number == 8134 {
            *seen_clone.borrow_mut() = true;
        }
    });

    let result = session.batch("SELECT 1/0");
    assert!(result.is_err());
    assert!(*seen.borrow());

    session.disconnect().unwrap();
    server.stop();
}

// ============================================================================
// Multiple sessions against one server
// ============================================================================

#[test]
fn test_two_sessions_share_a_server_without_cross_talk() {
    let server = MockTdsServer::builder()
        .with_response("SELECT 'a'", MockResponse::scalar_string("a"))
        .with_response("SELECT 'b'", MockResponse::scalar_string("b"))
        .build()
        .expect("server starts");

    let mut one = authenticated(&server);
    let mut two = authenticated(&server);

    let ra = one.batch("SELECT 'a'").unwrap();
    let rb = two.batch("SELECT 'b'").unwrap();

    assert_eq!(ra.rows()[0].get_str(0).unwrap(), "a");
    assert_eq!(rb.rows()[0].get_str(0).unwrap(), "b");

    one.disconnect().unwrap();
    two.disconnect().unwrap();
    server.stop();
}
