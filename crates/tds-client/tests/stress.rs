//! Load tests against the in-process mock server: many sequential queries,
//! many concurrent connections, and large result sets. These exercise the
//! driver's buffer handling rather than a real SQL Server, so they run as
//! part of the normal test suite instead of being gated on live-server
//! environment variables.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tds_client::{Config, Session};
use tds_testing::mock_server::{MockColumn, MockResponse, MockTdsServer, ScalarValue};
use tds_transport::TcpTransport;

fn authenticated_session(
    server: &MockTdsServer,
) -> Session<TcpTransport, tds_client::Authenticated> {
    let config = Config::default()
        .server_name("127.0.0.1")
        .port(server.port())
        .credentials("sa", "whatever");

    Session::connect(config, TcpTransport::new())
        .expect("connect")
        .login()
        .expect("login")
}

#[test]
fn test_many_sequential_batches_on_one_connection() {
    let server = MockTdsServer::builder()
        .with_default_response(MockResponse::scalar_int(7))
        .build()
        .expect("server starts");
    let mut session = authenticated_session(&server);

    for i in 0..500 {
        let result = session
            .batch(&format!("SELECT {i} AS result"))
            .unwrap_or_else(|e| panic!("batch {i} failed: {e}"));
        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.rows()[0].get::<i32>(0).unwrap(), 7);
    }

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_many_concurrent_connections_to_one_server() {
    let server = Arc::new(
        MockTdsServer::builder()
            .with_default_response(MockResponse::affected(1))
            .build()
            .expect("server starts"),
    );
    let completed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let server = server.clone();
            let completed = completed.clone();
            std::thread::spawn(move || {
                let mut session = authenticated_session(&server);
                for _ in 0..20 {
                    session.batch("UPDATE T SET X = 1").expect("batch");
                }
                session.disconnect().expect("disconnect");
                completed.fetch_add(1, Ordering::AcqRel);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert_eq!(completed.load(Ordering::Acquire), 16);
    server.stop();
}

#[test]
fn test_large_result_set_decodes_every_row() {
    const ROW_COUNT: i32 = 5_000;

    let columns = vec![MockColumn::int("n")];
    let rows: Vec<Vec<ScalarValue>> = (0..ROW_COUNT).map(|i| vec![ScalarValue::Int(i)]).collect();

    let server = MockTdsServer::builder()
        .with_response("SELECT * FROM BIG_TABLE", MockResponse::rows(columns, rows))
        .build()
        .expect("server starts");
    let mut session = authenticated_session(&server);

    let result = session
        .batch("SELECT * FROM BIG_TABLE")
        .expect("batch succeeds");
    assert_eq!(result.rows().len(), ROW_COUNT as usize);
    assert_eq!(result.rows()[0].get::<i32>(0).unwrap(), 0);
    assert_eq!(
        result.rows()[ROW_COUNT as usize - 1].get::<i32>(0).unwrap(),
        ROW_COUNT - 1
    );

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_wide_row_with_many_columns() {
    const COLUMN_COUNT: usize = 100;

    let columns: Vec<MockColumn> = (0..COLUMN_COUNT)
        .map(|i| MockColumn::int(&format!("c{i}")))
        .collect();
    let row: Vec<ScalarValue> = (0..COLUMN_COUNT as i32).map(ScalarValue::Int).collect();

    let server = MockTdsServer::builder()
        .with_response("SELECT * FROM WIDE_TABLE", MockResponse::rows(columns, vec![row]))
        .build()
        .expect("server starts");
    let mut session = authenticated_session(&server);

    let result = session
        .batch("SELECT * FROM WIDE_TABLE")
        .expect("batch succeeds");
    assert_eq!(result.rows().len(), 1);
    assert_eq!(result.rows()[0].len(), COLUMN_COUNT);
    assert_eq!(result.rows()[0].get_by_name::<i32>("c99").unwrap(), 99);

    session.disconnect().unwrap();
    server.stop();
}

#[test]
fn test_large_batch_text_round_trips() {
    let server = MockTdsServer::builder()
        .with_default_response(MockResponse::affected(0))
        .build()
        .expect("server starts");
    let mut session = authenticated_session(&server);

    // A single batch text well over one default packet (4096 bytes); the
    // transport layer must split it across multiple TDS packets.
    let long_predicate = (0..2000)
        .map(|i| format!("col{i} = {i}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!("SELECT 1 WHERE {long_predicate}");

    session.batch(&sql).expect("large batch succeeds");

    session.disconnect().unwrap();
    server.stop();
}
