//! Transaction handling with savepoints example.
//!
//! This example demonstrates transaction management including:
//! - Beginning and committing transactions
//! - Rolling back to a savepoint
//! - Isolation levels
//!
//! # Running
//!
//! ```bash
//! cargo run --example transactions
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, IsolationLevel, NamedParam, Session};
use tds_transport::TcpTransport;
use tds_types::SqlValue;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("MSSQL_HOST").unwrap_or_else(|_| "localhost".into());
    let database = std::env::var("MSSQL_DATABASE").unwrap_or_else(|_| "master".into());
    let user = std::env::var("MSSQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    let mut config = Config::new();
    config.server_name = host;
    config.database = Some(database);
    config.user_name = user;
    config.password = password;

    let mut session = Session::connect(config, TcpTransport::new())?.login()?;
    println!("Connected to SQL Server");

    println!("\n--- Example 1: Basic Transaction ---");
    basic_transaction_example(&mut session)?;

    session.disconnect()?;
    Ok(())
}

fn basic_transaction_example(
    session: &mut Session<TcpTransport, tds_client::Authenticated>,
) -> Result<(), Error> {
    // `begin_transaction` sends `BEGIN TRANSACTION` and returns a marker for
    // the requested isolation level; the transaction descriptor itself lives
    // inside `Session` and is threaded into every ALL_HEADERS prelude.
    let _tx = session.begin_transaction(IsolationLevel::ReadCommitted)?;
    println!("Transaction started");

    session.execute("CREATE TABLE #TempUsers (id INT, name NVARCHAR(100))", &[])?;
    println!("Temporary table created");

    session.execute(
        "INSERT INTO #TempUsers (id, name) VALUES (@id, @name)",
        &[
            NamedParam::new("id", SqlValue::Int(1)),
            NamedParam::new("name", SqlValue::String("Alice".into())),
        ],
    )?;
    println!("Inserted Alice");

    session.execute(
        "INSERT INTO #TempUsers (id, name) VALUES (@id, @name)",
        &[
            NamedParam::new("id", SqlValue::Int(2)),
            NamedParam::new("name", SqlValue::String("Bob".into())),
        ],
    )?;
    println!("Inserted Bob");

    // Create a savepoint before a potentially risky operation.
    let savepoint = session.save_point("before_charlie")?;
    println!("Savepoint 'before_charlie' created");

    session.execute(
        "INSERT INTO #TempUsers (id, name) VALUES (@id, @name)",
        &[
            NamedParam::new("id", SqlValue::Int(3)),
            NamedParam::new("name", SqlValue::String("Charlie".into())),
        ],
    )?;
    println!("Inserted Charlie");

    if std::env::var("SIMULATE_ERROR").is_ok() {
        println!("Simulating error - rolling back to savepoint...");
        session.rollback_to(&savepoint)?;
        println!("Rolled back to savepoint (Charlie's insert undone)");
    }

    let rows = session.query("SELECT id, name FROM #TempUsers ORDER BY id", &[])?;
    println!("\nUsers in transaction:");
    for row in &rows {
        let id: i32 = row.get(0)?;
        let name: String = row.get(1)?;
        println!("  {id} - {name}");
    }

    session.commit_transaction()?;
    println!("\nTransaction committed");

    Ok(())
}
