//! Basic connection and query example.
//!
//! This example demonstrates how to connect to SQL Server and execute
//! simple queries with parameters.
//!
//! # Running
//!
//! ```bash
//! # Set connection details via environment variables
//! export MSSQL_HOST=localhost
//! export MSSQL_DATABASE=testdb
//! export MSSQL_USER=sa
//! export MSSQL_PASSWORD=YourStrong@Passw0rd
//!
//! cargo run --example basic
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, NamedParam, Session};
use tds_transport::TcpTransport;
use tds_types::SqlValue;

fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let host = std::env::var("MSSQL_HOST").unwrap_or_else(|_| "localhost".into());
    let database = std::env::var("MSSQL_DATABASE").unwrap_or_else(|_| "master".into());
    let user = std::env::var("MSSQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    let mut config = Config::new();
    config.server_name = host.clone();
    config.database = Some(database);
    config.user_name = user;
    config.password = password;

    println!("Connecting to SQL Server at {host}...");
    let mut session = Session::connect(config, TcpTransport::new())?.login()?;
    println!("Connected successfully!");

    // Execute a simple query with no parameters.
    let rows = session.query("SELECT @@VERSION AS version", &[])?;
    for row in &rows {
        let version: String = row.get_by_name("version")?;
        println!("SQL Server Version: {version}");
    }

    // Execute a statement with a named parameter, discarding any rows.
    println!("\nExecuting parameterized statement...");
    let rows_affected = session.execute(
        "SELECT @id AS input_value, GETDATE() AS query_time",
        &[NamedParam::new("id", SqlValue::Int(1))],
    )?;
    println!("Rows affected: {rows_affected}");

    // Query with multiple named parameters.
    let rows = session.query(
        "SELECT @name AS name, @count AS count",
        &[
            NamedParam::new("name", SqlValue::String("test".into())),
            NamedParam::new("count", SqlValue::Int(42)),
        ],
    )?;
    for row in &rows {
        let name: String = row.get_by_name("name")?;
        let count: i32 = row.get_by_name("count")?;
        println!("Name: {name}, Count: {count}");
    }

    // Close the connection gracefully.
    session.disconnect()?;
    println!("\nConnection closed.");

    Ok(())
}
