//! Error handling and diagnostics example.
//!
//! This example demonstrates how to handle the different error shapes the
//! driver can surface, and how to register a message handler for `INFO`/
//! `ERROR` tokens that don't fail the current operation (severity class < 14).
//!
//! # Running
//!
//! ```bash
//! export MSSQL_HOST=localhost
//! export MSSQL_USER=sa
//! export MSSQL_PASSWORD=YourStrong@Passw0rd
//!
//! cargo run --example error_handling
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, Session};
use tds_transport::TcpTransport;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("MSSQL_HOST").unwrap_or_else(|_| "localhost".into());
    let user = std::env::var("MSSQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    println!("=== Error Handling Examples ===\n");

    // Example 1: a message handler that prints every INFO/ERROR the server
    // sends, without failing the surrounding query.
    println!("1. Message handler + non-fatal server error:");
    let mut config = Config::new();
    config.server_name = host.clone();
    config.database = Some("master".to_string());
    config.user_name = user.clone();
    config.password = password.clone();

    let mut session = Session::connect(config, TcpTransport::new())?.login()?;
    session.on_message(|msg| {
        let kind = if msg.is_error { "ERROR" } else { "INFO" };
        println!(
            "  [{kind}] #{} (class {}): {}",
            msg.number, msg.class, msg.message
        );
    });

    match session.query("SELECT 1/0", &[]) {
        Ok(rows) => println!("  Unexpectedly succeeded with {} rows", rows.len()),
        Err(Error::Server {
            number,
            message,
            class,
            ..
        }) => {
            println!("  SQL Server Error #{number}: {message} (severity: {class})");
        }
        Err(e) => println!("  Other error: {e:?}"),
    }

    // Example 2: authentication failure.
    println!("\n2. Authentication error (expected to fail):");
    let mut bad_config = Config::new();
    bad_config.server_name = host;
    bad_config.database = Some("master".to_string());
    bad_config.user_name = "invalid".to_string();
    bad_config.password = "wrong".to_string();

    match Session::connect(bad_config, TcpTransport::new()).and_then(|s| s.login()) {
        Ok(_) => println!("  Unexpectedly connected!"),
        Err(Error::LoginFailed(detail)) => {
            println!("  Login failed: {detail}");
            println!("  This is expected - do not retry auth failures blindly");
        }
        Err(Error::Server { number, .. }) if number == 18_456 => {
            println!("  Logon failed (error 18456) - bad username or password");
        }
        Err(e) => println!("  Other error: {e:?}"),
    }

    // Example 3: constraint violation (non-transient, should not be retried).
    println!("\n3. Constraint violation (non-retriable):");
    session.execute(
        "CREATE TABLE #test_constraints (id INT PRIMARY KEY, name VARCHAR(50))",
        &[],
    )?;
    session.execute("INSERT INTO #test_constraints VALUES (1, 'first')", &[])?;

    match session.execute("INSERT INTO #test_constraints VALUES (1, 'duplicate')", &[]) {
        Ok(_) => println!("  Unexpectedly succeeded!"),
        Err(Error::Server {
            number, message, ..
        }) if number == 2627 => {
            println!("  Primary key violation (error {number}): {message}");
            println!("  This is NOT transient - fix your data, don't retry");
        }
        Err(e) => println!("  Other error: {e:?}"),
    }

    session.disconnect()?;
    println!("\nAll error handling examples completed.");

    Ok(())
}
