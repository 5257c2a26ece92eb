//! Collation-aware VARCHAR encoding/decoding example.
//!
//! This example demonstrates how the driver handles VARCHAR columns with
//! locale-specific character encodings (collations) such as Japanese Shift_JIS,
//! Chinese GB18030/Big5, Korean EUC-KR, and various Windows code pages.
//!
//! # Background
//!
//! SQL Server VARCHAR columns store data in single-byte or multi-byte character
//! encodings determined by the column's collation. Unlike NVARCHAR (which is
//! always UTF-16), VARCHAR data must be decoded using the correct code page:
//!
//! | Collation | Code Page | Encoding |
//! |-----------|-----------|----------|
//! | Japanese_CI_AS | 932 | Shift_JIS |
//! | Chinese_PRC_CI_AS | 936 | GBK/GB18030 |
//! | Korean_Wansung_CI_AS | 949 | EUC-KR |
//! | Chinese_Taiwan_Stroke_CI_AS | 950 | Big5 |
//! | SQL_Latin1_General_CP1_CI_AS | 1252 | Windows-1252 |
//! | Latin1_General_100_CI_AS_SC_UTF8 | 65001 | UTF-8 |
//!
//! When the `encoding` feature is enabled (default), the driver automatically
//! decodes VARCHAR data using the column's collation information.
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
//! cargo run --example collation_encoding
//! ```
//!
//! # Feature Flag
//!
//! The collation-aware decoding requires the `encoding` feature:
//!
//! ```toml
//! [dependencies]
//! tds-client = { version = "0.1", features = ["encoding"] }
//! ```
//!
//! Without this feature, the driver falls back to UTF-16LE decoding for
//! non-UTF-8 data, which may produce incorrect results for VARCHAR columns.

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, Row, Session};
use tds_transport::TcpTransport;

fn main() -> Result<(), Error> {
    // Initialize tracing for logging (shows collation fallback warnings)
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
    println!("Connected successfully!\n");

    demonstrate_collation_metadata(&mut session)?;
    demonstrate_nvarchar_unicode(&mut session)?;

    // Only run VARCHAR tests if the server supports the required collations
    // (some SQL Server installations may not have all collations available).
    if let Err(e) = demonstrate_varchar_with_collations(&mut session) {
        println!("\nNote: VARCHAR collation tests skipped or partially failed: {e}");
        println!(
            "This is expected if the SQL Server instance doesn't have the required collations."
        );
    }

    session.disconnect()?;
    println!("\nConnection closed.");

    Ok(())
}

type Auth = tds_client::Authenticated;

/// Demonstrates how to inspect column collation metadata.
fn demonstrate_collation_metadata(
    session: &mut Session<TcpTransport, Auth>,
) -> Result<(), Error> {
    println!("=== Column Collation Metadata ===\n");

    let rows = session.query(
        "SELECT
            CAST('hello' AS VARCHAR(50)) AS varchar_col,
            N'hello' AS nvarchar_col,
            CAST('test' AS CHAR(10)) AS char_col",
        &[],
    )?;

    for row in &rows {
        println!("Column metadata:");
        for (i, col) in row.columns().iter().enumerate() {
            println!("  [{i}] {} (type 0x{:02X})", col.name, col.type_id);

            #[cfg(feature = "encoding")]
            {
                println!("       Encoding: {}", col.encoding_name());
                println!("       Is UTF-8: {}", col.is_utf8_collation());
            }
        }
        println!();
    }

    Ok(())
}

/// Demonstrates NVARCHAR (always UTF-16, no collation decoding needed).
fn demonstrate_nvarchar_unicode(session: &mut Session<TcpTransport, Auth>) -> Result<(), Error> {
    println!("=== NVARCHAR Unicode Handling ===\n");

    let rows = session.query(
        "SELECT
            N'Hello, 世界!' AS chinese,
            N'こんにちは' AS japanese,
            N'안녕하세요' AS korean,
            N'Привет мир' AS russian,
            N'مرحبا بالعالم' AS arabic",
        &[],
    )?;

    for row in &rows {
        println!("NVARCHAR results (always Unicode):");
        println!("  Chinese:  {}", row.get::<String>(0)?);
        println!("  Japanese: {}", row.get::<String>(1)?);
        println!("  Korean:   {}", row.get::<String>(2)?);
        println!("  Russian:  {}", row.get::<String>(3)?);
        println!("  Arabic:   {}", row.get::<String>(4)?);
    }
    println!();

    Ok(())
}

/// Demonstrates VARCHAR with various collations.
///
/// This requires the SQL Server to have the appropriate collations installed.
fn demonstrate_varchar_with_collations(
    session: &mut Session<TcpTransport, Auth>,
) -> Result<(), Error> {
    println!("=== VARCHAR Collation-Aware Decoding ===\n");

    session.execute(
        "IF OBJECT_ID('tempdb..#collation_test') IS NOT NULL
            DROP TABLE #collation_test",
        &[],
    )?;

    let create_result = session.execute(
        "CREATE TABLE #collation_test (
            id INT IDENTITY(1,1),
            latin1_col VARCHAR(100) COLLATE SQL_Latin1_General_CP1_CI_AS,
            unicode_col NVARCHAR(100)
        )",
        &[],
    );

    if let Err(e) = create_result {
        println!("Could not create test table: {e}");
        return Ok(());
    }

    session.execute(
        "INSERT INTO #collation_test (latin1_col, unicode_col) VALUES
            ('Hello World', N'Hello World'),
            ('Café résumé', N'Café résumé'),
            ('Müller Böse', N'Müller Böse')",
        &[],
    )?;

    let rows: Vec<Row> = session.query("SELECT * FROM #collation_test", &[])?;

    println!("Test data with Latin1 (Windows-1252) collation:");
    for row in &rows {
        let id: i32 = row.get(0)?;
        let latin1: String = row.get(1)?;
        let unicode: String = row.get(2)?;

        println!("  Row {id}: latin1='{latin1}' unicode='{unicode}'");
        if latin1 == unicode {
            println!("         encoding preserved correctly");
        } else {
            println!("         encoding mismatch (may indicate a decoding issue)");
        }
    }
    println!();

    println!("Understanding VARCHAR encoding:");
    println!("  - VARCHAR stores data in the collation's code page");
    println!("  - Windows-1252 (Latin1): 'é' = 0xE9 (single byte)");
    println!("  - Shift_JIS (Japanese): '日' = 0x93FA (two bytes)");
    println!("  - UTF-16 (NVARCHAR): '日' = 0x65E5 (two bytes, different value)");
    println!();

    session.execute("DROP TABLE #collation_test", &[])?;

    Ok(())
}
