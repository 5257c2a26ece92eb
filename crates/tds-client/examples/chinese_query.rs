//! An example of querying a SQL Server database and retrieving Chinese characters.
//!
//! Demonstrates that a collation-tagged `VARCHAR` column (decoded through its
//! code page) and an `NVARCHAR` column (always UTF-16LE) both round-trip
//! non-ASCII text correctly.
//!
//! # Running
//!
//! ```bash
//! cargo run --example chinese_query
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tds_client::{Config, Error, Session};
use tds_transport::TcpTransport;

fn main() -> Result<(), Error> {
    let host = std::env::var("MSSQL_HOST").unwrap_or_else(|_| "192.168.100.5".into());
    let database = std::env::var("MSSQL_DATABASE").unwrap_or_else(|_| "master".into());
    let user = std::env::var("MSSQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| "@cwc3002#".into());

    let mut config = Config::new();
    config.server_name = host;
    config.database = Some(database);
    config.user_name = user;
    config.password = password;

    let mut session = Session::connect(config, TcpTransport::new())?.login()?;

    let rows = session.query(
        "SELECT CONVERT(VARCHAR(40),'中文') COLLATE Chinese_PRC_CI_AI AS info, \
         CONVERT(NVARCHAR(40),'汉字') AS lang",
        &[],
    )?;

    println!("Number of rows: {}", rows.len());
    for row in &rows {
        let info: String = row.get_by_name("info")?;
        let lang: String = row.get_by_name("lang")?;
        println!("{info:?} {lang:?}");
    }

    session.disconnect()?;
    Ok(())
}
