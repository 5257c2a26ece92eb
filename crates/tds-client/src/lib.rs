//! # tds-client
//!
//! Synchronous SQL Server client with type-state connection management.
//!
//! This is the primary public API surface: a blocking `Session` built on
//! top of [`tds_transport`]'s framing layer and [`tds_protocol`]'s wire
//! codecs, with ergonomic row access and parameter binding layered on top.
//!
//! ## Features
//!
//! - **Type-state pattern**: compile-time enforcement of connection states
//! - **Synchronous I/O**: every call blocks the calling thread; no runtime required
//! - **Prepared statements**: opt-in caching with LRU eviction
//! - **Transactions**: explicit transactions with savepoints
//! - **Zero-copy rows**: column values are decoded lazily from a shared buffer
//!
//! ## Type-State Connection Management
//!
//! ```text
//! Disconnected -> Connected (via Session::connect)
//! Connected -> Authenticated (via Session::login)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tds_client::{Config, Session};
//! use tds_transport::TcpTransport;
//!
//! let config = Config::from_connection_string(
//!     "Server=localhost;Database=test;User Id=sa;Password=Password123;"
//! )?;
//!
//! let mut session = Session::connect(config, TcpTransport::new())?.login()?;
//!
//! for row in session.query("SELECT name FROM users WHERE id = @id", &params)? {
//!     let name: String = row.get_by_name("name")?;
//!     println!("User: {name}");
//! }
//! # Ok::<(), tds_client::Error>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod from_row;
pub mod params;
pub mod row;
pub mod state;
pub mod statement_cache;
pub mod to_params;
pub mod transaction;

pub use client::{QueryResult, ServerMessage, Session};
pub use config::Config;
pub use error::Error;
pub use from_row::{FromRow, MapRows, RowIteratorExt};
pub use row::{ColMetaData, Column, ColumnSlice, Row};
pub use state::{Authenticated, Connected, ConnectionState, Disconnected};
pub use statement_cache::{PreparedStatement, StatementCache, StatementCacheConfig};
pub use to_params::{NamedParam, ParamList, ToParams};
pub use transaction::{IsolationLevel, SavePoint, Transaction};

pub use tds_protocol::version::TdsVersion;
pub use tds_types::{FromSql, SqlValue, ToSql};
