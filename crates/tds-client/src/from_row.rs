//! `FromRow` trait for row-to-struct mapping.
//!
//! This module provides the `FromRow` trait, which converts a [`Row`] into a
//! Rust struct by pulling typed values out of named columns.
//!
//! # Example
//!
//! ```rust,ignore
//! use tds_client::{FromRow, Row, Error};
//!
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl FromRow for User {
//!     fn from_row(row: &Row) -> Result<Self, Error> {
//!         Ok(Self {
//!             id: row.get_by_name("id")?,
//!             name: row.get_by_name("name")?,
//!         })
//!     }
//! }
//! ```

use crate::error::Error;
use crate::row::Row;

/// Trait for types that can be constructed from a database row.
pub trait FromRow: Sized {
    /// Construct an instance of this type from a database row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A required column is missing
    /// - A column value cannot be converted to the expected Rust type
    /// - Any other mapping error occurs
    fn from_row(row: &Row) -> Result<Self, Error>;
}

/// Extension trait for iterating over query results as typed structs.
///
/// This trait is automatically implemented for any iterator of `Result<Row, Error>`.
pub trait RowIteratorExt: Iterator<Item = Result<Row, Error>> + Sized {
    /// Map each row to a struct implementing `FromRow`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tds_client::{FromRow, RowIteratorExt};
    ///
    /// struct User { id: i32, name: String }
    ///
    /// let users: Vec<User> = session
    ///     .query("SELECT id, name FROM users", &[])?
    ///     .map_rows::<User>()
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// ```
    fn map_rows<T: FromRow>(self) -> MapRows<Self, T>;
}

impl<I: Iterator<Item = Result<Row, Error>>> RowIteratorExt for I {
    fn map_rows<T: FromRow>(self) -> MapRows<Self, T> {
        MapRows {
            inner: self,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Iterator adapter that maps rows to typed structs.
pub struct MapRows<I, T> {
    inner: I,
    _marker: std::marker::PhantomData<T>,
}

impl<I, T> Iterator for MapRows<I, T>
where
    I: Iterator<Item = Result<Row, Error>>,
    T: FromRow,
{
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.and_then(|row| T::from_row(&row)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
