//! Galactic SQL
//!
//! [`SqlClient`] opens a pool from a native connection string, runs one
//! statement per call and returns [`SqlRow`]s of tagged [`SqlValue`]s.
//! PostgreSQL, MySQL and SQLite are reached through `sqlx`'s `Any` driver.

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod row;

pub use client::SqlClient;
pub use config::{SqlConfig, SqlDriver};
pub use error::{Result, SqlError};
pub use filter::filter_to_sql;
pub use row::{SqlRow, SqlValue};
