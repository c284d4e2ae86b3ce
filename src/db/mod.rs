//! Engine gateway: the only owner of the SQLite connection.
//!
//! Layout:
//! - `gateway.rs`: ractor actor serialising `execute`/`fetch` against the pool
//! - `codec.rs`: JSON value <-> SQLite cell conversions
//! - `schema.rs`: DDL and introspection statements for per-kind tables

pub mod codec;
pub mod gateway;
pub mod schema;

pub use gateway::{GatewayHandle, GatewayMessage, SqlitePool};
pub use schema::{ID_COLUMN, JSON_COLUMN};
