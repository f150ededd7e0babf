//! sqlgate: HTTP gateway with a guarded SQL SELECT passthrough
//!
//! Exposes a fixed multi-row insert and a restricted raw-SQL SELECT
//! passthrough over a MySQL table. Writes use a dedicated writer login,
//! reads a dedicated reader login; the SELECT guard is a deliberate
//! prefix check only, with real enforcement delegated to the reader
//! account's database-level privileges.

pub mod config;
pub mod db;
pub mod http;
pub mod models;

pub use config::{Config, ConfigError};
pub use http::server::{serve, ServerError};
