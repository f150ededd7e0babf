//! HTTP surface: CORS, the single JSON boundary, error mapping, the
//! route table, and server assembly.

pub mod cors;
pub mod error;
pub mod respond;
pub mod routes;
pub mod server;
