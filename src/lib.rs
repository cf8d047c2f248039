pub mod bootstrap;
pub mod config;
pub mod http_client;
pub mod json;
pub mod logging;
pub mod rows;
pub mod schema;
pub mod signal;
pub mod snapshot;
pub mod traversal;
pub mod upsert;
