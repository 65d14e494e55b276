//! schema-hub: HTTP front-end for the schema store in `schema-hub-core`.

pub mod api;
pub mod config;
pub mod server;
