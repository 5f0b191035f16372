//! HTTP API: configuration, routing, authentication and the resource
//! operation handlers.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

pub use config::Config;
