//! HTTP surface of the proxy.

pub mod routes;
pub mod server;

pub use routes::{AppState, CACHE_STATUS_HEADER};
pub use server::{build_router, ProxyServer};
