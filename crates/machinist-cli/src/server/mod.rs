//! HTTP server startup and lifecycle management.

mod http_server;
mod lifecycle;
mod shutdown;

pub use self::http_server::serve_http as serve;
