//! vhttpd - static file server with virtual hosts
//!
//! Core library: the HTTP/1.1 connection pipeline, the virtual host table,
//! configuration and the accept loop.

pub mod config;
pub mod http;
pub mod logging;
pub mod server;
pub mod vhost;
