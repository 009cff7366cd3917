//! HTTP protocol implementation.
//!
//! This module implements the strict HTTP/1.1 subset the server speaks:
//! `GET` only, `HTTP/1.1` only, a mandatory `Host`, and keep-alive until the
//! client sends `Connection: close`.
//!
//! # Architecture
//!
//! - **`reader`**: Reads CRLF-terminated lines under a read deadline
//! - **`parser`**: Builds one validated request from those lines
//! - **`request`**: HTTP request representation and header canonicalization
//! - **`resolver`**: Maps a request to a file inside its virtual host's document root
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`connection`**: The per-connection request-response state machine
//! - **`mime`**: MIME type detection based on file extensions
//! - **`date`**: HTTP date formatting
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌──────────────────┐
//!        │   AwaitRequest   │ ← Arm the read deadline, parse one request
//!        └──────┬───────────┘
//!               │ Request parsed          (idle timeout / peer hung up → Closed)
//!               ▼                         (malformed / partial timeout → Respond 400)
//!        ┌──────────────────┐
//!        │    Dispatch      │ ← Resolve the file, build 200 or 404
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Respond       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → AwaitRequest (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vhttpd::http::connection::Connection;
//! use vhttpd::vhost::VirtualHosts;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let vhosts = Arc::new(VirtualHosts::new([("localhost", "/srv/www")])?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let vhosts = Arc::clone(&vhosts);
//!         tokio::spawn(async move {
//!             Connection::new(socket, vhosts).run().await;
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod reader;
pub mod parser;
pub mod resolver;
pub mod connection;
pub mod writer;
pub mod mime;
pub mod date;
