//! HTTP protocol implementation.
//!
//! This module implements the GET-only subset of HTTP/1.1 needed by a static
//! file server, with pipelining, persistent connections and idle timeouts.
//!
//! # Architecture
//!
//! - **`headers`**: Header storage and the `Message` trait shared by requests and responses
//! - **`request`** / **`response`**: The message types and the closed status registry
//! - **`parser`**: Splits byte buffers into pipelined requests; also decodes responses
//! - **`negotiate`**: `Accept-Encoding` selection and `If-None-Match` matching
//! - **`composer`**: Turns a request into a response using a resource resolver
//! - **`writer`**: Serializes messages and writes them out completely
//! - **`connection`**: The per-connection state machine
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Open     │ ← Read, then parse, compose and write each request in order
//!        └──────┬──────┘
//!               │ Batch written
//!               ├─ Persistent → Open (same connection)
//!               ├─ Peer closed, close requested or head too large → Closed
//!               │
//!               │ Idle timeout
//!               ▼
//!        ┌──────────────────┐
//!        │     Closing      │ ← Send 408 with `Connection: close`
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lantern::http::composer::Composer;
//! use lantern::http::connection::handle_connection;
//! use lantern::resource::FileResolver;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8001").await?;
//!     let composer = Composer::new(Arc::new(FileResolver::new("content")));
//!
//!     loop {
//!         let (socket, peer) = listener.accept().await?;
//!         let composer = composer.clone();
//!         tokio::spawn(async move {
//!             let timeout = Duration::from_secs(15);
//!             if let Err(e) = handle_connection(socket, peer, timeout, composer).await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod composer;
pub mod connection;
pub mod headers;
pub mod mime;
pub mod negotiate;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
