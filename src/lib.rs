//! Lantern - minimal static HTTP/1.1 server
//!
//! Core library: protocol engine, resource resolution, and the accept loop.

pub mod config;
pub mod http;
pub mod resource;
pub mod server;
