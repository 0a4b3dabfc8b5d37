//! Tool-RPC Protocol
//!
//! JSON-RPC 2.0 over HTTP and SSE for the assistant tool surface.

pub mod http;
pub mod messages;
pub mod types;
