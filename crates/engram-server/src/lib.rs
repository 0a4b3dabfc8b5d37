//! Engram Server
//!
//! The service binary's library surface: application state, the REST API,
//! the JSON-RPC tool endpoint (`/mcp` + `/sse`), and the tool
//! implementations. Exposed as a library so integration tests can build
//! the router against mock providers.

pub mod http;
pub mod protocol;
pub mod server;
pub mod state;
pub mod tools;

pub use state::AppState;
