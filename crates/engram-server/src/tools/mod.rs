//! Tool Implementations
//!
//! Each tool module exposes `schema()` for tools/list and `execute()` for
//! tools/call. Execution returns the human-readable text block the
//! assistant receives; errors are strings the dispatcher maps to -32603.

pub mod fetch_chat;
pub mod search_memory;
