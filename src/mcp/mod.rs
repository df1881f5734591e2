//! Model Context Protocol (MCP) envelopes and JSON-RPC dispatch
//!
//! Transport-agnostic: bindings hand parsed requests to the dispatcher and push its responses.

pub mod rpc;
pub mod server;
