//! HTTP transport layer for the Model Context Protocol
//!
//! Hosts the two session bindings: a duplex websocket at `/mcp` and an event
//! stream at `/sse` paired with POST submissions, plus metadata endpoints.

pub mod handlers;
pub mod sse;
pub mod websocket;
