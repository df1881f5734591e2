//! Fantasy league tools exposed over the MCP protocol
//!
//! Provides the tool catalog, argument validation and the calls into the league data provider

pub mod tools;
pub mod utils;
