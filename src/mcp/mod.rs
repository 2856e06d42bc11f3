//! Model Context Protocol server over stdio.
//!
//! ```text
//!   stdin ──▶ transport ──▶ server ──▶ tools ──▶ freecad (XML-RPC)
//!                              │          │
//!   stdout ◀── transport ◀─────┘          └──▶ feedback (screenshots)
//! ```
//!
//! The server handles the JSON-RPC lifecycle and protocol errors. Tool
//! handlers never fail at the protocol level: everything that goes wrong
//! inside them is reported to the model as result content.
//!
//! Targets MCP protocol version 2024-11-05.

pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use tools::ToolDispatcher;
pub use transport::StdioTransport;
