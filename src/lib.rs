//! freecad-mcp: MCP server that lets AI assistants drive a running FreeCAD
//!
//! FreeCAD runs an addon serving XML-RPC on `localhost:9875`. This crate sits
//! between an MCP client on stdio and that endpoint: it publishes modelling
//! and sketching tools, forwards each call to FreeCAD, and attaches a
//! screenshot of the active view to the result when one can be taken.
//!
//! # Modules
//!
//! - [`config`]: configuration loading and validation
//! - [`error`]: configuration errors
//! - [`freecad`]: XML-RPC codec, client and session lifecycle
//! - [`feedback`]: screenshot guard and result assembly
//! - [`mcp`]: MCP protocol, server and tool handlers

pub mod config;
pub mod error;
pub mod feedback;
pub mod freecad;
pub mod mcp;
