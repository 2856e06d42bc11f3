//! Talking to a running FreeCAD instance.
//!
//! FreeCAD runs an addon that serves XML-RPC over HTTP. This module holds the
//! wire codec ([`xmlrpc`]), the typed client ([`RpcClient`]), the session seam
//! the tool handlers program against ([`CadSession`]) and the Python scripts
//! sent through `execute_code` ([`scripts`]).

pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod scripts;
pub mod session;
pub mod types;
pub mod xmlrpc;

pub use client::{endpoint_url, HttpConnector, RpcClient, DEFAULT_PORT};
pub use error::{ConnectionError, RpcError, RpcResult};
pub use session::{CadSession, Connector, SessionManager};
pub use types::{ObjectEdit, ObjectSpec, RemoteResult};
