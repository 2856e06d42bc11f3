//! Error types for talking to FreeCAD.

use thiserror::Error;

/// Result type for remote FreeCAD calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised by a single XML-RPC round trip.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("XML-RPC endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not well-formed XML.
    #[error("Invalid XML in response: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The XML is well-formed but not a valid XML-RPC message.
    #[error("Malformed XML-RPC message: {message}")]
    Malformed {
        /// Description of what's wrong.
        message: String,
    },

    /// The remote method raised.
    #[error("FreeCAD fault {code}: {message}")]
    Fault {
        /// XML-RPC fault code.
        code: i64,
        /// Fault string reported by the remote side.
        message: String,
    },

    /// The response decoded but does not have the shape the method promises.
    #[error("Unexpected response from '{method}': {detail}")]
    UnexpectedResponse {
        /// Remote method name.
        method: String,
        /// Description of the mismatch.
        detail: String,
    },

    /// Base64 payload could not be decoded.
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl RpcError {
    /// Creates a malformed-message error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates an unexpected-response error.
    pub fn unexpected(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            method: method.into(),
            detail: detail.into(),
        }
    }
}

/// Errors raised while obtaining a live FreeCAD session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// FreeCAD did not answer the liveness check.
    #[error("Failed to connect to FreeCAD at {address}. Make sure the FreeCAD addon is running.")]
    Unreachable {
        /// Endpoint that was tried.
        address: String,
        /// Transport error, if the ping failed rather than returned false.
        #[source]
        source: Option<RpcError>,
    },

    /// The client itself could not be constructed.
    #[error("Failed to set up FreeCAD client: {0}")]
    Setup(#[source] RpcError),
}
