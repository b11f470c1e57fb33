//! Error types for the Treasure Data client and MCP server.
//!
//! One taxonomy serves both front-ends: the CLI prints the `Display` form and
//! exits non-zero, while the MCP server maps each variant to a JSON-RPC code.

use serde::{Deserialize, Serialize};

/// Errors raised by the client, the archive inspector, and the MCP layer.
///
/// Absence of a whole entity (database, project) is modelled as `Ok(None)`
/// by the client, never as an error, so callers can branch on it.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum TdError {
    /// No API key could be resolved from parameters or environment.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The remote API rejected the call with a non-2xx status.
    #[error("API error: status {status}: {body}")]
    Api {
        /// HTTP status code returned by the remote.
        status: u16,
        /// Response body, verbatim, for diagnostics.
        body: String,
    },

    /// A response body did not match the expected schema.
    #[error("parse error: {0}")]
    Parse(String),

    /// Transport-level HTTP failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local I/O failure while staging or reading an archive.
    #[error("I/O error: {0}")]
    Io(String),

    /// A requested path does not exist inside an archive.
    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),

    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for TdError {
    fn from(err: reqwest::Error) -> Self {
        TdError::Http(err.to_string())
    }
}

impl From<std::io::Error> for TdError {
    fn from(err: std::io::Error) -> Self {
        TdError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TdError {
    fn from(err: serde_json::Error) -> Self {
        TdError::Protocol(format!("JSON error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl TdError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            TdError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            TdError::MissingArg(_) | TdError::InvalidArg { .. } => rpc_codes::INVALID_PARAMS,
            TdError::EntryNotFound(_) => rpc_codes::INVALID_PARAMS,
            TdError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for client and server operations.
pub type Result<T> = std::result::Result<T, TdError>;
