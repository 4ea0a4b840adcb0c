// src/utils/error.rs
use alloy_primitives::B256;
use serde_json;
use std::io;
use thiserror::Error;
use url;

/// Message fragments that mark an RPC or transport failure as transient.
///
/// `could not coalesce` is what JSON-RPC gateways report when a batched or
/// pooled upstream connection drops mid-request.
pub const TRANSIENT_SIGNATURES: &[&str] = &[
    "could not coalesce",
    "connection reset",
    "temporarily unavailable",
];

/// Main error type for the mining application
///
/// This enum represents all possible error conditions that can occur
/// during mining operations, including network, I/O, protocol, and
/// configuration errors.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Errors related to network connectivity
    #[error("Network connection error: {0}")]
    ConnectionError(String),

    /// Malformed or unexpected responses from the remote ledger
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// Error object returned by a JSON-RPC endpoint
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message as reported by the node
        message: String,
    },

    /// No receipt was observed within the confirmation window
    #[error("Transaction {0} was not confirmed in time")]
    ConfirmationTimeout(B256),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Transaction signing errors
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Async task or worker pool errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

impl MinerError {
    /// Returns true when the failure is worth retrying with the same payload.
    ///
    /// Connection-level failures and errors carrying one of the
    /// [`TRANSIENT_SIGNATURES`] are transient. On-chain rejections,
    /// confirmation timeouts and everything else are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            MinerError::ConnectionError(_) => true,
            MinerError::HttpError(e) if e.is_connect() || e.is_timeout() => true,
            MinerError::ConfirmationTimeout(_) => false,
            other => {
                let message = other.to_string().to_lowercase();
                TRANSIENT_SIGNATURES
                    .iter()
                    .any(|signature| message.contains(signature))
            }
        }
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when invalid hex data is encountered in RPC responses or
/// command line input.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts async task join errors into MinerError
///
/// A search round runs on a blocking task; a panic inside a worker
/// surfaces here.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}

/// Converts WebSocket errors into MinerError
///
/// Every WebSocket failure means the connection is gone; the transport
/// reconnects on the next request.
impl From<tungstenite::Error> for MinerError {
    fn from(e: tungstenite::Error) -> Self {
        MinerError::ConnectionError(format!("WebSocket error: {}", e))
    }
}

impl From<alloy_signer::Error> for MinerError {
    fn from(e: alloy_signer::Error) -> Self {
        MinerError::SigningError(e.to_string())
    }
}

/// Splits HTTP client failures: a failed connect is a [`MinerError::ConnectionError`],
/// anything else stays an [`MinerError::HttpError`]
pub fn from_http(e: reqwest::Error) -> MinerError {
    if e.is_connect() {
        MinerError::ConnectionError(e.to_string())
    } else {
        MinerError::HttpError(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for MinerError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        MinerError::TaskError(format!("Worker pool setup failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_failures_are_transient() {
        let err = MinerError::Rpc {
            code: -32603,
            message: "could not coalesce error (error={ \"code\": -32000 })".into(),
        };
        assert!(err.is_transient());

        let err = MinerError::ProtocolError("Could Not Coalesce response".into());
        assert!(err.is_transient());
    }

    #[test]
    fn connection_errors_are_transient() {
        assert!(MinerError::ConnectionError("socket closed".into()).is_transient());

        let ws: MinerError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(ws, MinerError::ConnectionError(_)));
        assert!(ws.is_transient());
    }

    #[test]
    fn malformed_json_is_permanent() {
        let err: MinerError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, MinerError::JsonError(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn rejections_and_reverts_are_permanent() {
        let err = MinerError::Rpc {
            code: 3,
            message: "execution reverted: invalid nonce".into(),
        };
        assert!(!err.is_transient());
        assert!(!MinerError::SigningError("bad key".into()).is_transient());
        assert!(!MinerError::ConfirmationTimeout(B256::ZERO).is_transient());
        assert!(!MinerError::ConfigError("bad".into()).is_transient());
    }
}
