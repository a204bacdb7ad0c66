//! Error types for the agent client.

use thiserror::Error;

use tenantgate_core::crypto::{KeyExchangeError, SignatureError};

/// Errors that can occur while bootstrapping against a gateway.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The gateway did not sign the agent's token.
    #[error("gateway does not know token {0}")]
    UnknownToken(String),

    /// The gateway's signature over the token did not verify.
    #[error("gateway signature rejected: {0}")]
    Verification(#[from] SignatureError),

    /// Key exchange with the gateway's ephemeral key failed.
    #[error("key exchange failed: {0}")]
    KeyExchange(#[from] KeyExchangeError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// HTTP status returned by the gateway, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
