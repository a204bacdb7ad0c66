//! Core domain errors.

use thiserror::Error;

/// Core domain errors for TenantGate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid client identifier.
    #[error("Invalid client ID: {0}")]
    InvalidClientId(String),

    /// Malformed bootstrap token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Malformed keyring.
    #[error("Invalid keyring: {0}")]
    InvalidKeyring(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
