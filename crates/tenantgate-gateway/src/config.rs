//! Gateway configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use tenantgate_core::crypto::{IdentityKey, SignatureError};
use tenantgate_core::BootstrapToken;

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid identity key in '{path}': {source}")]
    InvalidIdentity {
        path: PathBuf,
        #[source]
        source: SignatureError,
    },

    #[error("invalid token file '{path}': {message}")]
    InvalidTokens { path: PathBuf, message: String },
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// PKCS#8 PEM file holding the Ed25519 identity key.
    pub identity_key_path: Option<PathBuf>,

    /// JSON array of bootstrap tokens loaded at startup.
    pub token_file: Option<PathBuf>,

    /// Mount the bootstrap routes.
    pub bootstrap_enabled: bool,

    /// Deadline for each storage call.
    pub store_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "[::1]:8443".to_string(),
            identity_key_path: None,
            token_file: None,
            bootstrap_enabled: true,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load the identity key, or generate an ephemeral one if no key file is
    /// configured. A configured file that cannot be read is an error.
    pub fn load_identity(&self) -> Result<IdentityKey, ConfigError> {
        let Some(path) = self.identity_key_path.as_deref() else {
            warn!("No identity key configured, generating an ephemeral identity");
            return Ok(IdentityKey::generate());
        };

        let pem = read(path)?;
        let identity =
            IdentityKey::from_pkcs8_pem(&pem).map_err(|source| ConfigError::InvalidIdentity {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "Identity key loaded");
        Ok(identity)
    }

    /// Load the bootstrap tokens. No token file means no tokens.
    pub fn load_tokens(&self) -> Result<Vec<BootstrapToken>, ConfigError> {
        match self.token_file.as_deref() {
            Some(path) => load_token_file(path),
            None => Ok(Vec::new()),
        }
    }
}

/// Parse a token file: a JSON array of tokens. A missing file is empty.
pub fn load_token_file(path: &Path) -> Result<Vec<BootstrapToken>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = read(path)?;
    let tokens: Vec<BootstrapToken> =
        serde_json::from_str(&data).map_err(|e| ConfigError::InvalidTokens {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if let Some(bad) = tokens
        .iter()
        .position(|t| t.id().is_empty() || t.secret().is_empty())
    {
        return Err(ConfigError::InvalidTokens {
            path: path.to_path_buf(),
            message: format!("token at index {} has an empty id or secret", bad),
        });
    }

    Ok(tokens)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
