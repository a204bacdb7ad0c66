//! Bootstrap token generation, encoding and parsing.
//!
//! A bootstrap token is a short-lived shared secret distributed out-of-band to
//! an agent. It has two parts:
//! - `id`: a short, non-secret identifier, shown as lowercase hex
//! - `secret`: the shared secret itself
//!
//! Tokens travel in two forms. Operators hand out the compact string
//! `"<hex id>.<hex secret>"`; the Auth assertion carries the JSON form.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::wire::b64;
use crate::CoreError;

/// Length of a generated token ID, in bytes.
pub const TOKEN_ID_LEN: usize = 6;

/// Length of a generated token secret, in bytes.
pub const TOKEN_SECRET_LEN: usize = 32;

/// Non-secret token metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// When the token stops being accepted. `None` means no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A bootstrap token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct BootstrapToken {
    #[serde(with = "b64")]
    id: Vec<u8>,

    #[serde(with = "b64")]
    secret: Vec<u8>,

    #[serde(default)]
    #[zeroize(skip)]
    metadata: TokenMetadata,
}

impl BootstrapToken {
    /// Create a token from explicit parts.
    pub fn new(id: Vec<u8>, secret: Vec<u8>) -> Result<Self, CoreError> {
        if id.is_empty() {
            return Err(CoreError::InvalidToken("token ID cannot be empty".into()));
        }
        if secret.is_empty() {
            return Err(CoreError::InvalidToken("token secret cannot be empty".into()));
        }
        Ok(Self {
            id,
            secret,
            metadata: TokenMetadata::default(),
        })
    }

    /// Generate a new random token with no expiry.
    pub fn generate() -> Self {
        let mut id = vec![0u8; TOKEN_ID_LEN];
        let mut secret = vec![0u8; TOKEN_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut id);
        rand::thread_rng().fill_bytes(&mut secret);

        Self {
            id,
            secret,
            metadata: TokenMetadata::default(),
        }
    }

    /// Build a token whose ID is derived from the secret.
    ///
    /// The ID is the first [`TOKEN_ID_LEN`] bytes of SHA-256(secret), so it can
    /// be published without revealing the secret.
    pub fn from_secret(secret: impl Into<Vec<u8>>) -> Result<Self, CoreError> {
        let secret = secret.into();
        let digest = Sha256::digest(&secret);
        Self::new(digest[..TOKEN_ID_LEN].to_vec(), secret)
    }

    /// Builder method to set the expiry.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.metadata.expires_at = Some(expires_at);
        self
    }

    /// Builder method to expire `ttl` from now.
    pub fn with_ttl(self, ttl: Duration) -> Result<Self, CoreError> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CoreError::InvalidToken(format!("token lifetime {} is out of range", ttl)))?;
        Ok(self.with_expiry(expires_at))
    }

    /// Raw token ID.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Token ID as lowercase hex.
    pub fn hex_id(&self) -> String {
        hex::encode(&self.id)
    }

    /// The shared secret.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Token metadata.
    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Check whether the token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata
            .expires_at
            .map(|expires_at| now >= expires_at)
            .unwrap_or(false)
    }

    /// Encode as `"<hex id>.<hex secret>"`.
    pub fn encode_hex(&self) -> String {
        format!("{}.{}", hex::encode(&self.id), hex::encode(&self.secret))
    }

    /// Parse the `"<hex id>.<hex secret>"` form.
    pub fn parse_hex(s: &str) -> Result<Self, CoreError> {
        let (id, secret) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| CoreError::InvalidToken("expected '<id>.<secret>'".into()))?;
        let id = hex::decode(id).map_err(|e| CoreError::InvalidToken(format!("bad ID: {}", e)))?;
        let secret = hex::decode(secret)
            .map_err(|e| CoreError::InvalidToken(format!("bad secret: {}", e)))?;
        Self::new(id, secret)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Parse the JSON form, rejecting empty IDs or secrets.
    pub fn parse_json(data: &[u8]) -> Result<Self, CoreError> {
        let token: Self =
            serde_json::from_slice(data).map_err(|e| CoreError::InvalidToken(e.to_string()))?;
        token.validate()?;
        Ok(token)
    }

    /// Check a deserialized token: ID and secret must be non-empty.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() || self.secret.is_empty() {
            return Err(CoreError::InvalidToken("token ID and secret are required".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for BootstrapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapToken")
            .field("id", &self.hex_id())
            .field("secret", &"<redacted>")
            .field("metadata", &self.metadata)
            .finish()
    }
}
