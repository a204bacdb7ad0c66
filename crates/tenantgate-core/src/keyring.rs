//! Per-tenant keyring.
//!
//! A keyring is an append-only list of key sets. The bootstrap handshake seeds
//! it with one [`SharedKeys`] entry split from the key-exchange output; later
//! rotations append entries and never remove them.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::ecdh::{SharedSecret, SHARED_SECRET_LEN};
use crate::wire::b64;
use crate::CoreError;

/// Length of each symmetric key, in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric keys shared between one agent and the gateway.
///
/// `client_key` protects traffic sent by the agent, `tenant_key` traffic sent
/// by the gateway to the tenant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SharedKeys {
    #[serde(with = "b64")]
    client_key: Vec<u8>,

    #[serde(with = "b64")]
    tenant_key: Vec<u8>,
}

impl SharedKeys {
    /// Split a 64-byte shared secret into the client and tenant keys.
    pub fn from_secret(secret: &SharedSecret) -> Self {
        let bytes = secret.as_bytes();
        Self {
            client_key: bytes[..KEY_LEN].to_vec(),
            tenant_key: bytes[KEY_LEN..SHARED_SECRET_LEN].to_vec(),
        }
    }

    /// Key used for agent-originated traffic.
    pub fn client_key(&self) -> &[u8] {
        &self.client_key
    }

    /// Key used for gateway-originated traffic.
    pub fn tenant_key(&self) -> &[u8] {
        &self.tenant_key
    }

    /// Stable, non-secret identifier of this key set.
    pub fn key_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"tenantgate-key-id");
        hasher.update(&self.client_key);
        hasher.update(&self.tenant_key);
        hex::encode(&hasher.finalize()[..8])
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.client_key.len() != KEY_LEN || self.tenant_key.len() != KEY_LEN {
            return Err(CoreError::InvalidKeyring(format!(
                "shared keys must be {} bytes each",
                KEY_LEN
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for SharedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeys")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Append-only container of a tenant's shared keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyring {
    shared_keys: Vec<SharedKeys>,
}

impl Keyring {
    /// Create a keyring from one or more key sets.
    pub fn new(keys: impl IntoIterator<Item = SharedKeys>) -> Self {
        let mut keyring = Self::default();
        for key in keys {
            keyring.push(key);
        }
        keyring
    }

    /// Append a key set. Returns false if a key set with the same ID is
    /// already present.
    pub fn push(&mut self, keys: SharedKeys) -> bool {
        let key_id = keys.key_id();
        if self.shared_keys.iter().any(|k| k.key_id() == key_id) {
            return false;
        }
        self.shared_keys.push(keys);
        true
    }

    /// All key sets, oldest first.
    pub fn shared_keys(&self) -> &[SharedKeys] {
        &self.shared_keys
    }

    /// Look up a key set by its ID.
    pub fn get(&self, key_id: &str) -> Option<&SharedKeys> {
        self.shared_keys.iter().find(|k| k.key_id() == key_id)
    }

    pub fn len(&self) -> usize {
        self.shared_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared_keys.is_empty()
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Parse the JSON form, validating key lengths.
    pub fn from_json(data: &[u8]) -> Result<Self, CoreError> {
        let keyring: Self =
            serde_json::from_slice(data).map_err(|e| CoreError::InvalidKeyring(e.to_string()))?;
        for keys in &keyring.shared_keys {
            keys.validate()?;
        }
        Ok(keyring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(fill: u8) -> SharedSecret {
        SharedSecret::from_bytes([fill; SHARED_SECRET_LEN])
    }

    #[test]
    fn test_shared_keys_split() {
        let mut bytes = [0u8; SHARED_SECRET_LEN];
        bytes[KEY_LEN..].fill(1);
        let keys = SharedKeys::from_secret(&SharedSecret::from_bytes(bytes));

        assert_eq!(keys.client_key(), &[0u8; KEY_LEN]);
        assert_eq!(keys.tenant_key(), &[1u8; KEY_LEN]);
    }

    #[test]
    fn test_keyring_is_append_only() {
        let mut keyring = Keyring::new([SharedKeys::from_secret(&secret(1))]);
        assert_eq!(keyring.len(), 1);

        assert!(keyring.push(SharedKeys::from_secret(&secret(2))));
        assert!(!keyring.push(SharedKeys::from_secret(&secret(1))));
        assert_eq!(keyring.len(), 2);

        let first = SharedKeys::from_secret(&secret(1));
        assert_eq!(keyring.shared_keys()[0], first);
        assert!(keyring.get(&first.key_id()).is_some());
    }

    #[test]
    fn test_keyring_json() {
        let keyring = Keyring::new([SharedKeys::from_secret(&secret(7))]);
        let json = keyring.to_json().unwrap();
        assert_eq!(Keyring::from_json(&json).unwrap(), keyring);
    }

    #[test]
    fn test_keyring_rejects_short_keys() {
        let json = br#"{"shared_keys":[{"client_key":"AQID","tenant_key":"AQID"}]}"#;
        assert!(matches!(
            Keyring::from_json(json),
            Err(CoreError::InvalidKeyring(_))
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let keys = SharedKeys::from_secret(&secret(9));
        let debug = format!("{:?}", keys);
        assert!(debug.contains(&keys.key_id()));
        assert!(!debug.contains("client_key"));
    }
}
