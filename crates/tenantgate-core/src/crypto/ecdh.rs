//! Ephemeral X25519 key exchange.
//!
//! Both sides of the bootstrap handshake generate a single-use key pair,
//! exchange public keys, and run the raw Diffie-Hellman output through
//! HKDF-SHA512. The HKDF info binds the transcript in a fixed role order
//! (client public key, then server public key), so the two honest parties
//! agree on the secret while a party that claims the wrong role for its peer
//! derives a different one.

use std::fmt;

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha512;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::{Zeroize, Zeroizing};

/// Length of an X25519 public key, in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the derived shared secret, in bytes.
pub const SHARED_SECRET_LEN: usize = 64;

const DERIVATION_CONTEXT: &[u8] = b"tenantgate/bootstrap/v1";

/// Errors that can occur during key exchange.
#[derive(Debug, Error)]
pub enum KeyExchangeError {
    #[error("peer public key must be {expected} bytes, got {actual}")]
    InvalidPublicKeyLength { expected: usize, actual: usize },

    #[error("peer public key produced a non-contributory shared secret")]
    NonContributory,

    #[error("shared secret expansion failed")]
    Derivation,
}

/// Role of the peer whose public key is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerType {
    Client,
    Server,
}

/// Single-use X25519 key pair.
///
/// The private half is consumed by [`derive_shared_secret`] and wiped on drop.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public half, safe to send to the peer.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public.to_bytes()
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// The peer's public key, tagged with the role the peer plays.
#[derive(Debug, Clone, Copy)]
pub struct PeerPublicKey<'a> {
    pub public_key: &'a [u8],
    pub peer_type: PeerType,
}

/// Output of the key exchange. Wiped on drop.
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_LEN]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Derive the shared secret from our ephemeral key pair and the peer's
/// public key.
pub fn derive_shared_secret(
    ours: EphemeralKeyPair,
    peer: PeerPublicKey<'_>,
) -> Result<SharedSecret, KeyExchangeError> {
    let theirs: [u8; PUBLIC_KEY_LEN] =
        peer.public_key
            .try_into()
            .map_err(|_| KeyExchangeError::InvalidPublicKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: peer.public_key.len(),
            })?;
    let theirs = PublicKey::from(theirs);
    let our_public = ours.public;

    let dh = ours.secret.diffie_hellman(&theirs);
    if !dh.was_contributory() {
        return Err(KeyExchangeError::NonContributory);
    }

    let (client_pub, server_pub) = match peer.peer_type {
        PeerType::Client => (theirs.as_bytes(), our_public.as_bytes()),
        PeerType::Server => (our_public.as_bytes(), theirs.as_bytes()),
    };

    let mut info = Vec::with_capacity(DERIVATION_CONTEXT.len() + 2 * PUBLIC_KEY_LEN);
    info.extend_from_slice(DERIVATION_CONTEXT);
    info.extend_from_slice(client_pub);
    info.extend_from_slice(server_pub);

    expand_secret(dh.as_bytes(), &info)
}

/// HKDF-SHA512 with no salt. The extracted PRK is wiped before returning.
fn expand_secret(ikm: &[u8], info: &[u8]) -> Result<SharedSecret, KeyExchangeError> {
    let (mut prk, hk) = Hkdf::<Sha512>::extract(None, ikm);
    let mut okm = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    let expanded = hk.expand(info, &mut okm[..]);
    prk.as_mut_slice().zeroize();
    expanded.map_err(|_| KeyExchangeError::Derivation)?;

    Ok(SharedSecret(okm))
}
