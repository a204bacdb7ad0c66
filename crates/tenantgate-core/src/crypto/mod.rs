//! Cryptographic primitives for the bootstrap handshake.

pub mod ecdh;
mod signature;

pub use ecdh::{
    derive_shared_secret, EphemeralKeyPair, KeyExchangeError, PeerPublicKey, PeerType,
    SharedSecret,
};
pub use signature::{
    parse_public_key, verify_compact, verify_detached, IdentityKey, SignatureError,
};

// Re-export so callers do not need a direct ed25519-dalek dependency
pub use ed25519_dalek::VerifyingKey;
