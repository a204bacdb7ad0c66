//! TenantGate Core Domain Types
//!
//! This crate contains the domain types and cryptographic primitives shared by
//! the gateway and the agent, with no dependencies on:
//! - Network/HTTP
//! - Storage backends
//! - Runtime specifics
//!
//! The bootstrap handshake is built from three pieces defined here:
//! - [`crypto::IdentityKey`]: detached/attached Ed25519 signatures (JWS compact form)
//! - [`crypto::ecdh`]: ephemeral X25519 key exchange with role-tagged derivation
//! - [`keyring::Keyring`]: the per-tenant container of derived shared keys

pub mod crypto;
pub mod error;
pub mod ids;
pub mod keyring;
pub mod token;
pub mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::ClientId;
pub use keyring::{Keyring, SharedKeys};
pub use token::{BootstrapToken, TokenMetadata};
pub use wire::{BootstrapAuthRequest, BootstrapAuthResponse, BootstrapJoinResponse};
