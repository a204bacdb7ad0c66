//! Bootstrap trust establishment.
//!
//! A new agent joins in two phases:
//!
//! 1. **Join** (`GET /bootstrap/join`, no credentials): the gateway returns a
//!    detached signature over the secret of every active token, keyed by token
//!    ID. An agent holding a token checks the signature for its token ID
//!    against the pinned gateway identity key before going further.
//! 2. **Auth** (`POST /bootstrap/auth`, `Authorization: Bearer <assertion>`):
//!    the assertion is a JWS over the token JSON, verified against the gateway
//!    identity key. On success the gateway creates the tenant, runs an
//!    ephemeral X25519 exchange with the agent's public key, stores the
//!    derived keyring, and returns its own ephemeral public key.
//!
//! Tenant uniqueness rests on the store's atomic create; the existence check
//! before it only saves work.

mod coordinator;
mod error;

pub use coordinator::BootstrapCoordinator;
pub use error::BootstrapError;
