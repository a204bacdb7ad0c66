//! Agent-side client for the TenantGate bootstrap handshake.
//!
//! Verifies that the gateway knows the agent's bootstrap token, registers the
//! agent as a tenant and derives the tenant keyring locally.

pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::{BootstrapClient, JoinVerification};
