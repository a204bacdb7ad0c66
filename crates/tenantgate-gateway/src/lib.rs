//! TenantGate Gateway Library
//!
//! This crate provides the gateway side of the bootstrap handshake:
//! token and tenant storage, the Join/Auth coordinator, and the HTTP surface.

pub mod bootstrap;
pub mod config;
pub mod http;
pub mod state;
pub mod storage;

pub use bootstrap::{BootstrapCoordinator, BootstrapError};
pub use config::{Config, ConfigError};
pub use state::AppState;
