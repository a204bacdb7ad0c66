//! Token and tenant storage.
//!
//! The coordinator only talks to these traits. Backends are expected to be
//! thread-safe (`Send + Sync`) and to make [`TenantStore::create_tenant`] a
//! single conditional write of the tenant together with its first keyring: of
//! N concurrent creates for the same client ID, exactly one succeeds and the
//! rest get [`StoreError::AlreadyExists`]. A failed create leaves nothing.

mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use tenantgate_core::{BootstrapToken, ClientId, Keyring};

pub use memory::{MemoryKeyringStore, MemoryTenantStore, MemoryTokenStore};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Registry of bootstrap tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Register a token. Fails with `AlreadyExists` if the ID is taken.
    async fn create_token(&self, token: BootstrapToken) -> Result<(), StoreError>;

    /// All tokens that are currently accepted (not expired).
    async fn list_active_tokens(&self) -> Result<Vec<BootstrapToken>, StoreError>;

    /// Check whether an active token with the given hex ID exists.
    async fn token_exists(&self, hex_id: &str) -> Result<bool, StoreError>;
}

/// Registry of tenants.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Check whether a tenant exists. Advisory only; see [`create_tenant`](Self::create_tenant).
    async fn tenant_exists(&self, client_id: &ClientId) -> Result<bool, StoreError>;

    /// Create a tenant seeded with `keyring` if and only if it does not exist
    /// yet. The tenant and its keyring become visible together or not at all.
    ///
    /// Must fail with `AlreadyExists` instead of overwriting.
    async fn create_tenant(&self, client_id: &ClientId, keyring: &Keyring)
        -> Result<(), StoreError>;

    /// Handle to the keyring of an existing tenant.
    async fn keyring_store(
        &self,
        client_id: &ClientId,
    ) -> Result<Arc<dyn KeyringStore>, StoreError>;
}

/// Keyring storage scoped to one tenant.
#[async_trait]
pub trait KeyringStore: Send + Sync {
    /// Replace the stored keyring. Readers see either the old or the new
    /// keyring in full, never a mix.
    async fn put(&self, keyring: &Keyring) -> Result<(), StoreError>;

    /// Read the stored keyring.
    async fn get(&self) -> Result<Keyring, StoreError>;
}

/// Run a store operation with a deadline.
///
/// Dropping the inner future on expiry is safe for every operation above:
/// each one is a single atomic write or a read.
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}
