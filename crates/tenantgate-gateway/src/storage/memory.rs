//! In-memory stores.
//!
//! Used by the gateway binary when no external backend is configured, and by
//! tests. All maps sit behind a `tokio::sync::RwLock`; tenant creation checks
//! and inserts the tenant with its keyring under a single write guard.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tenantgate_core::{BootstrapToken, ClientId, Keyring};

use super::{KeyringStore, StoreError, TenantStore, TokenStore};

/// Bootstrap tokens indexed by hex ID.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, BootstrapToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored tokens, including expired ones.
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_token(&self, token: BootstrapToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        match tokens.entry(token.hex_id()) {
            Entry::Occupied(e) => Err(StoreError::AlreadyExists(format!("token {}", e.key()))),
            Entry::Vacant(e) => {
                e.insert(token);
                Ok(())
            }
        }
    }

    async fn list_active_tokens(&self) -> Result<Vec<BootstrapToken>, StoreError> {
        let now = Utc::now();
        let tokens = self.tokens.read().await;
        let mut active: Vec<BootstrapToken> = tokens
            .values()
            .filter(|t| !t.is_expired(now))
            .cloned()
            .collect();
        active.sort_by_key(|t| t.hex_id());
        Ok(active)
    }

    async fn token_exists(&self, hex_id: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        let tokens = self.tokens.read().await;
        Ok(tokens.get(hex_id).map(|t| !t.is_expired(now)).unwrap_or(false))
    }
}

/// Tenants and their keyrings.
type TenantMap = Arc<RwLock<HashMap<ClientId, Keyring>>>;

/// Tenants indexed by client ID.
#[derive(Default)]
pub struct MemoryTenantStore {
    tenants: TenantMap,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of tenants.
    pub async fn tenant_count(&self) -> usize {
        self.tenants.read().await.len()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn tenant_exists(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        Ok(self.tenants.read().await.contains_key(client_id))
    }

    async fn create_tenant(
        &self,
        client_id: &ClientId,
        keyring: &Keyring,
    ) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        match tenants.entry(client_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(format!("tenant {}", client_id))),
            Entry::Vacant(e) => {
                e.insert(keyring.clone());
                Ok(())
            }
        }
    }

    async fn keyring_store(
        &self,
        client_id: &ClientId,
    ) -> Result<Arc<dyn KeyringStore>, StoreError> {
        if !self.tenants.read().await.contains_key(client_id) {
            return Err(StoreError::NotFound(format!("tenant {}", client_id)));
        }
        Ok(Arc::new(MemoryKeyringStore {
            client_id: client_id.clone(),
            tenants: Arc::clone(&self.tenants),
        }))
    }
}

/// Keyring handle for one tenant of a [`MemoryTenantStore`].
pub struct MemoryKeyringStore {
    client_id: ClientId,
    tenants: TenantMap,
}

#[async_trait]
impl KeyringStore for MemoryKeyringStore {
    async fn put(&self, keyring: &Keyring) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        let slot = tenants
            .get_mut(&self.client_id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", self.client_id)))?;
        *slot = keyring.clone();
        Ok(())
    }

    async fn get(&self) -> Result<Keyring, StoreError> {
        let tenants = self.tenants.read().await;
        tenants
            .get(&self.client_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", self.client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use tenantgate_core::crypto::{derive_shared_secret, EphemeralKeyPair, PeerPublicKey, PeerType};
    use tenantgate_core::SharedKeys;

    fn client(id: &str) -> ClientId {
        ClientId::parse(id).unwrap()
    }

    fn keyring() -> Keyring {
        let server = EphemeralKeyPair::generate().public_key();
        let secret = derive_shared_secret(
            EphemeralKeyPair::generate(),
            PeerPublicKey {
                public_key: &server,
                peer_type: PeerType::Server,
            },
        )
        .unwrap();
        Keyring::new([SharedKeys::from_secret(&secret)])
    }

    #[tokio::test]
    async fn test_token_store_filters_expired() {
        let store = MemoryTokenStore::new();
        let active = BootstrapToken::generate().with_ttl(Duration::hours(1)).unwrap();
        let expired = BootstrapToken::generate().with_expiry(Utc::now() - Duration::seconds(1));
        let active_id = active.hex_id();
        let expired_id = expired.hex_id();

        store.create_token(active).await.unwrap();
        store.create_token(expired).await.unwrap();

        let listed = store.list_active_tokens().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].hex_id(), active_id);

        assert!(store.token_exists(&active_id).await.unwrap());
        assert!(!store.token_exists(&expired_id).await.unwrap());
        assert!(!store.token_exists("ffff").await.unwrap());
        assert_eq!(store.token_count().await, 2);
    }

    #[tokio::test]
    async fn test_token_store_rejects_duplicate_id() {
        let store = MemoryTokenStore::new();
        let token = BootstrapToken::new(vec![0xab, 0x12], b"tok-123".to_vec()).unwrap();

        store.create_token(token.clone()).await.unwrap();
        assert!(matches!(
            store.create_token(token).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_create_tenant_is_create_if_absent() {
        let store = MemoryTenantStore::new();
        let id = client("agent-1");

        assert!(!store.tenant_exists(&id).await.unwrap());
        store.create_tenant(&id, &Keyring::default()).await.unwrap();
        assert!(store.tenant_exists(&id).await.unwrap());
        assert!(matches!(
            store.create_tenant(&id, &Keyring::default()).await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.tenant_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_create_tenant_single_winner() {
        let store = Arc::new(MemoryTenantStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_tenant(&client("agent-race"), &Keyring::default())
                    .await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(StoreError::AlreadyExists(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn test_keyring_store_requires_tenant() {
        let store = MemoryTenantStore::new();
        assert!(matches!(
            store.keyring_store(&client("missing")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_created_tenant_has_keyring() {
        let store = MemoryTenantStore::new();
        let id = client("agent-1");
        let keyring = keyring();
        store.create_tenant(&id, &keyring).await.unwrap();

        let keyrings = store.keyring_store(&id).await.unwrap();
        assert_eq!(keyrings.get().await.unwrap(), keyring);
    }

    #[tokio::test]
    async fn test_losing_create_keeps_first_keyring() {
        let store = MemoryTenantStore::new();
        let id = client("agent-1");
        let first = keyring();
        let second = keyring();

        store.create_tenant(&id, &first).await.unwrap();
        assert!(store.create_tenant(&id, &second).await.is_err());

        let keyrings = store.keyring_store(&id).await.unwrap();
        assert_eq!(keyrings.get().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_keyring_put_replaces() {
        let store = MemoryTenantStore::new();
        let id = client("agent-1");
        store.create_tenant(&id, &Keyring::default()).await.unwrap();

        let keyrings = store.keyring_store(&id).await.unwrap();
        let keyring = keyring();
        keyrings.put(&keyring).await.unwrap();
        assert_eq!(keyrings.get().await.unwrap(), keyring);
    }
}
