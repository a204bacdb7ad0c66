//! Join and Auth operations.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use tenantgate_core::crypto::{
    derive_shared_secret, verify_compact, EphemeralKeyPair, IdentityKey, PeerPublicKey, PeerType,
    SignatureError,
};
use tenantgate_core::{
    BootstrapAuthRequest, BootstrapAuthResponse, BootstrapJoinResponse, BootstrapToken, ClientId,
    Keyring, SharedKeys,
};

use super::BootstrapError;
use crate::storage::{with_timeout, StoreError, TenantStore, TokenStore};

/// Runs the bootstrap handshake against the token and tenant stores.
///
/// Stateless apart from the read-only identity key, so it is cheap to clone
/// and safe to share across requests.
#[derive(Clone)]
pub struct BootstrapCoordinator {
    identity: Arc<IdentityKey>,
    tokens: Arc<dyn TokenStore>,
    tenants: Arc<dyn TenantStore>,
    store_timeout: Duration,
}

impl BootstrapCoordinator {
    /// Create a coordinator.
    pub fn new(
        identity: Arc<IdentityKey>,
        tokens: Arc<dyn TokenStore>,
        tenants: Arc<dyn TenantStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            tokens,
            tenants,
            store_timeout,
        }
    }

    /// The gateway identity key.
    pub fn identity(&self) -> &IdentityKey {
        &self.identity
    }

    /// Sign every active token's secret so the caller can check which one the
    /// gateway knows, without any secret leaving the gateway.
    ///
    /// Must be called without credentials.
    pub async fn join(
        &self,
        authorization: Option<&str>,
    ) -> Result<BootstrapJoinResponse, BootstrapError> {
        // HTTP strips surrounding whitespace from header values, so a blank
        // Authorization header is indistinguishable from an absent one.
        if authorization.map(|h| !h.trim().is_empty()).unwrap_or(false) {
            debug!("Join called with credentials");
            return Err(BootstrapError::ProtocolViolation);
        }

        let tokens = with_timeout(self.store_timeout, self.tokens.list_active_tokens())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list bootstrap tokens");
                BootstrapError::store("listing tokens", e)
            })?;

        if tokens.is_empty() {
            return Err(BootstrapError::BootstrapDisabled);
        }

        let signatures = tokens
            .iter()
            .map(|token| {
                let sig = self.identity.sign_detached(token.secret()).map_err(|e| {
                    error!(token_id = %token.hex_id(), error = %e, "Failed to sign bootstrap token");
                    BootstrapError::Internal(format!("signing token: {}", e))
                })?;
                Ok((token.hex_id(), sig.into_bytes()))
            })
            .collect::<Result<_, BootstrapError>>()?;

        debug!(count = tokens.len(), "Signed active bootstrap tokens");
        Ok(BootstrapJoinResponse { signatures })
    }

    /// Authenticate the bearer assertion, create the tenant and return the
    /// server's ephemeral public key.
    ///
    /// Not idempotent: a replay after success fails with `Conflict`.
    pub async fn auth(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<BootstrapAuthResponse, BootstrapError> {
        let assertion = bearer_credential(authorization)?;

        // Only the identity key could have signed the payload, so a verified
        // payload that is not a token means the signer produced a bad token.
        let token: BootstrapToken = verify_compact(&self.identity.public_key(), assertion)
            .map_err(|e| match e {
                SignatureError::InvalidPayload(e) => invalid_token(e),
                e => {
                    debug!(error = %e, "Bootstrap assertion rejected");
                    BootstrapError::Unauthenticated
                }
            })?;
        token.validate().map_err(|e| invalid_token(e.to_string()))?;
        let token_id = token.hex_id();

        let known = with_timeout(self.store_timeout, self.tokens.token_exists(&token_id))
            .await
            .map_err(|e| {
                error!(token_id = %token_id, error = %e, "Failed to look up bootstrap token");
                BootstrapError::store("looking up token", e)
            })?;
        if !known {
            debug!(token_id = %token_id, "Unknown or expired bootstrap token");
            return Err(BootstrapError::Unauthenticated);
        }

        let request: BootstrapAuthRequest = serde_json::from_slice(body).map_err(|e| {
            debug!(error = %e, "Malformed auth request body");
            BootstrapError::BadRequest(e.to_string())
        })?;
        let client_id = request.client_id;

        // Fast path only. create_tenant below is the authoritative check.
        let exists = with_timeout(self.store_timeout, self.tenants.tenant_exists(&client_id))
            .await
            .map_err(|e| {
                error!(client_id = %client_id, error = %e, "Failed to check tenant");
                BootstrapError::store("checking tenant", e)
            })?;
        if exists {
            info!(client_id = %client_id, "Client ID already in use");
            return Err(BootstrapError::Conflict);
        }

        let ephemeral = EphemeralKeyPair::generate();
        let server_pub_key = ephemeral.public_key();
        let shared_secret = derive_shared_secret(
            ephemeral,
            PeerPublicKey {
                public_key: &request.client_pub_key,
                peer_type: PeerType::Client,
            },
        )
        .map_err(|e| {
            error!(client_id = %client_id, error = %e, "Key exchange failed");
            BootstrapError::Internal(format!("key exchange: {}", e))
        })?;
        let keyring = Keyring::new([SharedKeys::from_secret(&shared_secret)]);
        drop(shared_secret);

        // Commit on a separate task so a dropped request cannot abandon the
        // write after the store accepted it.
        let commit = tokio::spawn(commit_tenant(
            Arc::clone(&self.tenants),
            self.store_timeout,
            client_id.clone(),
            keyring,
        ));
        match commit.await {
            Ok(result) => result?,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "Tenant commit task failed");
                return Err(BootstrapError::Internal(format!("commit task: {}", e)));
            }
        }

        info!(client_id = %client_id, token_id = %token_id, "Tenant bootstrapped");
        Ok(BootstrapAuthResponse {
            server_pub_key: server_pub_key.to_vec(),
        })
    }
}

fn invalid_token(reason: String) -> BootstrapError {
    error!(error = %reason, "BUG: verified bootstrap assertion carries a malformed token");
    BootstrapError::InvariantViolation(format!("verified payload is not a token: {}", reason))
}

/// Extract the credential from an `Authorization: Bearer <credential>` value.
fn bearer_credential(authorization: Option<&str>) -> Result<&str, BootstrapError> {
    let value = authorization
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BootstrapError::Unauthenticated)?;

    let (scheme, credential) = value
        .split_once(' ')
        .ok_or(BootstrapError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BootstrapError::Unauthenticated);
    }

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(BootstrapError::Unauthenticated);
    }
    Ok(credential)
}

async fn commit_tenant(
    tenants: Arc<dyn TenantStore>,
    timeout: Duration,
    client_id: ClientId,
    keyring: Keyring,
) -> Result<(), BootstrapError> {
    match with_timeout(timeout, tenants.create_tenant(&client_id, &keyring)).await {
        Ok(()) => Ok(()),
        Err(StoreError::AlreadyExists(_)) => {
            info!(client_id = %client_id, "Lost tenant creation race");
            Err(BootstrapError::Conflict)
        }
        Err(e) => {
            error!(client_id = %client_id, error = %e, "Failed to create tenant");
            Err(BootstrapError::store("creating tenant", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_credential() {
        assert_eq!(bearer_credential(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_credential(Some("bearer  abc ")).unwrap(), "abc");
        assert_eq!(bearer_credential(Some("  BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_credential_rejects() {
        let values = [
            None,
            Some(""),
            Some("   "),
            Some("Bearer"),
            Some("Bearer   "),
            Some("Basic abc"),
            Some("abc"),
        ];
        for value in values {
            assert!(
                matches!(bearer_credential(value), Err(BootstrapError::Unauthenticated)),
                "accepted {:?}",
                value
            );
        }
    }
}
