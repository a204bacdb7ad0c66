//! HTTP client for the gateway's bootstrap endpoints.

use reqwest::header::AUTHORIZATION;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use tenantgate_core::crypto::{
    derive_shared_secret, verify_detached, EphemeralKeyPair, PeerPublicKey, PeerType,
    VerifyingKey,
};
use tenantgate_core::{
    BootstrapAuthRequest, BootstrapAuthResponse, BootstrapJoinResponse, BootstrapToken, ClientId,
    Keyring, SharedKeys,
};

use crate::error::ClientError;

/// How the gateway's Join answer was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinVerification {
    /// The signature verified against the pinned identity key.
    Pinned,
    /// No key was pinned; only the presence of a signature was checked.
    Unpinned,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for one gateway.
pub struct BootstrapClient {
    inner: reqwest::Client,
    base_url: String,
}

impl BootstrapClient {
    /// Create a new client for the gateway at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Gateway base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the gateway is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let url = format!("{}/health", self.base_url);
        debug!(url = %url, "Checking health");

        let response = self.inner.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Ask the gateway to prove it knows `token`.
    ///
    /// With a pinned identity key the detached signature over the token
    /// secret must verify. Without one, any signature for the token's ID is
    /// accepted, which proves nothing about the gateway.
    pub async fn join(
        &self,
        token: &BootstrapToken,
        pinned: Option<&VerifyingKey>,
    ) -> Result<JoinVerification, ClientError> {
        let url = format!("{}/bootstrap/join", self.base_url);
        debug!(url = %url, "Join request");

        let response = self.inner.get(&url).send().await?;
        let join: BootstrapJoinResponse = decode(response).await?;

        let token_id = token.hex_id();
        let signature = join
            .signatures
            .get(&token_id)
            .ok_or_else(|| ClientError::UnknownToken(token_id.clone()))?;

        let Some(key) = pinned else {
            warn!(token_id = %token_id, "No gateway identity pinned, signature not verified");
            return Ok(JoinVerification::Unpinned);
        };

        let signature = std::str::from_utf8(signature)
            .map_err(|e| ClientError::Serialization(format!("signature is not UTF-8: {}", e)))?;
        verify_detached(key, signature, token.secret())?;

        info!(token_id = %token_id, "Gateway proved knowledge of token");
        Ok(JoinVerification::Pinned)
    }

    /// Register `client_id` using a signed token assertion and derive the
    /// tenant keyring.
    pub async fn auth(&self, assertion: &str, client_id: &ClientId) -> Result<Keyring, ClientError> {
        let url = format!("{}/bootstrap/auth", self.base_url);
        debug!(url = %url, client_id = %client_id, "Auth request");

        let ephemeral = EphemeralKeyPair::generate();
        let request = BootstrapAuthRequest {
            client_id: client_id.clone(),
            client_pub_key: ephemeral.public_key().to_vec(),
        };

        let response = self
            .inner
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", assertion))
            .json(&request)
            .send()
            .await?;
        let auth: BootstrapAuthResponse = decode(response).await?;

        let secret = derive_shared_secret(
            ephemeral,
            PeerPublicKey {
                public_key: &auth.server_pub_key,
                peer_type: PeerType::Server,
            },
        )?;
        let keyring = Keyring::new([SharedKeys::from_secret(&secret)]);

        info!(client_id = %client_id, "Tenant keyring derived");
        Ok(keyring)
    }

    /// Run Join then Auth.
    pub async fn bootstrap(
        &self,
        token: &BootstrapToken,
        assertion: &str,
        client_id: &ClientId,
        pinned: Option<&VerifyingKey>,
    ) -> Result<Keyring, ClientError> {
        self.join(token, pinned).await?;
        self.auth(assertion, client_id).await
    }
}

/// Decode a JSON success body, or turn an error status into `ClientError::Status`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = BootstrapClient::new("http://gateway.local:8443/");
        assert_eq!(client.base_url(), "http://gateway.local:8443");
    }

    #[test]
    fn test_error_status() {
        let err = ClientError::Status {
            status: 409,
            message: "client ID already in use".into(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(ClientError::UnknownToken("ab12".into()).status(), None);
    }
}
