//! Newtype wrappers for identifiers to ensure type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Maximum length of a client identifier, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 128;

/// Identifier a client requests for its tenant during bootstrap.
///
/// Client IDs are chosen by the agent, so they are validated on the way in:
/// non-empty, at most [`MAX_CLIENT_ID_LEN`] bytes, no whitespace or control
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Validate and wrap a client ID.
    pub fn parse(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidClientId("client ID cannot be empty".into()));
        }
        if id.len() > MAX_CLIENT_ID_LEN {
            return Err(CoreError::InvalidClientId(format!(
                "client ID exceeds {} bytes",
                MAX_CLIENT_ID_LEN
            )));
        }
        if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(CoreError::InvalidClientId(
                "client ID contains whitespace or control characters".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ClientId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ClientId {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_parse() {
        let id = ClientId::parse("agent-1").unwrap();
        assert_eq!(id.as_str(), "agent-1");
        assert_eq!(format!("{}", id), "agent-1");
    }

    #[test]
    fn test_client_id_rejects_empty() {
        assert!(matches!(
            ClientId::parse(""),
            Err(CoreError::InvalidClientId(_))
        ));
    }

    #[test]
    fn test_client_id_rejects_whitespace_and_control() {
        assert!(ClientId::parse("agent 1").is_err());
        assert!(ClientId::parse("agent\n1").is_err());
        assert!(ClientId::parse("agent\u{0}").is_err());
    }

    #[test]
    fn test_client_id_rejects_oversized() {
        let long = "a".repeat(MAX_CLIENT_ID_LEN + 1);
        assert!(ClientId::parse(long).is_err());
        assert!(ClientId::parse("a".repeat(MAX_CLIENT_ID_LEN)).is_ok());
    }

    #[test]
    fn test_client_id_deserialize_validates() {
        let ok: ClientId = serde_json::from_str("\"agent-1\"").unwrap();
        assert_eq!(ok.as_str(), "agent-1");
        assert!(serde_json::from_str::<ClientId>("\"\"").is_err());
    }
}
