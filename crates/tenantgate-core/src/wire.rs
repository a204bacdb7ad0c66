//! Bootstrap request and response types.
//!
//! Byte fields travel as standard base64 strings in JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ClientId;

// ============================================================================
// Join
// ============================================================================

/// Response body for the join endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapJoinResponse {
    /// Detached signature (JWS compact form) over each active token's secret,
    /// keyed by the token's hex ID.
    #[serde(with = "b64::map")]
    pub signatures: BTreeMap<String, Vec<u8>>,
}

// ============================================================================
// Auth
// ============================================================================

/// Request body for the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAuthRequest {
    /// Tenant identifier the client wants to register.
    pub client_id: ClientId,

    /// Client's ephemeral X25519 public key.
    #[serde(with = "b64")]
    pub client_pub_key: Vec<u8>,
}

/// Response body for the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAuthResponse {
    /// Server's ephemeral X25519 public key.
    #[serde(with = "b64")]
    pub server_pub_key: Vec<u8>,
}

/// Serde adapter encoding `Vec<u8>` as standard base64.
pub mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(D::Error::custom)
    }

    /// Same encoding applied to the values of a string-keyed map.
    pub mod map {
        use std::collections::BTreeMap;

        use base64::{engine::general_purpose::STANDARD, Engine};
        use serde::{de::Error, ser::SerializeMap, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            map: &BTreeMap<String, Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut out = serializer.serialize_map(Some(map.len()))?;
            for (k, v) in map {
                out.serialize_entry(k, &STANDARD.encode(v))?;
            }
            out.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
            let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
            raw.into_iter()
                .map(|(k, v)| {
                    STANDARD
                        .decode(v.as_bytes())
                        .map(|bytes| (k, bytes))
                        .map_err(D::Error::custom)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_request_wire_format() {
        let req: BootstrapAuthRequest =
            serde_json::from_str(r#"{"client_id":"agent-1","client_pub_key":"AQID"}"#).unwrap();
        assert_eq!(req.client_id.as_str(), "agent-1");
        assert_eq!(req.client_pub_key, vec![1, 2, 3]);
    }

    #[test]
    fn test_auth_request_rejects_bad_base64() {
        let result = serde_json::from_str::<BootstrapAuthRequest>(
            r#"{"client_id":"agent-1","client_pub_key":"not base64!"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_join_response_encodes_signature_values() {
        let mut signatures = BTreeMap::new();
        signatures.insert("ab12".to_string(), b"sig".to_vec());
        let json = serde_json::to_value(BootstrapJoinResponse { signatures }).unwrap();
        assert_eq!(json["signatures"]["ab12"], "c2ln");
    }
}
