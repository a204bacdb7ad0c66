//! Ed25519 signatures in JWS compact form.
//!
//! The gateway's identity key signs two kinds of messages:
//! - token secrets, as *detached* JWS (`<header>..<signature>`) returned by Join
//! - token JSON, as *attached* JWS (`<header>.<payload>.<signature>`) carried
//!   as the Auth bearer assertion
//!
//! Both use `jsonwebtoken` with `Algorithm::EdDSA`. Verification treats every
//! malformed input as an ordinary failure and returns a [`SignatureError`];
//! nothing in here panics on untrusted input.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

const PEM_TAG: &str = "PRIVATE KEY";

// PKCS#8 v1 prefix for a bare Ed25519 seed (RFC 8410).
const PKCS8_ED25519_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER version 0
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
];

/// Errors that can occur while signing, verifying or loading keys.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed JWS: {0}")]
    Malformed(String),

    #[error("unsupported JWS algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed")]
    VerificationFailed,

    /// The signature verified but the payload did not decode.
    #[error("signed payload is invalid: {0}")]
    InvalidPayload(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid identity key: {0}")]
    InvalidKey(String),
}

/// The gateway's long-lived Ed25519 identity key.
#[derive(Clone)]
pub struct IdentityKey {
    signing: SigningKey,
    encoding: EncodingKey,
}

impl IdentityKey {
    /// Generate a new random identity key.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Build an identity key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let der = pkcs8_der(&signing);
        let encoding = EncodingKey::from_ed_der(&der);
        Self { signing, encoding }
    }

    /// Public verification key.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Sign `claims` as JSON and return an attached JWS.
    pub fn sign_compact<T: Serialize>(&self, claims: &T) -> Result<String, SignatureError> {
        encode(&Header::new(Algorithm::EdDSA), claims, &self.encoding)
            .map_err(|e| SignatureError::Signing(e.to_string()))
    }

    /// Sign `payload` and return a detached JWS (payload segment left empty).
    pub fn sign_detached(&self, payload: &[u8]) -> Result<String, SignatureError> {
        let header = encoded_header()?;
        let signing_input = format!("{}.{}", header, URL_SAFE_NO_PAD.encode(payload));
        let signature =
            jsonwebtoken::crypto::sign(signing_input.as_bytes(), &self.encoding, Algorithm::EdDSA)
                .map_err(|e| SignatureError::Signing(e.to_string()))?;
        Ok(format!("{}..{}", header, signature))
    }

    /// Load from a PKCS#8 PEM document.
    pub fn from_pkcs8_pem(data: &str) -> Result<Self, SignatureError> {
        let doc = pem::parse(data).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        if doc.tag() != PEM_TAG {
            return Err(SignatureError::InvalidKey(format!(
                "expected '{}' PEM block, got '{}'",
                PEM_TAG,
                doc.tag()
            )));
        }

        let der = Zeroizing::new(doc.into_contents());
        let seed = der
            .strip_prefix(&PKCS8_ED25519_PREFIX[..])
            .ok_or_else(|| SignatureError::InvalidKey("not a PKCS#8 Ed25519 key".into()))?;
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(
            seed.try_into()
                .map_err(|_| SignatureError::InvalidKey("seed must be 32 bytes".into()))?,
        );

        Ok(Self::from_seed(&seed))
    }

    /// Encode as a PKCS#8 PEM document.
    pub fn to_pkcs8_pem(&self) -> Zeroizing<String> {
        let der = pkcs8_der(&self.signing);
        let doc = pem::Pem::new(PEM_TAG, der.to_vec());
        let encoded = Zeroizing::new(pem::encode(&doc));
        doc.into_contents().zeroize();
        encoded
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKey")
            .field("public", &hex::encode(self.public_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Parse a raw 32-byte Ed25519 public key.
pub fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey, SignatureError> {
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
        SignatureError::InvalidPublicKey(format!("expected {} bytes", PUBLIC_KEY_LENGTH))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))
}

/// Verify an attached JWS and decode its payload as `T`.
///
/// No registered claims are required or checked; the payload is opaque JSON.
/// A payload that fails to decode after the signature verified is reported as
/// [`SignatureError::InvalidPayload`].
pub fn verify_compact<T: DeserializeOwned>(
    key: &VerifyingKey,
    jws: &str,
) -> Result<T, SignatureError> {
    let jws = jws.trim();
    check_header(jws)?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    // The header already parsed, so a JSON error here comes from the payload,
    // which is only decoded once the signature checks out.
    let data = decode::<T>(jws, &decoding_key(key)?, &validation).map_err(|e| match e.kind() {
        ErrorKind::Json(err) => SignatureError::InvalidPayload(err.to_string()),
        _ => verification_error(e),
    })?;
    Ok(data.claims)
}

/// Verify a detached JWS over `payload`.
pub fn verify_detached(key: &VerifyingKey, jws: &str, payload: &[u8]) -> Result<(), SignatureError> {
    let jws = jws.trim();
    let (header, signature) = jws
        .split_once("..")
        .filter(|(h, s)| !h.is_empty() && !h.contains('.') && !s.is_empty() && !s.contains('.'))
        .ok_or_else(|| SignatureError::Malformed("expected '<header>..<signature>'".into()))?;
    check_header(jws)?;

    let signing_input = format!("{}.{}", header, URL_SAFE_NO_PAD.encode(payload));
    let valid = jsonwebtoken::crypto::verify(
        signature,
        signing_input.as_bytes(),
        &decoding_key(key)?,
        Algorithm::EdDSA,
    )
    .map_err(verification_error)?;

    if valid {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

fn pkcs8_der(signing: &SigningKey) -> Zeroizing<Vec<u8>> {
    let mut der = Zeroizing::new(Vec::with_capacity(PKCS8_ED25519_PREFIX.len() + 32));
    der.extend_from_slice(&PKCS8_ED25519_PREFIX);
    der.extend_from_slice(signing.as_bytes());
    der
}

fn encoded_header() -> Result<String, SignatureError> {
    let json = serde_json::to_vec(&Header::new(Algorithm::EdDSA))
        .map_err(|e| SignatureError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decoding_key(key: &VerifyingKey) -> Result<DecodingKey, SignatureError> {
    DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(key.as_bytes()))
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))
}

fn check_header(jws: &str) -> Result<(), SignatureError> {
    let header = decode_header(jws).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    if header.alg != Algorithm::EdDSA {
        return Err(SignatureError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }
    Ok(())
}

fn verification_error(e: JwtError) -> SignatureError {
    match e.kind() {
        ErrorKind::InvalidSignature => SignatureError::VerificationFailed,
        ErrorKind::InvalidAlgorithm => SignatureError::UnsupportedAlgorithm(e.to_string()),
        _ => SignatureError::Malformed(e.to_string()),
    }
}
