//! Request authentication.
//!
//! Every interaction is signed by the platform with Ed25519 over the
//! concatenation of the `X-Signature-Timestamp` header and the raw request
//! body. The signature travels hex-encoded in `X-Signature-Ed25519`.
//!
//! Verification must happen on the raw bytes, before the body is parsed.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::trace;

use crate::error::{AuthError, AuthResult};

/// Header carrying the hex-encoded detached signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";

/// Header carrying the timestamp that prefixes the signed message.
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Verifies incoming requests against the application's public key.
#[derive(Debug, Clone)]
pub struct SignatureGate {
    key: VerifyingKey,
}

impl SignatureGate {
    /// Creates a gate from a raw 32-byte public key.
    pub fn new(public_key: &[u8; 32]) -> AuthResult<Self> {
        let key = VerifyingKey::from_bytes(public_key).map_err(|e| AuthError::InvalidPublicKey {
            reason: e.to_string(),
        })?;
        Ok(Self { key })
    }

    /// Creates a gate from the hex-encoded key shown in the developer portal.
    pub fn from_hex(public_key: &str) -> AuthResult<Self> {
        let bytes = hex::decode(public_key.trim()).map_err(|e| AuthError::InvalidPublicKey {
            reason: e.to_string(),
        })?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| AuthError::InvalidPublicKey {
                reason: format!("expected 32 bytes, got {}", b.len()),
            })?;
        Self::new(&bytes)
    }

    /// Wraps an already decoded verifying key.
    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Returns the verifying key.
    pub fn key(&self) -> &VerifyingKey {
        &self.key
    }

    /// Verifies a request given its raw body and optional signature headers.
    pub fn verify(
        &self,
        body: &[u8],
        signature: Option<&str>,
        timestamp: Option<&str>,
    ) -> AuthResult<()> {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            trace!("Rejecting request with missing signature headers");
            return Err(AuthError::InvalidSignature);
        };
        verify(body, signature, timestamp, &self.key)
    }
}

/// Verifies the detached `signature` over `timestamp || body`.
///
/// Any malformed input fails with [`AuthError::InvalidSignature`]; the
/// function has no side effects.
pub fn verify(body: &[u8], signature: &str, timestamp: &str, key: &VerifyingKey) -> AuthResult<()> {
    let raw = hex::decode(signature).map_err(|_| AuthError::InvalidSignature)?;
    let signature = Signature::from_slice(&raw).map_err(|_| AuthError::InvalidSignature)?;

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature)
        .map_err(|_| AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    const TIMESTAMP: &str = "1700000000";
    const BODY: &[u8] = br#"{"type":1}"#;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    fn gate() -> SignatureGate {
        SignatureGate::from_key(signing_key().verifying_key())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        assert_eq!(gate().verify(BODY, Some(&signature), Some(TIMESTAMP)), Ok(()));
    }

    #[test]
    fn test_any_signature_bit_flip_fails() {
        let signature = hex::decode(sign(&signing_key(), TIMESTAMP, BODY)).unwrap();
        for byte in 0..signature.len() {
            for bit in 0..8 {
                let mut mutated = signature.clone();
                mutated[byte] ^= 1 << bit;
                let result = gate().verify(BODY, Some(&hex::encode(&mutated)), Some(TIMESTAMP));
                assert_eq!(result, Err(AuthError::InvalidSignature), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_any_body_bit_flip_fails() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        for byte in 0..BODY.len() {
            for bit in 0..8 {
                let mut mutated = BODY.to_vec();
                mutated[byte] ^= 1 << bit;
                let result = gate().verify(&mutated, Some(&signature), Some(TIMESTAMP));
                assert_eq!(result, Err(AuthError::InvalidSignature), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_timestamp_is_part_of_signed_message() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        let result = gate().verify(BODY, Some(&signature), Some("1700000001"));
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_missing_headers_fail() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        assert_eq!(
            gate().verify(BODY, None, Some(TIMESTAMP)),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(
            gate().verify(BODY, Some(&signature), None),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_hex_fails() {
        assert_eq!(
            gate().verify(BODY, Some("not-hex"), Some(TIMESTAMP)),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(
            gate().verify(BODY, Some("abcd"), Some(TIMESTAMP)),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let signature = sign(&other, TIMESTAMP, BODY);
        assert_eq!(
            gate().verify(BODY, Some(&signature), Some(TIMESTAMP)),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_from_hex_roundtrips_portal_key() {
        let hex_key = hex::encode(signing_key().verifying_key().to_bytes());
        let gate = SignatureGate::from_hex(&hex_key).unwrap();
        assert_eq!(gate.key(), &signing_key().verifying_key());
    }

    #[test]
    fn test_from_hex_rejects_bad_keys() {
        assert!(matches!(
            SignatureGate::from_hex("zz"),
            Err(AuthError::InvalidPublicKey { .. })
        ));
        assert!(matches!(
            SignatureGate::from_hex("abcdef"),
            Err(AuthError::InvalidPublicKey { .. })
        ));
    }
}
