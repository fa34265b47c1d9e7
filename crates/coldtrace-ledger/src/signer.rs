use crate::transaction::{SignedEnvelope, UnsignedEnvelope};
use coldtrace_domain::error::{DomainError, DomainResult};
use coldtrace_domain::fingerprint::canonical_json;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

/// ECDSA (secp256k1) signer for ledger envelopes.
///
/// The private key lives only inside this struct. It is never logged,
/// never serialized and never part of an error message; parse failures
/// report a fixed description instead of echoing input back.
pub struct TransactionSigner {
    signing_key: SigningKey,
    account: String,
}

impl TransactionSigner {
    /// Build a signer from a hex-encoded private key (optional 0x prefix).
    pub fn from_hex_key(hex_key: &str) -> DomainResult<Self> {
        let trimmed = hex_key.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed).map_err(|_| {
            DomainError::ValidationError("ledger private key is not valid hex".to_string())
        })?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| {
            DomainError::ValidationError(
                "ledger private key is not a valid secp256k1 scalar".to_string(),
            )
        })?;
        let account = derive_account(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            account,
        })
    }

    /// Ledger account id derived from the verifying key.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign the canonical digest of an envelope.
    ///
    /// The digest is SHA-256 over the envelope's canonical JSON, so any
    /// party holding the verifying key can rebuild and check it without
    /// caring how the JSON was ordered in transit.
    pub fn sign(&self, envelope: &UnsignedEnvelope) -> DomainResult<SignedEnvelope> {
        let digest = envelope_digest(envelope)?;
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| DomainError::SubmissionFailure(format!("signing failed: {e}")))?;
        Ok(SignedEnvelope {
            envelope: envelope.clone(),
            signature: hex::encode(signature.to_bytes()),
        })
    }
}

impl std::fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// SHA-256 over the canonical JSON form of an unsigned envelope.
pub fn envelope_digest(envelope: &UnsignedEnvelope) -> DomainResult<[u8; 32]> {
    let value = serde_json::to_value(envelope)
        .map_err(|e| DomainError::SubmissionFailure(format!("unserializable envelope: {e}")))?;
    Ok(Sha256::digest(canonical_json(&value).as_bytes()).into())
}

// Last 20 bytes of sha256 over the uncompressed SEC1 point, 0x-prefixed.
fn derive_account(key: &VerifyingKey) -> String {
    let encoded = key.to_encoded_point(false);
    let digest = Sha256::digest(encoded.as_bytes());
    format!("0x{}", hex::encode(&digest[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{AlertParams, STORE_ALERT_METHOD};
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn envelope(nonce: u64) -> UnsignedEnvelope {
        UnsignedEnvelope {
            account: "0xabc".to_string(),
            nonce,
            contract: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            method: STORE_ALERT_METHOD.to_string(),
            params: AlertParams {
                device_id: "truck-1".to_string(),
                alert_type: "HIGH_TEMP".to_string(),
                timestamp: "2025-06-01T12:00:00Z".to_string(),
                fingerprint: "fp".to_string(),
            },
        }
    }

    #[test]
    fn rejects_non_hex_key_without_echoing_it() {
        let err = TransactionSigner::from_hex_key("not-a-key").unwrap_err();
        let message = err.to_string();
        assert!(!message.contains("not-a-key"));
        assert!(message.contains("not valid hex"));
    }

    #[test]
    fn rejects_wrong_length_key() {
        assert!(TransactionSigner::from_hex_key("deadbeef").is_err());
    }

    #[test]
    fn accepts_0x_prefixed_keys() {
        let plain = TransactionSigner::from_hex_key(TEST_KEY).unwrap();
        let prefixed = TransactionSigner::from_hex_key(&format!("0x{TEST_KEY}")).unwrap();
        assert_eq!(plain.account(), prefixed.account());
    }

    #[test]
    fn account_is_deterministic_and_short() {
        let signer = TransactionSigner::from_hex_key(TEST_KEY).unwrap();
        let account = signer.account();
        assert!(account.starts_with("0x"));
        assert_eq!(account.len(), 42);
    }

    #[test]
    fn signature_verifies_against_the_canonical_digest() {
        let signer = TransactionSigner::from_hex_key(TEST_KEY).unwrap();
        let unsigned = envelope(7);
        let signed = signer.sign(&unsigned).unwrap();

        let digest = envelope_digest(&unsigned).unwrap();
        let bytes = hex::decode(&signed.signature).unwrap();
        let signature = Signature::from_slice(&bytes).unwrap();
        signer
            .verifying_key()
            .verify_prehash(&digest, &signature)
            .unwrap();
    }

    #[test]
    fn different_nonces_produce_different_signatures() {
        let signer = TransactionSigner::from_hex_key(TEST_KEY).unwrap();
        let a = signer.sign(&envelope(1)).unwrap();
        let b = signer.sign(&envelope(2)).unwrap();
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn debug_output_shows_only_the_account() {
        let signer = TransactionSigner::from_hex_key(TEST_KEY).unwrap();
        let printed = format!("{signer:?}");
        assert!(printed.contains(signer.account()));
        assert!(!printed.contains(TEST_KEY));
    }
}
