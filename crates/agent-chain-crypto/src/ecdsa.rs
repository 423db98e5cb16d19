use agent_chain_core::types::{PublicKey, Signature};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as K256Signature, SigningKey, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign `message` with a raw 32-byte secp256k1 secret scalar.
///
/// `k256::ecdsa::SigningKey`'s `Signer` implementation hashes `message` with
/// SHA-256 before signing, matching §4.1's "sign/verify operate on SHA-256
/// of the input" contract without a separate pre-hash step.
pub fn sign(secret_key_bytes: &[u8; 32], message: &[u8]) -> Result<Signature, SignatureError> {
    let signing_key =
        SigningKey::from_bytes(secret_key_bytes.into()).map_err(|_| SignatureError::InvalidSignature)?;
    let sig: K256Signature = signing_key.sign(message);
    Ok(Signature::from_bytes(sig.to_bytes().into()))
}

/// Verify a 64-byte `r ∥ s` signature against a public key.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    let verifying_key = verifying_key_from_public_key(public_key)?;
    let sig = K256Signature::from_slice(signature.as_bytes()).map_err(|_| SignatureError::InvalidSignature)?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// Reconstruct a `k256::ecdsa::VerifyingKey` from our uncompressed x ∥ y
/// coordinate encoding.
pub fn verifying_key_from_public_key(public_key: &PublicKey) -> Result<VerifyingKey, SignatureError> {
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(public_key.as_bytes());
    VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| SignatureError::InvalidPublicKey)
}

/// Encode a `k256::ecdsa::VerifyingKey` into our x ∥ y coordinate form.
pub fn public_key_from_verifying_key(verifying_key: &VerifyingKey) -> PublicKey {
    let encoded = verifying_key.to_encoded_point(false);
    let mut coords = [0u8; 64];
    coords.copy_from_slice(&encoded.as_bytes()[1..]);
    PublicKey::from_bytes(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn sign_verify_round_trip() {
        let signing_key = SigningKey::random(&mut OsRng);
        let secret_bytes: [u8; 32] = signing_key.to_bytes().into();
        let public_key = public_key_from_verifying_key(signing_key.verifying_key());

        let message = b"transfer 100 units";
        let sig = sign(&secret_bytes, message).unwrap();
        assert!(verify_signature(&public_key, message, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let secret_bytes: [u8; 32] = signing_key.to_bytes().into();
        let public_key = public_key_from_verifying_key(signing_key.verifying_key());

        let sig = sign(&secret_bytes, b"original").unwrap();
        assert!(verify_signature(&public_key, b"tampered", &sig).is_err());
    }
}
