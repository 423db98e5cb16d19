use agent_chain_core::types::{Address, PublicKey, Signature};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::ecdsa::{public_key_from_verifying_key, sign};
use crate::hash::address_from_pubkey;

/// A node or account keypair: secp256k1 secret scalar plus derived public key
/// and address. The secret scalar is held in a `Zeroizing` buffer and wiped
/// on drop.
pub struct KeyPair {
    pub address: Address,
    pub public_key: PublicKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Restore a keypair from a raw 32-byte secret scalar (e.g. loaded from
    /// `<data_dir>/node.key`).
    pub fn from_secret_bytes(secret_key_bytes: [u8; 32]) -> Result<Self, crate::ecdsa::SignatureError> {
        let signing_key = SigningKey::from_bytes((&secret_key_bytes).into())
            .map_err(|_| crate::ecdsa::SignatureError::InvalidSignature)?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = public_key_from_verifying_key(signing_key.verifying_key());
        let address = address_from_pubkey(&public_key);
        let secret_key = Zeroizing::new(<[u8; 32]>::from(signing_key.to_bytes()));
        Self {
            address,
            public_key,
            secret_key,
        }
    }

    /// Sign `message` (the canonical body bytes of a transaction or header).
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign(&self.secret_key, message).expect("sign with a valid secret key is infallible")
    }

    /// Raw 32-byte secret scalar, for persistence as hex in the node key file.
    pub fn secret_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ address: {:?} }}", self.address)
    }
}
