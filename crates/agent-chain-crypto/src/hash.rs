use agent_chain_core::types::{Address, Hash, PublicKey};
use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash arbitrary canonical bytes into a `Hash` (used for both transaction
/// hashes and block header hashes — §3, §4.1).
pub fn hash_bytes(data: &[u8]) -> Hash {
    Hash::from_bytes(sha256(data))
}

/// Derive a 20-byte address from a public key: SHA-256 over the concatenated
/// 32-byte x/y coordinates, keeping the last 20 bytes (§3).
pub fn address_from_pubkey(pubkey: &PublicKey) -> Address {
    let digest = sha256(pubkey.as_bytes());
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    Address::from_bytes(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_last_20_bytes_of_sha256() {
        let pk = PublicKey::from_bytes([7u8; 64]);
        let expected_full = sha256(pk.as_bytes());
        let addr = address_from_pubkey(&pk);
        assert_eq!(addr.as_bytes(), &expected_full[12..]);
    }

    #[test]
    fn different_inputs_hash_differently() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }
}
