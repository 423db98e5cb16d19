use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Hash, Nonce, PublicKey, Signature, Timestamp};

// ── TxType ───────────────────────────────────────────────────────────────────

/// One-of tag for the transaction kind. `Stake`, `Unstake`, and `ClaimReward`
/// are reserved (§9): the engine recognizes them but never applies a state
/// transition for them, and `add_transaction` rejects them with
/// `FeatureNotActive` rather than silently accepting a no-op.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Transfer,
    PatchSubmit,
    Stake,
    Unstake,
    ClaimReward,
}

// ── PatchSet ─────────────────────────────────────────────────────────────────

/// The payload of a `patch_submit` transaction. The core treats it as an
/// inert record: acceptance credits a fixed reward but no test execution or
/// verification of `files` is performed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchSet {
    pub id: String,
    pub problem_id: String,
    /// Equal to the owning transaction's `from`.
    pub author: Address,
    pub code: String,
    pub language: String,
    /// path → content. Non-text payloads are stored as a single raw-bytes
    /// entry rather than attempted UTF-8 decoding.
    pub files: std::collections::BTreeMap<String, Vec<u8>>,
    pub timestamp: Timestamp,
    pub signature: Signature,
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// A signed transaction. `hash` and `signature` are zeroed when computing
/// `body_bytes()` so that both the hash and the signature commit to the same
/// canonical byte form (§3, §9 "Signing disciplines").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub from: Address,
    pub to: Address,
    pub amount: Balance,
    pub patch_set: Option<PatchSet>,
    pub timestamp: Timestamp,
    pub nonce: Nonce,
    pub signature: Signature,
    pub hash: Hash,
    /// The public key that produced `signature`. Required to verify without
    /// a recovery byte in `Signature` (§4.1 fixes the wire encoding to the
    /// bare 64-byte `r ∥ s` form); recorded in DESIGN.md as the one field
    /// added beyond §3's listed shape, since verification is meaningless
    /// without it.
    pub sender_public_key: PublicKey,
}

/// The fields covered by `hash` and `signature`: every field of `Transaction`
/// except `hash` and `signature` themselves.
#[derive(Serialize)]
pub struct TransactionBody<'a> {
    pub tx_type: TxType,
    pub from: &'a Address,
    pub to: &'a Address,
    pub amount: Balance,
    pub patch_set: &'a Option<PatchSet>,
    pub timestamp: Timestamp,
    pub nonce: Nonce,
    pub sender_public_key: &'a PublicKey,
}

impl Transaction {
    pub fn body(&self) -> TransactionBody<'_> {
        TransactionBody {
            tx_type: self.tx_type,
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            patch_set: &self.patch_set,
            timestamp: self.timestamp,
            nonce: self.nonce,
            sender_public_key: &self.sender_public_key,
        }
    }

    /// Canonical bytes covered by the hash and the signature.
    pub fn body_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.body()).expect("transaction body serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(amount: Balance) -> Transaction {
        Transaction {
            tx_type: TxType::Transfer,
            from: Address::from_bytes([1u8; 20]),
            to: Address::from_bytes([2u8; 20]),
            amount,
            patch_set: None,
            timestamp: 1_000,
            nonce: 0,
            signature: Signature::from_bytes([0u8; 64]),
            hash: Hash::ZERO,
            sender_public_key: PublicKey::from_bytes([3u8; 64]),
        }
    }

    #[test]
    fn body_bytes_stable_across_hash_and_signature_values() {
        let mut a = sample(100);
        let b_bytes = a.body_bytes();
        a.hash = Hash::from_bytes([9u8; 32]);
        a.signature = Signature::from_bytes([9u8; 64]);
        assert_eq!(a.body_bytes(), b_bytes, "body_bytes must ignore hash/signature");
    }

    #[test]
    fn body_bytes_differ_on_amount() {
        assert_ne!(sample(100).body_bytes(), sample(200).body_bytes());
    }
}
