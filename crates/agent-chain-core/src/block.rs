use serde::{Deserialize, Serialize};

use crate::types::{Address, Hash, Timestamp};
use crate::transaction::Transaction;

/// Block header. `hash` commits to every other field with `hash` itself
/// zeroed and `merkle_root` already populated (§3, §4.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: i64,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: Timestamp,
    pub difficulty: u32,
    pub nonce: u64,
    pub validator: Address,
    pub hash: Hash,
}

/// The fields covered by `header.hash`.
#[derive(Serialize)]
pub struct BlockHeaderBody<'a> {
    pub height: i64,
    pub prev_hash: &'a Hash,
    pub merkle_root: &'a Hash,
    pub timestamp: Timestamp,
    pub difficulty: u32,
    pub nonce: u64,
    pub validator: &'a Address,
}

impl BlockHeader {
    pub fn body(&self) -> BlockHeaderBody<'_> {
        BlockHeaderBody {
            height: self.height,
            prev_hash: &self.prev_hash,
            merkle_root: &self.merkle_root,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            nonce: self.nonce,
            validator: &self.validator,
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.body()).expect("header body serialization is infallible")
    }
}

/// Header plus ordered transactions. Append-only: no block is ever removed
/// or mutated once accepted by the chain engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn height(&self) -> i64 {
        self.header.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_body_excludes_hash() {
        let mut h = BlockHeader {
            height: 1,
            prev_hash: Hash::ZERO,
            merkle_root: Hash::ZERO,
            timestamp: 0,
            difficulty: 1,
            nonce: 0,
            validator: Address::from_bytes([0u8; 20]),
            hash: Hash::ZERO,
        };
        let before = h.body_bytes();
        h.hash = Hash::from_bytes([7u8; 32]);
        assert_eq!(h.body_bytes(), before);
    }
}
