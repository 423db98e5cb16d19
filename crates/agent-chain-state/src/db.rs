use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use agent_chain_core::block::Block;
use agent_chain_core::error::ChainError;
use agent_chain_core::types::Address;
use agent_chain_core::Account;

/// Flat-file persistence for the chain: an ordered sequence of blocks and an
/// unordered snapshot of accounts, each rewritten atomically after every
/// applied block (§4.3, §6).
pub struct StateDb {
    blocks_path: PathBuf,
    accounts_path: PathBuf,
}

impl StateDb {
    /// Open the store rooted at `<data_dir>/blockchain/`, creating the
    /// directory if it doesn't exist yet.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, ChainError> {
        let root = data_dir.as_ref().join("blockchain");
        fs::create_dir_all(&root).map_err(|e| ChainError::StorageError(e.to_string()))?;
        Ok(Self {
            blocks_path: root.join("blocks.json"),
            accounts_path: root.join("accounts.json"),
        })
    }

    /// `true` if a prior genesis has already been persisted.
    pub fn has_genesis(&self) -> bool {
        self.blocks_path.exists()
    }

    pub fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        if !self.blocks_path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.blocks_path).map_err(|e| ChainError::StorageError(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ChainError::DecodingError { what: e.to_string() })
    }

    pub fn load_accounts(&self) -> Result<BTreeMap<Address, Account>, ChainError> {
        if !self.accounts_path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.accounts_path).map_err(|e| ChainError::StorageError(e.to_string()))?;
        let list: Vec<Account> =
            serde_json::from_slice(&bytes).map_err(|e| ChainError::DecodingError { what: e.to_string() })?;
        Ok(list.into_iter().map(|a| (a.address, a)).collect())
    }

    /// Atomically rewrite both files: write to a sibling temp path, then
    /// rename over the target so a crash never leaves a half-written file.
    pub fn persist(&self, blocks: &[Block], accounts: &BTreeMap<Address, Account>) -> Result<(), ChainError> {
        let account_list: Vec<&Account> = accounts.values().collect();
        Self::write_atomic(&self.blocks_path, blocks)?;
        Self::write_atomic(&self.accounts_path, &account_list)?;
        Ok(())
    }

    fn write_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ChainError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| ChainError::EncodingError { what: e.to_string() })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|e| ChainError::StorageError(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| ChainError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain_core::block::BlockHeader;
    use agent_chain_core::types::Hash;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("agent_chain_db_test_{}_{}", name, std::process::id()))
    }

    #[test]
    fn fresh_store_has_no_genesis() {
        let dir = temp_dir("fresh");
        let db = StateDb::open(&dir).unwrap();
        assert!(!db.has_genesis());
        assert!(db.load_blocks().unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn persist_then_reload_round_trips() {
        let dir = temp_dir("roundtrip");
        let db = StateDb::open(&dir).unwrap();

        let header = BlockHeader {
            height: 0,
            prev_hash: Hash::ZERO,
            merkle_root: Hash::ZERO,
            timestamp: 0,
            difficulty: 1,
            nonce: 0,
            validator: Address::from_bytes([0u8; 20]),
            hash: Hash::ZERO,
        };
        let block = Block { header, transactions: vec![] };
        let mut accounts = BTreeMap::new();
        let acc = Account::zero(Address::from_bytes([1u8; 20]));
        accounts.insert(acc.address, acc.clone());

        db.persist(&[block.clone()], &accounts).unwrap();
        assert!(db.has_genesis());

        let loaded_blocks = db.load_blocks().unwrap();
        assert_eq!(loaded_blocks.len(), 1);
        assert_eq!(loaded_blocks[0].header.height, 0);

        let loaded_accounts = db.load_accounts().unwrap();
        assert_eq!(loaded_accounts.get(&acc.address), Some(&acc));

        let _ = fs::remove_dir_all(&dir);
    }
}
