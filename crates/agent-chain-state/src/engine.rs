use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use agent_chain_core::block::{Block, BlockHeader};
use agent_chain_core::config::ChainConfig;
use agent_chain_core::error::ChainError;
use agent_chain_core::transaction::{Transaction, TxType};
use agent_chain_core::types::{Address, Hash};
use agent_chain_core::Account;
use agent_chain_crypto::ecdsa::verify_signature;
use agent_chain_crypto::hash::hash_bytes;
use tracing::{error, info, warn};

use crate::db::StateDb;

/// All chain state guarded by a single exclusive lock: blocks, the account
/// map, and the mempool (§4.3, §5). Readers take a shared lock; every
/// mutating operation takes exclusive.
struct Inner {
    blocks: Vec<Block>,
    accounts: BTreeMap<Address, Account>,
    mempool: Vec<Transaction>,
    mempool_hashes: HashSet<Hash>,
}

/// The chain engine: sole owner of chain state (§4.3).
pub struct StateEngine {
    config: ChainConfig,
    db: StateDb,
    inner: RwLock<Inner>,
}

impl StateEngine {
    /// Load a prior genesis from `data_dir`, or create one from
    /// `config.genesis_accounts` and persist it.
    pub fn initialize(config: ChainConfig, data_dir: impl AsRef<Path>) -> Result<Self, ChainError> {
        let db = StateDb::open(data_dir)?;

        let (blocks, accounts) = if db.has_genesis() {
            info!("loading existing chain state from disk");
            let blocks = db.load_blocks()?;
            let accounts = db.load_accounts()?;
            (blocks, accounts)
        } else {
            info!(chain_id = %config.chain_id, "no prior genesis found, creating one");
            let mut accounts = BTreeMap::new();
            for account in &config.genesis_accounts {
                accounts.insert(account.address, account.clone());
            }
            let header = BlockHeader {
                height: 0,
                prev_hash: Hash::ZERO,
                merkle_root: Hash::ZERO,
                timestamp: now(),
                difficulty: 1,
                nonce: 0,
                validator: Address::from_bytes([0u8; 20]),
                hash: Hash::ZERO,
            };
            let genesis = finalize_header(header, &[]);
            let blocks = vec![Block { header: genesis, transactions: Vec::new() }];
            db.persist(&blocks, &accounts)?;
            (blocks, accounts)
        };

        Ok(Self {
            config,
            db,
            inner: RwLock::new(Inner {
                blocks,
                accounts,
                mempool: Vec::new(),
                mempool_hashes: HashSet::new(),
            }),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Validate and admit `tx` to the mempool (§4.3).
    pub fn add_transaction(&self, tx: Transaction) -> Result<Hash, ChainError> {
        let mut inner = self.inner.write().expect("state lock poisoned");

        if matches!(tx.tx_type, TxType::Stake | TxType::Unstake | TxType::ClaimReward) {
            return Err(ChainError::FeatureNotActive(format!("{:?}", tx.tx_type)));
        }

        let expected_hash = hash_bytes(&tx.body_bytes());
        if tx.hash != expected_hash {
            return Err(ChainError::BadHash);
        }

        verify_signature(&tx.sender_public_key, &tx.body_bytes(), &tx.signature)
            .map_err(|e| ChainError::SignatureError(e.to_string()))?;

        if tx.tx_type == TxType::Transfer {
            if tx.amount < 0 {
                return Err(ChainError::InvalidAmount(tx.amount));
            }
            let sender = inner.accounts.get(&tx.from).cloned().unwrap_or_else(|| Account::zero(tx.from));
            if sender.balance < tx.amount {
                return Err(ChainError::InsufficientBalance { need: tx.amount, have: sender.balance });
            }
        }

        if inner.mempool_hashes.contains(&tx.hash) {
            return Err(ChainError::DuplicateTx(tx.hash.to_hex()));
        }

        inner.mempool_hashes.insert(tx.hash);
        inner.mempool.push(tx.clone());
        Ok(tx.hash)
    }

    /// Validate and apply `block` (§4.3).
    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        let mut inner = self.inner.write().expect("state lock poisoned");

        let last = inner.blocks.last().expect("genesis always present").header.clone();
        if block.header.height != last.height + 1 {
            return Err(ChainError::BadHeight { expected: last.height + 1, got: block.header.height });
        }
        if block.header.prev_hash != last.hash {
            return Err(ChainError::BadPrevHash);
        }

        let expected_hash = hash_bytes(&block.header.body_bytes());
        if block.header.hash != expected_hash {
            return Err(ChainError::BadBlockHash);
        }

        let expected_root = merkle_root(&block.transactions.iter().map(|t| t.hash).collect::<Vec<_>>());
        if block.header.merkle_root != expected_root {
            return Err(ChainError::BadMerkleRoot);
        }

        // Validate and apply every transaction against a scratch copy first,
        // so a mid-block failure never partially mutates committed state.
        let mut scratch = inner.accounts.clone();
        for tx in &block.transactions {
            apply_transaction(&mut scratch, tx, &self.config, block.header.height)?;
        }

        inner.accounts = scratch;
        for tx in &block.transactions {
            if inner.mempool_hashes.remove(&tx.hash) {
                inner.mempool.retain(|t| t.hash != tx.hash);
            }
        }
        inner.blocks.push(block);

        if let Err(e) = self.db.persist(&inner.blocks, &inner.accounts) {
            error!(error = %e, "failed to persist chain state, rolling back in-memory block append");
            inner.blocks.pop();
            return Err(e);
        }

        Ok(())
    }

    pub fn get_account(&self, address: &Address) -> Account {
        let inner = self.inner.read().expect("state lock poisoned");
        inner.accounts.get(address).cloned().unwrap_or_else(|| Account::zero(*address))
    }

    pub fn get_height(&self) -> i64 {
        let inner = self.inner.read().expect("state lock poisoned");
        inner.blocks.last().expect("genesis always present").header.height
    }

    pub fn get_last_block(&self) -> Block {
        let inner = self.inner.read().expect("state lock poisoned");
        inner.blocks.last().expect("genesis always present").clone()
    }

    pub fn get_blocks_above(&self, from_height: i64) -> Vec<Block> {
        let inner = self.inner.read().expect("state lock poisoned");
        inner.blocks.iter().filter(|b| b.header.height > from_height).cloned().collect()
    }

    pub fn get_pending_transactions(&self, limit: usize) -> Vec<Transaction> {
        let inner = self.inner.read().expect("state lock poisoned");
        inner.mempool.iter().take(limit).cloned().collect()
    }
}

fn apply_transaction(
    accounts: &mut BTreeMap<Address, Account>,
    tx: &Transaction,
    config: &ChainConfig,
    block_index: i64,
) -> Result<(), ChainError> {
    let expected_hash = hash_bytes(&tx.body_bytes());
    if tx.hash != expected_hash {
        return Err(ChainError::BadHash);
    }
    verify_signature(&tx.sender_public_key, &tx.body_bytes(), &tx.signature)
        .map_err(|e| ChainError::SignatureError(e.to_string()))?;

    match tx.tx_type {
        TxType::Transfer => {
            if tx.amount < 0 {
                return Err(ChainError::InvalidAmount(tx.amount));
            }
            let mut sender = accounts.get(&tx.from).cloned().unwrap_or_else(|| Account::zero(tx.from));
            if sender.balance < tx.amount {
                return Err(ChainError::InsufficientBalance { need: tx.amount, have: sender.balance });
            }
            sender.balance -= tx.amount;
            sender.nonce += 1;
            accounts.insert(tx.from, sender);

            let mut recipient = accounts.get(&tx.to).cloned().unwrap_or_else(|| Account::zero(tx.to));
            recipient.balance += tx.amount;
            accounts.insert(tx.to, recipient);
        }
        TxType::PatchSubmit => {
            let reward = config.reward_at(block_index as u64);
            let mut sender = accounts.get(&tx.from).cloned().unwrap_or_else(|| Account::zero(tx.from));
            sender.balance += reward;
            sender.nonce += 1;
            accounts.insert(tx.from, sender);
        }
        TxType::Stake | TxType::Unstake | TxType::ClaimReward => {
            warn!(tx_type = ?tx.tx_type, "reserved transaction type reached add_block without effect");
            return Err(ChainError::FeatureNotActive(format!("{:?}", tx.tx_type)));
        }
    }
    Ok(())
}

/// Compute the header hash for a fresh block: set `merkle_root` first, then
/// hash the header body with `hash` zeroed (§4.3).
pub fn finalize_header(mut header: BlockHeader, tx_hashes: &[Hash]) -> BlockHeader {
    header.merkle_root = merkle_root(tx_hashes);
    header.hash = hash_bytes(&header.body_bytes());
    header
}

/// Pair-and-hash Merkle root (§4.3): odd levels propagate the trailing hash
/// unchanged rather than duplicating it.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::ZERO;
    }
    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        let mut i = 0;
        while i + 1 < level.len() {
            let mut buf = Vec::with_capacity(64);
            buf.extend_from_slice(level[i].as_bytes());
            buf.extend_from_slice(level[i + 1].as_bytes());
            next.push(hash_bytes(&buf));
            i += 2;
        }
        if i < level.len() {
            next.push(level[i]);
        }
        level = next;
    }
    level[0]
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain_core::transaction::PatchSet;
    use agent_chain_core::types::{PublicKey, Signature};
    use agent_chain_crypto::keypair::KeyPair;
    use std::collections::BTreeMap as Map;
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("agent_chain_engine_test_{}_{}", name, std::process::id()))
    }

    fn signed_transfer(kp: &KeyPair, to: Address, amount: i64, nonce: i64) -> Transaction {
        let mut tx = Transaction {
            tx_type: TxType::Transfer,
            from: kp.address,
            to,
            amount,
            patch_set: None,
            timestamp: 1,
            nonce,
            signature: Signature::from_bytes([0u8; 64]),
            hash: Hash::ZERO,
            sender_public_key: kp.public_key.clone(),
        };
        let body = tx.body_bytes();
        tx.hash = hash_bytes(&body);
        tx.signature = kp.sign(&body);
        tx
    }

    fn signed_patch_submit(kp: &KeyPair, nonce: i64) -> Transaction {
        let mut tx = Transaction {
            tx_type: TxType::PatchSubmit,
            from: kp.address,
            to: kp.address,
            amount: 0,
            patch_set: Some(PatchSet {
                id: "p1".into(),
                problem_id: "prob1".into(),
                author: kp.address,
                code: "fn main() {}".into(),
                language: "rust".into(),
                files: Map::new(),
                timestamp: 1,
                signature: Signature::from_bytes([0u8; 64]),
            }),
            timestamp: 1,
            nonce,
            signature: Signature::from_bytes([0u8; 64]),
            hash: Hash::ZERO,
            sender_public_key: kp.public_key.clone(),
        };
        let body = tx.body_bytes();
        tx.hash = hash_bytes(&body);
        tx.signature = kp.sign(&body);
        tx
    }

    fn produce_block(engine: &StateEngine, validator: Address, txs: Vec<Transaction>) -> Block {
        let last = engine.get_last_block();
        let header = BlockHeader {
            height: last.header.height + 1,
            prev_hash: last.header.hash,
            merkle_root: Hash::ZERO,
            timestamp: 2,
            difficulty: 1,
            nonce: 0,
            validator,
            hash: Hash::ZERO,
        };
        let tx_hashes: Vec<Hash> = txs.iter().map(|t| t.hash).collect();
        let header = finalize_header(header, &tx_hashes);
        Block { header, transactions: txs }
    }

    #[test]
    fn genesis_is_deterministic_on_fresh_dir() {
        let dir = temp_dir("genesis");
        let engine = StateEngine::initialize(ChainConfig::default(), &dir).unwrap();
        assert_eq!(engine.get_height(), 0);
        assert_eq!(engine.get_last_block().header.prev_hash, Hash::ZERO);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn transfer_moves_balance_and_increments_nonce() {
        let dir = temp_dir("transfer");
        let sender_kp = KeyPair::generate();
        let recipient = Address::from_bytes([9u8; 20]);

        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: sender_kp.address, balance: 1000, nonce: 0 });
        let engine = StateEngine::initialize(config, &dir).unwrap();

        let tx = signed_transfer(&sender_kp, recipient, 100, 0);
        engine.add_transaction(tx.clone()).unwrap();

        let block = produce_block(&engine, sender_kp.address, vec![tx]);
        engine.add_block(block).unwrap();

        let sender_acc = engine.get_account(&sender_kp.address);
        assert_eq!(sender_acc.balance, 900);
        assert_eq!(sender_acc.nonce, 1);
        let recipient_acc = engine.get_account(&recipient);
        assert_eq!(recipient_acc.balance, 100);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let dir = temp_dir("insufficient");
        let sender_kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: sender_kp.address, balance: 50, nonce: 0 });
        let engine = StateEngine::initialize(config, &dir).unwrap();

        let tx = signed_transfer(&sender_kp, Address::from_bytes([2u8; 20]), 10_000, 0);
        let err = engine.add_transaction(tx).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn negative_amount_transfer_is_rejected_not_treated_as_a_mint() {
        let dir = temp_dir("negative_amount");
        let sender_kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: sender_kp.address, balance: 50, nonce: 0 });
        let engine = StateEngine::initialize(config, &dir).unwrap();

        let victim = Address::from_bytes([3u8; 20]);
        let tx = signed_transfer(&sender_kp, victim, -10_000, 0);
        let err = engine.add_transaction(tx).unwrap_err();
        assert!(matches!(err, ChainError::InvalidAmount(-10_000)));

        assert_eq!(engine.get_account(&sender_kp.address).balance, 50);
        assert_eq!(engine.get_account(&victim).balance, 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_transaction_is_rejected_once_admitted() {
        let dir = temp_dir("duplicate");
        let sender_kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: sender_kp.address, balance: 1000, nonce: 0 });
        let engine = StateEngine::initialize(config, &dir).unwrap();

        let tx = signed_transfer(&sender_kp, Address::from_bytes([2u8; 20]), 10, 0);
        engine.add_transaction(tx.clone()).unwrap();
        let err = engine.add_transaction(tx).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTx(_)));
        assert_eq!(engine.get_pending_transactions(10).len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn patch_submit_credits_fixed_reward() {
        let dir = temp_dir("patch");
        let submitter_kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.initial_reward = 1000;
        config.reward_decay = 1.0;
        config.genesis_accounts.push(Account { address: submitter_kp.address, balance: 0, nonce: 0 });
        let engine = StateEngine::initialize(config, &dir).unwrap();

        let tx = signed_patch_submit(&submitter_kp, 0);
        engine.add_transaction(tx.clone()).unwrap();
        let block = produce_block(&engine, submitter_kp.address, vec![tx]);
        engine.add_block(block).unwrap();

        assert_eq!(engine.get_account(&submitter_kp.address).balance, 1000);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn add_block_rejects_repeated_height() {
        let dir = temp_dir("badheight");
        let engine = StateEngine::initialize(ChainConfig::default(), &dir).unwrap();
        let block = produce_block(&engine, Address::from_bytes([1u8; 20]), vec![]);
        engine.add_block(block.clone()).unwrap();
        let err = engine.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::BadHeight { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn restart_reloads_persisted_height_and_balances() {
        let dir = temp_dir("restart");
        let sender_kp = KeyPair::generate();
        let mut config = ChainConfig::default();
        config.genesis_accounts.push(Account { address: sender_kp.address, balance: 1000, nonce: 0 });
        {
            let engine = StateEngine::initialize(config.clone(), &dir).unwrap();
            let tx = signed_transfer(&sender_kp, Address::from_bytes([2u8; 20]), 100, 0);
            engine.add_transaction(tx.clone()).unwrap();
            let block = produce_block(&engine, sender_kp.address, vec![tx]);
            engine.add_block(block).unwrap();
        }
        let reloaded = StateEngine::initialize(config, &dir).unwrap();
        assert_eq!(reloaded.get_height(), 1);
        assert_eq!(reloaded.get_account(&sender_kp.address).balance, 900);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn merkle_root_changes_with_transaction_order() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        let c = hash_bytes(b"c");
        assert_ne!(merkle_root(&[a, b, c]), merkle_root(&[b, a, c]));
    }

    #[test]
    fn merkle_root_of_empty_list_is_zero() {
        assert_eq!(merkle_root(&[]), Hash::ZERO);
    }
}
