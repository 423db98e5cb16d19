//! Protocol defaults. All are overridable per-chain via `ChainConfig`; these
//! are the values used when a config field is omitted.

// ── Block production ─────────────────────────────────────────────────────────

/// Target seconds between produced blocks.
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 10;

/// Maximum serialized size of a block, in bytes.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Maximum number of transactions drawn from the mempool per produced block.
pub const DEFAULT_MAX_TX_PER_BLOCK: usize = 1000;

/// Fixed PoW difficulty used by every produced block (no auto-adjustment;
/// §1 Non-goals exclude BFT agreement and anything resembling mining).
pub const FIXED_DIFFICULTY: u32 = 1;

// ── Rewards ───────────────────────────────────────────────────────────────────

/// Default credit for an accepted `patch_submit` transaction, before decay.
pub const DEFAULT_INITIAL_REWARD: i64 = 1000;

/// Default per-block multiplicative decay applied to the reward (§9 Open
/// Question, resolved in SPEC_FULL.md: decay is enforced, not merely
/// documented). 1.0 = no decay.
pub const DEFAULT_REWARD_DECAY: f64 = 1.0;

/// Reward payouts never decay below this floor.
pub const MIN_REWARD: i64 = 1;

// ── P2P overlay ───────────────────────────────────────────────────────────────

/// Default P2P listen port.
pub const DEFAULT_P2P_PORT: u16 = 30333;

/// Default RPC listen port.
pub const DEFAULT_RPC_PORT: u16 = 8545;

/// Fixed protocol string identifying the overlay's stream protocol (§6).
pub const WIRE_PROTOCOL: &str = "/agent-chain/1.0.0";

/// Minimum live peer count the discovery loop tries to maintain.
pub const MIN_PEERS: usize = 8;

/// Maximum live peer count the discovery loop will exceed.
pub const MAX_PEERS: usize = 50;

/// Discovery loop cadence.
pub const DISCOVERY_INTERVAL_SECS: u64 = 30;

/// Address-exchange (getaddr/addr) loop cadence.
pub const ADDR_EXCHANGE_INTERVAL_SECS: u64 = 60;

/// Maintenance loop cadence (eviction + discovery trigger).
pub const MAINTENANCE_INTERVAL_SECS: u64 = 30;

/// Quality delta applied on a successful connection attempt.
pub const QUALITY_ON_SUCCESS: i32 = 10;

/// Quality delta applied on a failed connection attempt.
pub const QUALITY_ON_FAILURE: i32 = -5;

/// Known addresses below this quality are never selected as connect candidates.
pub const QUALITY_MIN_CANDIDATE: i32 = 10;

/// Known addresses above this quality are eligible to be shared in `addr` replies.
pub const QUALITY_SHAREABLE: i32 = 30;

/// Initial quality assigned to freshly-seeded or freshly-learned addresses.
pub const QUALITY_INITIAL: i32 = 50;

/// Maximum addresses returned in a single `addr` reply.
pub const ADDR_REPLY_LIMIT: usize = 100;

/// Known addresses older than this (seconds) and below `QUALITY_EVICT_MAX`
/// are evicted by the maintenance loop.
pub const ADDR_STALE_SECS: i64 = 24 * 3600;

/// Quality ceiling for staleness-based eviction.
pub const QUALITY_EVICT_MAX: i32 = 20;

/// Dial timeout.
pub const DIAL_TIMEOUT_SECS: u64 = 10;

/// Stream read/write timeout.
pub const STREAM_TIMEOUT_SECS: u64 = 10;

/// A connected peer is evicted from the live table after this long without
/// activity (implementation-defined staleness threshold, §4.4).
pub const PEER_STALENESS_SECS: i64 = 300;

// ── Consensus loop ───────────────────────────────────────────────────────────

/// Sync-poll loop cadence.
pub const SYNC_POLL_INTERVAL_SECS: u64 = 30;

// ── RPC ───────────────────────────────────────────────────────────────────────

/// Graceful shutdown deadline for the RPC server.
pub const RPC_SHUTDOWN_GRACE_SECS: u64 = 5;
