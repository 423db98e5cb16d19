use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    // ── Decoding / input errors ──────────────────────────────────────────────
    #[error("decoding error: {what}")]
    DecodingError { what: String },

    #[error("encoding error: {what}")]
    EncodingError { what: String },

    #[error("invalid address: {value}")]
    InvalidAddress { value: String },

    // ── Signature errors ─────────────────────────────────────────────────────
    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("bad signature")]
    BadSignature,

    // ── Block validation errors ──────────────────────────────────────────────
    #[error("bad hash")]
    BadHash,

    #[error("bad height: expected {expected}, got {got}")]
    BadHeight { expected: i64, got: i64 },

    #[error("bad prev_hash")]
    BadPrevHash,

    #[error("bad block hash")]
    BadBlockHash,

    #[error("bad merkle root")]
    BadMerkleRoot,

    // ── Transaction / mempool errors ─────────────────────────────────────────
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: i64, have: i64 },

    #[error("duplicate transaction: {0}")]
    DuplicateTx(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    // ── Transport / overlay errors ───────────────────────────────────────────
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    #[error("stream error: {0}")]
    StreamError(String),

    // ── Storage errors ───────────────────────────────────────────────────────
    #[error("storage error: {0}")]
    StorageError(String),

    // ── Reserved transaction types (§9: not part of the core) ────────────────
    #[error("transaction type not active: {0}")]
    FeatureNotActive(String),

    // ── General ───────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}
