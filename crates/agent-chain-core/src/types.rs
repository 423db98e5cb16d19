use serde::{Deserialize, Serialize};
use std::fmt;

/// Account balance, in the chain's base unit. Signed so that underflow is a
/// catchable programmer error rather than a silent wraparound; the engine
/// never lets it go negative (see `agent_chain_state::engine`).
pub type Balance = i64;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Per-account transaction sequence number. Monotonically non-decreasing.
pub type Nonce = i64;

// ── Hash ─────────────────────────────────────────────────────────────────────

/// 32-byte SHA-256 digest. Display form is lowercase hex, no prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, crate::error::ChainError> {
        let bytes = hex::decode(s).map_err(|_| crate::error::ChainError::DecodingError {
            what: "hash hex".into(),
        })?;
        if bytes.len() != 32 {
            return Err(crate::error::ChainError::DecodingError {
                what: "hash length".into(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}…)", &self.to_hex()[..12])
    }
}

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte account address: the last 20 bytes of SHA-256 over the
/// concatenated 32-byte x/y coordinates of the owning public key.
/// Display form: `0x` followed by 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, crate::error::ChainError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| crate::error::ChainError::InvalidAddress {
            value: s.to_string(),
        })?;
        if bytes.len() != 20 {
            return Err(crate::error::ChainError::InvalidAddress {
                value: s.to_string(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

// ── Signature ────────────────────────────────────────────────────────────────

/// 64-byte ECDSA signature, encoded as the concatenation of the two 32-byte
/// scalars `r ∥ s`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn from_bytes(b: [u8; 64]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &self.to_hex()[..12])
    }
}

// ── PublicKey ────────────────────────────────────────────────────────────────

/// Uncompressed secp256k1 public key coordinates: 32-byte x ∥ 32-byte y.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 64]);

impl PublicKey {
    pub fn from_bytes(b: [u8; 64]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}…)", &self.to_hex()[..12])
    }
}
