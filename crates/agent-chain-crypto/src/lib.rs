pub mod ecdsa;
pub mod hash;
pub mod keypair;

pub use ecdsa::{sign, verify_signature, SignatureError};
pub use hash::{address_from_pubkey, hash_bytes, sha256};
pub use keypair::KeyPair;
