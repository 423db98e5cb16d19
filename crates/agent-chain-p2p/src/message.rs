use serde::{Deserialize, Serialize};

/// Known message type tags exchanged over the wire protocol (§4.4).
pub mod msg_type {
    pub const BLOCK: &str = "block";
    pub const TRANSACTION: &str = "transaction";
    pub const GET_BLOCKS: &str = "get_blocks";
    pub const GET_HEIGHT: &str = "get_height";
    pub const HEIGHT: &str = "height";
    pub const ADDR: &str = "addr";
    pub const GETADDR: &str = "getaddr";
}

/// The single envelope type carried over `/agent-chain/1.0.0` (§4.4, §6).
/// `data` is the canonical (bincode) encoding of the typed payload named by
/// `msg_type`; this module never inspects it beyond routing by `msg_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub data: Vec<u8>,
    pub timestamp: i64,
    pub from: String,
}

impl Message {
    pub fn new(msg_type: impl Into<String>, data: Vec<u8>, from: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data,
            timestamp: chrono::Utc::now().timestamp(),
            from: from.into(),
        }
    }
}

/// Acknowledgement returned for every request (one message per stream; the
/// response carries no payload of its own).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ack;

/// A single `host:port` entry as carried in a `get_blocks` payload's
/// `from_height`, or an `addr`/`getaddr` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBlocks {
    pub from_height: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddrEntry {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddrList {
    pub addresses: Vec<AddrEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Height {
    pub height: i64,
}
