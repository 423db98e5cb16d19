pub mod account;
pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod transaction;
pub mod types;

pub use account::*;
pub use block::*;
pub use config::*;
pub use constants::*;
pub use error::ChainError;
pub use transaction::*;
pub use types::*;
