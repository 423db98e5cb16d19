pub mod db;
pub mod engine;

pub use db::StateDb;
pub use engine::{finalize_header, merkle_root, StateEngine};
