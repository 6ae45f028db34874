pub mod backend;
pub mod types;

pub use backend::{ChordMode, GroupInitMode, PurgeMode, StateBackend};
