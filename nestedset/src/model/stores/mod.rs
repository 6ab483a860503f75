pub mod db;
pub mod memory;
pub mod node;
pub mod staging;

pub use db::DbNodeStore;
pub use memory::MemoryNodeStore;
pub use node::{Bounds, ChangeSet, NodeFilter, NodeStore, NodeStoreReader, RowUpdate};
pub use staging::{Checkpoint, StagingNodeStore};
