pub mod node;
pub mod stores;

pub use node::{Node, NodeId, Position, RootId};
