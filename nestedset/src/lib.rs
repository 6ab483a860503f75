//!
//! Nested-set (modified preorder tree traversal) forests.
//!
//! Each node of a tree carries an interval `[lft, rgt]` strictly enclosing the intervals of all of
//! its descendants, so ancestry questions become range predicates over a flat row store. Several
//! independent trees share one store, partitioned by `root_id`.
//!
//! [`forest::Forest`] is the entry point. It coordinates transactions over a
//! [`model::stores::NodeStore`] and exposes the structural mutations of
//! [`processes::writer::TreeWriter`] and the queries of [`processes::reader::TreeReader`].
//!

pub mod config;
pub mod errors;
pub mod forest;
pub mod model;
pub mod processes;

pub mod prelude {
    pub use crate::config::{LevelStrategy, ParentStrategy, TreeConfig};
    pub use crate::errors::{Relation, RootViolation, TreeError, TreeResult};
    pub use crate::forest::{Forest, Transaction};
    pub use crate::model::stores::{DbNodeStore, MemoryNodeStore, NodeFilter, NodeStore, NodeStoreReader, RowUpdate};
    pub use crate::model::{Node, NodeId, Position, RootId};
    pub use crate::processes::{fields::generate_additional_fields, reader::TreeReader, writer::TreeWriter};
}
