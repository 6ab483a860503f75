//!
//! Test utils for nested-set forests
//!
use super::{fields::generate_additional_fields, writer::TreeWriter};
use crate::{
    config::TreeConfig,
    errors::TreeError,
    model::{
        stores::{NodeFilter, NodeStore, NodeStoreReader},
        Node, NodeId, RootId,
    },
};
use itertools::Itertools;
use nestedset_database::prelude::StoreError;
use thiserror::Error;

/// A struct with fluent API to streamline forest building
pub struct ForestBuilder<'a> {
    writer: TreeWriter<'a>,
}

impl<'a> ForestBuilder<'a> {
    pub fn new(store: &'a mut dyn NodeStore, config: TreeConfig) -> Self {
        Self { writer: TreeWriter::new(store, config) }
    }

    pub fn root(&mut self, id: NodeId) -> &mut Self {
        self.writer.create_root(Node::new(id)).unwrap();
        self
    }

    /// Appends `id` as the last child of `parent`
    pub fn child(&mut self, id: NodeId, parent: NodeId) -> &mut Self {
        self.writer.insert_as_last_child_of(Node::new(id), &Node::new(parent)).unwrap();
        self
    }

    pub fn children(&mut self, ids: impl IntoIterator<Item = NodeId>, parent: NodeId) -> &mut Self {
        for id in ids {
            self.child(id, parent);
        }
        self
    }
}

#[derive(Error, Debug)]
pub enum TestError {
    #[error("data store error")]
    StoreError(#[from] StoreError),

    #[error("intervals do not nest: {0}")]
    Nesting(#[from] TreeError),

    #[error("tree {0} has no root")]
    MissingRoot(RootId),

    #[error("tree {0} has more than one root")]
    MultipleRoots(RootId),

    #[error("invalid interval {0}")]
    InvalidInterval(Node),

    #[error("node {node} spans {expected} descendants but has {actual}")]
    DescendantCountMismatch { node: NodeId, expected: i64, actual: usize },

    #[error("tree {root_id} of {size} nodes ends at {rgt}")]
    NonContiguous { root_id: RootId, size: usize, rgt: i64 },

    #[error("stored fields of {stored} differ from derived level {level} and parent {parent:?}")]
    FieldMismatch { stored: Node, level: i64, parent: Option<NodeId> },
}

/// Checks every tree of the store: a single root, valid odd-width intervals which either nest
/// strictly or are disjoint, descendant counts matching interval widths, no holes, and persisted
/// level and parent ids matching the ones derived from the intervals, or left blank when derived on read.
pub fn validate_forest(store: &dyn NodeStoreReader, config: &TreeConfig) -> std::result::Result<(), TestError> {
    let rows = store.find(&NodeFilter::all())?;
    for (root_id, tree) in &rows.into_iter().chunk_by(|n| n.root_id) {
        validate_tree(root_id, tree.collect(), config)?;
    }
    Ok(())
}

fn validate_tree(root_id: RootId, stored: Vec<Node>, config: &TreeConfig) -> std::result::Result<(), TestError> {
    let root = match stored.iter().filter(|n| n.is_root()).collect_vec().as_slice() {
        [] => return Err(TestError::MissingRoot(root_id)),
        [root] => (*root).clone(),
        _ => return Err(TestError::MultipleRoots(root_id)),
    };
    if let Some(node) = stored.iter().find(|n| !n.is_valid() || (n.rgt - n.lft) % 2 == 0) {
        return Err(TestError::InvalidInterval(node.clone()));
    }
    let size = stored.len();
    if root.rgt != 2 * size as i64 {
        return Err(TestError::NonContiguous { root_id, size, rgt: root.rgt });
    }

    let mut derived = stored.clone();
    generate_additional_fields(&mut derived)?;

    let lefts = stored.iter().map(|n| n.lft).collect_vec();
    for (node, fields) in stored.iter().zip(derived.iter()) {
        let actual = lefts.partition_point(|&l| l < node.rgt) - lefts.partition_point(|&l| l <= node.lft);
        if node.number_descendants() != actual as i64 {
            return Err(TestError::DescendantCountMismatch { node: node.id, expected: node.number_descendants(), actual });
        }
        let level_ok = node.level == if config.tracks_level() { fields.level } else { 0 };
        let parent_ok = node.parent_id == if config.tracks_parent() { fields.parent_id } else { None };
        if !level_ok || !parent_ok {
            return Err(TestError::FieldMismatch { stored: node.clone(), level: fields.level, parent: fields.parent_id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stores::MemoryNodeStore;

    #[test]
    fn test_builder_and_validation() {
        let config = TreeConfig::default();
        let mut store = MemoryNodeStore::new();
        ForestBuilder::new(&mut store, config).root(1).children([2, 3], 1).child(4, 2);
        validate_forest(&store, &config).unwrap();

        let c = store.get(4).unwrap();
        store.put(Node { rgt: 5, ..c.clone() }).unwrap();
        assert!(validate_forest(&store, &config).is_err());

        store.put(Node { level: 3, ..c }).unwrap();
        assert!(matches!(validate_forest(&store, &config), Err(TestError::FieldMismatch { .. })));
    }

    #[test]
    fn test_derived_columns_stay_blank() {
        let config = TreeConfig::default().derived();
        let mut store = MemoryNodeStore::new();
        ForestBuilder::new(&mut store, config).root(1).children([2, 3], 1).child(4, 2).child(5, 3);
        validate_forest(&store, &config).unwrap();

        let d = store.get(5).unwrap();
        assert_eq!((d.level, d.parent_id), (0, None));
        store.put(Node { level: 2, parent_id: Some(3), ..d }).unwrap();
        assert!(matches!(validate_forest(&store, &config), Err(TestError::FieldMismatch { .. })));
    }

    #[test]
    fn test_hole_is_detected() {
        let config = TreeConfig::default();
        let mut store = MemoryNodeStore::new();
        ForestBuilder::new(&mut store, config).root(1).children([2, 3], 1);
        store.delete_where(&NodeFilter::in_root(1).lft_eq(2)).unwrap();
        assert!(matches!(validate_forest(&store, &config), Err(TestError::NonContiguous { root_id: 1, size: 2, rgt: 6 })));
    }
}
