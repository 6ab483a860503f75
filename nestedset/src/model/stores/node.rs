use crate::model::{Node, NodeId, RootId};
use nestedset_database::{
    prelude::{DbKey, StoreError},
    registry::DatabaseStorePrefixes,
};
use std::collections::{HashMap, HashSet};

/// Inclusive `[min, max]` bounds on an integer column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const ALL: Bounds = Bounds { min: i64::MIN, max: i64::MAX };

    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    fn narrow(self, min: i64, max: i64) -> Self {
        Self { min: self.min.max(min), max: self.max.min(max) }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::ALL
    }
}

/// A conjunctive row predicate. Every constraint left unset matches all rows.
///
/// Built fluently, e.g. all strict descendants of `node` are
/// `NodeFilter::in_root(node.root_id).lft_gt(node.lft).rgt_lt(node.rgt)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub root_id: Option<RootId>,
    pub lft: Bounds,
    pub rgt: Bounds,
    pub level: Bounds,
    pub parent_id: Option<Option<NodeId>>,
    pub exclude: Option<NodeId>,
}

impl NodeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_root(root_id: RootId) -> Self {
        Self { root_id: Some(root_id), ..Default::default() }
    }

    /// Strict ancestors of `node`, i.e. intervals enclosing it
    pub fn ancestors_of(node: &Node) -> Self {
        Self::in_root(node.root_id).lft_lt(node.lft).rgt_gt(node.rgt)
    }

    /// Strict descendants of `node`
    pub fn descendants_of(node: &Node) -> Self {
        Self::in_root(node.root_id).lft_gt(node.lft).rgt_lt(node.rgt)
    }

    /// `node` and all of its descendants
    pub fn subtree_of(node: &Node) -> Self {
        Self::in_root(node.root_id).lft_between(node.lft, node.rgt)
    }

    pub fn root_id(mut self, root_id: RootId) -> Self {
        self.root_id = Some(root_id);
        self
    }

    pub fn lft_between(mut self, min: i64, max: i64) -> Self {
        self.lft = self.lft.narrow(min, max);
        self
    }

    pub fn lft_eq(self, value: i64) -> Self {
        self.lft_between(value, value)
    }

    pub fn lft_ge(self, value: i64) -> Self {
        self.lft_between(value, i64::MAX)
    }

    pub fn lft_gt(self, value: i64) -> Self {
        self.lft_between(value.saturating_add(1), i64::MAX)
    }

    pub fn lft_lt(self, value: i64) -> Self {
        self.lft_between(i64::MIN, value.saturating_sub(1))
    }

    pub fn rgt_between(mut self, min: i64, max: i64) -> Self {
        self.rgt = self.rgt.narrow(min, max);
        self
    }

    pub fn rgt_eq(self, value: i64) -> Self {
        self.rgt_between(value, value)
    }

    pub fn rgt_ge(self, value: i64) -> Self {
        self.rgt_between(value, i64::MAX)
    }

    pub fn rgt_gt(self, value: i64) -> Self {
        self.rgt_between(value.saturating_add(1), i64::MAX)
    }

    pub fn rgt_lt(self, value: i64) -> Self {
        self.rgt_between(i64::MIN, value.saturating_sub(1))
    }

    pub fn level_between(mut self, min: i64, max: i64) -> Self {
        self.level = self.level.narrow(min, max);
        self
    }

    /// Restricts to tree roots, i.e. rows with `lft = 1`
    pub fn roots_only(self) -> Self {
        self.lft_eq(1)
    }

    pub fn parent_id(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn exclude(mut self, id: NodeId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Intersects `self` with `other`. Constraints of `other` on `root_id`, `parent_id`
    /// and `exclude` take precedence when both sides set them.
    pub fn and(self, other: &NodeFilter) -> Self {
        Self {
            root_id: other.root_id.or(self.root_id),
            lft: self.lft.narrow(other.lft.min, other.lft.max),
            rgt: self.rgt.narrow(other.rgt.min, other.rgt.max),
            level: self.level.narrow(other.level.min, other.level.max),
            parent_id: other.parent_id.or(self.parent_id),
            exclude: other.exclude.or(self.exclude),
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.root_id.is_none_or(|r| r == node.root_id)
            && self.lft.contains(node.lft)
            && self.rgt.contains(node.rgt)
            && self.level.contains(node.level)
            && self.parent_id.is_none_or(|p| p == node.parent_id)
            && self.exclude != Some(node.id)
    }
}

/// A bulk column update: signed increments of the bounds and level, and an optional
/// reassignment of the partition key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowUpdate {
    pub lft_delta: i64,
    pub rgt_delta: i64,
    pub level_delta: i64,
    pub root_id: Option<RootId>,
}

impl RowUpdate {
    pub fn shift_lft(mut self, delta: i64) -> Self {
        self.lft_delta = delta;
        self
    }

    pub fn shift_rgt(mut self, delta: i64) -> Self {
        self.rgt_delta = delta;
        self
    }

    pub fn shift_bounds(self, delta: i64) -> Self {
        self.shift_lft(delta).shift_rgt(delta)
    }

    pub fn shift_level(mut self, delta: i64) -> Self {
        self.level_delta = delta;
        self
    }

    pub fn set_root_id(mut self, root_id: RootId) -> Self {
        self.root_id = Some(root_id);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.lft_delta == 0 && self.rgt_delta == 0 && self.level_delta == 0 && self.root_id.is_none()
    }

    pub fn apply_to(&self, node: &mut Node) {
        node.lft += self.lft_delta;
        node.rgt += self.rgt_delta;
        node.level += self.level_delta;
        if let Some(root_id) = self.root_id {
            node.root_id = root_id;
        }
    }
}

/// Row writes and deletions to be applied as one atomic unit. An id is either written or deleted, never both.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub(crate) writes: HashMap<NodeId, Node>,
    pub(crate) deletions: HashSet<NodeId>,
}

impl ChangeSet {
    pub fn write(&mut self, node: Node) {
        self.deletions.remove(&node.id);
        self.writes.insert(node.id, node);
    }

    pub fn delete(&mut self, id: NodeId) {
        self.writes.remove(&id);
        self.deletions.insert(id);
    }

    pub fn writes(&self) -> impl Iterator<Item = &Node> {
        self.writes.values()
    }

    pub fn deletions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.deletions.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len() + self.deletions.len()
    }
}

/// Reader API for `NodeStore`.
pub trait NodeStoreReader {
    fn has(&self, id: NodeId) -> Result<bool, StoreError>;
    fn get(&self, id: NodeId) -> Result<Node, StoreError>;
    /// Returns all rows matching `filter`, ordered by `(root_id, lft)`
    fn find(&self, filter: &NodeFilter) -> Result<Vec<Node>, StoreError>;
    /// Returns the counts of entries in the store. To be used for tests only
    fn count(&self) -> Result<usize, StoreError>;
}

/// Write API for `NodeStore`. Bulk operations report the number of affected rows.
pub trait NodeStore: NodeStoreReader {
    /// Inserts a new row, failing if the id is already present
    fn insert(&mut self, node: Node) -> Result<(), StoreError>;
    /// Upserts a row by primary key
    fn put(&mut self, node: Node) -> Result<(), StoreError>;
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError>;

    fn update_where(&mut self, filter: &NodeFilter, update: &RowUpdate) -> Result<usize, StoreError> {
        if update.is_noop() {
            return Ok(0);
        }
        let mut changes = ChangeSet::default();
        for mut node in self.find(filter)? {
            update.apply_to(&mut node);
            changes.write(node);
        }
        let affected = changes.len();
        self.apply(changes)?;
        Ok(affected)
    }

    fn delete_where(&mut self, filter: &NodeFilter) -> Result<usize, StoreError> {
        let mut changes = ChangeSet::default();
        for node in self.find(filter)? {
            changes.delete(node.id);
        }
        let affected = changes.len();
        self.apply(changes)?;
        Ok(affected)
    }
}

pub(crate) fn sort_rows(rows: &mut [Node]) {
    rows.sort_unstable_by_key(|n| (n.root_id, n.lft, n.id));
}

pub(crate) fn node_not_found(id: NodeId) -> StoreError {
    StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::Nodes.as_ref(), id.to_be_bytes()))
}

pub(crate) fn node_already_exists(id: NodeId) -> StoreError {
    StoreError::KeyAlreadyExists(format!("node {id}"))
}
