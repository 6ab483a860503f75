use super::node::{node_already_exists, node_not_found, sort_rows, ChangeSet, NodeFilter, NodeStore, NodeStoreReader};
use crate::model::{Node, NodeId};
use nestedset_database::prelude::StoreError;
use parking_lot::{RwLockUpgradableReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet};

/// A write overlay over a committed `NodeStore`.
///
/// Holds an upgradable read guard for its whole lifetime, so at most one staging store
/// exists per underlying store while plain readers keep reading the committed state.
/// Reads through the staging store observe staged writes. Dropping it discards them.
pub struct StagingNodeStore<'a, S: NodeStore> {
    store_read: RwLockUpgradableReadGuard<'a, S>,
    staging_writes: HashMap<NodeId, Node>,
    staging_deletions: HashSet<NodeId>,
}

/// A savepoint within a staging store
#[derive(Clone, Debug, Default)]
pub struct Checkpoint {
    writes: HashMap<NodeId, Node>,
    deletions: HashSet<NodeId>,
}

impl<'a, S: NodeStore> StagingNodeStore<'a, S> {
    pub fn new(store_read: RwLockUpgradableReadGuard<'a, S>) -> Self {
        Self { store_read, staging_writes: HashMap::new(), staging_deletions: HashSet::new() }
    }

    /// Applies all staged changes to the underlying store in one atomic `apply` and returns the
    /// write guard, so callers may keep the store locked for follow-up work
    pub fn commit(self) -> Result<RwLockWriteGuard<'a, S>, StoreError> {
        let changes = ChangeSet { writes: self.staging_writes, deletions: self.staging_deletions };
        let mut store_write = RwLockUpgradableReadGuard::upgrade(self.store_read);
        store_write.apply(changes)?;
        Ok(store_write)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { writes: self.staging_writes.clone(), deletions: self.staging_deletions.clone() }
    }

    /// Discards everything staged since `checkpoint` was taken
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.staging_writes = checkpoint.writes;
        self.staging_deletions = checkpoint.deletions;
    }

    pub fn is_dirty(&self) -> bool {
        !self.staging_writes.is_empty() || !self.staging_deletions.is_empty()
    }

    /// The committed store, as seen before any staged change
    pub fn committed(&self) -> &S {
        &self.store_read
    }

    fn is_overlaid(&self, id: NodeId) -> bool {
        self.staging_writes.contains_key(&id) || self.staging_deletions.contains(&id)
    }
}

impl<S: NodeStore> NodeStore for StagingNodeStore<'_, S> {
    fn insert(&mut self, node: Node) -> Result<(), StoreError> {
        if self.has(node.id)? {
            return Err(node_already_exists(node.id));
        }
        self.put(node)
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        self.staging_deletions.remove(&node.id);
        self.staging_writes.insert(node.id, node);
        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        for id in changes.deletions {
            self.staging_writes.remove(&id);
            self.staging_deletions.insert(id);
        }
        for (id, node) in changes.writes {
            self.staging_deletions.remove(&id);
            self.staging_writes.insert(id, node);
        }
        Ok(())
    }
}

impl<S: NodeStore> NodeStoreReader for StagingNodeStore<'_, S> {
    fn has(&self, id: NodeId) -> Result<bool, StoreError> {
        if self.staging_deletions.contains(&id) {
            return Ok(false);
        }
        Ok(self.staging_writes.contains_key(&id) || self.store_read.has(id)?)
    }

    fn get(&self, id: NodeId) -> Result<Node, StoreError> {
        if self.staging_deletions.contains(&id) {
            return Err(node_not_found(id));
        }
        if let Some(node) = self.staging_writes.get(&id) {
            Ok(node.clone())
        } else {
            self.store_read.get(id)
        }
    }

    fn find(&self, filter: &NodeFilter) -> Result<Vec<Node>, StoreError> {
        let mut rows = self.store_read.find(filter)?;
        rows.retain(|n| !self.is_overlaid(n.id));
        rows.extend(self.staging_writes.values().filter(|n| filter.matches(n)).cloned());
        sort_rows(&mut rows);
        Ok(rows)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let mut count = self.store_read.count()?;
        for &id in self.staging_deletions.iter() {
            if self.store_read.has(id)? {
                count -= 1;
            }
        }
        for &id in self.staging_writes.keys() {
            if !self.store_read.has(id)? {
                count += 1;
            }
        }
        Ok(count)
    }
}
