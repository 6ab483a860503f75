use super::node::{node_already_exists, node_not_found, sort_rows, ChangeSet, NodeFilter, NodeStore, NodeStoreReader, RowUpdate};
use crate::model::{Node, NodeId};
use nestedset_database::prelude::StoreError;
use std::collections::{hash_map::Entry::Vacant, HashMap};

/// An in-memory implementation of the `NodeStore` trait
#[derive(Clone, Debug, Default)]
pub struct MemoryNodeStore {
    map: HashMap<NodeId, Node>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<Node> for MemoryNodeStore {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self { map: iter.into_iter().map(|n| (n.id, n)).collect() }
    }
}

impl NodeStore for MemoryNodeStore {
    fn insert(&mut self, node: Node) -> Result<(), StoreError> {
        if let Vacant(e) = self.map.entry(node.id) {
            e.insert(node);
            Ok(())
        } else {
            Err(node_already_exists(node.id))
        }
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        self.map.insert(node.id, node);
        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        for id in changes.deletions {
            self.map.remove(&id);
        }
        self.map.extend(changes.writes);
        Ok(())
    }

    fn update_where(&mut self, filter: &NodeFilter, update: &RowUpdate) -> Result<usize, StoreError> {
        if update.is_noop() {
            return Ok(0);
        }
        let mut affected = 0;
        for node in self.map.values_mut().filter(|n| filter.matches(n)) {
            update.apply_to(node);
            affected += 1;
        }
        Ok(affected)
    }

    fn delete_where(&mut self, filter: &NodeFilter) -> Result<usize, StoreError> {
        let before = self.map.len();
        self.map.retain(|_, n| !filter.matches(n));
        Ok(before - self.map.len())
    }
}

impl NodeStoreReader for MemoryNodeStore {
    fn has(&self, id: NodeId) -> Result<bool, StoreError> {
        Ok(self.map.contains_key(&id))
    }

    fn get(&self, id: NodeId) -> Result<Node, StoreError> {
        self.map.get(&id).cloned().ok_or_else(|| node_not_found(id))
    }

    fn find(&self, filter: &NodeFilter) -> Result<Vec<Node>, StoreError> {
        let mut rows: Vec<Node> = self.map.values().filter(|n| filter.matches(n)).cloned().collect();
        sort_rows(&mut rows);
        Ok(rows)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.map.len())
    }
}
