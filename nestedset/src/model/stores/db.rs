use super::node::{node_already_exists, node_not_found, sort_rows, ChangeSet, NodeFilter, NodeStore, NodeStoreReader};
use crate::model::{Node, NodeId};
use nestedset_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DbSetAccess, StoreError, StoreResultExt, DB},
    registry::DatabaseStorePrefixes,
};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Big-endian node or root id, so that rows of a table iterate in id order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey([u8; 8]);

impl From<NodeId> for NodeKey {
    fn from(id: NodeId) -> Self {
        Self(id.to_be_bytes())
    }
}

impl AsRef<[u8]> for NodeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A DB + cache implementation of `NodeStore` trait, with concurrent readers support.
///
/// Rows live under `Nodes/<table>` keyed by node id. Each tree additionally owns a
/// membership set under `TreeMembers/<table>/<root id>`, so that tree-scoped reads only
/// visit the rows of that tree.
#[derive(Clone)]
pub struct DbNodeStore {
    db: Arc<DB>,
    access: CachedDbAccess<NodeKey, Node>,
    members: DbSetAccess<NodeKey, NodeId>,
}

impl DbNodeStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self::with_table(db, cache_policy, 0)
    }

    /// Opens the store over the given table byte. Several forests may share a DB under distinct tables.
    pub fn with_table(db: Arc<DB>, cache_policy: CachePolicy, table: u8) -> Self {
        let rows_prefix = DatabaseStorePrefixes::Nodes.into_iter().chain(std::iter::once(table)).collect();
        let members_prefix = DatabaseStorePrefixes::TreeMembers.into_iter().chain(std::iter::once(table)).collect();
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(Arc::clone(&db), cache_policy, rows_prefix),
            members: DbSetAccess::new(db, members_prefix),
        }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self {
            db: Arc::clone(&self.db),
            access: CachedDbAccess::new(Arc::clone(&self.db), cache_policy, self.access.prefix().to_vec()),
            members: self.members.clone(),
        }
    }

    fn read(&self, id: NodeId) -> Result<Node, StoreError> {
        self.access.read(id.into()).map_err(|err| match err {
            StoreError::KeyNotFound(_) => node_not_found(id),
            err => err,
        })
    }

    fn stage(&self, batch: &mut WriteBatch, changes: ChangeSet) -> Result<(), StoreError> {
        for id in changes.deletions {
            if let Some(old) = self.read(id).optional()? {
                self.members.delete(BatchDbWriter::new(batch), old.root_id.into(), id)?;
                self.access.delete(BatchDbWriter::new(batch), id.into())?;
            }
        }
        for (id, node) in changes.writes {
            match self.read(id).optional()? {
                Some(old) if old.root_id == node.root_id => {}
                Some(old) => {
                    self.members.delete(BatchDbWriter::new(batch), old.root_id.into(), id)?;
                    self.members.write(BatchDbWriter::new(batch), node.root_id.into(), id)?;
                }
                None => self.members.write(BatchDbWriter::new(batch), node.root_id.into(), id)?,
            }
            self.access.write(BatchDbWriter::new(batch), id.into(), node)?;
        }
        Ok(())
    }
}

impl NodeStore for DbNodeStore {
    fn insert(&mut self, node: Node) -> Result<(), StoreError> {
        if self.access.has(node.id.into())? {
            return Err(node_already_exists(node.id));
        }
        self.put(node)
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        let mut changes = ChangeSet::default();
        changes.write(node);
        self.apply(changes)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        // The cache is populated while staging, so it must be dropped if the batch does not land
        let result = self.stage(&mut batch, changes).and_then(|_| Ok(self.db.write(batch)?));
        if result.is_err() {
            self.access.clear_cache();
        }
        result
    }
}

impl NodeStoreReader for DbNodeStore {
    fn has(&self, id: NodeId) -> Result<bool, StoreError> {
        self.access.has(id.into())
    }

    fn get(&self, id: NodeId) -> Result<Node, StoreError> {
        self.read(id)
    }

    fn find(&self, filter: &NodeFilter) -> Result<Vec<Node>, StoreError> {
        let mut rows = Vec::new();
        if let Some(root_id) = filter.root_id {
            for id in self.members.bucket_iterator(root_id.into()) {
                let node = self.read(id?)?;
                if filter.matches(&node) {
                    rows.push(node);
                }
            }
        } else {
            for item in self.access.iterator() {
                let (_, node) = item.map_err(|err| StoreError::DataInconsistency(err.to_string()))?;
                if filter.matches(&node) {
                    rows.push(node);
                }
            }
        }
        sort_rows(&mut rows);
        Ok(rows)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.access.iterator().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stores::node::RowUpdate;
    use nestedset_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_tree_membership_follows_root_id() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let mut store = DbNodeStore::new(db.clone(), CachePolicy::Count(16));

        store.insert(Node { lft: 1, rgt: 4, ..Node::new(1) }).unwrap();
        store.insert(Node { lft: 2, rgt: 3, level: 1, parent_id: Some(1), ..Node::new(2).with_root_id(1) }).unwrap();
        store.insert(Node { lft: 1, rgt: 2, ..Node::new(5) }).unwrap();
        assert!(store.insert(Node::new(5)).is_err());

        assert_eq!(store.find(&NodeFilter::in_root(1)).unwrap().len(), 2);
        assert_eq!(store.count().unwrap(), 3);

        let moved = store.update_where(&NodeFilter::in_root(1).lft_eq(2), &RowUpdate::default().set_root_id(5)).unwrap();
        assert_eq!(moved, 1);
        assert_eq!(store.find(&NodeFilter::in_root(1)).unwrap().iter().map(|n| n.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(store.find(&NodeFilter::in_root(5)).unwrap().iter().map(|n| n.id).collect::<Vec<_>>(), vec![5, 2]);

        // A fresh cache must observe the same state from disk
        let reopened = store.clone_with_new_cache(CachePolicy::Empty);
        assert_eq!(reopened.get(2).unwrap().root_id, 5);
        assert_eq!(reopened.find(&NodeFilter::all().roots_only()).unwrap().len(), 2);

        assert_eq!(store.delete_where(&NodeFilter::in_root(5)).unwrap(), 2);
        assert!(reopened.find(&NodeFilter::in_root(5)).unwrap().is_empty());
        assert!(!reopened.has(5).unwrap());
    }

    #[test]
    fn test_tables_are_isolated() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let mut first = DbNodeStore::with_table(db.clone(), CachePolicy::Empty, 1);
        let second = DbNodeStore::with_table(db.clone(), CachePolicy::Empty, 2);

        first.insert(Node { lft: 1, rgt: 2, ..Node::new(1) }).unwrap();
        assert!(!second.has(1).unwrap());
        assert_eq!(second.count().unwrap(), 0);
        assert!(second.find(&NodeFilter::in_root(1)).unwrap().is_empty());
    }
}
