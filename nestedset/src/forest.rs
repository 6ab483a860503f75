use crate::{
    config::TreeConfig,
    errors::TreeResult,
    model::{
        stores::{NodeStore, StagingNodeStore},
        Node, Position, RootId,
    },
    processes::{reader::TreeReader, writer::TreeWriter},
};
use nestedset_core::debug;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

/// A unit of work over a forest store. Dropping it without committing rolls back.
pub type Transaction<'a, S> = StagingNodeStore<'a, S>;

/// Coordinates atomic structural edits of a forest.
///
/// Every writer operation takes an optional transaction. With `None` the forest opens its own,
/// committing on success and rolling back on failure. With a caller transaction the operation is
/// staged into it, and on failure the transaction is restored to its state before the operation,
/// so several edits can be composed and committed together.
///
/// Structural writes are serialized store-wide: only one transaction may be open at a time while
/// readers keep observing the committed state. Holding a [`Self::reader`] on the same thread while
/// committing deadlocks.
pub struct Forest<S: NodeStore> {
    store: Arc<RwLock<S>>,
    config: TreeConfig,
}

impl<S: NodeStore> Forest<S> {
    pub fn new(store: S, config: TreeConfig) -> Self {
        Self::with_shared_store(Arc::new(RwLock::new(store)), config)
    }

    pub fn with_shared_store(store: Arc<RwLock<S>>, config: TreeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RwLock<S>> {
        &self.store
    }

    /// Opens a transaction. Blocks while another transaction is open.
    pub fn begin(&self) -> Transaction<'_, S> {
        StagingNodeStore::new(self.store.upgradable_read())
    }

    pub fn commit(&self, tx: Transaction<'_, S>) -> TreeResult<()> {
        tx.commit()?;
        Ok(())
    }

    /// A reader over the committed state
    pub fn reader(&self) -> TreeReader<RwLockReadGuard<'_, S>> {
        TreeReader::new(self.store.read(), self.config)
    }

    /// A reader over the committed state overlaid with the changes staged in `tx`
    pub fn reader_in<'t, 'a>(&self, tx: &'t Transaction<'a, S>) -> TreeReader<&'t Transaction<'a, S>> {
        TreeReader::new(tx, self.config)
    }

    fn run<T>(
        &self,
        tx: Option<&mut Transaction<'_, S>>,
        op: &str,
        f: impl FnOnce(&mut TreeWriter<'_>) -> TreeResult<T>,
    ) -> TreeResult<T> {
        match tx {
            Some(tx) => {
                let checkpoint = tx.checkpoint();
                let result = f(&mut TreeWriter::new(&mut *tx, self.config));
                match result {
                    Ok(value) => {
                        debug!("{op} staged");
                        Ok(value)
                    }
                    Err(err) => {
                        tx.restore(checkpoint);
                        debug!("{op} rolled back: {err}");
                        Err(err)
                    }
                }
            }
            None => {
                let mut tx = self.begin();
                let value = f(&mut TreeWriter::new(&mut tx, self.config)).inspect_err(|err| debug!("{op} rolled back: {err}"))?;
                tx.commit()?;
                debug!("{op} committed");
                Ok(value)
            }
        }
    }

    pub fn create_root(&self, tx: Option<&mut Transaction<'_, S>>, node: Node) -> TreeResult<Node> {
        self.run(tx, &format!("create root {}", node.id), |w| w.create_root(node))
    }

    pub fn insert(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node, position: Position) -> TreeResult<Node> {
        self.run(tx, &format!("insert {} as {} of {}", node.id, position, dest.id), |w| w.insert(node, dest, position))
    }

    pub fn insert_as_parent_of(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(tx, node, dest, Position::Parent)
    }

    pub fn insert_as_prev_sibling_of(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(tx, node, dest, Position::PrevSibling)
    }

    pub fn insert_as_next_sibling_of(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(tx, node, dest, Position::NextSibling)
    }

    pub fn insert_as_first_child_of(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(tx, node, dest, Position::FirstChild)
    }

    pub fn insert_as_last_child_of(&self, tx: Option<&mut Transaction<'_, S>>, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(tx, node, dest, Position::LastChild)
    }

    pub fn add_child(&self, tx: Option<&mut Transaction<'_, S>>, parent: &Node, node: Node) -> TreeResult<Node> {
        self.insert(tx, node, parent, Position::LastChild)
    }

    pub fn move_node(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, dest: &Node, position: Position) -> TreeResult<Node> {
        self.run(tx, &format!("move {} as {} of {}", node.id, position, dest.id), |w| w.move_node(node, dest, position))
    }

    pub fn move_as_prev_sibling_of(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(tx, node, dest, Position::PrevSibling)
    }

    pub fn move_as_next_sibling_of(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(tx, node, dest, Position::NextSibling)
    }

    pub fn move_as_first_child_of(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(tx, node, dest, Position::FirstChild)
    }

    pub fn move_as_last_child_of(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(tx, node, dest, Position::LastChild)
    }

    pub fn make_root(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node, new_root_id: RootId) -> TreeResult<Node> {
        self.run(tx, &format!("make root {} of tree {}", node.id, new_root_id), |w| w.make_root(node, new_root_id))
    }

    pub fn delete(&self, tx: Option<&mut Transaction<'_, S>>, node: &Node) -> TreeResult<usize> {
        self.run(tx, &format!("delete {}", node.id), |w| w.delete(node))
    }

    pub fn rebuild_fields(&self, tx: Option<&mut Transaction<'_, S>>, root_id: RootId) -> TreeResult<usize> {
        self.run(tx, &format!("rebuild fields of tree {root_id}"), |w| w.rebuild_fields(root_id))
    }
}
