use crate::{
    config::TreeConfig,
    errors::{Relation, RootViolation, TreeError, TreeResult},
    model::{
        stores::{NodeFilter, NodeStore, RowUpdate},
        Node, NodeId, Position, RootId,
    },
    processes::{
        fields::generate_additional_fields,
        reader::TreeReader,
        shift::{shift_range, shift_values},
    },
};
use nestedset_core::trace;

/// Structural mutations of a forest.
///
/// Operates directly on the given store, so a writer is expected to run over a transaction
/// (see [`crate::forest::Forest`]): a failure may leave the store half shifted. All
/// preconditions are verified before the first write.
pub struct TreeWriter<'a> {
    store: &'a mut dyn NodeStore,
    config: TreeConfig,
}

impl<'a> TreeWriter<'a> {
    pub fn new(store: &'a mut dyn NodeStore, config: TreeConfig) -> Self {
        Self { store, config }
    }

    fn load(&self, id: NodeId) -> TreeResult<Node> {
        self.store.get(id).map_err(|err| TreeError::lookup(id, err))
    }

    fn load_attached(&self, id: NodeId) -> TreeResult<Node> {
        let node = self.load(id)?;
        if !node.is_valid() {
            return Err(TreeError::NotAttached(id));
        }
        Ok(node)
    }

    /// Loads an attached node with its level and parent id filled in under every strategy
    fn load_hydrated(&self, id: NodeId) -> TreeResult<Node> {
        let node = self.load_attached(id)?;
        TreeReader::new(&*self.store, self.config).hydrate(node)
    }

    fn check_unattached(&self, node: &Node) -> TreeResult<()> {
        if node.is_valid() || self.store.has(node.id)? {
            return Err(TreeError::AlreadyAttached(node.id));
        }
        Ok(())
    }

    fn check_root_free(&self, node: NodeId, root_id: RootId) -> TreeResult<()> {
        if !self.store.find(&NodeFilter::in_root(root_id))?.is_empty() {
            return Err(TreeError::RootOperationInvalid { node, reason: RootViolation::RootIdTaken(root_id) });
        }
        Ok(())
    }

    /// Clears the columns which are derived on read rather than persisted
    fn persisted(&self, node: &Node) -> Node {
        let mut node = node.clone();
        if !self.config.tracks_level() {
            node.level = 0;
        }
        if !self.config.tracks_parent() {
            node.parent_id = None;
        }
        node
    }

    fn level_delta(&self, delta: i64) -> i64 {
        if self.config.tracks_level() { delta } else { 0 }
    }

    /// Attaches `node` as the root of a new tree. In multi-root mode the tree is keyed by the
    /// node's own `root_id` (its id unless set explicitly), otherwise by the configured default.
    pub fn create_root(&mut self, node: Node) -> TreeResult<Node> {
        self.check_unattached(&node)?;
        let root_id = if self.config.multi_root { node.root_id } else { self.config.default_root_id };
        self.check_root_free(node.id, root_id)?;

        let node = Node { lft: 1, rgt: 2, root_id, level: 0, parent_id: None, ..node };
        self.store.insert(node.clone())?;
        Ok(node)
    }

    /// Attaches the unattached `node` at `position` relative to `dest`
    pub fn insert(&mut self, node: Node, dest: &Node, position: Position) -> TreeResult<Node> {
        self.check_unattached(&node)?;
        if node.id == dest.id {
            return Err(TreeError::SelfReference { node: node.id, dest: dest.id, relation: Relation::Same });
        }
        let dest = self.load_hydrated(dest.id)?;
        if dest.is_root() && position != Position::FirstChild && position != Position::LastChild {
            let reason = if position == Position::Parent { RootViolation::ParentOfRoot } else { RootViolation::SiblingOfRoot };
            return Err(TreeError::RootOperationInvalid { node: node.id, reason });
        }

        match position {
            Position::Parent => self.wrap(node, &dest),
            _ => self.place(node, &dest, position),
        }
    }

    pub fn insert_as_parent_of(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(node, dest, Position::Parent)
    }

    pub fn insert_as_prev_sibling_of(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(node, dest, Position::PrevSibling)
    }

    pub fn insert_as_next_sibling_of(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(node, dest, Position::NextSibling)
    }

    pub fn insert_as_first_child_of(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(node, dest, Position::FirstChild)
    }

    pub fn insert_as_last_child_of(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        self.insert(node, dest, Position::LastChild)
    }

    pub fn add_child(&mut self, parent: &Node, node: Node) -> TreeResult<Node> {
        self.insert_as_last_child_of(node, parent)
    }

    /// Makes `node` the parent of `dest`, pushing the subtree of `dest` one level deeper
    fn wrap(&mut self, node: Node, dest: &Node) -> TreeResult<Node> {
        shift_values(self.store, dest.rgt + 1, 2, dest.root_id)?;
        let update = RowUpdate::default().shift_bounds(1).shift_level(self.level_delta(1));
        self.store.update_where(&NodeFilter::subtree_of(dest), &update)?;

        let node =
            Node { lft: dest.lft, rgt: dest.rgt + 2, root_id: dest.root_id, level: dest.level, parent_id: dest.parent_id, ..node };
        self.store.insert(self.persisted(&node))?;
        if self.config.tracks_parent() {
            let wrapped = self.load(dest.id)?;
            self.store.put(Node { parent_id: Some(node.id), ..wrapped })?;
        }
        Ok(node)
    }

    /// Opens a 2-wide gap next to the `dest` snapshot and places `node` in it
    fn place(&mut self, node: Node, dest: &Node, position: Position) -> TreeResult<Node> {
        let anchor = position.anchor(dest);
        shift_values(self.store, anchor, 2, dest.root_id)?;

        let parent_id = if position.is_sibling() { dest.parent_id } else { Some(dest.id) };
        let node =
            Node { lft: anchor, rgt: anchor + 1, root_id: dest.root_id, level: position.level(dest.level), parent_id, ..node };
        self.store.put(self.persisted(&node))?;
        Ok(node)
    }

    /// Moves `node` together with its subtree to `position` relative to `dest`, possibly into another tree
    pub fn move_node(&mut self, node: &Node, dest: &Node, position: Position) -> TreeResult<Node> {
        if position == Position::Parent {
            return Err(TreeError::UnknownMoveType(position));
        }
        if node.id == dest.id {
            return Err(TreeError::SelfReference { node: node.id, dest: dest.id, relation: Relation::Same });
        }
        let node = self.load_attached(node.id)?;
        let dest = self.load_hydrated(dest.id)?;
        if dest.is_descendant_of(&node) {
            return Err(TreeError::SelfReference { node: node.id, dest: dest.id, relation: Relation::Descendant });
        }
        if dest.is_root() && position.is_sibling() {
            return Err(TreeError::RootOperationInvalid { node: node.id, reason: RootViolation::SiblingOfRoot });
        }

        if node.root_id != dest.root_id { self.move_between_trees(node, &dest, position) } else { self.update_node(node, &dest, position) }
    }

    pub fn move_as_prev_sibling_of(&mut self, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(node, dest, Position::PrevSibling)
    }

    pub fn move_as_next_sibling_of(&mut self, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(node, dest, Position::NextSibling)
    }

    pub fn move_as_first_child_of(&mut self, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(node, dest, Position::FirstChild)
    }

    pub fn move_as_last_child_of(&mut self, node: &Node, dest: &Node) -> TreeResult<Node> {
        self.move_node(node, dest, Position::LastChild)
    }

    fn move_between_trees(&mut self, node: Node, dest: &Node, position: Position) -> TreeResult<Node> {
        let (old_lft, old_rgt, old_level, old_root) = (node.lft, node.rgt, node.level, node.root_id);
        trace!("moving node {} from tree {} to tree {} as {}", node.id, old_root, dest.root_id, position);

        // The single node reinsertion below supplies the last 2 slots of the gap
        shift_values(self.store, position.anchor(dest), old_rgt - old_lft - 1, dest.root_id)?;

        let mut detached = node.with_root_id(dest.root_id);
        detached.detach();
        self.store.put(detached.clone())?;

        let placed = self.place(detached, dest, position)?;
        let node = Node { rgt: placed.lft + (old_rgt - old_lft), ..placed };
        self.store.put(self.persisted(&node))?;

        let relocation = RowUpdate::default()
            .shift_bounds(node.lft - old_lft)
            .shift_level(self.level_delta(node.level - old_level))
            .set_root_id(dest.root_id);
        let interior = NodeFilter::in_root(old_root).lft_gt(old_lft).rgt_lt(old_rgt);
        self.store.update_where(&interior, &relocation)?;

        shift_values(self.store, old_rgt + 1, old_lft - old_rgt - 1, old_root)?;
        Ok(node)
    }

    fn update_node(&mut self, node: Node, dest: &Node, position: Position) -> TreeResult<Node> {
        let root_id = node.root_id;
        let width = node.width();
        let anchor = position.anchor(dest);
        let (mut left, mut right) = (node.lft, node.rgt);
        let new_level = position.level(dest.level);

        shift_values(self.store, anchor, width, root_id)?;
        if left >= anchor {
            left += width;
            right += width;
        }

        let level_delta = self.level_delta(new_level - node.level);
        if level_delta != 0 {
            let interior = NodeFilter::in_root(root_id).lft_gt(left).rgt_lt(right);
            self.store.update_where(&interior, &RowUpdate::default().shift_level(level_delta))?;
        }

        shift_range(self.store, left, right, anchor - left, root_id)?;
        shift_values(self.store, right + 1, -width, root_id)?;

        let parent_id = if position.is_sibling() { dest.parent_id } else { Some(dest.id) };
        let moved = Node { level: new_level, parent_id, ..self.load(node.id)? };
        self.store.put(self.persisted(&moved))?;
        Ok(moved)
    }

    /// Detaches the subtree of `node` into an independent tree keyed by `new_root_id`
    pub fn make_root(&mut self, node: &Node, new_root_id: RootId) -> TreeResult<Node> {
        if !self.config.multi_root {
            return Err(TreeError::RootOperationInvalid { node: node.id, reason: RootViolation::MultiRootDisabled });
        }
        let node = self.load_attached(node.id)?;
        if node.is_root() {
            return Err(TreeError::RootOperationInvalid { node: node.id, reason: RootViolation::AlreadyRoot });
        }
        self.check_root_free(node.id, new_root_id)?;

        let relocation = RowUpdate::default()
            .shift_bounds(1 - node.lft)
            .shift_level(self.level_delta(-node.level))
            .set_root_id(new_root_id);
        self.store.update_where(&NodeFilter::descendants_of(&node), &relocation)?;
        shift_values(self.store, node.rgt + 1, node.lft - node.rgt - 1, node.root_id)?;

        let root = Node { lft: 1, rgt: node.width(), root_id: new_root_id, level: 0, parent_id: None, ..node };
        self.store.put(root.clone())?;
        Ok(root)
    }

    /// Deletes `node` with its whole subtree and closes the gap. Returns the number of removed nodes.
    pub fn delete(&mut self, node: &Node) -> TreeResult<usize> {
        let node = self.load_attached(node.id)?;
        let removed = self.store.delete_where(&NodeFilter::subtree_of(&node))?;
        shift_values(self.store, node.rgt + 1, node.lft - node.rgt - 1, node.root_id)?;
        Ok(removed)
    }

    /// Recomputes level and parent ids of tree `root_id` from its intervals and persists
    /// the tracked ones. Returns the number of rewritten nodes.
    pub fn rebuild_fields(&mut self, root_id: RootId) -> TreeResult<usize> {
        if !self.config.tracks_level() && !self.config.tracks_parent() {
            return Ok(0);
        }
        let stored = self.store.find(&NodeFilter::in_root(root_id))?;
        let mut derived = stored.clone();
        generate_additional_fields(&mut derived)?;

        let mut rewritten = 0;
        for (before, after) in stored.iter().zip(derived) {
            let after = self.persisted(&after);
            if *before != after {
                self.store.put(after)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{LevelStrategy, ParentStrategy},
        model::stores::{MemoryNodeStore, NodeStoreReader},
    };

    fn bounds(store: &MemoryNodeStore, id: NodeId) -> (i64, i64, i64) {
        let n = store.get(id).unwrap();
        (n.lft, n.rgt, n.level)
    }

    fn strategies() -> [TreeConfig; 4] {
        [
            TreeConfig::default(),
            TreeConfig::default().derived(),
            TreeConfig::default().with_level(LevelStrategy::Derived),
            TreeConfig::default().with_parent(ParentStrategy::Derived),
        ]
    }

    /// R(1,10) A(2,5) C(3,4) B(6,9) D(7,8) with ids 1, 2, 4, 3, 5
    fn scenario(config: TreeConfig) -> MemoryNodeStore {
        let mut store = MemoryNodeStore::new();
        let mut writer = TreeWriter::new(&mut store, config);
        let r = writer.create_root(Node::new(1)).unwrap();
        let a = writer.insert_as_last_child_of(Node::new(2), &r).unwrap();
        let b = writer.insert_as_last_child_of(Node::new(3), &r).unwrap();
        writer.insert_as_first_child_of(Node::new(4), &a).unwrap();
        writer.add_child(&b, Node::new(5)).unwrap();
        store
    }

    #[test]
    fn test_build_scenario() {
        let store = scenario(TreeConfig::default());
        assert_eq!(bounds(&store, 1), (1, 10, 0));
        assert_eq!(bounds(&store, 2), (2, 5, 1));
        assert_eq!(bounds(&store, 3), (6, 9, 1));
        assert_eq!(bounds(&store, 4), (3, 4, 2));
        assert_eq!(bounds(&store, 5), (7, 8, 2));
        assert_eq!(store.get(4).unwrap().parent_id, Some(2));
        assert_eq!(store.get(5).unwrap().parent_id, Some(3));
    }

    #[test]
    fn test_insert_as_first_child() {
        let mut store = scenario(TreeConfig::default());
        let b = store.get(3).unwrap();
        let n = TreeWriter::new(&mut store, TreeConfig::default()).insert_as_first_child_of(Node::new(6), &b).unwrap();
        assert_eq!((n.lft, n.rgt, n.level, n.parent_id), (7, 8, 2, Some(3)));
        assert_eq!(bounds(&store, 3), (6, 11, 1));
        assert_eq!(bounds(&store, 5), (9, 10, 2));
        assert_eq!(bounds(&store, 1), (1, 12, 0));
        assert_eq!(bounds(&store, 2), (2, 5, 1));
    }

    #[test]
    fn test_insert_as_parent() {
        let mut store = scenario(TreeConfig::default());
        let a = store.get(2).unwrap();
        let p = TreeWriter::new(&mut store, TreeConfig::default()).insert_as_parent_of(Node::new(6), &a).unwrap();
        assert_eq!((p.lft, p.rgt, p.level, p.parent_id), (2, 7, 1, Some(1)));
        assert_eq!(bounds(&store, 2), (3, 6, 2));
        assert_eq!(bounds(&store, 4), (4, 5, 3));
        assert_eq!(bounds(&store, 3), (8, 11, 1));
        assert_eq!(bounds(&store, 5), (9, 10, 2));
        assert_eq!(bounds(&store, 1), (1, 12, 0));
        assert_eq!(store.get(2).unwrap().parent_id, Some(6));
    }

    #[test]
    fn test_insert_siblings() {
        let mut store = scenario(TreeConfig::default());
        let a = store.get(2).unwrap();
        let mut writer = TreeWriter::new(&mut store, TreeConfig::default());
        let prev = writer.insert_as_prev_sibling_of(Node::new(6), &a).unwrap();
        assert_eq!((prev.lft, prev.rgt, prev.level, prev.parent_id), (2, 3, 1, Some(1)));
        let next = writer.insert_as_next_sibling_of(Node::new(7), &a).unwrap();
        assert_eq!((next.lft, next.rgt, next.level, next.parent_id), (8, 9, 1, Some(1)));
        assert_eq!(bounds(&store, 2), (4, 7, 1));
        assert_eq!(bounds(&store, 3), (10, 13, 1));
        assert_eq!(bounds(&store, 5), (11, 12, 2));
        assert_eq!(bounds(&store, 1), (1, 14, 0));
    }

    #[test]
    fn test_structural_violations() {
        let mut store = scenario(TreeConfig::default());
        let (r, a, c) = (store.get(1).unwrap(), store.get(2).unwrap(), store.get(4).unwrap());
        let mut writer = TreeWriter::new(&mut store, TreeConfig::default());

        assert!(matches!(writer.insert_as_last_child_of(Node::new(2), &r), Err(TreeError::AlreadyAttached(2))));
        assert!(matches!(writer.create_root(Node::new(9)), Err(TreeError::RootOperationInvalid { .. })));
        assert!(matches!(
            writer.insert_as_parent_of(Node::new(9), &r),
            Err(TreeError::RootOperationInvalid { reason: RootViolation::ParentOfRoot, .. })
        ));
        assert!(matches!(
            writer.insert_as_next_sibling_of(Node::new(9), &r),
            Err(TreeError::RootOperationInvalid { reason: RootViolation::SiblingOfRoot, .. })
        ));
        assert!(matches!(writer.insert_as_last_child_of(Node::new(9), &Node::new(42)), Err(TreeError::NodeNotFound(42))));
        assert!(matches!(
            writer.move_as_last_child_of(&a, &c),
            Err(TreeError::SelfReference { relation: Relation::Descendant, .. })
        ));
        assert!(matches!(writer.move_as_last_child_of(&a, &a), Err(TreeError::SelfReference { relation: Relation::Same, .. })));
        assert!(matches!(writer.move_node(&c, &r, Position::Parent), Err(TreeError::UnknownMoveType(Position::Parent))));
        assert!(matches!(
            writer.make_root(&a, 7),
            Err(TreeError::RootOperationInvalid { reason: RootViolation::MultiRootDisabled, .. })
        ));
        assert_eq!(bounds(&store, 1), (1, 10, 0));
        assert_eq!(bounds(&store, 5), (7, 8, 2));
    }

    #[test]
    fn test_same_tree_moves() {
        let mut store = scenario(TreeConfig::default());
        let (a, b) = (store.get(2).unwrap(), store.get(3).unwrap());

        // A(2,5) with C goes under B(6,9), after D
        let moved = TreeWriter::new(&mut store, TreeConfig::default()).move_as_last_child_of(&a, &b).unwrap();
        assert_eq!((moved.lft, moved.rgt, moved.level, moved.parent_id), (5, 8, 2, Some(3)));
        assert_eq!(bounds(&store, 3), (2, 9, 1));
        assert_eq!(bounds(&store, 5), (3, 4, 2));
        assert_eq!(bounds(&store, 4), (6, 7, 3));
        assert_eq!(bounds(&store, 1), (1, 10, 0));

        // And back, as previous sibling of B
        let b = store.get(3).unwrap();
        let moved = TreeWriter::new(&mut store, TreeConfig::default()).move_as_prev_sibling_of(&moved, &b).unwrap();
        assert_eq!((moved.lft, moved.rgt, moved.level, moved.parent_id), (2, 5, 1, Some(1)));
        assert_eq!(bounds(&store, 4), (3, 4, 2));
        assert_eq!(bounds(&store, 3), (6, 9, 1));
        assert_eq!(bounds(&store, 5), (7, 8, 2));
    }

    #[test]
    fn test_cross_tree_move_and_make_root() {
        let config = TreeConfig::default().with_multi_root(true);
        let mut store = scenario(config);
        let a = store.get(2).unwrap();
        let mut writer = TreeWriter::new(&mut store, config);
        let other = writer.create_root(Node::new(10)).unwrap();
        assert_eq!(other.root_id, 10);

        let moved = writer.move_as_last_child_of(&a, &other).unwrap();
        assert_eq!((moved.lft, moved.rgt, moved.level, moved.root_id, moved.parent_id), (2, 5, 1, 10, Some(10)));
        let c = store.get(4).unwrap();
        assert_eq!((c.lft, c.rgt, c.level, c.root_id, c.parent_id), (3, 4, 2, 10, Some(2)));
        assert_eq!(bounds(&store, 10), (1, 6, 0));
        assert_eq!(bounds(&store, 1), (1, 6, 0));
        assert_eq!(bounds(&store, 3), (2, 5, 1));
        assert_eq!(bounds(&store, 5), (3, 4, 2));

        let mut writer = TreeWriter::new(&mut store, config);
        assert!(matches!(
            writer.make_root(&moved, 1),
            Err(TreeError::RootOperationInvalid { reason: RootViolation::RootIdTaken(1), .. })
        ));
        let root = writer.make_root(&moved, 2).unwrap();
        assert_eq!((root.lft, root.rgt, root.level, root.root_id, root.parent_id), (1, 4, 0, 2, None));
        let c = store.get(4).unwrap();
        assert_eq!((c.lft, c.rgt, c.level, c.root_id), (2, 3, 1, 2));
        assert_eq!(bounds(&store, 10), (1, 2, 0));
    }

    #[test]
    fn test_delete_closes_gap() {
        let mut store = scenario(TreeConfig::default());
        let a = store.get(2).unwrap();
        let removed = TreeWriter::new(&mut store, TreeConfig::default()).delete(&a).unwrap();
        assert_eq!(removed, 2);
        assert!(!store.has(4).unwrap());
        assert_eq!(bounds(&store, 3), (2, 5, 1));
        assert_eq!(bounds(&store, 5), (3, 4, 2));
        assert_eq!(bounds(&store, 1), (1, 6, 0));
    }

    #[test]
    fn test_returned_nodes_carry_derived_columns() {
        for config in strategies() {
            let mut store = scenario(config);
            let (a, b, d) = (store.get(2).unwrap(), store.get(3).unwrap(), store.get(5).unwrap());
            let mut writer = TreeWriter::new(&mut store, config);

            let n = writer.add_child(&d, Node::new(6)).unwrap();
            assert_eq!((n.lft, n.rgt, n.level, n.parent_id), (8, 9, 3, Some(5)));
            let p = writer.insert_as_next_sibling_of(Node::new(7), &n).unwrap();
            assert_eq!((p.lft, p.rgt, p.level, p.parent_id), (10, 11, 3, Some(5)));

            // A(2,5) goes under B(6,13) after D(7,12)
            let moved = writer.move_as_last_child_of(&a, &b).unwrap();
            assert_eq!((moved.lft, moved.rgt, moved.level, moved.parent_id), (9, 12, 2, Some(3)));

            let stored = store.get(6).unwrap();
            assert_eq!(stored.level, if config.tracks_level() { 3 } else { 0 });
            assert_eq!(stored.parent_id, if config.tracks_parent() { Some(5) } else { None });
            let stored = store.get(2).unwrap();
            assert_eq!(stored.level, if config.tracks_level() { 2 } else { 0 });
            assert_eq!(stored.parent_id, if config.tracks_parent() { Some(3) } else { None });
        }
    }

    #[test]
    fn test_rebuild_fields() {
        let mut store = scenario(TreeConfig::default());
        let c = store.get(4).unwrap();
        store.put(Node { level: 7, parent_id: None, ..c }).unwrap();
        let rewritten = TreeWriter::new(&mut store, TreeConfig::default()).rebuild_fields(1).unwrap();
        assert_eq!(rewritten, 1);
        assert_eq!(store.get(4).unwrap().level, 2);
        assert_eq!(store.get(4).unwrap().parent_id, Some(2));
    }
}
