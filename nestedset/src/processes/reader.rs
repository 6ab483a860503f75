use crate::{
    config::TreeConfig,
    errors::{TreeError, TreeResult},
    model::{
        stores::{NodeFilter, NodeStoreReader},
        Node, NodeId, RootId,
    },
    processes::fields::{generate_additional_fields, generate_fields_from},
};
use itertools::Itertools;
use std::{collections::BTreeMap, ops::Deref};

/// Read-only ancestry queries over a forest.
///
/// Every fact is derived from interval containment. When level or parent ids are persisted
/// the reader uses them to narrow store queries, otherwise it reconstructs them, so all nodes
/// returned carry correct `level` and `parent_id` under either strategy.
///
/// Node arguments are only used for their id: the reader always works on the current row.
pub struct TreeReader<H> {
    store: H,
    config: TreeConfig,
}

impl<H> TreeReader<H>
where
    H: Deref,
    H::Target: NodeStoreReader,
{
    pub fn new(store: H, config: TreeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    fn tracks_all(&self) -> bool {
        self.config.tracks_level() && self.config.tracks_parent()
    }

    fn load(&self, id: NodeId) -> TreeResult<Node> {
        self.store.get(id).map_err(|err| TreeError::lookup(id, err))
    }

    /// Fills in the derived columns of `node` from its enclosing intervals
    pub(crate) fn hydrate(&self, mut node: Node) -> TreeResult<Node> {
        if self.tracks_all() || !node.is_valid() {
            return Ok(node);
        }
        let ancestors = self.store.find(&NodeFilter::ancestors_of(&node))?;
        if !self.config.tracks_level() {
            node.level = ancestors.len() as i64;
        }
        if !self.config.tracks_parent() {
            node.parent_id = ancestors.last().map(|a| a.id);
        }
        Ok(node)
    }

    fn first_match(&self, filter: &NodeFilter) -> TreeResult<Option<Node>> {
        match self.store.find(filter)?.into_iter().next() {
            Some(node) => Ok(Some(self.hydrate(node)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.store.has(id)?)
    }

    pub fn get(&self, id: NodeId) -> TreeResult<Node> {
        let node = self.load(id)?;
        self.hydrate(node)
    }

    /// Like [`Self::get`], with a missing node as `None`
    pub fn find(&self, id: NodeId) -> TreeResult<Option<Node>> {
        match self.get(id) {
            Ok(node) => Ok(Some(node)),
            Err(TreeError::NodeNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// `node` holds a valid interval and is persisted
    pub fn is_valid_node(&self, node: &Node) -> TreeResult<bool> {
        Ok(node.is_valid() && self.store.has(node.id)?)
    }

    pub fn fetch_root(&self, root_id: RootId) -> TreeResult<Option<Node>> {
        self.fetch_root_where(root_id, &NodeFilter::all())
    }

    /// Fetches the root of tree `root_id` if it also satisfies `extra`
    pub fn fetch_root_where(&self, root_id: RootId, extra: &NodeFilter) -> TreeResult<Option<Node>> {
        Ok(self.store.find(&extra.clone().and(&NodeFilter::in_root(root_id).roots_only()))?.into_iter().next())
    }

    pub fn fetch_roots(&self) -> TreeResult<Vec<Node>> {
        self.fetch_roots_where(&NodeFilter::all())
    }

    pub fn fetch_roots_where(&self, extra: &NodeFilter) -> TreeResult<Vec<Node>> {
        // Roots are persisted with level 0 and no parent under every strategy
        Ok(self.store.find(&extra.clone().roots_only())?)
    }

    /// Fetches tree `root_id` in preorder, limited to `depth` levels below the root when given.
    /// `Some(0)` yields the root alone, `None` the whole tree.
    pub fn fetch_tree(&self, depth: Option<u32>, root_id: RootId) -> TreeResult<Vec<Node>> {
        self.fetch_tree_where(depth, root_id, &NodeFilter::all())
    }

    pub fn fetch_tree_where(&self, depth: Option<u32>, root_id: RootId, extra: &NodeFilter) -> TreeResult<Vec<Node>> {
        let mut filter = NodeFilter::in_root(root_id);
        if let (Some(depth), true) = (depth, self.config.tracks_level()) {
            filter = filter.level_between(0, depth as i64);
        }
        if self.tracks_all() {
            return Ok(self.store.find(&extra.clone().and(&filter))?);
        }

        let mut nodes = self.store.find(&filter)?;
        generate_additional_fields(&mut nodes)?;
        if let Some(depth) = depth {
            nodes.retain(|n| n.level <= depth as i64);
        }
        nodes.retain(|n| extra.matches(n));
        Ok(nodes)
    }

    /// Returns the ancestors of `node` root first, limited to the `depth` closest ones when given
    pub fn ancestors(&self, node: &Node, depth: Option<u32>) -> TreeResult<Vec<Node>> {
        let node = self.load(node.id)?;
        let mut filter = NodeFilter::ancestors_of(&node);
        if self.tracks_all() {
            if let Some(depth) = depth {
                filter = filter.level_between(node.level - depth as i64, node.level - 1);
            }
            return Ok(self.store.find(&filter)?);
        }

        let mut chain = self.store.find(&filter)?;
        let mut parent = None;
        for (level, ancestor) in chain.iter_mut().enumerate() {
            if !self.config.tracks_level() {
                ancestor.level = level as i64;
            }
            if !self.config.tracks_parent() {
                ancestor.parent_id = parent;
            }
            parent = Some(ancestor.id);
        }
        if let Some(depth) = depth {
            chain.drain(..chain.len().saturating_sub(depth as usize));
        }
        Ok(chain)
    }

    /// Returns the descendants of `node` in preorder, limited to `depth` levels below it when given
    pub fn descendants(&self, node: &Node, depth: Option<u32>) -> TreeResult<Vec<Node>> {
        let node = self.load(node.id)?;
        let mut filter = NodeFilter::descendants_of(&node);
        if self.tracks_all() {
            if let Some(depth) = depth {
                filter = filter.level_between(node.level + 1, node.level + depth as i64);
            }
            return Ok(self.store.find(&filter)?);
        }

        let node = self.hydrate(node)?;
        if let (Some(depth), true) = (depth, self.config.tracks_level()) {
            filter = filter.level_between(node.level + 1, node.level + depth as i64);
        }
        let mut subtree = vec![node.clone()];
        subtree.extend(self.store.find(&filter)?);
        generate_fields_from(&mut subtree, node.level, node.parent_id)?;

        let mut descendants = subtree.split_off(1);
        if let Some(depth) = depth {
            descendants.retain(|n| n.level <= node.level + depth as i64);
        }
        Ok(descendants)
    }

    pub fn children(&self, node: &Node) -> TreeResult<Vec<Node>> {
        self.descendants(node, Some(1))
    }

    pub fn number_children(&self, node: &Node) -> TreeResult<usize> {
        Ok(self.children(node)?.len())
    }

    /// Returns the tightest enclosing node, `None` for a root
    pub fn parent(&self, node: &Node) -> TreeResult<Option<Node>> {
        let node = self.load(node.id)?;
        if self.config.tracks_parent() {
            return match node.parent_id {
                Some(parent_id) => Ok(Some(self.get(parent_id)?)),
                None => Ok(None),
            };
        }
        Ok(self.ancestors(&node, Some(1))?.pop())
    }

    pub fn first_child(&self, node: &Node) -> TreeResult<Option<Node>> {
        let node = self.load(node.id)?;
        self.first_match(&NodeFilter::in_root(node.root_id).lft_eq(node.lft + 1))
    }

    pub fn last_child(&self, node: &Node) -> TreeResult<Option<Node>> {
        let node = self.load(node.id)?;
        self.first_match(&NodeFilter::in_root(node.root_id).rgt_eq(node.rgt - 1))
    }

    pub fn prev_sibling(&self, node: &Node) -> TreeResult<Option<Node>> {
        let node = self.load(node.id)?;
        self.first_match(&NodeFilter::in_root(node.root_id).rgt_eq(node.lft - 1))
    }

    pub fn next_sibling(&self, node: &Node) -> TreeResult<Option<Node>> {
        let node = self.load(node.id)?;
        self.first_match(&NodeFilter::in_root(node.root_id).lft_eq(node.rgt + 1))
    }

    pub fn has_prev_sibling(&self, node: &Node) -> TreeResult<bool> {
        Ok(self.prev_sibling(node)?.is_some())
    }

    pub fn has_next_sibling(&self, node: &Node) -> TreeResult<bool> {
        Ok(self.next_sibling(node)?.is_some())
    }

    /// Children of the parent of `node`. A root has no siblings besides itself.
    pub fn siblings(&self, node: &Node, include_self: bool) -> TreeResult<Vec<Node>> {
        let node = self.load(node.id)?;
        let mut siblings = match self.parent(&node)? {
            Some(parent) => self.children(&parent)?,
            None => vec![self.hydrate(node.clone())?],
        };
        if !include_self {
            siblings.retain(|n| n.id != node.id);
        }
        Ok(siblings)
    }

    pub fn count_nodes_per_level(&self, root_id: RootId) -> TreeResult<BTreeMap<i64, usize>> {
        Ok(self.fetch_tree(None, root_id)?.iter().map(|n| n.level).counts().into_iter().collect())
    }
}
