use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub type NodeId = u64;

/// Partition key of a tree within the forest. By convention the id of the tree's root node.
pub type RootId = u64;

/// A row of the forest table.
///
/// `lft`/`rgt` bound the node's interval: the interval of every descendant lies strictly
/// inside it, and a node with `rgt > lft` is attached to a tree. `level` and `parent_id`
/// are only meaningful as persisted columns when the matching strategy is tracked, but
/// every node handed out by a reader carries correct values for both.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lft: i64,
    pub rgt: i64,
    pub root_id: RootId,
    pub level: i64,
    pub parent_id: Option<NodeId>,
}

impl Node {
    /// A new unattached node, partitioned under its own id
    pub fn new(id: NodeId) -> Self {
        Self { id, lft: 0, rgt: 0, root_id: id, level: 0, parent_id: None }
    }

    pub fn with_root_id(mut self, root_id: RootId) -> Self {
        self.root_id = root_id;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.rgt > self.lft
    }

    pub fn is_root(&self) -> bool {
        self.lft == 1
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt - self.lft == 1
    }

    pub fn has_children(&self) -> bool {
        self.rgt - self.lft > 1
    }

    pub fn has_parent(&self) -> bool {
        self.is_valid() && !self.is_root()
    }

    /// Same position within the same tree
    pub fn is_equal_to(&self, other: &Node) -> bool {
        self.lft == other.lft && self.rgt == other.rgt && self.root_id == other.root_id
    }

    pub fn is_descendant_of(&self, other: &Node) -> bool {
        other.lft < self.lft && other.rgt > self.rgt && other.root_id == self.root_id
    }

    pub fn is_descendant_of_or_equal_to(&self, other: &Node) -> bool {
        other.lft <= self.lft && other.rgt >= self.rgt && other.root_id == self.root_id
    }

    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        other.lft > self.lft && other.rgt < self.rgt && other.root_id == self.root_id
    }

    pub fn number_descendants(&self) -> i64 {
        (self.rgt - self.lft - 1) / 2
    }

    /// Number of interval slots spanned by the node and its subtree
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Invalidates the interval. In-memory only, nothing is written to the store.
    pub fn detach(&mut self) {
        self.lft = 0;
        self.rgt = 0;
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}[{}, {}]@{}", self.id, self.lft, self.rgt, self.root_id)
    }
}

/// Placement of a node relative to a destination node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Wraps the destination, which becomes the only child of the placed node
    Parent,
    PrevSibling,
    NextSibling,
    FirstChild,
    LastChild,
}

impl Position {
    pub fn is_sibling(self) -> bool {
        matches!(self, Position::PrevSibling | Position::NextSibling)
    }

    /// The `lft` at which a 2-wide gap for a single node is opened next to `dest`
    pub(crate) fn anchor(self, dest: &Node) -> i64 {
        match self {
            Position::Parent | Position::PrevSibling => dest.lft,
            Position::NextSibling => dest.rgt + 1,
            Position::FirstChild => dest.lft + 1,
            Position::LastChild => dest.rgt,
        }
    }

    /// Level of a node placed at this position, given the destination's level
    pub(crate) fn level(self, dest_level: i64) -> i64 {
        match self {
            Position::Parent | Position::PrevSibling | Position::NextSibling => dest_level,
            Position::FirstChild | Position::LastChild => dest_level + 1,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Position::Parent => "parent",
            Position::PrevSibling => "previous sibling",
            Position::NextSibling => "next sibling",
            Position::FirstChild => "first child",
            Position::LastChild => "last child",
        };
        f.write_str(s)
    }
}
