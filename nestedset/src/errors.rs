use crate::model::{NodeId, Position};
use nestedset_database::prelude::{StoreError, StoreErrorPredicates};
use std::fmt::Display;
use thiserror::Error;

/// How a destination relates to the acting node in a rejected operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Same,
    Ancestor,
    Descendant,
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Same => f.write_str("the node itself"),
            Relation::Ancestor => f.write_str("an ancestor of the node"),
            Relation::Descendant => f.write_str("a descendant of the node"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootViolation {
    /// A root cannot be wrapped by a new parent
    ParentOfRoot,
    /// A root cannot get siblings, the tree would end up with two roots
    SiblingOfRoot,
    AlreadyRoot,
    MultiRootDisabled,
    /// The partition key is already used by another tree
    RootIdTaken(u64),
}

impl Display for RootViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootViolation::ParentOfRoot => f.write_str("cannot insert a parent of a root node"),
            RootViolation::SiblingOfRoot => f.write_str("cannot place a sibling of a root node"),
            RootViolation::AlreadyRoot => f.write_str("node is already a root"),
            RootViolation::MultiRootDisabled => f.write_str("multiple roots are disabled"),
            RootViolation::RootIdTaken(root_id) => write!(f, "root id {root_id} already owns a tree"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("node {0} is already attached to a tree")]
    AlreadyAttached(NodeId),

    #[error("node {0} is not attached to a tree")]
    NotAttached(NodeId),

    #[error("destination {dest} of node {node} is {relation}")]
    SelfReference { node: NodeId, dest: NodeId, relation: Relation },

    #[error("invalid root operation on node {node}: {reason}")]
    RootOperationInvalid { node: NodeId, reason: RootViolation },

    #[error("cannot move a node as {0}")]
    UnknownMoveType(Position),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("malformed preorder sequence at index {index}: {reason}")]
    MalformedSequence { index: usize, reason: String },

    #[error("{0}")]
    StoreError(#[from] StoreError),
}

impl TreeError {
    /// Maps a failed primary-key lookup of `id`, surfacing a missing row as [`TreeError::NodeNotFound`]
    pub(crate) fn lookup(id: NodeId, err: StoreError) -> Self {
        if err.is_key_not_found() { TreeError::NodeNotFound(id) } else { TreeError::StoreError(err) }
    }

    /// Structural violations are rejected before any write takes place
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TreeError::AlreadyAttached(_)
                | TreeError::NotAttached(_)
                | TreeError::SelfReference { .. }
                | TreeError::RootOperationInvalid { .. }
                | TreeError::UnknownMoveType(_)
        )
    }
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;
