use crate::{
    errors::{TreeError, TreeResult},
    model::{Node, NodeId},
};

/// Reconstructs `level` and `parent_id` of a single-rooted, preorder-sorted sequence from interval
/// containment alone. The first node is taken as the tree root (level 0, no parent).
///
/// Rejects with [`TreeError::MalformedSequence`] any input which is not sorted by `lft`, mixes
/// trees, or contains partially overlapping intervals.
pub fn generate_additional_fields(nodes: &mut [Node]) -> TreeResult<()> {
    generate_fields_from(nodes, 0, None)
}

/// Same as [`generate_additional_fields`] for a sequence headed by an inner node whose own
/// level and parent are already known
pub(crate) fn generate_fields_from(nodes: &mut [Node], base_level: i64, base_parent: Option<NodeId>) -> TreeResult<()> {
    let Some(first) = nodes.first() else {
        return Ok(());
    };
    let root_id = first.root_id;

    // Enclosing (rgt, id) pairs of the current node, innermost last
    let mut ancestors: Vec<(i64, NodeId)> = Vec::new();
    let mut prev_lft = i64::MIN;
    for (index, node) in nodes.iter_mut().enumerate() {
        let malformed = |reason: String| TreeError::MalformedSequence { index, reason };
        if node.root_id != root_id {
            return Err(malformed(format!("node {} belongs to tree {} instead of {}", node.id, node.root_id, root_id)));
        }
        if node.lft <= prev_lft {
            return Err(malformed(format!("node {} is out of preorder", node.id)));
        }
        if node.rgt <= node.lft {
            return Err(malformed(format!("node {} has an empty interval", node.id)));
        }
        prev_lft = node.lft;

        while ancestors.last().is_some_and(|&(rgt, _)| rgt < node.lft) {
            ancestors.pop();
        }
        match ancestors.last() {
            None if index > 0 => return Err(malformed(format!("node {} lies outside of the first node", node.id))),
            None => {
                node.level = base_level;
                node.parent_id = base_parent;
            }
            Some(&(rgt, _)) if rgt <= node.rgt => {
                return Err(malformed(format!("node {} partially overlaps its predecessor", node.id)));
            }
            Some(&(_, parent)) => {
                node.level = base_level + ancestors.len() as i64;
                node.parent_id = Some(parent);
            }
        }
        ancestors.push((node.rgt, node.id));
    }
    Ok(())
}
