//! Converts the backend's flat list of Bommels into a `Tree`, and back.

use crate::error::{TreeError, TreeResult};
use crate::model::{BommelStatistics, DomainNode, NodeData, NodeId, Statistics, TreeNode};
use crate::tree::Tree;
use std::collections::BTreeMap;
use tracing::debug;

/// Builds a tree from `entities`, keeping their order.
///
/// Every entity whose parent is absent or is the root becomes a top-level node (`parent_id` is
/// `NodeId::TOP`). Only the entity whose id equals `root_id` is flagged as the root, and it is the
/// only node that is not `droppable`.
///
/// # Errors
/// - `Validation` if an entity is its own parent, has a blank name, or shares its id with another
///   entity.
pub fn build(entities: &[DomainNode], root_id: NodeId) -> TreeResult<Tree> {
    let mut nodes = Vec::with_capacity(entities.len());
    for entity in entities {
        if entity.parent_id() == Some(entity.id) {
            return Err(TreeError::Validation(format!(
                "Bommel {} '{}' is its own parent",
                entity.id, entity.name
            )));
        }
        let label = entity.name.trim();
        if label.is_empty() {
            return Err(TreeError::Validation(format!(
                "Bommel {} has an empty name",
                entity.id
            )));
        }
        let parent_id = match entity.parent_id() {
            Some(parent) if parent != root_id => parent,
            _ => NodeId::TOP,
        };
        let is_root = entity.id == root_id;
        nodes.push(TreeNode {
            id: entity.id,
            parent_id,
            label: label.to_string(),
            droppable: !is_root,
            provisional: false,
            data: NodeData {
                emoji: entity.emoji.clone(),
                is_root,
                statistics: None,
            },
        });
    }
    let tree = Tree::new(nodes)?;
    debug!("Built a tree of {} Bommels with root {root_id}", tree.len());
    Ok(tree)
}

impl Tree {
    /// Returns a copy sorted ascending by `node_depth`. The sort is stable, so nodes at the same
    /// depth keep their order.
    pub fn sorted_by_depth(&self) -> Tree {
        let mut keyed: Vec<(usize, TreeNode)> = self
            .nodes()
            .iter()
            .map(|n| (self.node_depth(n.id()), n.clone()))
            .collect();
        keyed.sort_by_key(|(depth, _)| *depth);
        self.with_nodes(keyed.into_iter().map(|(_, n)| n).collect())
    }

    /// Flattens the tree back into backend entities for persistence hand-off.
    ///
    /// Top-level nodes reference the root as their parent again, the root references nothing.
    /// In a tree without a root, top-level nodes have no parent.
    pub fn to_domain_nodes(&self) -> Vec<DomainNode> {
        let root_id = self.root_id();
        self.nodes()
            .iter()
            .map(|n| {
                let parent = if n.is_root() {
                    None
                } else if n.parent_id().is_top() {
                    root_id
                } else {
                    Some(n.parent_id())
                };
                DomainNode::new(n.id(), parent, n.label(), n.data.emoji.clone())
            })
            .collect()
    }

    /// Returns a copy with `stats` attached to the matching nodes. Nodes without an entry lose any
    /// statistics they had.
    pub fn with_statistics(&self, stats: &BTreeMap<NodeId, BommelStatistics>) -> Tree {
        let nodes = self
            .nodes()
            .iter()
            .map(|n| {
                let mut n = n.clone();
                n.data.statistics = stats.get(&n.id).map(|s| Statistics {
                    income: s.income,
                    expenses: s.expenses,
                    total: s.total,
                    transactions_count: s.transactions_count,
                    sub_bommels_count: None,
                });
                n
            })
            .collect();
        self.with_nodes(nodes)
    }
}
