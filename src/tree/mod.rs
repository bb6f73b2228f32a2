//! The Bommel tree: an owned, flat list of `TreeNode` values plus the walks that the builder,
//! mutation engine, aggregation engine and sync service share.
//!
//! A `Tree` is a value. Every mutation returns a new `Tree` and leaves the old one untouched, so a
//! caller can keep old values around as undo snapshots.
//!
//! The root Bommel and the nodes directly beneath it all carry `NodeId::TOP` as their
//! `parent_id` once built from the backend. Structurally, though, the root is the parent of every
//! top-level node: walks treat a `parent_id` of `TOP` (or of the root's own id) as "child of the
//! root".

mod aggregate;
mod builder;
mod mutation;

pub use aggregate::{Aggregate, AggregateMode};
pub use builder::build;

use crate::error::{TreeError, TreeResult};
use crate::model::{NodeId, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An in-memory Bommel hierarchy for one organization.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeFile", into = "TreeFile")]
pub struct Tree {
    nodes: Vec<TreeNode>,
    /// The highest id this tree has ever held. Never goes down, so deleted ids are not reused.
    last_id: NodeId,
}

/// The stored form of a `Tree`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct TreeFile {
    nodes: Vec<TreeNode>,
    #[serde(default)]
    last_id: NodeId,
}

impl Tree {
    /// Creates a tree from nodes that are already in their flat form.
    ///
    /// # Errors
    /// - `Validation` if two nodes share an id, a node is its own parent, a node uses the `TOP`
    ///   sentinel as its id, or more than one node is flagged as the root.
    pub fn new(nodes: Vec<TreeNode>) -> TreeResult<Self> {
        let mut seen = HashSet::with_capacity(nodes.len());
        let mut roots = 0usize;
        for node in &nodes {
            if node.id.is_top() {
                return Err(TreeError::Validation(format!(
                    "node '{}' uses the reserved id {}",
                    node.label,
                    NodeId::TOP
                )));
            }
            if !seen.insert(node.id) {
                return Err(TreeError::Validation(format!("duplicate id {}", node.id)));
            }
            if node.parent_id == node.id {
                return Err(TreeError::Validation(format!(
                    "node {} is its own parent",
                    node.id
                )));
            }
            if node.is_root() {
                roots += 1;
            }
        }
        if roots > 1 {
            return Err(TreeError::Validation(format!(
                "expected one root node, found {roots}"
            )));
        }
        let last_id = nodes
            .iter()
            .map(|n| n.id)
            .max()
            .unwrap_or(NodeId::TOP)
            .max(NodeId::TOP);
        Ok(Self { nodes, last_id })
    }

    /// The nodes in their stored order.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// The node flagged as the organization's root, if the tree has one.
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.is_root())
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root().map(|n| n.id)
    }

    /// The largest id in the tree, or `TOP` for an empty tree.
    pub fn max_id(&self) -> NodeId {
        self.nodes
            .iter()
            .map(|n| n.id)
            .max()
            .unwrap_or(NodeId::TOP)
    }

    /// The highest id ever held by this tree, including ids of nodes deleted since. New nodes are
    /// numbered above it.
    pub fn last_id(&self) -> NodeId {
        self.last_id.max(self.max_id())
    }

    /// Returns a copy whose `last_id` is at least `id`.
    pub(crate) fn with_last_id(mut self, id: NodeId) -> Tree {
        self.last_id = self.last_id.max(id);
        self
    }

    /// A copy holding `nodes` instead, keeping `last_id`. `nodes` must keep the ids of `self`.
    pub(crate) fn with_nodes(&self, nodes: Vec<TreeNode>) -> Tree {
        Tree {
            nodes,
            last_id: self.last_id,
        }
    }

    /// True for ids that mean "directly under the organization root": `TOP` and the root's id.
    pub(crate) fn is_top_level_target(&self, id: NodeId) -> bool {
        id.is_top() || Some(id) == self.root_id()
    }

    /// Normalizes a parent reference: the root's id is stored as `TOP`.
    pub(crate) fn normalize_parent(&self, parent_id: NodeId) -> NodeId {
        if self.is_top_level_target(parent_id) {
            NodeId::TOP
        } else {
            parent_id
        }
    }

    /// The structural parent of `node`: `None` for the root, the root for top-level nodes when the
    /// tree has a root, otherwise the stored `parent_id` (which may be dangling, or `TOP`).
    pub(crate) fn structural_parent(&self, node: &TreeNode) -> Option<NodeId> {
        if node.is_root() {
            return None;
        }
        match self.root_id() {
            Some(root_id) if self.is_top_level_target(node.parent_id) => Some(root_id),
            _ => Some(node.parent_id),
        }
    }

    /// Maps each structural parent to its children, in stored order.
    pub(crate) fn child_index(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut index: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent) = self.structural_parent(node) {
                index.entry(parent).or_default().push(node.id);
            }
        }
        index
    }

    /// The direct children of `id`, in stored order.
    pub fn children(&self, id: NodeId) -> Vec<&TreeNode> {
        self.nodes
            .iter()
            .filter(|n| self.structural_parent(n) == Some(id))
            .collect()
    }

    /// All transitive descendants of `id`, parents before their children.
    ///
    /// # Errors
    /// - `NotFound` if `id` is not in the tree.
    /// - `CycleDetected` if the walk reaches a node twice.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        let index = self.child_index();
        descendants_in(&index, id)
    }

    /// Returns true if `id` is a transitive descendant of `ancestor`.
    ///
    /// Walks up from `id` through structural parents. A walk that comes back to a node it already
    /// visited is reported as a descendant so that callers fail closed on corrupted input.
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = match self.get(id) {
            Some(node) => node,
            None => return false,
        };
        visited.insert(current.id);
        while let Some(parent) = self.structural_parent(current) {
            if parent == ancestor {
                return true;
            }
            if !visited.insert(parent) {
                return true;
            }
            current = match self.get(parent) {
                Some(node) => node,
                None => return false,
            };
        }
        false
    }

    /// Replaces the node with the same id as `node`. Used by the mutation engine on a fresh copy.
    pub(crate) fn replace(&mut self, node: TreeNode) -> TreeResult<()> {
        let slot = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or(TreeError::NotFound(node.id))?;
        *slot = node;
        Ok(())
    }
}

/// Iterative depth-first walk of `index` below `id`. Children keep their stored order.
pub(crate) fn descendants_in(
    index: &HashMap<NodeId, Vec<NodeId>>,
    id: NodeId,
) -> TreeResult<Vec<NodeId>> {
    let mut visited = HashSet::from([id]);
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = index
        .get(&id)
        .map(|c| c.iter().rev().copied().collect())
        .unwrap_or_default();
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            return Err(TreeError::CycleDetected(current));
        }
        out.push(current);
        if let Some(children) = index.get(&current) {
            stack.extend(children.iter().rev().copied());
        }
    }
    Ok(out)
}

impl TryFrom<TreeFile> for Tree {
    type Error = TreeError;

    fn try_from(file: TreeFile) -> TreeResult<Self> {
        Ok(Tree::new(file.nodes)?.with_last_id(file.last_id))
    }
}

impl From<Tree> for TreeFile {
    fn from(tree: Tree) -> Self {
        let last_id = tree.last_id();
        TreeFile {
            nodes: tree.nodes,
            last_id,
        }
    }
}
