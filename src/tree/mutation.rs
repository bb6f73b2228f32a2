//! Create, rename, delete and move. Each operation returns a new `Tree`.

use crate::error::{TreeError, TreeResult};
use crate::model::{NodeData, NodeId, TreeNode};
use crate::tree::Tree;
use tracing::debug;

impl Tree {
    /// Creates a new node under `parent_id` and returns the new tree along with the node.
    ///
    /// The node gets the id one past `last_id`, so ids of deleted nodes are never handed out
    /// again, and is flagged `provisional` until sync replaces it with a backend id. Passing the
    /// root's id (or `TOP`) places the node at the top level.
    ///
    /// # Errors
    /// - `NotFound` if `parent_id` is not in the tree.
    /// - `Validation` if the label is blank or the id space is exhausted.
    pub fn create_node(&self, parent_id: NodeId, label: &str) -> TreeResult<(Tree, TreeNode)> {
        let label = validate_label(label)?;
        if !self.is_top_level_target(parent_id) && !self.contains(parent_id) {
            return Err(TreeError::NotFound(parent_id));
        }
        let id = self
            .last_id()
            .value()
            .checked_add(1)
            .map(NodeId::new)
            .ok_or_else(|| TreeError::Validation("no Bommel ids left".to_string()))?;
        let node = TreeNode {
            id,
            parent_id: self.normalize_parent(parent_id),
            label,
            droppable: true,
            provisional: true,
            data: NodeData::default(),
        };
        debug!("Creating provisional Bommel {id} under {parent_id}");
        let mut next = self.clone().with_last_id(id);
        next.nodes.push(node.clone());
        Ok((next, node))
    }

    pub fn rename_node(&self, id: NodeId, label: &str) -> TreeResult<Tree> {
        let label = validate_label(label)?;
        self.edit(id, |node| node.label = label)
    }

    /// Sets or clears the emoji of a node.
    pub fn set_emoji(&self, id: NodeId, emoji: Option<&str>) -> TreeResult<Tree> {
        let emoji = emoji.map(str::trim).filter(|e| !e.is_empty()).map(String::from);
        self.edit(id, |node| node.data.emoji = emoji)
    }

    /// Removes exactly the node `id`. Its children keep their `parent_id`; use `delete_subtree`
    /// to remove them too.
    pub fn delete_node(&self, id: NodeId) -> TreeResult<Tree> {
        let node = self.get(id).ok_or(TreeError::NotFound(id))?;
        if node.is_root() {
            return Err(TreeError::Validation(format!(
                "the root Bommel {id} cannot be deleted"
            )));
        }
        let mut next = self.clone();
        next.nodes.retain(|n| n.id != id);
        Ok(next)
    }

    /// Removes `id` and all of its descendants, deepest first.
    pub fn delete_subtree(&self, id: NodeId) -> TreeResult<Tree> {
        let descendants = self.descendants(id)?;
        let mut next = self.clone();
        for child in descendants.into_iter().rev() {
            next = next.delete_node(child)?;
        }
        next.delete_node(id)
    }

    /// Whether `drag_id` may be dropped onto `target_id` as its new parent.
    ///
    /// Never fails: unknown ids and every illegal combination simply yield `false`. The root is
    /// never draggable. A target of `TOP` or the root's id means "top level" and is accepted even
    /// though the root itself is not `droppable`.
    pub fn can_drop(&self, drag_id: NodeId, target_id: NodeId) -> bool {
        let drag = match self.get(drag_id) {
            Some(node) => node,
            None => return false,
        };
        if drag.is_root() || drag_id == target_id {
            return false;
        }
        if self.is_top_level_target(target_id) {
            return true;
        }
        let target = match self.get(target_id) {
            Some(node) => node,
            None => return false,
        };
        if self.is_descendant_of(target_id, drag_id) {
            return false;
        }
        if drag.parent_id == target_id {
            return true;
        }
        target.droppable
    }

    /// Reparents `drag_id` under `target_id`, if `can_drop` allows it.
    ///
    /// # Errors
    /// - `InvalidMove` if `can_drop` is false. The tree is unchanged.
    pub fn move_node(&self, drag_id: NodeId, target_id: NodeId) -> TreeResult<Tree> {
        if !self.can_drop(drag_id, target_id) {
            return Err(TreeError::InvalidMove {
                drag: drag_id,
                target: target_id,
            });
        }
        let parent_id = self.normalize_parent(target_id);
        debug!("Moving Bommel {drag_id} under {parent_id}");
        self.edit(drag_id, |node| node.parent_id = parent_id)
    }

    fn edit(&self, id: NodeId, f: impl FnOnce(&mut TreeNode)) -> TreeResult<Tree> {
        let mut node = self.get(id).cloned().ok_or(TreeError::NotFound(id))?;
        f(&mut node);
        let mut next = self.clone();
        next.replace(node)?;
        Ok(next)
    }
}

fn validate_label(label: &str) -> TreeResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(TreeError::Validation(
            "a Bommel name cannot be empty".to_string(),
        ));
    }
    Ok(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{chain, node, root, wide};

    fn id(v: i64) -> NodeId {
        NodeId::new(v)
    }

    #[test]
    fn test_create_node_assigns_next_id() {
        let tree = wide();
        let (next, created) = tree.create_node(id(3), "Lights").unwrap();
        assert_eq!(created.id(), id(7));
        assert_eq!(created.parent_id(), id(3));
        assert!(created.droppable());
        assert!(created.is_provisional());
        assert!(!created.is_root());
        assert_eq!(next.len(), tree.len() + 1);
        // the prior value is untouched
        assert!(!tree.contains(id(7)));

        let (next, again) = next.create_node(id(7), "Cables").unwrap();
        assert_eq!(again.id(), id(8));
        assert!(next.contains(id(8)));
    }

    #[test]
    fn test_create_node_never_reuses_deleted_ids() {
        let tree = wide().delete_node(id(6)).unwrap();
        let (tree, created) = tree.create_node(id(3), "Lights").unwrap();
        assert_eq!(created.id(), id(7));

        // a provisional node deleted again still counts
        let tree = tree.delete_node(id(7)).unwrap();
        let (tree, again) = tree.create_node(id(3), "Lights").unwrap();
        assert_eq!(again.id(), id(8));

        let tree = tree.delete_subtree(id(2)).unwrap();
        let (_, third) = tree.create_node(NodeId::TOP, "Board").unwrap();
        assert_eq!(third.id(), id(9));
    }

    #[test]
    fn test_create_node_id_overflow() {
        let tree = Tree::new(vec![root(1, "Org"), node(i64::MAX, 0, "Last")]).unwrap();
        assert!(matches!(
            tree.create_node(id(1), "x").unwrap_err(),
            TreeError::Validation(_)
        ));
    }

    #[test]
    fn test_create_node_under_root_is_top_level() {
        let (_, created) = chain().create_node(id(1), "Board").unwrap();
        assert!(created.parent_id().is_top());
    }

    #[test]
    fn test_create_node_in_empty_tree() {
        let (tree, created) = Tree::default().create_node(NodeId::TOP, "First").unwrap();
        assert_eq!(created.id(), id(1));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_create_node_errors() {
        let tree = chain();
        assert_eq!(
            tree.create_node(id(42), "x").unwrap_err(),
            TreeError::NotFound(id(42))
        );
        assert!(matches!(
            tree.create_node(id(2), "   ").unwrap_err(),
            TreeError::Validation(_)
        ));
    }

    #[test]
    fn test_rename_node() {
        let tree = chain().rename_node(id(2), " Festivals ").unwrap();
        assert_eq!(tree.get(id(2)).unwrap().label(), "Festivals");
        assert!(chain().rename_node(id(2), "").is_err());
        assert_eq!(
            chain().rename_node(id(9), "x").unwrap_err(),
            TreeError::NotFound(id(9))
        );
    }

    #[test]
    fn test_set_emoji() {
        let tree = chain().set_emoji(id(2), Some("🎉")).unwrap();
        assert_eq!(tree.get(id(2)).unwrap().emoji(), Some("🎉"));
        let tree = tree.set_emoji(id(2), Some("  ")).unwrap();
        assert_eq!(tree.get(id(2)).unwrap().emoji(), None);
    }

    #[test]
    fn test_delete_does_not_cascade() {
        let tree = chain().delete_node(id(2)).unwrap();
        assert!(!tree.contains(id(2)));
        assert_eq!(tree.get(id(3)).unwrap().parent_id(), id(2));
    }

    #[test]
    fn test_delete_root_is_rejected() {
        assert!(matches!(
            chain().delete_node(id(1)).unwrap_err(),
            TreeError::Validation(_)
        ));
    }

    #[test]
    fn test_delete_subtree() {
        let tree = wide().delete_subtree(id(2)).unwrap();
        let ids: Vec<i64> = tree.nodes().iter().map(|n| n.id().value()).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_can_drop_ancestor_onto_descendant() {
        let tree = chain();
        assert!(!tree.can_drop(id(1), id(3)));
        assert!(!tree.can_drop(id(2), id(3)));
    }

    #[test]
    fn test_can_drop_onto_root() {
        assert!(chain().can_drop(id(3), id(1)));
        assert!(chain().can_drop(id(3), NodeId::TOP));
    }

    #[test]
    fn test_can_drop_with_explicit_root_parent() {
        let tree = Tree::new(vec![root(1, "Org"), node(2, 1, "a"), node(3, 2, "b")]).unwrap();
        assert!(!tree.can_drop(id(1), id(3)));
        assert!(tree.can_drop(id(3), id(1)));
        assert!(!tree.can_drop(id(2), id(3)));
    }

    #[test]
    fn test_can_drop_never_onto_self_or_descendants() {
        let tree = wide();
        for drag in tree.nodes() {
            let below = tree.descendants(drag.id()).unwrap();
            assert!(!tree.can_drop(drag.id(), drag.id()));
            for target in below {
                assert!(
                    !tree.can_drop(drag.id(), target),
                    "{} onto {target}",
                    drag.id()
                );
            }
        }
    }

    #[test]
    fn test_can_drop_respects_droppable() {
        let mut locked = node(5, 0, "Locked");
        locked.droppable = false;
        let tree = Tree::new(vec![root(1, "Org"), node(2, 0, "a"), locked]).unwrap();
        assert!(!tree.can_drop(id(2), id(5)));
    }

    #[test]
    fn test_can_drop_onto_current_parent_even_if_not_droppable() {
        let mut locked = node(5, 0, "Locked");
        locked.droppable = false;
        let tree = Tree::new(vec![root(1, "Org"), locked, node(6, 5, "child")]).unwrap();
        assert!(tree.can_drop(id(6), id(5)));
    }

    #[test]
    fn test_can_drop_unknown_ids() {
        let tree = chain();
        assert!(!tree.can_drop(id(99), id(2)));
        assert!(!tree.can_drop(id(3), id(99)));
    }

    #[test]
    fn test_can_drop_rejects_cyclic_input() {
        let tree = Tree::new(vec![node(2, 3, "a"), node(3, 2, "b"), node(4, 0, "c")]).unwrap();
        assert!(!tree.can_drop(id(4), id(2)));
    }

    #[test]
    fn test_move_node() {
        let tree = wide().move_node(id(5), id(4)).unwrap();
        assert_eq!(tree.get(id(5)).unwrap().parent_id(), id(4));
        let tree = tree.move_node(id(5), id(1)).unwrap();
        assert!(tree.get(id(5)).unwrap().parent_id().is_top());
    }

    #[test]
    fn test_move_node_invalid_is_atomic() {
        let tree = wide();
        let err = tree.move_node(id(2), id(6)).unwrap_err();
        assert_eq!(
            err,
            TreeError::InvalidMove {
                drag: id(2),
                target: id(6)
            }
        );
        assert_eq!(tree, wide());
    }

    #[test]
    fn test_move_to_current_parent_is_idempotent() {
        let tree = wide();
        for n in tree.nodes().iter().filter(|n| !n.is_root()) {
            let moved = tree.move_node(n.id(), n.parent_id()).unwrap();
            assert_eq!(
                serde_json::to_string(&moved).unwrap(),
                serde_json::to_string(&tree).unwrap()
            );
        }
    }
}
