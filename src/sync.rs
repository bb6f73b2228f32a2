//! Reconciles an edited tree with the backend.
//!
//! `plan` compares the working tree with the snapshot taken at the last sync and classifies every
//! node. `push` walks the plan in order and awaits the backend for each change, one at a time.
//! Creates return server ids, and these replace the provisional ids before any child that
//! references them is sent.

use crate::api::Backend;
use crate::error::{TreeError, TreeResult};
use crate::model::{DomainNode, NodeData, NodeId, NodePayload, TreeNode};
use crate::tree::{self, Tree};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};

/// What `push` will do with a node.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A provisional node that the backend has never seen.
    Create,
    /// Label, emoji or parent differ from the snapshot.
    Update,
    Unchanged,
    /// In the snapshot but no longer in the working tree.
    Delete,
}

serde_plain::derive_display_from_serialize!(ChangeKind);
serde_plain::derive_fromstr_from_deserialize!(ChangeKind);

/// One entry of a `SyncPlan`. For `Delete` the node is the one from the snapshot.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NodeChange {
    pub kind: ChangeKind,
    pub node: TreeNode,
}

/// The ordered list of changes that brings the backend in line with the working tree.
///
/// Creates, updates and unchanged nodes come first, parents before their children. Deletes come
/// last, children before their parents.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncPlan {
    changes: Vec<NodeChange>,
}

impl SyncPlan {
    pub fn changes(&self) -> &[NodeChange] {
        &self.changes
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.kind == ChangeKind::Unchanged)
    }
}

/// The result of a successful `push`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncOutcome {
    /// The working tree with every provisional id replaced by its server id.
    pub tree: Tree,
    /// Provisional id to server id.
    pub id_map: BTreeMap<NodeId, NodeId>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Classifies every node of `current` against `snapshot` and orders the result for `push`.
///
/// Without a snapshot, every node that is not provisional is `Unchanged`. A node that is not
/// provisional but is missing from an existing snapshot is sent as an `Update`. A snapshot node is
/// deleted when the working tree no longer holds it, or holds a provisional node under its id.
///
/// # Errors
/// - `DependencyOrder` if the parent links of `current` contain a cycle.
pub fn plan(current: &Tree, snapshot: Option<&Tree>) -> TreeResult<SyncPlan> {
    let mut changes = Vec::with_capacity(current.len());
    for id in dependency_order(current)? {
        let node = current.get(id).ok_or(TreeError::NotFound(id))?;
        let kind = if node.is_provisional() {
            ChangeKind::Create
        } else {
            match snapshot {
                None => ChangeKind::Unchanged,
                Some(snapshot) => match snapshot.get(id) {
                    Some(before) if !differs(before, node) => ChangeKind::Unchanged,
                    _ => ChangeKind::Update,
                },
            }
        };
        changes.push(NodeChange {
            kind,
            node: node.clone(),
        });
    }

    if let Some(snapshot) = snapshot {
        let mut removed: Vec<(usize, &TreeNode)> = snapshot
            .nodes()
            .iter()
            .filter(|n| current.get(n.id()).map_or(true, |c| c.is_provisional()))
            .map(|n| (snapshot.node_depth(n.id()), n))
            .collect();
        removed.sort_by(|a, b| b.0.cmp(&a.0));
        changes.extend(removed.into_iter().map(|(_, n)| NodeChange {
            kind: ChangeKind::Delete,
            node: n.clone(),
        }));
    }

    let plan = SyncPlan { changes };
    debug!(
        "Planned {} creates, {} updates, {} deletes",
        plan.count(ChangeKind::Create),
        plan.count(ChangeKind::Update),
        plan.count(ChangeKind::Delete)
    );
    Ok(plan)
}

/// Sends `plan` to `backend`, one change at a time and in order.
///
/// The first failing call aborts the walk and its error is returned. Changes sent before the
/// failure stay applied on the backend.
pub async fn push<B>(
    backend: &mut B,
    organization_id: i64,
    plan: &SyncPlan,
    current: &Tree,
) -> Result<SyncOutcome>
where
    B: Backend + ?Sized,
{
    let root = backend
        .get_or_create_root(organization_id)
        .await
        .context("Unable to get the organization's root Bommel")?;
    let tree_root = current.root_id();
    let mut id_map: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let (mut created, mut updated, mut deleted) = (0, 0, 0);

    for change in plan.changes() {
        let node = &change.node;
        match change.kind {
            ChangeKind::Unchanged => {}
            ChangeKind::Create => {
                let payload = payload(organization_id, node, root.id, tree_root, &id_map);
                let stored = backend
                    .create_node(&payload)
                    .await
                    .with_context(|| format!("Unable to create Bommel '{}'", node.label()))?;
                debug!("Created Bommel {} as {}", node.id(), stored.id);
                id_map.insert(node.id(), stored.id);
                created += 1;
            }
            ChangeKind::Update => {
                let payload = payload(organization_id, node, root.id, tree_root, &id_map);
                backend
                    .update_node(node.id(), &payload)
                    .await
                    .with_context(|| format!("Unable to update Bommel {}", node.id()))?;
                updated += 1;
            }
            ChangeKind::Delete => {
                backend
                    .delete_node(organization_id, node.id())
                    .await
                    .with_context(|| format!("Unable to delete Bommel {}", node.id()))?;
                deleted += 1;
            }
        }
    }
    info!("Pushed {created} creates, {updated} updates and {deleted} deletes");

    Ok(SyncOutcome {
        tree: remap(current, &root, &id_map)?,
        id_map,
        created,
        updated,
        deleted,
    })
}

/// Fetches the organization's Bommels and builds the tree, creating the root if needed.
pub async fn pull<B>(backend: &mut B, organization_id: i64) -> Result<Tree>
where
    B: Backend + ?Sized,
{
    let root = backend
        .get_or_create_root(organization_id)
        .await
        .context("Unable to get the organization's root Bommel")?;
    let nodes = backend
        .list_nodes(organization_id)
        .await
        .context("Unable to list the organization's Bommels")?;
    let tree = tree::build(&nodes, root.id)?;
    debug!("Pulled {} Bommels", tree.len());
    Ok(tree)
}

/// Node ids in parent-before-child order. Siblings keep their stored order.
fn dependency_order(tree: &Tree) -> TreeResult<Vec<NodeId>> {
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut ready = VecDeque::new();
    for node in tree.nodes() {
        match tree.structural_parent(node) {
            Some(parent) if tree.contains(parent) => {
                children.entry(parent).or_default().push(node.id())
            }
            // roots, top-level nodes of a rootless tree and dangling parents depend on nothing
            _ => ready.push_back(node.id()),
        }
    }
    let mut order = Vec::with_capacity(tree.len());
    while let Some(id) = ready.pop_front() {
        order.push(id);
        if let Some(kids) = children.remove(&id) {
            ready.extend(kids);
        }
    }
    if order.len() != tree.len() {
        let stuck: Vec<String> = tree
            .nodes()
            .iter()
            .map(|n| n.id())
            .filter(|id| !order.contains(id))
            .map(|id| id.to_string())
            .collect();
        return Err(TreeError::DependencyOrder(format!(
            "the parent links of Bommels [{}] form a cycle",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

fn differs(before: &TreeNode, after: &TreeNode) -> bool {
    before.label() != after.label()
        || before.emoji() != after.emoji()
        || before.parent_id() != after.parent_id()
}

/// The backend body for `node`. Top-level nodes point at the backend's root, provisional parents
/// are replaced by the ids they were created under.
fn payload(
    organization_id: i64,
    node: &TreeNode,
    root_id: NodeId,
    tree_root: Option<NodeId>,
    id_map: &BTreeMap<NodeId, NodeId>,
) -> NodePayload {
    let parent_id = if node.is_root() {
        None
    } else if node.parent_id().is_top() || Some(node.parent_id()) == tree_root {
        Some(root_id)
    } else {
        Some(
            id_map
                .get(&node.parent_id())
                .copied()
                .unwrap_or(node.parent_id()),
        )
    };
    NodePayload {
        organization_id,
        name: node.label().to_string(),
        emoji: node.emoji().map(String::from),
        parent_id,
    }
}

/// `current` with server ids in place of provisional ones. A tree without a root gets the
/// backend's root prepended. `last_id` never drops below the one of `current`.
fn remap(
    current: &Tree,
    root: &DomainNode,
    id_map: &BTreeMap<NodeId, NodeId>,
) -> TreeResult<Tree> {
    let lookup = |id: NodeId| id_map.get(&id).copied().unwrap_or(id);
    let tree_root = current.root_id();
    let mut nodes = Vec::with_capacity(current.len() + 1);
    if current.root().is_none() {
        nodes.push(TreeNode {
            id: root.id,
            parent_id: NodeId::TOP,
            label: root.name.clone(),
            droppable: false,
            provisional: false,
            data: NodeData {
                emoji: root.emoji.clone(),
                is_root: true,
                statistics: None,
            },
        });
    }
    for node in current.nodes() {
        let mut node = node.clone();
        node.id = lookup(node.id);
        node.parent_id = if node.parent_id.is_top() || Some(node.parent_id) == tree_root {
            NodeId::TOP
        } else {
            lookup(node.parent_id)
        };
        node.provisional = false;
        nodes.push(node);
    }
    Ok(Tree::new(nodes)?.with_last_id(current.last_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestBackend;
    use crate::tree::tests::{chain, node, root, wide};

    fn id(v: i64) -> NodeId {
        NodeId::new(v)
    }

    fn kinds(plan: &SyncPlan) -> Vec<(i64, ChangeKind)> {
        plan.changes()
            .iter()
            .map(|c| (c.node.id().value(), c.kind))
            .collect()
    }

    fn position(plan: &SyncPlan, v: i64) -> usize {
        plan.changes()
            .iter()
            .position(|c| c.node.id() == id(v))
            .unwrap()
    }

    #[test]
    fn test_plan_without_snapshot() {
        let (tree, _) = chain().create_node(id(3), "New").unwrap();
        let sync_plan = plan(&tree, None).unwrap();
        assert_eq!(
            kinds(&sync_plan),
            vec![
                (1, ChangeKind::Unchanged),
                (2, ChangeKind::Unchanged),
                (3, ChangeKind::Unchanged),
                (4, ChangeKind::Create),
            ]
        );
        assert!(!sync_plan.is_empty());
        assert_eq!(sync_plan.count(ChangeKind::Create), 1);
    }

    #[test]
    fn test_plan_orders_parents_first() {
        // children are stored before their parents
        let tree = Tree::new(vec![
            node(6, 3, "f"),
            node(3, 2, "c"),
            node(4, 2, "d"),
            node(2, 0, "b"),
            root(1, "a"),
        ])
        .unwrap();
        let sync_plan = plan(&tree, None).unwrap();
        assert_eq!(sync_plan.changes()[0].node.id(), id(1));
        assert!(position(&sync_plan, 2) < position(&sync_plan, 3));
        assert!(position(&sync_plan, 2) < position(&sync_plan, 4));
        assert!(position(&sync_plan, 3) < position(&sync_plan, 6));
    }

    #[test]
    fn test_plan_detects_updates_and_deletes() {
        let snapshot = wide();
        let edited = snapshot
            .rename_node(id(2), "renamed")
            .unwrap()
            .move_node(id(5), id(4))
            .unwrap()
            .delete_subtree(id(3))
            .unwrap();
        let sync_plan = plan(&edited, Some(&snapshot)).unwrap();
        let updates: Vec<i64> = sync_plan
            .changes()
            .iter()
            .filter(|c| c.kind == ChangeKind::Update)
            .map(|c| c.node.id().value())
            .collect();
        assert_eq!(updates, vec![2, 5]);
        let deletes: Vec<i64> = sync_plan
            .changes()
            .iter()
            .filter(|c| c.kind == ChangeKind::Delete)
            .map(|c| c.node.id().value())
            .collect();
        assert_eq!(deletes, vec![6, 3]);
        assert_eq!(sync_plan.changes().last().unwrap().node.id(), id(3));
    }

    #[test]
    fn test_plan_deletes_node_whose_id_was_taken() {
        let snapshot = wide();
        let (edited, created) = snapshot
            .delete_node(id(6))
            .unwrap()
            .create_node(id(3), "Lights")
            .unwrap();
        assert_eq!(created.id(), id(7));
        let sync_plan = plan(&edited, Some(&snapshot)).unwrap();
        assert!(kinds(&sync_plan).contains(&(6, ChangeKind::Delete)));
        assert!(kinds(&sync_plan).contains(&(7, ChangeKind::Create)));

        // a provisional node sitting on a snapshot id, as left by older tree files
        let mut reused = created.clone();
        reused.id = id(6);
        let edited = Tree::new(
            snapshot
                .nodes()
                .iter()
                .filter(|n| n.id() != id(6))
                .cloned()
                .chain([reused])
                .collect(),
        )
        .unwrap();
        let sync_plan = plan(&edited, Some(&snapshot)).unwrap();
        assert_eq!(sync_plan.count(ChangeKind::Create), 1);
        assert_eq!(sync_plan.count(ChangeKind::Delete), 1);
        assert_eq!(
            sync_plan.changes().last().unwrap().kind,
            ChangeKind::Delete
        );
    }

    #[test]
    fn test_plan_unchanged_when_equal_to_snapshot() {
        let tree = wide();
        let sync_plan = plan(&tree, Some(&tree)).unwrap();
        assert!(sync_plan.is_empty());
        assert_eq!(sync_plan.count(ChangeKind::Unchanged), tree.len());
    }

    #[test]
    fn test_plan_rejects_cycles() {
        let tree = Tree::new(vec![root(1, "r"), node(2, 3, "a"), node(3, 2, "b")]).unwrap();
        let err = plan(&tree, None).unwrap_err();
        assert!(matches!(err, TreeError::DependencyOrder(_)));
    }

    #[test]
    fn test_plan_dangling_parent_has_no_dependency() {
        let tree = Tree::new(vec![root(1, "r"), node(2, 9, "orphan")]).unwrap();
        let sync_plan = plan(&tree, None).unwrap();
        assert_eq!(sync_plan.changes().len(), 2);
    }

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Unchanged.to_string(), "unchanged");
        assert_eq!("delete".parse::<ChangeKind>().unwrap(), ChangeKind::Delete);
    }

    #[tokio::test]
    async fn test_push_remaps_provisional_ids() {
        let mut backend = TestBackend::seeded(1).unwrap();
        let tree = pull(&mut backend, 1).await.unwrap();
        let (tree, a) = tree.create_node(id(3), "Stage").unwrap();
        let (tree, b) = tree.create_node(a.id(), "Lights").unwrap();
        let (tree, c) = tree.create_node(id(1), "Merch").unwrap();
        assert_eq!((a.id(), b.id(), c.id()), (id(5), id(6), id(7)));

        // someone else takes id 5 on the backend in the meantime
        let elsewhere = NodePayload {
            organization_id: 1,
            name: "Elsewhere".to_string(),
            emoji: None,
            parent_id: Some(id(1)),
        };
        backend.create_node(&elsewhere).await.unwrap();

        let snapshot = pull(&mut TestBackend::seeded(1).unwrap(), 1).await.unwrap();
        let sync_plan = plan(&tree, Some(&snapshot)).unwrap();
        let outcome = push(&mut backend, 1, &sync_plan, &tree).await.unwrap();
        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.updated, 0);
        // top-level nodes are sent before deeper ones, so Merch is created first
        assert_eq!(outcome.id_map.get(&id(7)), Some(&id(6)));
        assert_eq!(outcome.id_map.get(&id(5)), Some(&id(7)));
        assert_eq!(outcome.id_map.get(&id(6)), Some(&id(8)));

        let pushed = &outcome.tree;
        assert!(pushed.nodes().iter().all(|n| !n.is_provisional()));
        assert_eq!(pushed.get(id(6)).unwrap().label(), "Merch");
        assert_eq!(pushed.get(id(6)).unwrap().parent_id(), NodeId::TOP);
        assert_eq!(pushed.get(id(7)).unwrap().parent_id(), id(3));
        assert_eq!(pushed.get(id(8)).unwrap().parent_id(), id(7));

        let server = pull(&mut backend, 1).await.unwrap();
        assert_eq!(server.get(id(6)).unwrap().parent_id(), NodeId::TOP);
        assert_eq!(server.get(id(7)).unwrap().parent_id(), id(3));
        assert_eq!(server.get(id(8)).unwrap().parent_id(), id(7));
    }

    #[tokio::test]
    async fn test_push_updates_and_deletes() {
        let mut backend = TestBackend::seeded(1).unwrap();
        let snapshot = pull(&mut backend, 1).await.unwrap();
        let (tree, fresh) = snapshot.create_node(id(4), "Kids").unwrap();
        let tree = tree
            .rename_node(id(4), "Sport")
            .unwrap()
            .set_emoji(id(4), Some("🏃"))
            .unwrap()
            .move_node(id(3), id(1))
            .unwrap();
        let sync_plan = plan(&tree, Some(&snapshot)).unwrap();
        let outcome = push(&mut backend, 1, &sync_plan, &tree).await.unwrap();
        assert_eq!((outcome.created, outcome.updated), (1, 2));

        let server = pull(&mut backend, 1).await.unwrap();
        assert_eq!(server.get(id(4)).unwrap().label(), "Sport");
        assert_eq!(server.get(id(4)).unwrap().emoji(), Some("🏃"));
        assert_eq!(server.get(id(3)).unwrap().parent_id(), NodeId::TOP);
        assert!(server.contains(outcome.id_map[&fresh.id()]));

        // a second pass only deletes the node created above
        let snapshot = outcome.tree.clone();
        let tree = snapshot.delete_node(outcome.id_map[&fresh.id()]).unwrap();
        let sync_plan = plan(&tree, Some(&snapshot)).unwrap();
        let outcome = push(&mut backend, 1, &sync_plan, &tree).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(pull(&mut backend, 1).await.unwrap().nodes(), tree.nodes());
    }

    #[tokio::test]
    async fn test_push_delete_then_create() {
        let mut backend = TestBackend::seeded(1).unwrap();
        let lonely = NodePayload {
            organization_id: 1,
            name: "Lonely".to_string(),
            emoji: None,
            parent_id: Some(id(1)),
        };
        let lonely = backend.create_node(&lonely).await.unwrap();
        let snapshot = pull(&mut backend, 1).await.unwrap();
        assert_eq!(snapshot.max_id(), lonely.id);

        let (tree, fresh) = snapshot
            .delete_node(lonely.id)
            .unwrap()
            .create_node(id(1), "Fresh")
            .unwrap();
        assert_ne!(fresh.id(), lonely.id);

        let sync_plan = plan(&tree, Some(&snapshot)).unwrap();
        let outcome = push(&mut backend, 1, &sync_plan, &tree).await.unwrap();
        assert_eq!((outcome.created, outcome.deleted), (1, 1));

        let server = pull(&mut backend, 1).await.unwrap();
        assert!(!server.contains(lonely.id));
        assert_eq!(
            server.get(outcome.id_map[&fresh.id()]).unwrap().label(),
            "Fresh"
        );
        assert!(plan(&outcome.tree, Some(&server)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_stops_at_first_failure() {
        let mut backend = TestBackend::seeded(1).unwrap().fail_on_write(2);
        let tree = pull(&mut backend, 1).await.unwrap();
        let (tree, _) = tree.create_node(id(1), "One").unwrap();
        let (tree, _) = tree.create_node(id(1), "Two").unwrap();
        let (tree, _) = tree.create_node(id(1), "Three").unwrap();
        let sync_plan = plan(&tree, None).unwrap();
        let err = push(&mut backend, 1, &sync_plan, &tree).await.unwrap_err();
        assert!(err.to_string().contains("Two"));

        // the first create went through, the third was never sent
        let names: Vec<String> = backend
            .list_nodes(1)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert!(names.contains(&"One".to_string()));
        assert!(!names.contains(&"Two".to_string()));
        assert!(!names.contains(&"Three".to_string()));
    }

    #[tokio::test]
    async fn test_push_into_empty_organization() {
        let mut backend = TestBackend::new();
        let (tree, a) = Tree::default().create_node(NodeId::TOP, "First").unwrap();
        let (tree, _) = tree.create_node(a.id(), "Second").unwrap();
        let sync_plan = plan(&tree, None).unwrap();
        let outcome = push(&mut backend, 9, &sync_plan, &tree).await.unwrap();
        assert_eq!(outcome.created, 2);
        let root = outcome.tree.root().unwrap();
        assert_eq!(root.id(), id(1));
        assert_eq!(outcome.tree.len(), 3);
        assert_eq!(pull(&mut backend, 9).await.unwrap(), outcome.tree);
    }

    #[tokio::test]
    async fn test_pull_builds_tree() {
        let mut backend = TestBackend::seeded(4).unwrap();
        let tree = pull(&mut backend, 4).await.unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root_id(), Some(id(1)));
        assert_eq!(tree.sub_bommels_count(id(1)).unwrap(), 3);
    }
}
