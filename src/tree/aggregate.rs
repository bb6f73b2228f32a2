//! Roll-ups of financial statistics from nodes to their ancestors.

use crate::error::{TreeError, TreeResult};
use crate::model::{NodeId, OrganizationStatistics, Statistics, TreeNode};
use crate::tree::{descendants_in, Tree};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// Whether a node's figures include its descendants. Mirrors the backend's `aggregate` flag.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMode {
    /// Only the transactions the node owns.
    #[default]
    Own,
    /// The node's own transactions plus those of every descendant.
    Descendants,
}

serde_plain::derive_display_from_serialize!(AggregateMode);
serde_plain::derive_fromstr_from_deserialize!(AggregateMode);

impl AggregateMode {
    pub fn from_flag(aggregate: bool) -> Self {
        if aggregate {
            AggregateMode::Descendants
        } else {
            AggregateMode::Own
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, AggregateMode::Descendants)
    }
}

/// The computed figures of one node.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Aggregate {
    pub total: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
    pub transactions_count: u64,
    /// All transitive descendants, regardless of mode.
    pub sub_bommels_count: u64,
}

impl Aggregate {
    fn add(&mut self, stats: &Statistics) {
        self.total += stats.total;
        self.income += stats.income;
        self.expenses += stats.expenses;
        self.transactions_count += stats.transactions_count;
    }
}

impl From<&Aggregate> for Statistics {
    fn from(a: &Aggregate) -> Self {
        Statistics {
            income: a.income,
            expenses: a.expenses,
            total: a.total,
            transactions_count: a.transactions_count,
            sub_bommels_count: Some(a.sub_bommels_count),
        }
    }
}

impl Tree {
    /// The number of transitive descendants of `id`.
    ///
    /// # Errors
    /// - `NotFound` if `id` is not in the tree.
    /// - `CycleDetected` if the subtree below `id` is not a tree.
    pub fn sub_bommels_count(&self, id: NodeId) -> TreeResult<u64> {
        Ok(self.descendants(id)?.len() as u64)
    }

    /// The figures of `id` in the given mode.
    pub fn aggregate_node(&self, id: NodeId, mode: AggregateMode) -> TreeResult<Aggregate> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        let index = self.child_index();
        let by_id = self.by_id();
        aggregate_with(&index, &by_id, id, mode)
    }

    /// The figures of every node. A cycle fails only the nodes whose subtree contains it.
    pub fn aggregate_all(&self, mode: AggregateMode) -> BTreeMap<NodeId, TreeResult<Aggregate>> {
        let index = self.child_index();
        let by_id = self.by_id();
        self.nodes()
            .iter()
            .map(|n| {
                let result = aggregate_with(&index, &by_id, n.id(), mode);
                if let Err(e) = &result {
                    warn!("Unable to aggregate Bommel {}: {e}", n.id());
                }
                (n.id(), result)
            })
            .collect()
    }

    /// Returns a copy whose nodes carry their computed figures as statistics. Nodes that cannot
    /// be aggregated keep what they had.
    pub fn with_aggregates(&self, mode: AggregateMode) -> Tree {
        let mut aggregates = self.aggregate_all(mode);
        let nodes = self
            .nodes()
            .iter()
            .map(|n| {
                let mut n = n.clone();
                if let Some(Ok(a)) = aggregates.remove(&n.id()) {
                    n.data.statistics = Some(Statistics::from(&a));
                }
                n
            })
            .collect();
        self.with_nodes(nodes)
    }

    /// The sum of every node's own income. Nothing is counted twice because each transaction
    /// belongs to exactly one node.
    pub fn total_income(&self) -> Decimal {
        self.own_statistics().map(|s| s.income).sum()
    }

    /// The sum of the absolute value of every node's own expenses.
    pub fn total_expenses(&self) -> Decimal {
        self.own_statistics().map(|s| s.expenses.abs()).sum()
    }

    /// Organization-wide figures from the nodes' own statistics.
    pub fn organization_statistics(&self) -> OrganizationStatistics {
        let mut out = OrganizationStatistics {
            total_bommels: self.len() as u64,
            ..Default::default()
        };
        for s in self.own_statistics() {
            out.income += s.income;
            out.expenses += s.expenses;
            out.total += s.total;
            out.transactions_count += s.transactions_count;
        }
        out
    }

    /// The number of hops from `id` up to the top level. The root and the nodes directly beneath
    /// it are at depth 0. The walk stops early at a parent that is not in the tree, or at a node
    /// it has already visited.
    pub fn node_depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut visited = HashSet::from([id]);
        let mut current = match self.get(id) {
            Some(node) => node,
            None => return 0,
        };
        loop {
            let parent = self.normalize_parent(current.parent_id());
            if parent.is_top() || !visited.insert(parent) {
                break;
            }
            match self.get(parent) {
                Some(node) => {
                    depth += 1;
                    current = node;
                }
                None => break,
            }
        }
        depth
    }

    fn own_statistics(&self) -> impl Iterator<Item = &Statistics> {
        self.nodes().iter().filter_map(|n| n.statistics())
    }

    fn by_id(&self) -> HashMap<NodeId, &TreeNode> {
        self.nodes().iter().map(|n| (n.id(), n)).collect()
    }
}

fn aggregate_with(
    index: &HashMap<NodeId, Vec<NodeId>>,
    by_id: &HashMap<NodeId, &TreeNode>,
    id: NodeId,
    mode: AggregateMode,
) -> TreeResult<Aggregate> {
    let descendants = descendants_in(index, id)?;
    let mut aggregate = Aggregate {
        sub_bommels_count: descendants.len() as u64,
        ..Default::default()
    };
    if let Some(stats) = by_id.get(&id).and_then(|n| n.statistics()) {
        aggregate.add(stats);
    }
    if mode.is_aggregate() {
        for d in &descendants {
            if let Some(stats) = by_id.get(d).and_then(|n| n.statistics()) {
                aggregate.add(stats);
            }
        }
    }
    Ok(aggregate)
}
