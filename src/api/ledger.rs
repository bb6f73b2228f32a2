//! The data behind the local backends: stored Bommels and the transactions booked on them.
//!
//! Statistics are derived from transactions on demand. Aggregated statistics go through the tree
//! aggregation engine, so the backend and the engine cannot disagree about what a roll-up is.

use crate::model::{BommelStatistics, DomainNode, NodeId, NodePayload, OrganizationStatistics};
use crate::tree::{self, AggregateMode, Tree};
use crate::Result;
use anyhow::{bail, ensure, Context};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A Bommel row, scoped to its organization.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct StoredBommel {
    pub(crate) organization_id: i64,
    #[serde(flatten)]
    pub(crate) node: DomainNode,
}

/// A booked amount. Positive amounts are income, negative amounts are expenses.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub bommel_id: NodeId,
    pub amount: Decimal,
    /// Drafts only count when statistics are requested with drafts included.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Ledger {
    last_id: i64,
    bommels: Vec<StoredBommel>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub(crate) fn list_nodes(&self, organization_id: i64) -> Vec<DomainNode> {
        self.bommels
            .iter()
            .filter(|b| b.organization_id == organization_id)
            .map(|b| b.node.clone())
            .collect()
    }

    /// Returns the organization's root, creating it with `name` if it does not exist yet.
    pub(crate) fn get_or_create_root(&mut self, organization_id: i64, name: &str) -> DomainNode {
        if let Some(root) = self.root(organization_id) {
            return root.node.clone();
        }
        self.insert(organization_id, DomainNode::new(NodeId::TOP, None, name, None))
    }

    pub(crate) fn create_node(&mut self, payload: &NodePayload) -> Result<DomainNode> {
        ensure!(
            !payload.name.trim().is_empty(),
            "A Bommel name cannot be empty"
        );
        match payload.parent_id {
            Some(parent) => {
                self.find(payload.organization_id, parent)
                    .with_context(|| format!("Parent Bommel {parent} does not exist"))?;
            }
            None => {
                if self.root(payload.organization_id).is_some() {
                    bail!(
                        "Organization {} already has a root Bommel",
                        payload.organization_id
                    )
                }
            }
        }
        let node = DomainNode::new(
            NodeId::TOP,
            payload.parent_id,
            payload.name.trim(),
            payload.emoji.clone(),
        );
        Ok(self.insert(payload.organization_id, node))
    }

    pub(crate) fn update_node(&mut self, id: NodeId, payload: &NodePayload) -> Result<DomainNode> {
        ensure!(
            !payload.name.trim().is_empty(),
            "A Bommel name cannot be empty"
        );
        let org = payload.organization_id;
        let existing = self
            .find(org, id)
            .with_context(|| format!("Bommel {id} does not exist"))?;
        let is_root = existing.node.parent.is_none();
        match payload.parent_id {
            Some(parent) => {
                ensure!(!is_root, "The root Bommel {id} cannot be given a parent");
                ensure!(parent != id, "Bommel {id} cannot be its own parent");
                self.find(org, parent)
                    .with_context(|| format!("Parent Bommel {parent} does not exist"))?;
                ensure!(
                    !self.is_ancestor(org, id, parent),
                    "Moving Bommel {id} under {parent} would create a cycle"
                );
            }
            None => ensure!(is_root, "Only the root Bommel can be without a parent"),
        }
        let stored = self
            .bommels
            .iter_mut()
            .find(|b| b.organization_id == org && b.node.id == id)
            .with_context(|| format!("Bommel {id} does not exist"))?;
        stored.node = DomainNode::new(
            id,
            payload.parent_id,
            payload.name.trim(),
            payload.emoji.clone(),
        );
        Ok(stored.node.clone())
    }

    /// Deletes a Bommel. Refuses roots, Bommels that still have children, and Bommels that still
    /// own transactions.
    pub(crate) fn delete_node(&mut self, organization_id: i64, id: NodeId) -> Result<()> {
        let pos = self
            .bommels
            .iter()
            .position(|b| b.organization_id == organization_id && b.node.id == id)
            .with_context(|| format!("Bommel {id} does not exist"))?;
        ensure!(
            self.bommels[pos].node.parent.is_some(),
            "The root Bommel {id} cannot be deleted"
        );
        ensure!(
            !self.bommels.iter().any(|b| b.node.parent_id() == Some(id)),
            "Bommel {id} still has children"
        );
        ensure!(
            !self.transactions.iter().any(|t| t.bommel_id == id),
            "Bommel {id} still owns transactions"
        );
        self.bommels.remove(pos);
        Ok(())
    }

    pub(crate) fn book(&mut self, transaction: Transaction) -> Result<()> {
        ensure!(
            self.bommels.iter().any(|b| b.node.id == transaction.bommel_id),
            "Bommel {} does not exist",
            transaction.bommel_id
        );
        self.transactions.push(transaction);
        Ok(())
    }

    pub(crate) fn organization_statistics(
        &self,
        organization_id: i64,
        include_drafts: bool,
    ) -> OrganizationStatistics {
        let ids: HashSet<NodeId> = self
            .list_nodes(organization_id)
            .into_iter()
            .map(|n| n.id)
            .collect();
        let mut out = OrganizationStatistics {
            total_bommels: ids.len() as u64,
            ..Default::default()
        };
        for t in self.counted(include_drafts).filter(|t| ids.contains(&t.bommel_id)) {
            if t.amount.is_sign_negative() {
                out.expenses += t.amount;
            } else {
                out.income += t.amount;
            }
            out.total += t.amount;
            out.transactions_count += 1;
        }
        out
    }

    pub(crate) fn bommel_statistics(
        &self,
        id: NodeId,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BommelStatistics> {
        let stored = self
            .bommels
            .iter()
            .find(|b| b.node.id == id)
            .with_context(|| format!("Bommel {id} does not exist"))?;
        let mut all =
            self.all_bommel_statistics(stored.organization_id, include_drafts, aggregate)?;
        all.remove(&id)
            .with_context(|| format!("No statistics for Bommel {id}"))
    }

    pub(crate) fn all_bommel_statistics(
        &self,
        organization_id: i64,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BTreeMap<NodeId, BommelStatistics>> {
        let tree = self.statistics_tree(organization_id, include_drafts)?;
        let mut out = BTreeMap::new();
        for (id, result) in tree.aggregate_all(AggregateMode::from_flag(aggregate)) {
            let a = result.with_context(|| format!("Unable to aggregate Bommel {id}"))?;
            out.insert(
                id,
                BommelStatistics {
                    bommel_id: id,
                    total: a.total,
                    income: a.income,
                    expenses: a.expenses,
                    transactions_count: a.transactions_count,
                    aggregated: aggregate,
                },
            );
        }
        Ok(out)
    }

    /// The organization's tree with each node's own statistics attached.
    fn statistics_tree(&self, organization_id: i64, include_drafts: bool) -> Result<Tree> {
        let root_id = self.root(organization_id).map(|r| r.node.id).unwrap_or(NodeId::TOP);
        let tree = tree::build(&self.list_nodes(organization_id), root_id)?;
        let mut own: BTreeMap<NodeId, BommelStatistics> = BTreeMap::new();
        for t in self.counted(include_drafts) {
            if !tree.contains(t.bommel_id) {
                continue;
            }
            let s = own.entry(t.bommel_id).or_insert_with(|| BommelStatistics {
                bommel_id: t.bommel_id,
                ..Default::default()
            });
            if t.amount.is_sign_negative() {
                s.expenses += t.amount;
            } else {
                s.income += t.amount;
            }
            s.total += t.amount;
            s.transactions_count += 1;
        }
        Ok(tree.with_statistics(&own))
    }

    fn counted(&self, include_drafts: bool) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |t| include_drafts || !t.draft)
    }

    fn root(&self, organization_id: i64) -> Option<&StoredBommel> {
        self.bommels
            .iter()
            .find(|b| b.organization_id == organization_id && b.node.parent.is_none())
    }

    fn find(&self, organization_id: i64, id: NodeId) -> Option<&StoredBommel> {
        self.bommels
            .iter()
            .find(|b| b.organization_id == organization_id && b.node.id == id)
    }

    /// True if `ancestor` is `id` itself or sits above it. Stops on a revisit.
    fn is_ancestor(&self, organization_id: i64, ancestor: NodeId, id: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor || !visited.insert(c) {
                return true;
            }
            current = self.find(organization_id, c).and_then(|b| b.node.parent_id());
        }
        false
    }

    fn insert(&mut self, organization_id: i64, mut node: DomainNode) -> DomainNode {
        self.last_id += 1;
        node.id = NodeId::new(self.last_id);
        self.bommels.push(StoredBommel {
            organization_id,
            node: node.clone(),
        });
        node
    }
}
