//! Implements the `Backend` trait with an in-memory ledger for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using the ledger file.

use crate::api::ledger::{Ledger, Transaction};
use crate::api::Backend;
use crate::model::{BommelStatistics, DomainNode, NodeId, NodePayload, OrganizationStatistics};
use crate::Result;
use anyhow::bail;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The name given to the seeded root Bommel.
pub(crate) const SEED_ROOT_NAME: &str = "Test Organization";

/// An implementation of the `Backend` trait that keeps everything in memory. It can fail the
/// n-th write on request so that partial syncs can be exercised.
#[derive(Debug, Default)]
pub(crate) struct TestBackend {
    ledger: Ledger,
    writes: usize,
    fail_on_write: Option<usize>,
}

impl TestBackend {
    /// An empty backend.
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A backend holding one organization with a few Bommels and transactions:
    ///
    /// ```text
    /// Test Organization (1)
    /// ├── Events (2)            -80.00
    /// │   └── Summer Festival (3) +1200.00, -450.50
    /// └── Sports (4)            +300.00, -120.00 (draft)
    /// ```
    pub(crate) fn seeded(organization_id: i64) -> Result<Self> {
        let mut ledger = Ledger::default();
        let root = ledger.get_or_create_root(organization_id, SEED_ROOT_NAME);
        let payload = |name: &str, emoji: Option<&str>, parent: NodeId| NodePayload {
            organization_id,
            name: name.to_string(),
            emoji: emoji.map(String::from),
            parent_id: Some(parent),
        };
        let events = ledger.create_node(&payload("Events", Some("🎉"), root.id))?;
        let summer = ledger.create_node(&payload("Summer Festival", None, events.id))?;
        let sports = ledger.create_node(&payload("Sports", Some("⚽"), root.id))?;
        for (bommel_id, cents, draft) in [
            (events.id, -8000, false),
            (summer.id, 120000, false),
            (summer.id, -45050, false),
            (sports.id, 30000, false),
            (sports.id, -12000, true),
        ] {
            ledger.book(Transaction {
                bommel_id,
                amount: Decimal::new(cents, 2),
                draft,
            })?;
        }
        Ok(Self {
            ledger,
            ..Default::default()
        })
    }

    /// Makes the `n`-th write from now on (counting from 1) fail.
    #[cfg(test)]
    pub(crate) fn fail_on_write(mut self, n: usize) -> Self {
        self.fail_on_write = Some(self.writes + n);
        self
    }

    fn write(&mut self) -> Result<()> {
        self.writes += 1;
        if self.fail_on_write == Some(self.writes) {
            bail!("Simulated backend failure on write {}", self.writes)
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn list_nodes(&mut self, organization_id: i64) -> Result<Vec<DomainNode>> {
        Ok(self.ledger.list_nodes(organization_id))
    }

    async fn get_or_create_root(&mut self, organization_id: i64) -> Result<DomainNode> {
        Ok(self
            .ledger
            .get_or_create_root(organization_id, SEED_ROOT_NAME))
    }

    async fn create_node(&mut self, payload: &NodePayload) -> Result<DomainNode> {
        self.write()?;
        self.ledger.create_node(payload)
    }

    async fn update_node(&mut self, id: NodeId, payload: &NodePayload) -> Result<DomainNode> {
        self.write()?;
        self.ledger.update_node(id, payload)
    }

    async fn delete_node(&mut self, organization_id: i64, id: NodeId) -> Result<()> {
        self.write()?;
        self.ledger.delete_node(organization_id, id)
    }

    async fn book_transaction(&mut self, transaction: Transaction) -> Result<()> {
        self.write()?;
        self.ledger.book(transaction)
    }

    async fn organization_statistics(
        &mut self,
        organization_id: i64,
        include_drafts: bool,
    ) -> Result<OrganizationStatistics> {
        Ok(self
            .ledger
            .organization_statistics(organization_id, include_drafts))
    }

    async fn bommel_statistics(
        &mut self,
        bommel_id: NodeId,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BommelStatistics> {
        self.ledger
            .bommel_statistics(bommel_id, include_drafts, aggregate)
    }

    async fn all_bommel_statistics(
        &mut self,
        organization_id: i64,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BTreeMap<NodeId, BommelStatistics>> {
        self.ledger
            .all_bommel_statistics(organization_id, include_drafts, aggregate)
    }
}
