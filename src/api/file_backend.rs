//! Implements the `Backend` trait on top of a JSON ledger file.

use crate::api::ledger::{Ledger, Transaction};
use crate::api::Backend;
use crate::model::{BommelStatistics, DomainNode, NodeId, NodePayload, OrganizationStatistics};
use crate::{utils, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::trace;

/// A backend that keeps its ledger in a JSON file and rewrites the file after every change.
pub(crate) struct FileBackend {
    path: PathBuf,
    root_name: String,
    ledger: Ledger,
}

impl FileBackend {
    /// Loads the ledger at `path`. A missing file is an empty ledger; it is created on the first
    /// write. `root_name` names the organization's root Bommel if it has to be created.
    pub(crate) async fn load(path: impl Into<PathBuf>, root_name: &str) -> Result<Self> {
        let path = path.into();
        let ledger = if path.is_file() {
            utils::deserialize(&path)
                .await
                .context("Unable to load the ledger")?
        } else {
            Ledger::default()
        };
        Ok(Self {
            path,
            root_name: root_name.to_string(),
            ledger,
        })
    }

    async fn save(&self) -> Result<()> {
        trace!("Saving the ledger to {}", self.path.display());
        utils::serialize(&self.path, &self.ledger)
            .await
            .context("Unable to save the ledger")
    }
}

#[async_trait::async_trait]
impl Backend for FileBackend {
    async fn list_nodes(&mut self, organization_id: i64) -> Result<Vec<DomainNode>> {
        Ok(self.ledger.list_nodes(organization_id))
    }

    async fn get_or_create_root(&mut self, organization_id: i64) -> Result<DomainNode> {
        let before = self.ledger.list_nodes(organization_id).len();
        let root = self
            .ledger
            .get_or_create_root(organization_id, &self.root_name);
        if self.ledger.list_nodes(organization_id).len() != before {
            self.save().await?;
        }
        Ok(root)
    }

    async fn create_node(&mut self, payload: &NodePayload) -> Result<DomainNode> {
        let node = self.ledger.create_node(payload)?;
        self.save().await?;
        Ok(node)
    }

    async fn update_node(&mut self, id: NodeId, payload: &NodePayload) -> Result<DomainNode> {
        let node = self.ledger.update_node(id, payload)?;
        self.save().await?;
        Ok(node)
    }

    async fn delete_node(&mut self, organization_id: i64, id: NodeId) -> Result<()> {
        self.ledger.delete_node(organization_id, id)?;
        self.save().await
    }

    async fn book_transaction(&mut self, transaction: Transaction) -> Result<()> {
        self.ledger.book(transaction)?;
        self.save().await
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn payload(name: &str, parent: Option<NodeId>) -> NodePayload {
        NodePayload {
            organization_id: 7,
            name: name.to_string(),
            emoji: None,
            parent_id: parent,
        }
    }

    #[tokio::test]
    async fn test_file_backend_persists_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut backend = FileBackend::load(&path, "Club").await.unwrap();
        let root = backend.get_or_create_root(7).await.unwrap();
        assert_eq!(root.name, "Club");
        let child = backend
            .create_node(&payload("Events", Some(root.id)))
            .await
            .unwrap();
        backend
            .book_transaction(Transaction {
                bommel_id: child.id,
                amount: Decimal::from(25),
                draft: false,
            })
            .await
            .unwrap();
        assert!(path.is_file());

        let mut reloaded = FileBackend::load(&path, "ignored").await.unwrap();
        let nodes = reloaded.list_nodes(7).await.unwrap();
        assert_eq!(nodes, vec![root.clone(), child.clone()]);
        assert_eq!(reloaded.get_or_create_root(7).await.unwrap(), root);
        let stats = reloaded.bommel_statistics(child.id, false, false).await.unwrap();
        assert_eq!(stats.income, Decimal::from(25));
    }

    #[tokio::test]
    async fn test_file_backend_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        let mut backend = FileBackend::load(&path, "Club").await.unwrap();
        assert!(backend.list_nodes(1).await.unwrap().is_empty());
        assert!(!path.is_file());
    }

    #[tokio::test]
    async fn test_file_backend_rejects_bad_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        utils::write(&path, "not json").await.unwrap();
        assert!(FileBackend::load(&path, "Club").await.is_err());
    }
}
