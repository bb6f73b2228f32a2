//! The boundary to the backend that stores Bommels and computes their statistics.
//!
//! `Backend` is the contract the sync service and the commands are written against. Two
//! implementations ship with the crate: `FileBackend`, a JSON ledger inside `$BOMMEL_HOME`, and
//! `TestBackend`, an in-memory ledger seeded with sample data so the whole program can run
//! top-to-bottom without touching the disk ledger.

mod file_backend;
mod ledger;
mod test_backend;

pub(crate) use file_backend::FileBackend;
pub use ledger::Transaction;
pub(crate) use test_backend::TestBackend;

use crate::model::{BommelStatistics, DomainNode, NodeId, NodePayload, OrganizationStatistics};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The name of the environment variable that puts the program in test mode.
pub const TEST_MODE_ENV: &str = "BOMMEL_IN_TEST_MODE";

/// Node fetch, node persistence and statistics fetch.
#[async_trait::async_trait]
pub trait Backend {
    /// All Bommels of the organization, including the root.
    async fn list_nodes(&mut self, organization_id: i64) -> Result<Vec<DomainNode>>;

    async fn get_or_create_root(&mut self, organization_id: i64) -> Result<DomainNode>;

    /// Creates a Bommel and returns it with the id the backend assigned.
    async fn create_node(&mut self, payload: &NodePayload) -> Result<DomainNode>;

    async fn update_node(&mut self, id: NodeId, payload: &NodePayload) -> Result<DomainNode>;

    async fn delete_node(&mut self, organization_id: i64, id: NodeId) -> Result<()>;

    /// Books an amount on a Bommel.
    async fn book_transaction(&mut self, transaction: Transaction) -> Result<()>;

    async fn organization_statistics(
        &mut self,
        organization_id: i64,
        include_drafts: bool,
    ) -> Result<OrganizationStatistics>;

    async fn bommel_statistics(
        &mut self,
        bommel_id: NodeId,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BommelStatistics>;

    async fn all_bommel_statistics(
        &mut self,
        organization_id: i64,
        include_drafts: bool,
        aggregate: bool,
    ) -> Result<BTreeMap<NodeId, BommelStatistics>>;
}

/// Which `Backend` implementation to use.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The JSON ledger in `$BOMMEL_HOME`.
    #[default]
    Local,
    /// The seeded in-memory ledger.
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Test` when `BOMMEL_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Local`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Local,
        }
    }
}

/// Creates the backend for `mode`.
pub async fn backend(config: &Config, mode: Mode) -> Result<Box<dyn Backend + Send>> {
    debug!("Using the {mode} backend");
    Ok(match mode {
        Mode::Local => Box::new(
            FileBackend::load(config.ledger_path(), config.organization_name()).await?,
        ),
        Mode::Test => Box::new(TestBackend::seeded(config.organization_id())?),
    })
}
