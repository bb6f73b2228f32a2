//! The shapes exchanged with the backend: domain entities, write payloads and statistics.

use crate::model::NodeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A reference to a parent entity, as the backend returns it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParentRef {
    pub id: NodeId,
}

/// A Bommel as stored by the backend.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DomainNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl DomainNode {
    pub fn new(
        id: NodeId,
        parent: Option<NodeId>,
        name: impl Into<String>,
        emoji: Option<String>,
    ) -> Self {
        Self {
            id,
            parent: parent.map(|id| ParentRef { id }),
            name: name.into(),
            emoji,
        }
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent.map(|p| p.id)
    }
}

/// The body of a create or update request.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NodePayload {
    pub organization_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// `None` only for the root of an organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

/// Organization-wide statistics. Sums over every Bommel's own transactions.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrganizationStatistics {
    pub total_bommels: u64,
    pub transactions_count: u64,
    pub total: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
}

/// Statistics of one Bommel, either its own (`aggregated == false`) or including all descendants.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BommelStatistics {
    pub bommel_id: NodeId,
    pub total: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
    pub transactions_count: u64,
    pub aggregated: bool,
}
