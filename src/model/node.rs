use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifies a Bommel within one loaded tree.
///
/// Ids handed out by the backend are positive. `NodeId::TOP` (`0`) is never the id of a node; as a
/// `parent_id` it means "attached directly under the organization root".
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    /// The sentinel parent of every top-level node.
    pub const TOP: NodeId = NodeId(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_top(&self) -> bool {
        *self == Self::TOP
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        NodeId(value)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeId(s.trim().parse()?))
    }
}

/// Financial statistics attached to a node.
///
/// `expenses` is kept signed, the way it is booked (zero or negative), and `total` is
/// `income + expenses`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Statistics {
    pub income: Decimal,
    pub expenses: Decimal,
    pub total: Decimal,
    pub transactions_count: u64,
    /// Only present when the statistics were precomputed with descendants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_bommels_count: Option<u64>,
}

impl Statistics {
    /// Statistics with `total` derived from `income` and `expenses`.
    pub fn new(income: Decimal, expenses: Decimal, transactions_count: u64) -> Self {
        Self {
            income,
            expenses,
            total: income + expenses,
            transactions_count,
            sub_bommels_count: None,
        }
    }
}

/// The payload of a node. Every field has a fixed meaning so the aggregation code can rely on it.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

/// One entry of the Bommel hierarchy in its flat, indexed form.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) parent_id: NodeId,
    pub(crate) label: String,
    pub(crate) droppable: bool,
    /// Created locally and not yet assigned an id by the backend.
    #[serde(default)]
    pub(crate) provisional: bool,
    #[serde(default)]
    pub(crate) data: NodeData,
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent_id(&self) -> NodeId {
        self.parent_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn droppable(&self) -> bool {
        self.droppable
    }

    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    pub fn is_root(&self) -> bool {
        self.data.is_root
    }

    pub fn emoji(&self) -> Option<&str> {
        self.data.emoji.as_deref()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.data.statistics.as_ref()
    }
}
