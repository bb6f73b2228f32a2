//! Types that represent the core data model, such as `TreeNode` and `DomainNode`.
mod amount;
mod domain;
mod node;

pub use amount::{Amount, DEFAULT_CURRENCY};
pub use domain::{BommelStatistics, DomainNode, NodePayload, OrganizationStatistics, ParentRef};
pub use node::{NodeData, NodeId, Statistics, TreeNode};
