//! Errors for the crate.
//!
//! Application-level code uses `anyhow` through the `Result` alias. The tree engine returns the
//! typed `TreeError` so that callers (and tests) can match on what went wrong:
//!
//! - [`Validation`] malformed input, e.g. an entity that is its own parent.
//! - [`InvalidMove`] a move was committed although `can_drop` would have refused it.
//! - [`CycleDetected`] a walk over parent/child links visited the same node twice.
//! - [`DependencyOrder`] sync could not order the nodes parent-before-child.
//! - [`NotFound`] an operation referenced an id that is not in the tree.
//!
//! [`Validation`]: TreeError::Validation
//! [`InvalidMove`]: TreeError::InvalidMove
//! [`CycleDetected`]: TreeError::CycleDetected
//! [`DependencyOrder`]: TreeError::DependencyOrder
//! [`NotFound`]: TreeError::NotFound

use crate::model::NodeId;
use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result type of the tree engine.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Tree engine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Invalid tree: {0}")]
    Validation(String),
    #[error("Node {drag} cannot be moved onto {target}")]
    InvalidMove { drag: NodeId, target: NodeId },
    #[error("Cycle detected at node {0}")]
    CycleDetected(NodeId),
    #[error("Unable to order nodes parent-before-child: {0}")]
    DependencyOrder(String),
    #[error("Node {0} not found")]
    NotFound(NodeId),
}
