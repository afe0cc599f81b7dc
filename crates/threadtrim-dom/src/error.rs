use crate::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("Inserting {node} under {parent} would create a cycle")]
    HierarchyCycle { parent: NodeId, node: NodeId },
}
