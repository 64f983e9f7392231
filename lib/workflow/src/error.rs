//! Error types for the workflow crate.
//!
//! - `GraphError`: structural problems with nodes and edges
//! - `ExecutionError`: status transitions and execution lifecycle failures
//! - `UnknownNodeKind`: a node type name that is not in the palette
//!
//! Callers that cross a layer boundary wrap these in a rootcause `Report`.

use crate::execution::NodeStatus;
use pagecraft_core::NodeId;
use std::fmt;

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// An edge connects a node to itself.
    SelfLoop { node_id: NodeId },
    /// Two edges connect the same handles of the same nodes.
    DuplicateEdge { source: NodeId, target: NodeId },
    /// Graph contains cycles.
    CycleDetected,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::SelfLoop { node_id } => write!(f, "node {node_id} is connected to itself"),
            Self::DuplicateEdge { source, target } => {
                write!(f, "duplicate edge: {source} -> {target}")
            }
            Self::CycleDetected => write!(f, "graph contains cycles"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors during workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// An execution is already in progress for this editor session.
    AlreadyRunning,
    /// A node status change is not allowed by the status state machine.
    InvalidTransition { from: NodeStatus, to: NodeStatus },
    /// The graph cannot be executed as drawn.
    InvalidGraph { reason: String },
    /// The backend refused or failed to start the execution.
    Initiation { reason: String },
    /// The backend reported the execution as failed.
    Failed { reason: String },
    /// The execution ran longer than the configured maximum.
    TimedOut { seconds: u64 },
    /// Execution was cancelled.
    Cancelled,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "an execution is already running"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid node status transition from {from} to {to}")
            }
            Self::InvalidGraph { reason } => write!(f, "workflow cannot be executed: {reason}"),
            Self::Initiation { reason } => write!(f, "failed to start execution: {reason}"),
            Self::Failed { reason } => write!(f, "execution failed: {reason}"),
            Self::TimedOut { seconds } => write!(f, "execution exceeded {seconds}s"),
            Self::Cancelled => write!(f, "execution cancelled"),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// A node type name that does not match any palette entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeKind {
    /// The name that failed to match.
    pub name: String,
}

impl fmt::Display for UnknownNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type: '{}'", self.name)
    }
}

impl std::error::Error for UnknownNodeKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let other = NodeId::new();
        let cases = [
            (
                GraphError::NodeNotFound { node_id },
                format!("node not found: {node_id}"),
            ),
            (
                GraphError::SelfLoop { node_id },
                format!("node {node_id} is connected to itself"),
            ),
            (
                GraphError::DuplicateEdge {
                    source: node_id,
                    target: other,
                },
                format!("duplicate edge: {node_id} -> {other}"),
            ),
            (GraphError::CycleDetected, "graph contains cycles".to_string()),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = ExecutionError::InvalidTransition {
            from: NodeStatus::Idle,
            to: NodeStatus::Success,
        };
        assert_eq!(
            err.to_string(),
            "invalid node status transition from idle to success"
        );
    }

    #[test]
    fn unknown_kind_display() {
        let err = UnknownNodeKind {
            name: "sms".to_string(),
        };
        assert_eq!(err.to_string(), "unknown node type: 'sms'");
    }
}
