//! Workflow graph model for the pagecraft automation editor.
//!
//! This crate provides the editor-independent parts of a workflow:
//!
//! - **Graph Model**: Stable directed graphs using petgraph with typed nodes and edges
//! - **Node Types**: Trigger, Action, Condition, Delay, Webhook, Email, CRM, End
//! - **Palette**: Display metadata and default configuration per node kind
//! - **Execution**: Node status state machine and whole-workflow progress
//! - **Definition**: Named workflows with settings and backend statistics

pub mod definition;
pub mod edge;
pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod palette;

pub use definition::{ErrorHandling, WorkflowDefinition, WorkflowSettings, WorkflowStats};
pub use edge::{Connection, WorkflowEdge};
pub use error::{ExecutionError, GraphError, UnknownNodeKind};
pub use execution::{COMPLETE_PERCENT, ExecutionProgress, NodeStatus};
pub use graph::{GraphSnapshot, WorkflowGraph};
pub use node::{NodeData, NodeDataPatch, NodeKind, Position, WorkflowNode};
pub use palette::{NodeCategory, PaletteEntry};
