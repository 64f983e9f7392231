//! Request and response shapes of the workflow backend.
//!
//! Node and workflow fields use snake_case; connection handles and
//! settings use camelCase, matching what the backend stores.

use chrono::{DateTime, Utc};
use pagecraft_core::{EdgeId, ExecutionId, NodeId, WorkflowId};
use pagecraft_workflow::{NodeKind, NodeStatus, Position, WorkflowSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body of a create or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub name: String,
    pub description: String,
    pub category: String,
    pub trigger_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    pub nodes: Vec<NodePayload>,
    pub connections: Vec<ConnectionPayload>,
    pub settings: WorkflowSettings,
}

/// One node on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    pub node_id: NodeId,
    /// Display label.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub node_type: NodeKind,
    /// Kind-specific configuration.
    #[serde(default)]
    pub parameters: JsonValue,
    pub position: Position,
    /// Target handle names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Source handle names.
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// One edge on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    /// Edge ID, when the backend echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// A stored workflow as returned by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub component_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodePayload>,
    #[serde(default)]
    pub connections: Vec<ConnectionPayload>,
    #[serde(default)]
    pub settings: WorkflowSettings,
    #[serde(default = "default_record_status")]
    pub status: String,
    #[serde(default)]
    pub trigger_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_record_status() -> String {
    "draft".to_string()
}

/// Lifecycle of a backend execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    #[default]
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExecutionState {
    /// Returns true once the backend stopped working on the execution.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Returned when an execution is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    pub execution_id: ExecutionId,
    #[serde(default)]
    pub state: ExecutionState,
}

/// Per-node outcome reported while polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub status: NodeStatus,
}

/// Response of the execution status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatusRecord {
    pub execution_id: ExecutionId,
    pub state: ExecutionState,
    /// Whole-workflow percentage, when the backend tracks it.
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub node_results: Vec<NodeResult>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_record_fills_defaults() {
        let id = WorkflowId::new();
        let record: WorkflowRecord = serde_json::from_value(json!({
            "id": id,
            "name": "Welcome series",
        }))
        .expect("deserialize");

        assert_eq!(record.id, id);
        assert_eq!(record.status, "draft");
        assert_eq!(record.trigger_count, 0);
        assert!(record.nodes.is_empty());
        assert_eq!(record.settings, WorkflowSettings::default());
    }

    #[test]
    fn connection_handles_are_camel_case() {
        let connection = ConnectionPayload {
            id: None,
            source: NodeId::new(),
            target: NodeId::new(),
            source_handle: Some("true".to_string()),
            target_handle: None,
        };
        let json = serde_json::to_value(&connection).expect("serialize");

        assert_eq!(json["sourceHandle"], "true");
        assert!(json.get("targetHandle").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let result: Result<NodePayload, _> = serde_json::from_value(json!({
            "node_id": NodeId::new(),
            "name": "SMS",
            "node_type": "sms",
            "position": { "x": 0.0, "y": 0.0 },
        }));
        assert!(result.is_err());
    }

    #[test]
    fn status_record_parses_node_results() {
        let node_id = NodeId::new();
        let record: ExecutionStatusRecord = serde_json::from_value(json!({
            "execution_id": ExecutionId::new(),
            "state": "running",
            "progress": 40,
            "node_results": [{ "node_id": node_id, "status": "success" }],
        }))
        .expect("deserialize");

        assert!(!record.state.is_finished());
        assert_eq!(record.progress, Some(40));
        assert_eq!(record.node_results[0].status, NodeStatus::Success);
    }
}
