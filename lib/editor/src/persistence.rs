//! Persistence adapter.
//!
//! Maps a [`WorkflowDefinition`] to the backend payload, chooses between
//! create and update, and maps the stored record back.

use crate::api::WorkflowApi;
use crate::store::{Action, EditorStore};
use crate::wire::{ConnectionPayload, NodePayload, WorkflowPayload, WorkflowRecord};
use pagecraft_core::{EdgeId, WorkflowId};
use pagecraft_workflow::definition::DEFAULT_CATEGORY;
use pagecraft_workflow::{
    Connection, GraphSnapshot, NodeData, WorkflowDefinition, WorkflowEdge, WorkflowGraph,
    WorkflowNode, WorkflowStats,
};
use rootcause::prelude::Report;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Errors from saving a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Creating a new workflow failed.
    CreateFailed { name: String },
    /// Updating an existing workflow failed.
    UpdateFailed { workflow_id: WorkflowId },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed { name } => write!(f, "failed to create workflow '{name}'"),
            Self::UpdateFailed { workflow_id } => {
                write!(f, "failed to update workflow {workflow_id}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Saves and loads workflow definitions through a [`WorkflowApi`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    api: Arc<dyn WorkflowApi>,
}

impl PersistenceAdapter {
    /// Creates an adapter over a backend.
    #[must_use]
    pub fn new(api: Arc<dyn WorkflowApi>) -> Self {
        Self { api }
    }

    /// Maps a definition to the wire payload.
    #[must_use]
    pub fn to_payload(definition: &WorkflowDefinition) -> WorkflowPayload {
        let nodes = definition
            .graph
            .nodes()
            .map(|node| {
                let entry = node.kind.palette();
                NodePayload {
                    node_id: node.id,
                    name: node.data.label.clone(),
                    description: node.data.description.clone(),
                    node_type: node.kind,
                    parameters: node.data.config.clone(),
                    position: node.position,
                    inputs: entry.inputs.iter().map(ToString::to_string).collect(),
                    outputs: entry.outputs.iter().map(ToString::to_string).collect(),
                }
            })
            .collect();

        let connections = definition
            .graph
            .edges()
            .map(|edge| ConnectionPayload {
                id: Some(edge.id),
                source: edge.source,
                target: edge.target,
                source_handle: edge.source_handle.clone(),
                target_handle: edge.target_handle.clone(),
            })
            .collect();

        WorkflowPayload {
            name: definition.name.clone(),
            description: definition.description.clone(),
            category: definition.category.clone(),
            trigger_type: definition.trigger_type().to_string(),
            component_id: definition.component_id.clone(),
            nodes,
            connections,
            settings: definition.settings.clone(),
        }
    }

    /// Maps a stored record back to a definition.
    ///
    /// Node statuses start idle. Connections whose endpoints are not in the
    /// record are dropped.
    #[must_use]
    pub fn load(record: WorkflowRecord) -> WorkflowDefinition {
        let stats = WorkflowStats::from_counts(
            record.status,
            record.trigger_count,
            record.success_count,
            record.created_at,
        );

        let nodes = record
            .nodes
            .into_iter()
            .map(|node| {
                let mut workflow_node =
                    WorkflowNode::with_id(node.node_id, node.node_type, node.position);
                workflow_node.data = NodeData {
                    label: node.name,
                    description: if node.description.is_empty() {
                        workflow_node.data.description
                    } else {
                        node.description
                    },
                    config: node.parameters,
                    status: workflow_node.data.status,
                };
                workflow_node
            })
            .collect();

        let edges = record
            .connections
            .into_iter()
            .map(|connection| {
                let id = connection.id.unwrap_or_else(EdgeId::new);
                WorkflowEdge::with_id(
                    id,
                    Connection {
                        source: connection.source,
                        target: connection.target,
                        source_handle: connection.source_handle,
                        target_handle: connection.target_handle,
                    },
                )
            })
            .collect();

        WorkflowDefinition {
            id: Some(record.id),
            name: record.name,
            description: record.description.unwrap_or_default(),
            category: record
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            component_id: record.component_id,
            graph: WorkflowGraph::from(GraphSnapshot { nodes, edges }),
            settings: record.settings,
            stats: Some(stats),
        }
    }

    /// Saves a definition, creating it if it has no ID yet.
    ///
    /// Returns the definition as stored by the backend.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::CreateFailed` or
    /// `PersistenceError::UpdateFailed` with the backend error attached.
    pub async fn save(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowDefinition, Report<PersistenceError>> {
        Ok(Self::load(self.save_record(definition).await?))
    }

    async fn save_record(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowRecord, Report<PersistenceError>> {
        let payload = Self::to_payload(definition);

        let result = match definition.id {
            Some(workflow_id) => self
                .api
                .update_workflow(workflow_id, &payload)
                .await
                .map_err(|report| report.context(PersistenceError::UpdateFailed { workflow_id })),
            None => self.api.create_workflow(&payload).await.map_err(|report| {
                report.context(PersistenceError::CreateFailed {
                    name: definition.name.clone(),
                })
            }),
        };

        match &result {
            Ok(record) => info!(
                workflow_id = %record.id,
                nodes = record.nodes.len(),
                connections = record.connections.len(),
                "Saved workflow"
            ),
            Err(report) => error!(error = %report, "Failed to save workflow"),
        }
        result
    }

    /// Saves the definition held by `store` and records the outcome there.
    ///
    /// On failure the store shows `SaveState::Failed` and keeps the graph as
    /// edited.
    ///
    /// # Errors
    ///
    /// Returns the error from [`save`](Self::save).
    pub async fn save_store(
        &self,
        store: &EditorStore,
    ) -> Result<WorkflowId, Report<PersistenceError>> {
        let _ = store.dispatch(Action::SaveStarted);
        let definition = store.read(|s| s.definition.clone());

        match self.save_record(&definition).await {
            Ok(record) => {
                let id = record.id;
                let saved = Self::load(record);
                let _ = store.dispatch(Action::Saved {
                    id,
                    stats: saved.stats,
                });
                Ok(id)
            }
            Err(report) => {
                let _ = store.dispatch(Action::SaveFailed {
                    message: report.to_string(),
                });
                Err(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::memory::{InMemoryWorkflowApi, Operation};
    use crate::store::SaveState;
    use pagecraft_workflow::{NodeKind, Position};
    use serde_json::json;

    fn two_node_definition() -> WorkflowDefinition {
        let mut definition = WorkflowDefinition::new("Lead capture").with_component("form-1");
        let trigger = definition
            .graph
            .add_node(WorkflowNode::new(NodeKind::Trigger, Position::new(0.0, 0.0)));
        let condition = definition
            .graph
            .add_node(WorkflowNode::new(NodeKind::Condition, Position::new(200.0, 0.0)));
        definition
            .graph
            .connect(Connection::new(trigger, condition).with_target_handle("input"))
            .unwrap();
        definition
    }

    #[test]
    fn payload_uses_wire_names_and_palette_handles() {
        let definition = two_node_definition();
        let payload = PersistenceAdapter::to_payload(&definition);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["trigger_type"], "manual");
        assert_eq!(json["component_id"], "form-1");
        assert_eq!(json["settings"]["retryAttempts"], 3);
        assert_eq!(json["connections"][0]["targetHandle"], "input");

        let condition = payload
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::Condition)
            .unwrap();
        assert_eq!(condition.outputs, vec!["true", "false"]);
        assert_eq!(condition.inputs, vec!["input"]);
    }

    #[tokio::test]
    async fn save_then_load_keeps_counts() {
        let adapter = PersistenceAdapter::new(Arc::new(InMemoryWorkflowApi::new()));
        let definition = two_node_definition();

        let saved = adapter.save(&definition).await.unwrap();

        assert!(saved.is_persisted());
        assert_eq!(saved.graph.node_count(), definition.graph.node_count());
        assert_eq!(saved.graph.edge_count(), definition.graph.edge_count());
        assert_eq!(saved.component_id.as_deref(), Some("form-1"));
    }

    #[tokio::test]
    async fn second_save_updates_instead_of_creating() {
        let api = Arc::new(InMemoryWorkflowApi::new());
        let adapter = PersistenceAdapter::new(api.clone());

        let saved = adapter.save(&two_node_definition()).await.unwrap();
        let again = adapter.save(&saved).await.unwrap();

        assert_eq!(again.id, saved.id);
        assert_eq!(api.workflow_count(), 1);
    }

    #[test]
    fn load_synthesizes_success_rate() {
        let record: WorkflowRecord = serde_json::from_value(json!({
            "id": WorkflowId::new(),
            "name": "Nurture",
            "status": "active",
            "trigger_count": 8,
            "success_count": 6,
        }))
        .unwrap();
        let stats = PersistenceAdapter::load(record).stats.unwrap();
        assert!((stats.success_rate - 75.0).abs() < f64::EPSILON);

        let fresh: WorkflowRecord = serde_json::from_value(json!({
            "id": WorkflowId::new(),
            "name": "Fresh",
        }))
        .unwrap();
        let stats = PersistenceAdapter::load(fresh).stats.unwrap();
        assert!((stats.success_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_drops_dangling_connections() {
        let definition = two_node_definition();
        let mut payload = PersistenceAdapter::to_payload(&definition);
        payload.connections.push(ConnectionPayload {
            id: None,
            source: payload.nodes[0].node_id,
            target: pagecraft_core::NodeId::new(),
            source_handle: None,
            target_handle: None,
        });
        let record = WorkflowRecord {
            id: WorkflowId::new(),
            name: payload.name,
            description: None,
            category: None,
            component_id: None,
            nodes: payload.nodes,
            connections: payload.connections,
            settings: payload.settings,
            status: "active".to_string(),
            trigger_count: 0,
            success_count: 0,
            created_at: None,
        };

        let loaded = PersistenceAdapter::load(record);
        assert_eq!(loaded.graph.node_count(), 2);
        assert_eq!(loaded.graph.edge_count(), 1);
        assert_eq!(loaded.category, "automation");
    }

    #[tokio::test]
    async fn failed_save_is_visible_in_store_without_rollback() {
        let api = Arc::new(InMemoryWorkflowApi::new());
        api.fail_next(
            Operation::Create,
            ApiError::Transport {
                reason: "connection refused".to_string(),
            },
        );
        let adapter = PersistenceAdapter::new(api);
        let store = EditorStore::new(two_node_definition());

        let err = adapter.save_store(&store).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            PersistenceError::CreateFailed { .. }
        ));

        let state = store.snapshot();
        assert!(matches!(state.save_state, SaveState::Failed { .. }));
        assert!(!state.definition.is_persisted());
        assert_eq!(state.definition.graph.node_count(), 2);
    }

    #[tokio::test]
    async fn successful_save_records_id_and_stats() {
        let adapter = PersistenceAdapter::new(Arc::new(InMemoryWorkflowApi::new()));
        let store = EditorStore::new(two_node_definition());

        let id = adapter.save_store(&store).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.definition.id, Some(id));
        assert!(matches!(state.save_state, SaveState::Saved { .. }));
        assert!(state.definition.stats.is_some());
    }
}
