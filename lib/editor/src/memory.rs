//! In-memory workflow backend.
//!
//! Used for offline editing and tests. Executions advance by a fixed step on
//! every status poll and complete at 100%. Failures can be injected per
//! operation.

use crate::api::{ApiError, ApiResult, WorkflowApi};
use crate::wire::{
    ExecutionHandle, ExecutionState, ExecutionStatusRecord, NodeResult, WorkflowPayload,
    WorkflowRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use pagecraft_core::{ExecutionId, WorkflowId};
use pagecraft_workflow::{COMPLETE_PERCENT, NodeStatus};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Backend operation a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Execute,
    Status,
}

#[derive(Debug)]
struct ExecutionEntry {
    workflow_id: WorkflowId,
    percent: u8,
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    workflows: HashMap<WorkflowId, WorkflowRecord>,
    executions: HashMap<ExecutionId, ExecutionEntry>,
    injected: HashMap<Operation, Vec<ApiError>>,
    execution_failure: Option<String>,
    progress_step: u8,
}

/// Workflow backend that keeps everything in process memory.
#[derive(Debug)]
pub struct InMemoryWorkflowApi {
    state: Mutex<MemoryState>,
}

impl InMemoryWorkflowApi {
    /// Progress added per status poll unless overridden.
    pub const DEFAULT_PROGRESS_STEP: u8 = 25;

    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                progress_step: Self::DEFAULT_PROGRESS_STEP,
                ..MemoryState::default()
            }),
        }
    }

    /// Sets how much each status poll advances an execution.
    #[must_use]
    pub fn with_progress_step(self, step: u8) -> Self {
        self.lock().progress_step = step.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Injected failures queue up; each call consumes one.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.lock().injected.entry(operation).or_default().push(error);
    }

    /// Makes executions started from now on report failure on their first
    /// poll.
    pub fn fail_executions(&self, reason: impl Into<String>) {
        self.lock().execution_failure = Some(reason.into());
    }

    /// Returns a stored workflow.
    #[must_use]
    pub fn workflow(&self, id: WorkflowId) -> Option<WorkflowRecord> {
        self.lock().workflows.get(&id).cloned()
    }

    /// Returns the number of stored workflows.
    #[must_use]
    pub fn workflow_count(&self) -> usize {
        self.lock().workflows.len()
    }

    fn take_injected(state: &mut MemoryState, operation: Operation) -> Result<(), ApiError> {
        match state.injected.get_mut(&operation) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryWorkflowApi {
    fn default() -> Self {
        Self::new()
    }
}

fn record_from_payload(
    id: WorkflowId,
    payload: &WorkflowPayload,
    previous: Option<&WorkflowRecord>,
) -> WorkflowRecord {
    WorkflowRecord {
        id,
        name: payload.name.clone(),
        description: Some(payload.description.clone()),
        category: Some(payload.category.clone()),
        component_id: payload.component_id.clone(),
        nodes: payload.nodes.clone(),
        connections: payload.connections.clone(),
        settings: payload.settings.clone(),
        status: previous.map_or_else(|| "active".to_string(), |p| p.status.clone()),
        trigger_count: previous.map_or(0, |p| p.trigger_count),
        success_count: previous.map_or(0, |p| p.success_count),
        created_at: previous.and_then(|p| p.created_at).or_else(|| Some(Utc::now())),
    }
}

#[async_trait]
impl WorkflowApi for InMemoryWorkflowApi {
    async fn create_workflow(&self, payload: &WorkflowPayload) -> ApiResult<WorkflowRecord> {
        let mut state = self.lock();
        Self::take_injected(&mut state, Operation::Create)?;

        let record = record_from_payload(WorkflowId::new(), payload, None);
        state.workflows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_workflow(
        &self,
        id: WorkflowId,
        payload: &WorkflowPayload,
    ) -> ApiResult<WorkflowRecord> {
        let mut state = self.lock();
        Self::take_injected(&mut state, Operation::Update)?;

        let previous = state.workflows.get(&id).ok_or_else(|| ApiError::NotFound {
            resource: id.to_string(),
        })?;
        let record = record_from_payload(id, payload, Some(previous));
        state.workflows.insert(id, record.clone());
        Ok(record)
    }

    async fn execute_workflow(
        &self,
        id: WorkflowId,
        _input: JsonValue,
    ) -> ApiResult<ExecutionHandle> {
        let mut state = self.lock();
        Self::take_injected(&mut state, Operation::Execute)?;

        let failure = state.execution_failure.clone();
        let workflow = state
            .workflows
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound {
                resource: id.to_string(),
            })?;
        workflow.trigger_count += 1;

        let execution_id = ExecutionId::new();
        state.executions.insert(
            execution_id,
            ExecutionEntry {
                workflow_id: id,
                percent: 0,
                failure,
            },
        );
        Ok(ExecutionHandle {
            execution_id,
            state: ExecutionState::Queued,
        })
    }

    async fn execution_status(
        &self,
        execution_id: ExecutionId,
    ) -> ApiResult<ExecutionStatusRecord> {
        let mut state = self.lock();
        Self::take_injected(&mut state, Operation::Status)?;

        let step = state.progress_step;
        let entry = state
            .executions
            .get_mut(&execution_id)
            .ok_or_else(|| ApiError::NotFound {
                resource: execution_id.to_string(),
            })?;

        if let Some(reason) = entry.failure.clone() {
            return Ok(ExecutionStatusRecord {
                execution_id,
                state: ExecutionState::Failed,
                progress: Some(entry.percent),
                node_results: Vec::new(),
                error: Some(reason),
            });
        }

        let was_complete = entry.percent >= COMPLETE_PERCENT;
        entry.percent = entry.percent.saturating_add(step).min(COMPLETE_PERCENT);
        let percent = entry.percent;
        let workflow_id = entry.workflow_id;

        if percent < COMPLETE_PERCENT {
            return Ok(ExecutionStatusRecord {
                execution_id,
                state: ExecutionState::Running,
                progress: Some(percent),
                node_results: Vec::new(),
                error: None,
            });
        }

        let workflow = state.workflows.get_mut(&workflow_id);
        let node_results = workflow
            .map(|workflow| {
                if !was_complete {
                    workflow.success_count += 1;
                }
                workflow
                    .nodes
                    .iter()
                    .map(|node| NodeResult {
                        node_id: node.node_id,
                        status: NodeStatus::Success,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ExecutionStatusRecord {
            execution_id,
            state: ExecutionState::Completed,
            progress: Some(percent),
            node_results,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_workflow::WorkflowSettings;

    fn payload(name: &str) -> WorkflowPayload {
        WorkflowPayload {
            name: name.to_string(),
            description: String::new(),
            category: "automation".to_string(),
            trigger_type: "manual".to_string(),
            component_id: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            settings: WorkflowSettings::default(),
        }
    }

    #[tokio::test]
    async fn update_keeps_counters_and_id() {
        let api = InMemoryWorkflowApi::new();
        let created = api.create_workflow(&payload("a")).await.unwrap();
        api.execute_workflow(created.id, JsonValue::Null)
            .await
            .unwrap();

        let updated = api
            .update_workflow(created.id, &payload("b"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "b");
        assert_eq!(updated.trigger_count, 1);
        assert_eq!(api.workflow_count(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_workflow_is_not_found() {
        let api = InMemoryWorkflowApi::new();
        let err = api
            .update_workflow(WorkflowId::new(), &payload("a"))
            .await
            .unwrap_err();
        assert!(matches!(err.current_context(), ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn execution_advances_per_poll_and_counts_success() {
        let api = InMemoryWorkflowApi::new().with_progress_step(50);
        let created = api.create_workflow(&payload("a")).await.unwrap();
        let handle = api
            .execute_workflow(created.id, JsonValue::Null)
            .await
            .unwrap();

        let first = api.execution_status(handle.execution_id).await.unwrap();
        assert_eq!(first.state, ExecutionState::Running);
        assert_eq!(first.progress, Some(50));

        let second = api.execution_status(handle.execution_id).await.unwrap();
        assert_eq!(second.state, ExecutionState::Completed);

        let stored = api.workflow(created.id).unwrap();
        assert_eq!(stored.trigger_count, 1);
        assert_eq!(stored.success_count, 1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let api = InMemoryWorkflowApi::new();
        api.fail_next(
            Operation::Create,
            ApiError::Transport {
                reason: "offline".to_string(),
            },
        );

        assert!(api.create_workflow(&payload("a")).await.is_err());
        assert!(api.create_workflow(&payload("a")).await.is_ok());
    }

    #[tokio::test]
    async fn failing_executions_report_error() {
        let api = InMemoryWorkflowApi::new();
        api.fail_executions("smtp unreachable");
        let created = api.create_workflow(&payload("a")).await.unwrap();
        let handle = api
            .execute_workflow(created.id, JsonValue::Null)
            .await
            .unwrap();

        let status = api.execution_status(handle.execution_id).await.unwrap();
        assert_eq!(status.state, ExecutionState::Failed);
        assert_eq!(status.error.as_deref(), Some("smtp unreachable"));
    }
}
