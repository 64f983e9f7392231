//! Workflow backend abstraction.
//!
//! The editor only talks to the backend through [`WorkflowApi`], so the
//! HTTP client and the in-memory backend are interchangeable.

use crate::wire::{ExecutionHandle, ExecutionStatusRecord, WorkflowPayload, WorkflowRecord};
use async_trait::async_trait;
use pagecraft_core::{ExecutionId, WorkflowId};
use serde_json::Value as JsonValue;
use std::fmt;

/// Errors from backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The client could not be built from its configuration.
    InvalidConfig { reason: String },
    /// The request never produced a response.
    Transport { reason: String },
    /// The backend answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body did not match the expected shape.
    InvalidResponse { reason: String },
    /// The referenced workflow or execution does not exist.
    NotFound { resource: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid backend configuration: {reason}"),
            Self::Transport { reason } => write!(f, "backend request failed: {reason}"),
            Self::Status { status, body } => {
                write!(f, "backend returned status {status}: {body}")
            }
            Self::InvalidResponse { reason } => write!(f, "invalid backend response: {reason}"),
            Self::NotFound { resource } => write!(f, "not found: {resource}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Result of a backend call.
pub type ApiResult<T> = pagecraft_core::Result<T, ApiError>;

/// Trait for workflow backends.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Stores a new workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the payload or is unreachable.
    async fn create_workflow(&self, payload: &WorkflowPayload) -> ApiResult<WorkflowRecord>;

    /// Replaces a stored workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow does not exist, the backend rejects
    /// the payload, or it is unreachable.
    async fn update_workflow(
        &self,
        id: WorkflowId,
        payload: &WorkflowPayload,
    ) -> ApiResult<WorkflowRecord>;

    /// Starts an execution of a stored workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution could not be started.
    async fn execute_workflow(
        &self,
        id: WorkflowId,
        input: JsonValue,
    ) -> ApiResult<ExecutionHandle>;

    /// Reports the current state of an execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution is unknown or the backend is
    /// unreachable.
    async fn execution_status(&self, execution_id: ExecutionId) -> ApiResult<ExecutionStatusRecord>;
}
