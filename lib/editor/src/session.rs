//! Editor session.
//!
//! Owns one workflow's store together with the canvas controller, the
//! persistence adapter and the execution driver that act on it. Dropping
//! the session cancels any execution it started.

use crate::api::{ApiResult, WorkflowApi};
use crate::canvas::CanvasController;
use crate::config::{EditorConfig, ExecutionConfig};
use crate::driver::{ExecutionDriver, ExecutionMode, ExecutionOutcome, ExecutionRun};
use crate::http::HttpWorkflowApi;
use crate::memory::InMemoryWorkflowApi;
use crate::persistence::{PersistenceAdapter, PersistenceError};
use crate::store::{Action, EditorStore};
use crate::wire::WorkflowRecord;
use pagecraft_core::WorkflowId;
use pagecraft_workflow::{ExecutionError, WorkflowDefinition};
use rootcause::prelude::Report;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// One open workflow in the editor.
pub struct EditorSession {
    store: EditorStore,
    canvas: CanvasController,
    persistence: PersistenceAdapter,
    driver: ExecutionDriver,
    run: Mutex<Option<ExecutionRun>>,
}

impl EditorSession {
    /// Opens a session over an explicit backend.
    #[must_use]
    pub fn new(
        definition: WorkflowDefinition,
        api: Arc<dyn WorkflowApi>,
        config: ExecutionConfig,
    ) -> Self {
        let store = EditorStore::new(definition);
        Self {
            canvas: CanvasController::new(store.clone()),
            persistence: PersistenceAdapter::new(Arc::clone(&api)),
            driver: ExecutionDriver::new(api, config),
            store,
            run: Mutex::new(None),
        }
    }

    /// Opens a session against the HTTP backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(
        definition: WorkflowDefinition,
        config: &EditorConfig,
    ) -> ApiResult<Self> {
        let api = HttpWorkflowApi::new(&config.api)?;
        info!(base_url = %config.api.base_url, "Opening editor session");
        Ok(Self::new(
            definition,
            Arc::new(api),
            config.execution.clone(),
        ))
    }

    /// Opens a session backed by an in-memory backend.
    #[must_use]
    pub fn offline(definition: WorkflowDefinition) -> Self {
        Self::new(
            definition,
            Arc::new(InMemoryWorkflowApi::new()),
            ExecutionConfig::default(),
        )
    }

    /// Returns the session's store.
    #[must_use]
    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    /// Returns the canvas controller.
    #[must_use]
    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    fn run_slot(&self) -> std::sync::MutexGuard<'_, Option<ExecutionRun>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves the workflow.
    ///
    /// # Errors
    ///
    /// Returns the persistence error; the store also shows it.
    pub async fn save(&self) -> Result<WorkflowId, Report<PersistenceError>> {
        self.persistence.save_store(&self.store).await
    }

    /// Replaces the open workflow with a stored record.
    ///
    /// A running execution is cancelled first.
    pub fn load(&self, record: WorkflowRecord) {
        self.cancel_execution();
        let _ = self
            .store
            .dispatch(Action::Load(PersistenceAdapter::load(record)));
    }

    /// Starts executing the workflow.
    ///
    /// # Errors
    ///
    /// Returns the driver's start error; see [`ExecutionDriver::start`].
    pub async fn execute(&self, input: JsonValue) -> Result<ExecutionMode, Report<ExecutionError>> {
        let run = self.driver.start(&self.store, input).await?;
        let mode = run.mode();
        *self.run_slot() = Some(run);
        Ok(mode)
    }

    /// Cancels the current execution. Returns false if none was running.
    pub fn cancel_execution(&self) -> bool {
        match self.run_slot().as_ref() {
            Some(run) if !run.is_finished() => {
                run.cancel();
                true
            }
            _ => false,
        }
    }

    /// Waits for the current execution to finish.
    ///
    /// Returns `None` if nothing was started since the last wait.
    pub async fn wait_for_execution(
        &self,
    ) -> Option<Result<ExecutionOutcome, Report<ExecutionError>>> {
        let run = self.run_slot().take()?;
        Some(run.wait().await)
    }
}
