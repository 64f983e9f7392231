//! Execution driver.
//!
//! A persisted workflow is executed by the backend and its progress is
//! polled on an interval. An unsaved workflow has nothing to execute
//! remotely, so progress is simulated locally with a fixed step per tick.
//!
//! Each run owns a cancellation token. Cancelling the run, or dropping its
//! [`ExecutionRun`] handle, stops the timer and resets progress.

use crate::api::WorkflowApi;
use crate::config::ExecutionConfig;
use crate::store::{Action, EditorStore, StoreError};
use crate::wire::{ExecutionState, ExecutionStatusRecord};
use pagecraft_core::{ExecutionId, WorkflowId};
use pagecraft_workflow::{COMPLETE_PERCENT, ExecutionError, WorkflowSettings};
use rootcause::prelude::Report;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lower bound for timer periods; tokio intervals reject zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// How a run advances its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Fixed local steps for an unsaved workflow.
    Simulated,
    /// Polling a backend execution.
    Backend,
}

/// Result of a run that reached 100%.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub mode: ExecutionMode,
    pub execution_id: Option<ExecutionId>,
}

/// Handle to an in-flight run.
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct ExecutionRun {
    mode: ExecutionMode,
    cancel: CancellationToken,
    handle: JoinHandle<Result<ExecutionOutcome, Report<ExecutionError>>>,
}

impl ExecutionRun {
    /// Returns how this run advances.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Requests cancellation. The run resets progress and stops.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the run stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run to finish.
    ///
    /// # Errors
    ///
    /// Returns the reason the run did not complete.
    pub async fn wait(mut self) -> Result<ExecutionOutcome, Report<ExecutionError>> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(join_error) => Err(ExecutionError::Failed {
                reason: join_error.to_string(),
            }
            .into()),
        }
    }
}

impl Drop for ExecutionRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Releases a claimed execution if `start` is dropped before its run exists.
struct StartGuard<'a> {
    store: Option<&'a EditorStore>,
}

impl<'a> StartGuard<'a> {
    fn new(store: &'a EditorStore) -> Self {
        Self { store: Some(store) }
    }

    fn disarm(&mut self) {
        self.store = None;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            warn!("Execution start abandoned before the run was created");
            let _ = store.dispatch(Action::ExecutionCancelled);
        }
    }
}

/// Starts workflow executions and drives their progress into a store.
#[derive(Clone)]
pub struct ExecutionDriver {
    api: Arc<dyn WorkflowApi>,
    config: ExecutionConfig,
}

impl ExecutionDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(api: Arc<dyn WorkflowApi>, config: ExecutionConfig) -> Self {
        Self { api, config }
    }

    /// Starts executing the workflow held by `store`.
    ///
    /// Dropping the returned future before it resolves releases the store
    /// again, so a later start is not rejected.
    ///
    /// # Errors
    ///
    /// - `ExecutionError::InvalidGraph` if the graph fails validation
    /// - `ExecutionError::AlreadyRunning` if the store is already executing
    /// - `ExecutionError::Initiation` if the backend refused to start
    pub async fn start(
        &self,
        store: &EditorStore,
        input: JsonValue,
    ) -> Result<ExecutionRun, Report<ExecutionError>> {
        let (workflow_id, settings, validation) = store.read(|s| {
            (
                s.definition.id,
                s.definition.settings.clone(),
                s.definition.graph.validate(),
            )
        });

        if let Err(e) = validation {
            return Err(ExecutionError::InvalidGraph {
                reason: e.to_string(),
            }
            .into());
        }

        store
            .dispatch(Action::ExecutionStarted)
            .map_err(|e| match e {
                StoreError::Execution(e) => e,
                StoreError::Graph(e) => ExecutionError::InvalidGraph {
                    reason: e.to_string(),
                },
            })?;
        let mut guard = StartGuard::new(store);

        let cancel = CancellationToken::new();
        let (mode, handle) = match workflow_id {
            None => {
                info!("Simulating execution of unsaved workflow");
                let task = simulate(store.clone(), self.config.clone(), cancel.clone());
                (ExecutionMode::Simulated, tokio::spawn(task))
            }
            Some(workflow_id) => {
                let initiated = self.initiate(store, workflow_id, input).await;
                guard.disarm();
                let execution_id = initiated?;
                let task = poll(
                    Arc::clone(&self.api),
                    store.clone(),
                    execution_id,
                    self.config.clone(),
                    settings,
                    cancel.clone(),
                );
                (ExecutionMode::Backend, tokio::spawn(task))
            }
        };
        guard.disarm();

        Ok(ExecutionRun {
            mode,
            cancel,
            handle,
        })
    }

    async fn initiate(
        &self,
        store: &EditorStore,
        workflow_id: WorkflowId,
        input: JsonValue,
    ) -> Result<ExecutionId, Report<ExecutionError>> {
        match self.api.execute_workflow(workflow_id, input).await {
            Ok(handle) => {
                info!(
                    workflow_id = %workflow_id,
                    execution_id = %handle.execution_id,
                    "Started workflow execution"
                );
                let _ = store.dispatch(Action::ExecutionAccepted {
                    execution_id: handle.execution_id,
                });
                Ok(handle.execution_id)
            }
            Err(report) => {
                let reason = report.to_string();
                error!(workflow_id = %workflow_id, error = %reason, "Failed to start execution");
                let _ = store.dispatch(Action::ExecutionFailed {
                    message: reason.clone(),
                });
                Err(report.context(ExecutionError::Initiation { reason }))
            }
        }
    }
}

fn fail(store: &EditorStore, err: ExecutionError) -> Report<ExecutionError> {
    let message = err.to_string();
    error!(error = %message, "Workflow execution failed");
    let _ = store.dispatch(Action::ExecutionFailed { message });
    err.into()
}

fn cancelled(store: &EditorStore) -> Report<ExecutionError> {
    info!("Workflow execution cancelled");
    let _ = store.dispatch(Action::ExecutionCancelled);
    ExecutionError::Cancelled.into()
}

async fn simulate(
    store: EditorStore,
    config: ExecutionConfig,
    cancel: CancellationToken,
) -> Result<ExecutionOutcome, Report<ExecutionError>> {
    let period = config.simulated_tick().max(MIN_PERIOD);
    let step = config.simulated_step.max(1);
    let mut ticker = time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(&store)),
            _ = ticker.tick() => {}
        }

        if !store.read(|s| s.is_executing()) {
            // Something else (a load, a failure) ended the execution.
            return Err(ExecutionError::Cancelled.into());
        }

        let _ = store.dispatch(Action::ProgressStepped(step));
        let percent = store.read(|s| s.progress.percent());
        debug!(percent, "Simulated execution progress");

        if percent >= COMPLETE_PERCENT {
            let _ = store.dispatch(Action::ExecutionCompleted);
            info!("Simulated execution completed");
            return Ok(ExecutionOutcome {
                mode: ExecutionMode::Simulated,
                execution_id: None,
            });
        }
    }
}

fn apply_status(store: &EditorStore, record: &ExecutionStatusRecord) {
    if !record.node_results.is_empty() {
        let results = record
            .node_results
            .iter()
            .map(|result| (result.node_id, result.status))
            .collect();
        let _ = store.dispatch(Action::NodeResults(results));
    }
    if let Some(percent) = record.progress {
        let _ = store.dispatch(Action::ProgressReported(percent));
    }
}

async fn poll(
    api: Arc<dyn WorkflowApi>,
    store: EditorStore,
    execution_id: ExecutionId,
    config: ExecutionConfig,
    settings: WorkflowSettings,
    cancel: CancellationToken,
) -> Result<ExecutionOutcome, Report<ExecutionError>> {
    let period = config.poll_interval().max(MIN_PERIOD);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = time::sleep(settings.max_execution_duration());
    tokio::pin!(deadline);

    let mut consecutive_errors = 0u32;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(&store)),
            () = &mut deadline => {
                return Err(fail(&store, ExecutionError::TimedOut {
                    seconds: settings.max_execution_time,
                }));
            }
            _ = ticker.tick() => {}
        }

        if !store.read(|s| s.is_executing()) {
            return Err(ExecutionError::Cancelled.into());
        }

        let status = api.execution_status(execution_id).await;
        if cancel.is_cancelled() {
            return Err(cancelled(&store));
        }

        let record = match status {
            Ok(record) => {
                consecutive_errors = 0;
                record
            }
            Err(report) => {
                consecutive_errors += 1;
                warn!(
                    execution_id = %execution_id,
                    attempt = consecutive_errors,
                    error = %report,
                    "Execution status poll failed"
                );
                if consecutive_errors > settings.retry_attempts {
                    let reason = report.to_string();
                    let _ = fail(
                        &store,
                        ExecutionError::Failed {
                            reason: reason.clone(),
                        },
                    );
                    return Err(report.context(ExecutionError::Failed { reason }));
                }
                continue;
            }
        };

        apply_status(&store, &record);
        debug!(
            execution_id = %execution_id,
            state = ?record.state,
            progress = ?record.progress,
            "Polled execution status"
        );

        match record.state {
            ExecutionState::Completed => {
                let _ = store.dispatch(Action::ExecutionCompleted);
                info!(execution_id = %execution_id, "Workflow execution completed");
                return Ok(ExecutionOutcome {
                    mode: ExecutionMode::Backend,
                    execution_id: Some(execution_id),
                });
            }
            ExecutionState::Failed => {
                let reason = record
                    .error
                    .unwrap_or_else(|| "backend reported failure".to_string());
                return Err(fail(&store, ExecutionError::Failed { reason }));
            }
            ExecutionState::Queued | ExecutionState::Running => {}
        }
    }
}
