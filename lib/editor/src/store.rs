//! Editor state and its reducer.
//!
//! All editor state lives in one [`EditorState`] value that only changes
//! through [`reduce`]. [`EditorStore`] shares it between the canvas, the
//! persistence adapter and the execution driver, and notifies subscribers
//! through a revision counter.

use chrono::{DateTime, Utc};
use pagecraft_core::{EdgeId, ExecutionId, NodeId, WorkflowId};
use pagecraft_workflow::{
    ExecutionError, ExecutionProgress, GraphError, NodeDataPatch, NodeStatus, Position,
    WorkflowDefinition, WorkflowEdge, WorkflowNode, WorkflowStats,
};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// What is currently selected on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

/// Outcome of the most recent save.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SaveState {
    /// Nothing saved in this session yet.
    #[default]
    Idle,
    /// A save request is in flight.
    Saving,
    /// The last save succeeded.
    Saved { at: DateTime<Utc> },
    /// The last save failed; the graph was kept as edited.
    Failed { message: String },
}

/// Complete state of one editor session.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub definition: WorkflowDefinition,
    pub selection: Selection,
    pub save_state: SaveState,
    pub progress: ExecutionProgress,
    /// Backend execution being tracked, if any.
    pub execution_id: Option<ExecutionId>,
    /// Message of the last failed execution.
    pub execution_error: Option<String>,
    edits: u64,
    saved_edits: u64,
    saving_edits: u64,
}

impl EditorState {
    /// Creates state around a definition, treated as clean.
    #[must_use]
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            definition,
            selection: Selection::None,
            save_state: SaveState::Idle,
            progress: ExecutionProgress::new(),
            execution_id: None,
            execution_error: None,
            edits: 0,
            saved_edits: 0,
            saving_edits: 0,
        }
    }

    /// Returns true if the graph or metadata changed since the last
    /// successful save or load.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.edits != self.saved_edits
    }

    /// Returns true while an execution is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.progress.is_executing()
    }

    /// Returns the selected node, if a node is selected.
    #[must_use]
    pub fn selected_node(&self) -> Option<&WorkflowNode> {
        match self.selection {
            Selection::Node(id) => self.definition.graph.get_node(id),
            _ => None,
        }
    }
}

/// Every change the editor can make to its state.
#[derive(Debug, Clone)]
pub enum Action {
    AddNode(WorkflowNode),
    DeleteNode(NodeId),
    Connect(WorkflowEdge),
    DeleteEdge(EdgeId),
    MoveNode { id: NodeId, position: Position },
    UpdateNodeData { id: NodeId, patch: NodeDataPatch },
    Rename { name: String, description: String },
    Select(Selection),
    /// Moves one node through the status state machine.
    SetNodeStatus { id: NodeId, status: NodeStatus },
    /// Returns every node to idle outside an execution.
    ResetStatuses,
    ExecutionStarted,
    /// Records the ID the backend assigned to the running execution.
    ExecutionAccepted { execution_id: ExecutionId },
    /// Adds to the progress percentage.
    ProgressStepped(u8),
    /// Raises the progress percentage to a reported value.
    ProgressReported(u8),
    /// Applies per-node results reported by the backend.
    NodeResults(Vec<(NodeId, NodeStatus)>),
    ExecutionCompleted,
    ExecutionFailed { message: String },
    ExecutionCancelled,
    SaveStarted,
    Saved {
        id: WorkflowId,
        stats: Option<WorkflowStats>,
    },
    SaveFailed { message: String },
    /// Replaces the whole definition, e.g. after loading.
    Load(WorkflowDefinition),
}

impl Action {
    fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::AddNode(_)
                | Self::DeleteNode(_)
                | Self::Connect(_)
                | Self::DeleteEdge(_)
                | Self::MoveNode { .. }
                | Self::UpdateNodeData { .. }
                | Self::Rename { .. }
        )
    }
}

/// Errors from applying an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Graph(GraphError),
    Execution(ExecutionError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "graph error: {e}"),
            Self::Execution(e) => write!(f, "execution error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GraphError> for StoreError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<ExecutionError> for StoreError {
    fn from(e: ExecutionError) -> Self {
        Self::Execution(e)
    }
}

/// Moves every node currently in `from` to `to`.
fn transition_all(state: &mut EditorState, from: Option<NodeStatus>, to: NodeStatus) {
    for node in state.definition.graph.nodes_mut() {
        let status = node.data.status;
        if from.is_none_or(|from| from == status) && status.can_transition_to(to) {
            node.data.status = to;
        }
    }
}

fn clear_selection_of(
    state: &mut EditorState,
    removed_node: Option<NodeId>,
    removed_edge: Option<EdgeId>,
) {
    let stale = match state.selection {
        Selection::Node(id) => Some(id) == removed_node,
        Selection::Edge(id) => {
            Some(id) == removed_edge || state.definition.graph.get_edge(id).is_none()
        }
        Selection::None => false,
    };
    if stale {
        state.selection = Selection::None;
    }
}

/// Applies `action` to `state`.
///
/// Returns whether anything changed. No-ops such as deleting a missing node
/// return `Ok(false)`.
///
/// # Errors
///
/// - `GraphError::NodeNotFound` when connecting to a missing node
/// - `ExecutionError::AlreadyRunning` when starting while executing
/// - `ExecutionError::InvalidTransition` for a disallowed node status change
pub fn reduce(state: &mut EditorState, action: Action) -> Result<bool, StoreError> {
    let is_edit = action.is_edit();

    let changed = match action {
        Action::AddNode(node) => {
            state.definition.graph.add_node(node);
            true
        }
        Action::DeleteNode(id) => {
            let removed = state.definition.graph.remove_node(id).is_some();
            if removed {
                clear_selection_of(state, Some(id), None);
            }
            removed
        }
        Action::Connect(edge) => {
            state.definition.graph.insert_edge(edge)?;
            true
        }
        Action::DeleteEdge(id) => {
            let removed = state.definition.graph.remove_edge(id).is_some();
            if removed {
                clear_selection_of(state, None, Some(id));
            }
            removed
        }
        Action::MoveNode { id, position } => state.definition.graph.move_node(id, position),
        Action::UpdateNodeData { id, patch } => {
            !patch.is_empty() && state.definition.graph.update_node_data(id, patch)
        }
        Action::Rename { name, description } => {
            state.definition.name = name;
            state.definition.description = description;
            true
        }
        Action::Select(selection) => {
            let exists = match selection {
                Selection::None => true,
                Selection::Node(id) => state.definition.graph.contains_node(id),
                Selection::Edge(id) => state.definition.graph.get_edge(id).is_some(),
            };
            let changed = exists && state.selection != selection;
            if changed {
                state.selection = selection;
            }
            changed
        }
        Action::SetNodeStatus { id, status } => {
            let node = state
                .definition
                .graph
                .get_node_mut(id)
                .ok_or(GraphError::NodeNotFound { node_id: id })?;
            node.data.status = node.data.status.transition(status)?;
            true
        }
        Action::ResetStatuses => {
            if state.is_executing() {
                return Err(ExecutionError::AlreadyRunning.into());
            }
            transition_all(state, None, NodeStatus::Idle);
            true
        }
        Action::ExecutionStarted => {
            if state.is_executing() {
                return Err(ExecutionError::AlreadyRunning.into());
            }
            state.progress.start();
            state.execution_id = None;
            state.execution_error = None;
            transition_all(state, None, NodeStatus::Running);
            true
        }
        Action::ExecutionAccepted { execution_id } => {
            if !state.is_executing() {
                return Ok(false);
            }
            state.execution_id = Some(execution_id);
            true
        }
        Action::ProgressStepped(step) => {
            let before = state.progress.percent();
            state.progress.advance_by(step) != before
        }
        Action::ProgressReported(percent) => {
            let before = state.progress.percent();
            state.progress.advance_to(percent) != before
        }
        Action::NodeResults(results) => {
            let mut changed = false;
            for (id, status) in results {
                let Some(node) = state.definition.graph.get_node_mut(id) else {
                    continue;
                };
                if let Ok(next) = node.data.status.transition(status) {
                    changed |= next != node.data.status;
                    node.data.status = next;
                }
            }
            changed
        }
        Action::ExecutionCompleted => {
            if !state.is_executing() {
                return Ok(false);
            }
            state.progress.complete();
            transition_all(state, Some(NodeStatus::Running), NodeStatus::Success);
            true
        }
        Action::ExecutionFailed { message } => {
            if !state.is_executing() {
                return Ok(false);
            }
            state.progress.reset();
            state.execution_error = Some(message);
            transition_all(state, Some(NodeStatus::Running), NodeStatus::Error);
            true
        }
        Action::ExecutionCancelled => {
            if !state.is_executing() {
                return Ok(false);
            }
            state.progress.reset();
            transition_all(state, Some(NodeStatus::Running), NodeStatus::Idle);
            true
        }
        Action::SaveStarted => {
            state.save_state = SaveState::Saving;
            state.saving_edits = state.edits;
            true
        }
        Action::Saved { id, stats } => {
            state.definition.id = Some(id);
            if stats.is_some() {
                state.definition.stats = stats;
            }
            state.saved_edits = state.saving_edits;
            state.save_state = SaveState::Saved { at: Utc::now() };
            true
        }
        Action::SaveFailed { message } => {
            state.save_state = SaveState::Failed { message };
            true
        }
        Action::Load(definition) => {
            *state = EditorState::new(definition);
            true
        }
    };

    if changed && is_edit {
        state.edits += 1;
    }
    Ok(changed)
}

/// Shared handle to editor state.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct EditorStore {
    state: Arc<RwLock<EditorState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl EditorStore {
    /// Creates a store around a definition.
    #[must_use]
    pub fn new(definition: WorkflowDefinition) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(EditorState::new(definition))),
            revision: Arc::new(revision),
        }
    }

    /// Applies an action and notifies subscribers if anything changed.
    ///
    /// # Errors
    ///
    /// Returns the reducer's error; the state is left as it was.
    pub fn dispatch(&self, action: Action) -> Result<bool, StoreError> {
        let changed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            reduce(&mut state, action)?
        };
        if changed {
            self.revision.send_modify(|revision| *revision += 1);
        }
        Ok(changed)
    }

    /// Runs `f` against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> EditorState {
        self.read(EditorState::clone)
    }

    /// Returns the number of changes applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribes to state changes.
    ///
    /// The receiver yields the revision counter; read the state with
    /// [`read`](Self::read) after each change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl fmt::Debug for EditorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorStore")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}
