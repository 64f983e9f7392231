//! Canvas controller.
//!
//! Translates graph-library callbacks (drops, connects, node and edge
//! change batches) into store actions.

use crate::store::{Action, EditorStore, Selection, StoreError};
use pagecraft_core::{EdgeId, NodeId};
use pagecraft_workflow::{
    Connection, NodeDataPatch, NodeKind, Position, UnknownNodeKind, WorkflowEdge, WorkflowNode,
};
use tracing::debug;

/// Columns of the automatic placement grid.
pub const GRID_COLUMNS: usize = 3;
/// Top-left corner of the automatic placement grid.
pub const GRID_ORIGIN: Position = Position::new(80.0, 80.0);
/// Horizontal distance between grid columns.
pub const GRID_COLUMN_PITCH: f64 = 200.0;
/// Vertical distance between grid rows.
pub const GRID_ROW_PITCH: f64 = 120.0;

/// Returns the grid slot for the `index`-th node.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn grid_position(index: usize) -> Position {
    let column = index % GRID_COLUMNS;
    let row = index / GRID_COLUMNS;
    Position::new(
        GRID_ORIGIN.x + column as f64 * GRID_COLUMN_PITCH,
        GRID_ORIGIN.y + row as f64 * GRID_ROW_PITCH,
    )
}

/// A node change reported by the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position { id: NodeId, position: Position },
    Select { id: NodeId, selected: bool },
    Remove { id: NodeId },
}

/// An edge change reported by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Select { id: EdgeId, selected: bool },
    Remove { id: EdgeId },
}

/// Applies canvas interactions to an editor store.
#[derive(Debug, Clone)]
pub struct CanvasController {
    store: EditorStore,
}

impl CanvasController {
    /// Creates a controller for a store.
    #[must_use]
    pub fn new(store: EditorStore) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    fn apply(&self, action: Action) -> bool {
        // Only connects and status changes can fail; neither goes through here.
        self.store.dispatch(action).unwrap_or(false)
    }

    /// Adds a node of `kind` at `position` with palette defaults.
    pub fn add_node(&self, kind: NodeKind, position: Position) -> NodeId {
        let node = WorkflowNode::new(kind, position);
        let id = node.id;
        self.apply(Action::AddNode(node));
        debug!(node_id = %id, kind = %kind, "Added node");
        id
    }

    /// Adds a node in the next free slot of the placement grid.
    pub fn add_node_auto(&self, kind: NodeKind) -> NodeId {
        let index = self.store.read(|s| s.definition.graph.node_count());
        self.add_node(kind, grid_position(index))
    }

    /// Adds a node dropped from the palette.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNodeKind` if `kind_name` is not a palette entry.
    pub fn on_drop(&self, kind_name: &str, position: Position) -> Result<NodeId, UnknownNodeKind> {
        let kind: NodeKind = kind_name.parse()?;
        Ok(self.add_node(kind, position))
    }

    /// Deletes a node and its edges. Returns false if it did not exist.
    pub fn delete_node(&self, id: NodeId) -> bool {
        self.apply(Action::DeleteNode(id))
    }

    /// Connects two handles.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` (wrapped) if either endpoint does
    /// not exist.
    pub fn connect(&self, connection: Connection) -> Result<EdgeId, StoreError> {
        let edge = WorkflowEdge::from_connection(connection);
        let id = edge.id;
        self.store.dispatch(Action::Connect(edge))?;
        debug!(edge_id = %id, "Connected nodes");
        Ok(id)
    }

    /// Deletes an edge. Returns false if it did not exist.
    pub fn delete_edge(&self, id: EdgeId) -> bool {
        self.apply(Action::DeleteEdge(id))
    }

    /// Moves a node. Returns false if it did not exist.
    pub fn move_node(&self, id: NodeId, position: Position) -> bool {
        self.apply(Action::MoveNode { id, position })
    }

    /// Merges a property-panel edit into a node's data.
    pub fn update_node_data(&self, id: NodeId, patch: NodeDataPatch) -> bool {
        self.apply(Action::UpdateNodeData { id, patch })
    }

    /// Selects a node, or clears the selection with `None`.
    pub fn select_node(&self, id: Option<NodeId>) -> bool {
        self.apply(Action::Select(id.map_or(Selection::None, Selection::Node)))
    }

    /// Selects an edge, or clears the selection with `None`.
    pub fn select_edge(&self, id: Option<EdgeId>) -> bool {
        self.apply(Action::Select(id.map_or(Selection::None, Selection::Edge)))
    }

    /// Deletes whatever is selected.
    pub fn delete_selection(&self) -> bool {
        match self.store.read(|s| s.selection) {
            Selection::Node(id) => self.delete_node(id),
            Selection::Edge(id) => self.delete_edge(id),
            Selection::None => false,
        }
    }

    /// Applies a batch of node changes from the canvas.
    pub fn on_nodes_change(&self, changes: impl IntoIterator<Item = NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    self.move_node(id, position);
                }
                NodeChange::Select { id, selected } => {
                    self.apply_selection(Selection::Node(id), selected);
                }
                NodeChange::Remove { id } => {
                    self.delete_node(id);
                }
            }
        }
    }

    /// Applies a batch of edge changes from the canvas.
    pub fn on_edges_change(&self, changes: impl IntoIterator<Item = EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    self.apply_selection(Selection::Edge(id), selected);
                }
                EdgeChange::Remove { id } => {
                    self.delete_edge(id);
                }
            }
        }
    }

    fn apply_selection(&self, selection: Selection, selected: bool) {
        if selected {
            self.apply(Action::Select(selection));
        } else if self.store.read(|s| s.selection) == selection {
            self.apply(Action::Select(Selection::None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_workflow::{GraphError, NodeStatus, WorkflowDefinition};
    use std::collections::HashSet;

    fn controller() -> CanvasController {
        CanvasController::new(EditorStore::new(WorkflowDefinition::new("Test")))
    }

    fn counts(canvas: &CanvasController) -> (usize, usize) {
        canvas.store().read(|s| {
            (
                s.definition.graph.node_count(),
                s.definition.graph.edge_count(),
            )
        })
    }

    #[test]
    fn trigger_action_scenario() {
        let canvas = controller();
        let trigger = canvas.add_node(NodeKind::Trigger, Position::new(0.0, 0.0));
        let action = canvas.add_node(NodeKind::Action, Position::new(200.0, 0.0));
        canvas.connect(Connection::new(trigger, action)).unwrap();
        assert_eq!(counts(&canvas), (2, 1));

        assert!(canvas.delete_node(trigger));
        assert_eq!(counts(&canvas), (1, 0));
    }

    #[test]
    fn added_nodes_are_unique_and_idle() {
        let canvas = controller();
        let ids: Vec<_> = NodeKind::ALL
            .into_iter()
            .map(|kind| canvas.add_node(kind, Position::default()))
            .collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        canvas.store().read(|s| {
            assert!(s.definition.graph.nodes().all(|n| n.status() == NodeStatus::Idle));
        });
    }

    #[test]
    fn delete_node_twice_changes_nothing_the_second_time() {
        let canvas = controller();
        let id = canvas.add_node(NodeKind::Delay, Position::default());
        assert!(canvas.delete_node(id));

        let revision = canvas.store().revision();
        assert!(!canvas.delete_node(id));
        assert_eq!(canvas.store().revision(), revision);
    }

    #[test]
    fn auto_placement_fills_three_columns() {
        let canvas = controller();
        let ids: Vec<_> = (0..4)
            .map(|_| canvas.add_node_auto(NodeKind::Action))
            .collect();

        let positions: Vec<_> = canvas.store().read(|s| {
            ids.iter()
                .map(|id| s.definition.graph.get_node(*id).unwrap().position)
                .collect()
        });
        assert_eq!(
            positions,
            vec![
                Position::new(80.0, 80.0),
                Position::new(280.0, 80.0),
                Position::new(480.0, 80.0),
                Position::new(80.0, 200.0),
            ]
        );
    }

    #[test]
    fn drop_parses_kind_name() {
        let canvas = controller();
        let id = canvas.on_drop("webhook", Position::new(5.0, 5.0)).unwrap();
        let kind = canvas
            .store()
            .read(|s| s.definition.graph.get_node(id).map(|n| n.kind));
        assert_eq!(kind, Some(NodeKind::Webhook));

        assert!(canvas.on_drop("fax", Position::default()).is_err());
        assert_eq!(counts(&canvas), (1, 0));
    }

    #[test]
    fn connect_to_missing_node_is_an_error() {
        let canvas = controller();
        let a = canvas.add_node(NodeKind::Trigger, Position::default());
        let ghost = NodeId::new();

        let err = canvas.connect(Connection::new(a, ghost)).unwrap_err();
        assert_eq!(err, StoreError::Graph(GraphError::NodeNotFound { node_id: ghost }));
    }

    #[test]
    fn change_batches_move_select_and_remove() {
        let canvas = controller();
        let a = canvas.add_node(NodeKind::Trigger, Position::default());
        let b = canvas.add_node(NodeKind::End, Position::default());
        let edge = canvas.connect(Connection::new(a, b)).unwrap();

        canvas.on_nodes_change([
            NodeChange::Position {
                id: b,
                position: Position::new(300.0, 40.0),
            },
            NodeChange::Select {
                id: b,
                selected: true,
            },
        ]);
        let (position, selection) = canvas.store().read(|s| {
            (
                s.definition.graph.get_node(b).unwrap().position,
                s.selection,
            )
        });
        assert_eq!(position, Position::new(300.0, 40.0));
        assert_eq!(selection, Selection::Node(b));

        canvas.on_edges_change([EdgeChange::Select {
            id: edge,
            selected: true,
        }]);
        assert!(canvas.delete_selection());
        assert_eq!(counts(&canvas), (2, 0));
        assert_eq!(canvas.store().read(|s| s.selection), Selection::None);
    }

    #[test]
    fn deselect_only_clears_matching_selection() {
        let canvas = controller();
        let a = canvas.add_node(NodeKind::Trigger, Position::default());
        let b = canvas.add_node(NodeKind::End, Position::default());
        canvas.select_node(Some(a));

        canvas.on_nodes_change([NodeChange::Select {
            id: b,
            selected: false,
        }]);
        assert_eq!(canvas.store().read(|s| s.selection), Selection::Node(a));

        canvas.on_nodes_change([NodeChange::Select {
            id: a,
            selected: false,
        }]);
        assert_eq!(canvas.store().read(|s| s.selection), Selection::None);
    }

    #[test]
    fn property_edit_updates_selected_node() {
        let canvas = controller();
        let id = canvas.add_node(NodeKind::Email, Position::default());
        canvas.select_node(Some(id));

        assert!(canvas.update_node_data(id, NodeDataPatch::default().with_label("Welcome mail")));
        let label = canvas
            .store()
            .read(|s| s.selected_node().map(|n| n.label().to_string()));
        assert_eq!(label.as_deref(), Some("Welcome mail"));
    }
}
