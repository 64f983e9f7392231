//! Workflow graph implementation using petgraph.
//!
//! Workflows are directed graphs where:
//! - Nodes are typed workflow steps
//! - Edges connect a source handle of one node to a target handle of another
//!
//! A stable graph keeps indices valid across removals, so the id-to-index
//! maps never need rebuilding after a delete.

use crate::edge::{Connection, WorkflowEdge};
use crate::error::GraphError;
use crate::node::{NodeDataPatch, Position, WorkflowNode};
use pagecraft_core::{EdgeId, NodeId};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A workflow graph.
///
/// Every edge references two nodes that exist in the graph: `connect`
/// rejects unknown endpoints and `remove_node` cascades to incident edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GraphSnapshot", into = "GraphSnapshot")]
pub struct WorkflowGraph {
    graph: StableDiGraph<WorkflowNode, WorkflowEdge>,
    node_index_map: HashMap<NodeId, NodeIndex>,
    edge_index_map: HashMap<EdgeId, EdgeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_index_map: HashMap::new(),
            edge_index_map: HashMap::new(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// A node whose ID is already present replaces the existing node and
    /// keeps its edges. Returns the node ID.
    pub fn add_node(&mut self, node: WorkflowNode) -> NodeId {
        let node_id = node.id;
        if let Some(existing) = self.get_node_mut(node_id) {
            *existing = node;
            return node_id;
        }
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        node_id
    }

    /// Removes a node and every edge that starts or ends on it.
    ///
    /// Returns `None` if the node does not exist.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<WorkflowNode> {
        let index = self.node_index_map.remove(&node_id)?;
        let incident: Vec<EdgeId> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|edge| edge.weight().id)
            .collect();
        for edge_id in incident {
            self.edge_index_map.remove(&edge_id);
        }
        self.graph.remove_node(index)
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: NodeId) -> Option<&WorkflowNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut WorkflowNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Returns true if the node exists.
    #[must_use]
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index_map.contains_key(&node_id)
    }

    /// Moves a node. Returns false if the node does not exist.
    pub fn move_node(&mut self, node_id: NodeId, position: Position) -> bool {
        match self.get_node_mut(node_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Shallow-merges a patch into a node's data.
    ///
    /// Returns false if the node does not exist.
    pub fn update_node_data(&mut self, node_id: NodeId, patch: NodeDataPatch) -> bool {
        match self.get_node_mut(node_id) {
            Some(node) => {
                node.data.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Connects two nodes with a new edge.
    ///
    /// Duplicate edges and self-loops are accepted here so that editing is
    /// never blocked; [`validate`](Self::validate) rejects them before
    /// execution.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either endpoint does not exist.
    pub fn connect(&mut self, connection: Connection) -> Result<EdgeId, GraphError> {
        self.insert_edge(WorkflowEdge::from_connection(connection))
    }

    /// Inserts a fully-formed edge, keeping its ID.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either endpoint does not exist.
    pub fn insert_edge(&mut self, edge: WorkflowEdge) -> Result<EdgeId, GraphError> {
        let source_index = *self
            .node_index_map
            .get(&edge.source)
            .ok_or(GraphError::NodeNotFound {
                node_id: edge.source,
            })?;
        let target_index = *self
            .node_index_map
            .get(&edge.target)
            .ok_or(GraphError::NodeNotFound {
                node_id: edge.target,
            })?;

        if let Some(previous) = self.edge_index_map.remove(&edge.id) {
            self.graph.remove_edge(previous);
        }

        let edge_id = edge.id;
        let index = self.graph.add_edge(source_index, target_index, edge);
        self.edge_index_map.insert(edge_id, index);
        Ok(edge_id)
    }

    /// Removes an edge. Returns `None` if it does not exist.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<WorkflowEdge> {
        let index = self.edge_index_map.remove(&edge_id)?;
        self.graph.remove_edge(index)
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn get_edge(&self, edge_id: EdgeId) -> Option<&WorkflowEdge> {
        let index = self.edge_index_map.get(&edge_id)?;
        self.graph.edge_weight(*index)
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
    }

    /// Returns all nodes mutably.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut WorkflowNode> {
        self.graph.node_weights_mut()
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &WorkflowEdge> {
        self.graph
            .edge_indices()
            .filter_map(|index| self.graph.edge_weight(index))
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns nodes that have no incoming edges (entry points).
    pub fn entry_nodes(&self) -> Vec<&WorkflowNode> {
        self.nodes_without(Direction::Incoming)
    }

    /// Returns nodes that have no outgoing edges (terminal nodes).
    pub fn terminal_nodes(&self) -> Vec<&WorkflowNode> {
        self.nodes_without(Direction::Outgoing)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<&WorkflowNode> {
        self.graph
            .node_indices()
            .filter(|&index| self.graph.edges_directed(index, direction).next().is_none())
            .filter_map(|index| self.graph.node_weight(index))
            .collect()
    }

    /// Returns the downstream neighbours of a node with the connecting edges.
    pub fn successors(&self, node_id: NodeId) -> Vec<(&WorkflowNode, &WorkflowEdge)> {
        self.neighbours(node_id, Direction::Outgoing)
    }

    /// Returns the upstream neighbours of a node with the connecting edges.
    pub fn predecessors(&self, node_id: NodeId) -> Vec<(&WorkflowNode, &WorkflowEdge)> {
        self.neighbours(node_id, Direction::Incoming)
    }

    fn neighbours(
        &self,
        node_id: NodeId,
        direction: Direction,
    ) -> Vec<(&WorkflowNode, &WorkflowEdge)> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                Some((self.graph.node_weight(other)?, edge.weight()))
            })
            .collect()
    }

    /// Validates the graph for execution.
    ///
    /// Checks, in order:
    /// - No edge connects a node to itself
    /// - No two edges connect the same handles of the same nodes
    /// - No cycles (DAG validation)
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(edge) = self.edges().find(|edge| edge.is_self_loop()) {
            return Err(GraphError::SelfLoop {
                node_id: edge.source,
            });
        }

        let mut seen = HashSet::new();
        for edge in self.edges() {
            let key = (
                edge.source,
                edge.target,
                edge.source_handle.as_deref(),
                edge.target_handle.as_deref(),
            );
            if !seen.insert(key) {
                return Err(GraphError::DuplicateEdge {
                    source: edge.source,
                    target: edge.target,
                });
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(GraphError::CycleDetected);
        }

        Ok(())
    }

    /// Returns node IDs in an order where every edge points forward.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` if the graph is not a DAG.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| GraphError::CycleDetected)?;
        Ok(order
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index).map(|node| node.id))
            .collect())
    }

    /// Returns a flat copy of the graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat node/edge lists, the shape the canvas library and JSON use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

impl From<GraphSnapshot> for WorkflowGraph {
    /// Builds a graph, dropping edges whose endpoints are missing.
    fn from(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new();
        for node in snapshot.nodes {
            graph.add_node(node);
        }
        for edge in snapshot.edges {
            let edge_id = edge.id;
            if let Err(error) = graph.insert_edge(edge) {
                tracing::warn!(edge_id = %edge_id, %error, "Dropping dangling edge");
            }
        }
        graph
    }
}

impl From<WorkflowGraph> for GraphSnapshot {
    fn from(graph: WorkflowGraph) -> Self {
        graph.snapshot()
    }
}
