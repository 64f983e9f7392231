//! Workflow node types.
//!
//! Each node has:
//! - A unique ID within the workflow
//! - A kind (trigger, action, condition, ...) that selects its palette entry
//! - A canvas position
//! - Editable data (label, description, config) plus its execution status

use crate::error::UnknownNodeKind;
use crate::execution::NodeStatus;
use crate::palette::{self, NodeCategory, PaletteEntry};
use pagecraft_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// The kind of step a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point that starts the workflow.
    Trigger,
    /// Generic action step.
    Action,
    /// Branches on a condition.
    Condition,
    /// Waits before continuing.
    Delay,
    /// Calls an external HTTP endpoint.
    Webhook,
    /// Sends an email.
    Email,
    /// Writes to a CRM.
    Crm,
    /// Terminates the workflow.
    End,
}

impl NodeKind {
    /// Every node kind, in palette order.
    pub const ALL: [NodeKind; 8] = [
        Self::Trigger,
        Self::Action,
        Self::Condition,
        Self::Delay,
        Self::Webhook,
        Self::Email,
        Self::Crm,
        Self::End,
    ];

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Condition => "condition",
            Self::Delay => "delay",
            Self::Webhook => "webhook",
            Self::Email => "email",
            Self::Crm => "crm",
            Self::End => "end",
        }
    }

    /// Returns the palette entry describing this kind.
    #[must_use]
    pub fn palette(&self) -> &'static PaletteEntry {
        palette::entry(*self)
    }

    /// Returns the palette category of this kind.
    #[must_use]
    pub fn category(&self) -> NodeCategory {
        self.palette().category
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownNodeKind {
                name: s.to_string(),
            })
    }
}

/// A position on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Editable payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Display label shown on the canvas.
    pub label: String,
    /// Longer description shown in the property panel.
    #[serde(default)]
    pub description: String,
    /// Kind-specific configuration.
    #[serde(default)]
    pub config: JsonValue,
    /// Status of this node in the current (or last) execution pass.
    #[serde(default)]
    pub status: NodeStatus,
}

impl NodeData {
    /// Shallow-merges a patch into this data.
    pub fn apply(&mut self, patch: NodeDataPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(config) = patch.config {
            self.config = config;
        }
    }
}

/// A partial update to a node's data, as produced by the property panel.
///
/// Status is deliberately absent; it only changes through
/// [`NodeStatus::transition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<JsonValue>,
}

impl NodeDataPatch {
    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the config.
    #[must_use]
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.description.is_none() && self.config.is_none()
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// The kind of step.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Canvas position.
    pub position: Position,
    /// Editable data and status.
    pub data: NodeData,
}

impl WorkflowNode {
    /// Creates a node of the given kind with palette defaults and idle status.
    #[must_use]
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self::with_id(NodeId::new(), kind, position)
    }

    /// Creates a node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, kind: NodeKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            data: kind.palette().default_data(),
        }
    }

    /// Returns the node label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }

    /// Returns the current execution status.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.data.status
    }
}
