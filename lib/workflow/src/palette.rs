//! Static registry of node kinds available in the editor palette.
//!
//! Lookup is an exhaustive match on [`NodeKind`], so adding a kind without a
//! palette entry is a compile error. Names only appear as strings at the
//! drag-and-drop and wire boundaries.

use crate::execution::NodeStatus;
use crate::node::{NodeData, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Palette grouping for node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Triggers,
    Actions,
    Logic,
    Integrations,
    Flow,
}

/// Display metadata and defaults for one node kind.
#[derive(Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub kind: NodeKind,
    pub label: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub category: NodeCategory,
    /// Names of the target handles a connection may end on.
    pub inputs: &'static [&'static str],
    /// Names of the source handles a connection may start from.
    pub outputs: &'static [&'static str],
}

impl PaletteEntry {
    /// Returns the configuration a freshly dropped node starts with.
    #[must_use]
    pub fn default_config(&self) -> JsonValue {
        match self.kind {
            NodeKind::Trigger => json!({ "trigger_type": "manual" }),
            NodeKind::Action => json!({ "action_type": "custom" }),
            NodeKind::Condition => json!({ "field": "", "operator": "equals", "value": "" }),
            NodeKind::Delay => json!({ "duration": 5, "unit": "minutes" }),
            NodeKind::Webhook => json!({ "url": "", "method": "POST", "headers": {} }),
            NodeKind::Email => json!({ "to": "", "subject": "", "template": "" }),
            NodeKind::Crm => json!({ "provider": "", "operation": "create_contact" }),
            NodeKind::End => json!({}),
        }
    }

    /// Returns the data a freshly dropped node starts with.
    #[must_use]
    pub fn default_data(&self) -> NodeData {
        NodeData {
            label: self.label.to_string(),
            description: self.description.to_string(),
            config: self.default_config(),
            status: NodeStatus::Idle,
        }
    }
}

const FLOW_IN: &[&str] = &["input"];
const FLOW_OUT: &[&str] = &["output"];

static TRIGGER: PaletteEntry = PaletteEntry {
    kind: NodeKind::Trigger,
    label: "Trigger",
    description: "Start the workflow",
    icon: "zap",
    color: "#10b981",
    category: NodeCategory::Triggers,
    inputs: &[],
    outputs: FLOW_OUT,
};

static ACTION: PaletteEntry = PaletteEntry {
    kind: NodeKind::Action,
    label: "Action",
    description: "Perform a custom action",
    icon: "play",
    color: "#3b82f6",
    category: NodeCategory::Actions,
    inputs: FLOW_IN,
    outputs: FLOW_OUT,
};

static CONDITION: PaletteEntry = PaletteEntry {
    kind: NodeKind::Condition,
    label: "Condition",
    description: "Branch on a rule",
    icon: "git-branch",
    color: "#f59e0b",
    category: NodeCategory::Logic,
    inputs: FLOW_IN,
    outputs: &["true", "false"],
};

static DELAY: PaletteEntry = PaletteEntry {
    kind: NodeKind::Delay,
    label: "Delay",
    description: "Wait before continuing",
    icon: "clock",
    color: "#8b5cf6",
    category: NodeCategory::Logic,
    inputs: FLOW_IN,
    outputs: FLOW_OUT,
};

static WEBHOOK: PaletteEntry = PaletteEntry {
    kind: NodeKind::Webhook,
    label: "Webhook",
    description: "Call an external endpoint",
    icon: "globe",
    color: "#06b6d4",
    category: NodeCategory::Integrations,
    inputs: FLOW_IN,
    outputs: FLOW_OUT,
};

static EMAIL: PaletteEntry = PaletteEntry {
    kind: NodeKind::Email,
    label: "Send Email",
    description: "Send an email message",
    icon: "mail",
    color: "#ef4444",
    category: NodeCategory::Actions,
    inputs: FLOW_IN,
    outputs: FLOW_OUT,
};

static CRM: PaletteEntry = PaletteEntry {
    kind: NodeKind::Crm,
    label: "CRM Update",
    description: "Create or update a CRM record",
    icon: "users",
    color: "#ec4899",
    category: NodeCategory::Integrations,
    inputs: FLOW_IN,
    outputs: FLOW_OUT,
};

static END: PaletteEntry = PaletteEntry {
    kind: NodeKind::End,
    label: "End",
    description: "Finish the workflow",
    icon: "square",
    color: "#6b7280",
    category: NodeCategory::Flow,
    inputs: FLOW_IN,
    outputs: &[],
};

static ENTRIES: [&PaletteEntry; 8] = [
    &TRIGGER, &ACTION, &CONDITION, &DELAY, &WEBHOOK, &EMAIL, &CRM, &END,
];

/// Returns the palette entry for a node kind.
#[must_use]
pub fn entry(kind: NodeKind) -> &'static PaletteEntry {
    match kind {
        NodeKind::Trigger => &TRIGGER,
        NodeKind::Action => &ACTION,
        NodeKind::Condition => &CONDITION,
        NodeKind::Delay => &DELAY,
        NodeKind::Webhook => &WEBHOOK,
        NodeKind::Email => &EMAIL,
        NodeKind::Crm => &CRM,
        NodeKind::End => &END,
    }
}

/// Returns every palette entry in display order.
#[must_use]
pub fn entries() -> &'static [&'static PaletteEntry] {
    &ENTRIES
}

/// Returns the palette entries of one category.
pub fn by_category(category: NodeCategory) -> impl Iterator<Item = &'static PaletteEntry> {
    ENTRIES
        .iter()
        .copied()
        .filter(move |entry| entry.category == category)
}
