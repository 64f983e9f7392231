//! Workflow definition types.
//!
//! A workflow definition is what the editor saves and loads:
//! - Metadata (name, description, category, owning component)
//! - The graph of nodes and edges
//! - Execution settings
//! - Backend-reported statistics, once persisted

use crate::graph::WorkflowGraph;
use crate::node::NodeKind;
use chrono::{DateTime, Utc};
use pagecraft_core::WorkflowId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default workflow category.
pub const DEFAULT_CATEGORY: &str = "automation";

/// Trigger type used when the graph has no configured trigger.
pub const DEFAULT_TRIGGER_TYPE: &str = "manual";

/// What the backend does when a node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Stop the run at the first failing node.
    #[default]
    Stop,
    /// Skip the failing node and keep going.
    Continue,
    /// Retry the failing node up to `retry_attempts` times.
    Retry,
}

/// Execution settings stored with a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    /// Upper bound on one run, in seconds.
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Delay between retries, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
    #[serde(default = "default_true")]
    pub enable_analytics: bool,
    #[serde(default)]
    pub error_handling: ErrorHandling,
}

fn default_max_execution_time() -> u64 {
    300
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_execution_time: default_max_execution_time(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            enable_logging: true,
            enable_analytics: true,
            error_handling: ErrorHandling::default(),
        }
    }
}

impl WorkflowSettings {
    /// Returns the maximum execution time as a `Duration`.
    #[must_use]
    pub fn max_execution_duration(&self) -> Duration {
        Duration::from_secs(self.max_execution_time)
    }

    /// Returns the retry delay as a `Duration`.
    #[must_use]
    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }
}

/// Backend-reported statistics for a persisted workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub status: String,
    pub trigger_count: u64,
    pub success_count: u64,
    /// Percentage of triggered runs that succeeded.
    pub success_rate: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkflowStats {
    /// Builds stats from raw counters, deriving the success rate.
    #[must_use]
    pub fn from_counts(
        status: impl Into<String>,
        trigger_count: u64,
        success_count: u64,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: status.into(),
            trigger_count,
            success_count,
            success_rate: success_rate(trigger_count, success_count),
            created_at,
        }
    }
}

/// Returns `success_count / trigger_count * 100`, or 100 for a workflow
/// that has never been triggered.
#[must_use]
pub fn success_rate(trigger_count: u64, success_count: u64) -> f64 {
    if trigger_count == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = success_count as f64 / trigger_count as f64 * 100.0;
    rate
}

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Backend identifier; `None` until the first save.
    pub id: Option<WorkflowId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Page component this workflow is attached to, if any.
    #[serde(default)]
    pub component_id: Option<String>,
    /// The workflow graph (nodes and edges).
    pub graph: WorkflowGraph,
    #[serde(default)]
    pub settings: WorkflowSettings,
    #[serde(default)]
    pub stats: Option<WorkflowStats>,
}

impl WorkflowDefinition {
    /// Creates an unsaved, empty workflow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            component_id: None,
            graph: WorkflowGraph::new(),
            settings: WorkflowSettings::default(),
            stats: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attaches the workflow to a page component.
    #[must_use]
    pub fn with_component(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns true once the backend has assigned an ID.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the trigger type of the first trigger node.
    ///
    /// Falls back to `"manual"` when there is no trigger node or it has no
    /// `trigger_type` in its config.
    #[must_use]
    pub fn trigger_type(&self) -> &str {
        self.graph
            .nodes()
            .find(|node| node.kind == NodeKind::Trigger)
            .and_then(|node| node.data.config.get("trigger_type"))
            .and_then(|value| value.as_str())
            .unwrap_or(DEFAULT_TRIGGER_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeDataPatch, Position, WorkflowNode};
    use serde_json::json;

    #[test]
    fn new_definition_is_unsaved_automation() {
        let def = WorkflowDefinition::new("Lead capture");
        assert!(!def.is_persisted());
        assert_eq!(def.category, "automation");
        assert!(def.graph.is_empty());
        assert!(def.stats.is_none());
    }

    #[test]
    fn settings_defaults_and_wire_names() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.max_execution_duration(), Duration::from_secs(300));
        assert_eq!(settings.retry_delay_duration(), Duration::from_millis(1000));

        let json = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(json["maxExecutionTime"], 300);
        assert_eq!(json["retryAttempts"], 3);
        assert_eq!(json["errorHandling"], "stop");
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: WorkflowSettings =
            serde_json::from_value(json!({ "retryAttempts": 5 })).expect("deserialize");
        assert_eq!(settings.retry_attempts, 5);
        assert_eq!(settings.max_execution_time, 300);
        assert!(settings.enable_logging);
    }

    #[test]
    fn success_rate_is_full_without_triggers() {
        assert!((success_rate(0, 0) - 100.0).abs() < f64::EPSILON);
        assert!((success_rate(4, 3) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trigger_type_reads_first_trigger_config() {
        let mut def = WorkflowDefinition::new("Scheduled");
        assert_eq!(def.trigger_type(), "manual");

        let trigger = def
            .graph
            .add_node(WorkflowNode::new(NodeKind::Trigger, Position::default()));
        def.graph.update_node_data(
            trigger,
            NodeDataPatch::default().with_config(json!({ "trigger_type": "form_submit" })),
        );
        assert_eq!(def.trigger_type(), "form_submit");
    }
}
