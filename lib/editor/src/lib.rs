//! Workflow editor core for pagecraft.
//!
//! This crate holds everything between the canvas and the workflow backend:
//!
//! - **Store**: Editor state changed only through a reducer, shared and observable
//! - **Canvas**: Handlers for drops, connects and node/edge change batches
//! - **Persistence**: Mapping between definitions and the backend wire shape
//! - **Execution**: Backend polling for saved workflows, simulated progress otherwise
//! - **Backends**: The `WorkflowApi` trait with HTTP and in-memory implementations

pub mod api;
pub mod canvas;
pub mod config;
pub mod driver;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod session;
pub mod store;
pub mod wire;

pub use api::{ApiError, ApiResult, WorkflowApi};
pub use canvas::{CanvasController, EdgeChange, NodeChange};
pub use config::{ApiConfig, EditorConfig, ExecutionConfig};
pub use driver::{ExecutionDriver, ExecutionMode, ExecutionOutcome, ExecutionRun};
pub use http::HttpWorkflowApi;
pub use memory::InMemoryWorkflowApi;
pub use persistence::{PersistenceAdapter, PersistenceError};
pub use session::EditorSession;
pub use store::{Action, EditorState, EditorStore, SaveState, Selection, StoreError, reduce};
