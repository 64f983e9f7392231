//! Core identifiers and error handling shared by the pagecraft crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, ExecutionId, NodeId, ParseIdError, WorkflowId};
