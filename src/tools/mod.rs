//! Extensible tool system.
//!
//! Tools are the agent's only interface to the platform's data: the model
//! sees their schemas, requests invocations by name, and receives serialized
//! results. The loop dispatches through [`ToolRegistry`] so new tools never
//! touch loop logic.

pub mod builtin;

mod registry;
mod tool;

pub use registry::ToolRegistry;
pub use tool::{require_str, validate_tool_schema, Tool, ToolSchema};

pub use crate::error::ToolError;
