//! Unitool: one tool-calling surface for in-process functions and remote
//! MCP tools, driven by a chat model.
//!
//! This crate re-exports the workspace crates under short names.

pub use unitool_agent as agent;
pub use unitool_core as core;
pub use unitool_mcp as mcp;
pub use unitool_tools as tools;

pub use unitool_agent::{
    CancellationToken, ChatBackend, ConversationOrchestrator, OrchestratorConfig,
};
pub use unitool_core::{CallableTool, InvocationResult, ToolDescriptor};
pub use unitool_tools::{InProcessTool, ToolProvider, ToolRegistry, ToolSession};
