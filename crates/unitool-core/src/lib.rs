//! # Unitool Core
//!
//! Core types shared by every Unitool crate: tool descriptors, invocation
//! arguments and results, the tool error taxonomy and the [`CallableTool`]
//! trait implemented by in-process and remote tools alike.

pub mod descriptor;
pub mod error;
pub mod result;
pub mod tool;

pub use descriptor::{ParameterKind, ParameterSchema, ParameterSpec, ToolAnnotations, ToolDescriptor};
pub use error::{ToolError, ToolResult};
pub use result::{FailureKind, InvocationResult, ToolFailure, render_payload};
pub use tool::{CallableTool, InvocationArguments, ToolOrigin};
