//! # Unitool Tools
//!
//! Tool adapters and the registry that unifies them.
//!
//! ## Components
//!
//! - **In-process tools** (`in_process`): wrap a local function with an
//!   explicitly declared name, description and parameter list
//! - **Remote tools** (`remote`): proxy tools listed by an external
//!   tool-server session
//! - **Registry** (`registry`): one case-insensitive catalog of both kinds

/// Local functions exposed as tools.
pub mod in_process;
/// Tools proxied over an external session.
pub mod remote;
/// Unified tool catalog.
pub mod registry;

pub use in_process::{BoundArguments, InProcessTool, InProcessToolBuilder, ToolBuildError, ToolProvider};
pub use registry::{RegistryError, ToolRegistry};
pub use remote::{RemoteTool, RemoteToolInfo, SessionError, ToolSession};
pub use unitool_core::{
    CallableTool, FailureKind, InvocationArguments, InvocationResult, ParameterKind,
    ParameterSchema, ParameterSpec, ToolDescriptor, ToolError, ToolOrigin,
};
