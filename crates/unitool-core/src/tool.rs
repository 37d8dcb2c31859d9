use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::descriptor::ToolDescriptor;
use crate::result::InvocationResult;

/// Arguments of a tool invocation, keyed by parameter name.
pub type InvocationArguments = Map<String, Value>;

/// Where a tool's implementation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolOrigin {
    /// A function running inside this process.
    InProcess,
    /// A tool proxied over an external tool-server session.
    Remote,
}

impl std::fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOrigin::InProcess => write!(f, "in-process"),
            ToolOrigin::Remote => write!(f, "remote"),
        }
    }
}

/// A tool the chat backend can call, regardless of where it runs.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use unitool_core::{
///     CallableTool, InvocationArguments, InvocationResult, ParameterSchema, ToolDescriptor,
///     ToolOrigin,
/// };
///
/// struct Clock {
///     descriptor: ToolDescriptor,
/// }
///
/// #[async_trait]
/// impl CallableTool for Clock {
///     fn descriptor(&self) -> &ToolDescriptor {
///         &self.descriptor
///     }
///
///     fn origin(&self) -> ToolOrigin {
///         ToolOrigin::InProcess
///     }
///
///     async fn invoke(&self, _args: InvocationArguments) -> InvocationResult {
///         InvocationResult::success("12:00")
///     }
/// }
///
/// let clock = Clock {
///     descriptor: ToolDescriptor::new("now", "Current time", ParameterSchema::empty()),
/// };
/// assert_eq!(clock.name(), "now");
/// ```
#[async_trait]
pub trait CallableTool: Send + Sync {
    /// Descriptor advertised to the chat backend.
    fn descriptor(&self) -> &ToolDescriptor;

    fn origin(&self) -> ToolOrigin;

    /// Execute the tool. Failures are returned as values, never panics.
    async fn invoke(&self, args: InvocationArguments) -> InvocationResult;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn description(&self) -> &str {
        &self.descriptor().description
    }

    /// JSON schema of the tool's input.
    fn schema(&self) -> Value {
        self.descriptor().input_schema()
    }
}
