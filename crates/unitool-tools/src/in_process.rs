//! Adapter that turns a local function into a [`CallableTool`].
//!
//! Tools are declared explicitly: the builder receives the name, the human
//! description, one [`ParameterSpec`] per parameter and the function to call.
//! The schema advertised to the chat backend is derived from those
//! declarations, and arguments are validated against them before the
//! function ever runs.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use unitool_core::{
    CallableTool, InvocationArguments, InvocationResult, ParameterKind, ParameterSchema,
    ParameterSpec, ToolAnnotations, ToolDescriptor, ToolError, ToolOrigin, ToolResult,
};

type Handler = Arc<dyn Fn(BoundArguments) -> BoxFuture<'static, ToolResult<Value>> + Send + Sync>;

/// Validated arguments handed to an in-process tool's function.
///
/// Every required parameter is present and every declared parameter has the
/// declared JSON type; omitted optional parameters carry their default.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    tool: String,
    values: InvocationArguments,
}

impl BoundArguments {
    /// Deserialize the argument `name`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> ToolResult<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ToolError::missing_argument(&self.tool, name))?;
        serde_json::from_value(value.clone()).map_err(|e| ToolError::MalformedArgument {
            tool: self.tool.clone(),
            parameter: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Deserialize the argument `name`, treating absence and `null` as `None`.
    pub fn get_optional<T: DeserializeOwned>(&self, name: &str) -> ToolResult<Option<T>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn tool_name(&self) -> &str {
        &self.tool
    }

    pub fn into_map(self) -> InvocationArguments {
        self.values
    }
}

/// A local function exposed as a tool.
#[derive(Clone)]
pub struct InProcessTool {
    descriptor: ToolDescriptor,
    parameters: Vec<ParameterSpec>,
    handler: Handler,
}

impl fmt::Debug for InProcessTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessTool")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl InProcessTool {
    /// Start declaring a tool named `name`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use unitool_core::{ParameterKind, ParameterSpec};
    /// use unitool_tools::{BoundArguments, InProcessTool};
    ///
    /// let add = InProcessTool::builder("Add")
    ///     .description("Add two numbers together")
    ///     .parameter(ParameterSpec::required("a", ParameterKind::Number).describe("The first number"))
    ///     .parameter(ParameterSpec::required("b", ParameterKind::Number).describe("The second number"))
    ///     .sync_handler(|args: BoundArguments| {
    ///         Ok::<_, unitool_core::ToolError>(args.get::<f64>("a")? + args.get::<f64>("b")?)
    ///     })
    ///     .build()
    ///     .expect("valid tool");
    ///
    /// assert_eq!(add.parameters().len(), 2);
    /// ```
    pub fn builder(name: impl Into<String>) -> InProcessToolBuilder {
        InProcessToolBuilder::new(name)
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Whether the tool carries a human description, the registration
    /// requirement for provider-declared tools.
    pub fn is_described(&self) -> bool {
        !self.descriptor.description.trim().is_empty()
    }

    /// Check `args` against the declared parameters.
    ///
    /// `null` counts as absent, so it selects the default of an optional
    /// parameter and fails a required one.
    fn bind(&self, mut args: InvocationArguments) -> ToolResult<BoundArguments> {
        let tool = &self.descriptor.name;
        for parameter in &self.parameters {
            let supplied = args.get(&parameter.name).filter(|v| !v.is_null()).cloned();
            let value = match supplied {
                Some(value) => {
                    if !parameter.kind.accepts(&value) {
                        return Err(ToolError::InvalidArgument {
                            tool: tool.clone(),
                            parameter: parameter.name.clone(),
                            expected: parameter.kind.to_string(),
                        });
                    }
                    normalize(parameter.kind, value)
                }
                None => match &parameter.default {
                    Some(default) => default.clone(),
                    None => return Err(ToolError::missing_argument(tool, &parameter.name)),
                },
            };
            args.insert(parameter.name.clone(), value);
        }

        Ok(BoundArguments {
            tool: tool.clone(),
            values: args,
        })
    }
}

/// Integral floats such as `3.0` become integers for `Integer` parameters.
fn normalize(kind: ParameterKind, value: Value) -> Value {
    if kind == ParameterKind::Integer
        && !value.is_i64()
        && !value.is_u64()
        && let Some(f) = value.as_f64()
        && f >= i64::MIN as f64
        && f <= i64::MAX as f64
    {
        return Value::from(f as i64);
    }
    value
}

/// A handler returning a [`ToolError`] keeps its kind; any other error is
/// an execution failure carrying its `Display` text.
fn handler_error<E: fmt::Display + 'static>(tool: &str, err: E) -> ToolError {
    match (&err as &dyn Any).downcast_ref::<ToolError>() {
        Some(err) => err.clone(),
        None => ToolError::execution(tool, err.to_string()),
    }
}

#[async_trait]
impl CallableTool for InProcessTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn origin(&self) -> ToolOrigin {
        ToolOrigin::InProcess
    }

    async fn invoke(&self, args: InvocationArguments) -> InvocationResult {
        let bound = match self.bind(args) {
            Ok(bound) => bound,
            Err(err) => {
                debug!(tool = %self.descriptor.name, error = %err, "Rejected tool arguments");
                return InvocationResult::Failure(err.to_failure());
            }
        };

        match (self.handler)(bound).await {
            Ok(value) => InvocationResult::Success(value),
            Err(err) => InvocationResult::Failure(err.to_failure()),
        }
    }
}

/// Errors raised while declaring an in-process tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolBuildError {
    #[error("Tool name is required")]
    EmptyName,

    #[error("Tool '{0}' has no handler")]
    MissingHandler(String),

    #[error("Tool '{tool}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { tool: String, parameter: String },

    #[error("Tool '{tool}' declares a parameter with an empty name")]
    EmptyParameterName { tool: String },
}

/// Builder for [`InProcessTool`].
pub struct InProcessToolBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    annotations: Option<ToolAnnotations>,
    handler: Option<Handler>,
}

impl InProcessToolBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            annotations: None,
            handler: None,
        }
    }

    /// Human description shown to the model.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Shorthand for a required parameter with a description.
    pub fn required(
        self,
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        self.parameter(ParameterSpec::required(name, kind).describe(description))
    }

    /// Shorthand for an optional parameter with a default and a description.
    pub fn optional(
        self,
        name: impl Into<String>,
        kind: ParameterKind,
        default: Value,
        description: impl Into<String>,
    ) -> Self {
        self.parameter(ParameterSpec::optional(name, kind, default).describe(description))
    }

    pub fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Asynchronous function backing the tool.
    ///
    /// The error's `Display` output becomes the failure message fed back to
    /// the model. A [`ToolError`] keeps its own failure kind, so argument
    /// errors from [`BoundArguments::get`] are still reported as such.
    pub fn handler<F, Fut, T, E>(mut self, f: F) -> Self
    where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.handler = Some(Arc::new(move |args: BoundArguments| {
            let tool = args.tool_name().to_string();
            let call = f(args);
            async move {
                let output = call.await.map_err(|e| handler_error(&tool, e))?;
                serde_json::to_value(output).map_err(|e| {
                    ToolError::execution(&tool, format!("Failed to serialize tool output: {e}"))
                })
            }
            .boxed()
        }));
        self
    }

    /// Synchronous function backing the tool.
    pub fn sync_handler<F, T, E>(self, f: F) -> Self
    where
        F: Fn(BoundArguments) -> Result<T, E> + Send + Sync + 'static,
        T: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.handler(move |args| std::future::ready(f(args)))
    }

    pub fn build(self) -> Result<InProcessTool, ToolBuildError> {
        if self.name.trim().is_empty() {
            return Err(ToolBuildError::EmptyName);
        }
        let handler = self
            .handler
            .ok_or_else(|| ToolBuildError::MissingHandler(self.name.clone()))?;

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if parameter.name.trim().is_empty() {
                return Err(ToolBuildError::EmptyParameterName {
                    tool: self.name.clone(),
                });
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(ToolBuildError::DuplicateParameter {
                    tool: self.name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
        }

        let mut descriptor = ToolDescriptor::new(
            self.name,
            self.description,
            ParameterSchema::Declared {
                parameters: self.parameters.clone(),
            },
        );
        descriptor.annotations = self.annotations;

        Ok(InProcessTool {
            descriptor,
            parameters: self.parameters,
            handler,
        })
    }
}

/// An object that exposes in-process tools.
///
/// Only declared tools that carry a description are registered by
/// [`ToolRegistry::register_in_process`](crate::ToolRegistry::register_in_process).
pub trait ToolProvider {
    fn tools(&self) -> Vec<InProcessTool>;
}
