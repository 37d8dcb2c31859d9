use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use unitool_core::{CallableTool, InvocationArguments, InvocationResult, ToolDescriptor, ToolError};

use crate::in_process::ToolProvider;
use crate::remote::{RemoteTool, SessionError, ToolSession};

/// Errors raised while registering tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool name cannot be empty")]
    EmptyName,

    /// Names are unique ignoring ASCII case; the first registration wins.
    #[error("A tool named '{name}' is already registered (as '{existing}')")]
    DuplicateName { name: String, existing: String },

    /// The remote session could not list its tools.
    #[error("Failed to list tools of session '{session}': {source}")]
    Session {
        session: String,
        #[source]
        source: SessionError,
    },
}

/// Single catalog of every tool the chat backend may call.
///
/// `ToolRegistry` holds in-process and remote tools side by side behind the
/// [`CallableTool`] trait. Tools keep their registration order, which is the
/// order descriptors are advertised to the backend. Lookup is
/// case-insensitive.
///
/// Registration takes `&mut self`; once populated the registry is typically
/// wrapped in an `Arc` and shared read-only with the orchestrator.
///
/// # Example
///
/// ```rust
/// use unitool_core::ParameterKind;
/// use unitool_tools::{InProcessTool, ToolRegistry};
/// use std::sync::Arc;
///
/// let echo = InProcessTool::builder("Echo")
///     .description("Repeat the input")
///     .required("text", ParameterKind::String, "Text to repeat")
///     .sync_handler(|args| args.get::<String>("text"))
///     .build()
///     .expect("valid tool");
///
/// let mut registry = ToolRegistry::new();
/// registry.register(Arc::new(echo)).expect("unique name");
///
/// assert!(registry.resolve("echo").is_some());
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn CallableTool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

fn lookup_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(&self, name: &str) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if let Some(&idx) = self.index.get(&lookup_key(name)) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
                existing: self.tools[idx].name().to_string(),
            });
        }
        Ok(())
    }

    /// Validate a batch of names against the registry and against each other.
    fn check_batch<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), RegistryError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for name in names {
            self.check_name(name)?;
            if let Some(existing) = seen.insert(lookup_key(name), name) {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, tool: Arc<dyn CallableTool>) {
        self.index.insert(lookup_key(tool.name()), self.tools.len());
        debug!(tool = %tool.name(), origin = %tool.origin(), "Registered tool");
        self.tools.push(tool);
    }

    /// Register a single tool.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if a tool with the same name (ignoring
    /// case) is already present; the registry is left unchanged.
    pub fn register(&mut self, tool: Arc<dyn CallableTool>) -> Result<(), RegistryError> {
        self.check_name(tool.name())?;
        self.insert(tool);
        Ok(())
    }

    /// Register every described tool of `provider`.
    ///
    /// Tools without a description are skipped. Registration is all or
    /// nothing: if any name clashes, no tool of the provider is added.
    ///
    /// # Returns
    ///
    /// The number of tools added.
    pub fn register_in_process<P>(&mut self, provider: &P) -> Result<usize, RegistryError>
    where
        P: ToolProvider + ?Sized,
    {
        let tools: Vec<_> = provider
            .tools()
            .into_iter()
            .filter(|tool| {
                let described = tool.is_described();
                if !described {
                    debug!(tool = %tool.name(), "Skipping undescribed tool");
                }
                described
            })
            .collect();

        self.check_batch(tools.iter().map(|tool| tool.name()))?;

        let count = tools.len();
        for tool in tools {
            self.insert(Arc::new(tool));
        }
        info!(count, "Registered in-process tools");
        Ok(count)
    }

    /// List the tools of a remote session and register one adapter per tool.
    ///
    /// The listing happens once; later changes on the server are not seen.
    /// Registration is all or nothing, like [`register_in_process`](Self::register_in_process).
    ///
    /// # Returns
    ///
    /// The number of tools added.
    pub async fn register_remote(&mut self, session: Arc<dyn ToolSession>) -> Result<usize, RegistryError> {
        let listing = session
            .list_tools()
            .await
            .map_err(|source| RegistryError::Session {
                session: session.name().to_string(),
                source,
            })?;

        self.check_batch(listing.iter().map(|info| info.name.as_str()))?;

        let count = listing.len();
        for info in listing {
            self.insert(Arc::new(RemoteTool::new(info, Arc::clone(&session))));
        }
        info!(session = %session.name(), count, "Registered remote tools");
        Ok(count)
    }

    /// Descriptors of all tools in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor().clone()).collect()
    }

    /// Find a tool by name, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CallableTool>> {
        self.index
            .get(&lookup_key(name))
            .map(|&idx| Arc::clone(&self.tools[idx]))
    }

    /// Resolve and invoke in one step.
    ///
    /// An unknown name yields a failure result instead of an error so the
    /// caller can feed it back to the model.
    pub async fn invoke(&self, name: &str, args: InvocationArguments) -> InvocationResult {
        match self.resolve(name) {
            Some(tool) => tool.invoke(args).await,
            None => InvocationResult::Failure(ToolError::unknown_tool(name).to_failure()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_process::InProcessTool;
    use crate::remote::RemoteToolInfo;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use unitool_core::{FailureKind, ParameterKind, ToolOrigin};

    fn echo(name: &str) -> InProcessTool {
        InProcessTool::builder(name)
            .description("Repeat the input")
            .required("text", ParameterKind::String, "Text to repeat")
            .sync_handler(|args| args.get::<String>("text"))
            .build()
            .unwrap()
    }

    struct Provider(Vec<InProcessTool>);

    impl ToolProvider for Provider {
        fn tools(&self) -> Vec<InProcessTool> {
            self.0.clone()
        }
    }

    struct ListingSession {
        listing: Result<Vec<RemoteToolInfo>, SessionError>,
    }

    #[async_trait]
    impl ToolSession for ListingSession {
        fn name(&self) -> &str {
            "listing"
        }

        async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>, SessionError> {
            self.listing.clone()
        }

        async fn call_tool(
            &self,
            name: &str,
            _args: InvocationArguments,
        ) -> Result<Value, SessionError> {
            Ok(json!(format!("called {name}")))
        }
    }

    fn remote_info(name: &str) -> RemoteToolInfo {
        RemoteToolInfo::new(name, "remote tool", json!({"type": "object"}))
    }

    #[test]
    fn duplicate_name_is_rejected_and_first_stays() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo("Echo"))).unwrap();

        let err = registry.register(Arc::new(echo("ECHO"))).unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateName { ref existing, .. } if existing == "Echo"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["Echo"]);
    }

    #[test]
    fn resolve_ignores_case() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo("GetWeather"))).unwrap();

        assert!(registry.resolve("getweather").is_some());
        assert!(registry.resolve("GETWEATHER").is_some());
        assert!(registry.resolve("weather").is_none());
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["Subtract", "Add", "Multiply"] {
            registry.register(Arc::new(echo(name))).unwrap();
        }

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Subtract", "Add", "Multiply"]);
    }

    #[test]
    fn provider_skips_undescribed_tools() {
        let undescribed = InProcessTool::builder("Hidden")
            .sync_handler(|_| Ok::<_, ToolError>(1))
            .build()
            .unwrap();
        let provider = Provider(vec![echo("Visible"), undescribed]);

        let mut registry = ToolRegistry::new();
        let added = registry.register_in_process(&provider).unwrap();

        assert_eq!(added, 1);
        assert!(registry.resolve("Hidden").is_none());
    }

    #[test]
    fn provider_registration_is_atomic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo("Add"))).unwrap();

        let provider = Provider(vec![echo("Multiply"), echo("add")]);
        assert!(registry.register_in_process(&provider).is_err());
        assert_eq!(registry.names(), vec!["Add"]);

        let clashing = Provider(vec![echo("Power"), echo("power")]);
        assert!(registry.register_in_process(&clashing).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_yields_failure() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("Foo", InvocationArguments::new()).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::UnknownTool));
        assert!(result.render().contains("Foo"));
    }

    #[tokio::test]
    async fn remote_and_local_tools_share_the_catalog() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo("Echo"))).unwrap();

        let session = Arc::new(ListingSession {
            listing: Ok(vec![remote_info("search"), remote_info("fetch")]),
        });
        let added = registry.register_remote(session).await.unwrap();

        assert_eq!(added, 2);
        assert_eq!(registry.names(), vec!["Echo", "search", "fetch"]);
        let fetch = registry.resolve("FETCH").unwrap();
        assert_eq!(fetch.origin(), ToolOrigin::Remote);

        let result = registry.invoke("fetch", InvocationArguments::new()).await;
        assert_eq!(result.render(), "called fetch");
    }

    #[tokio::test]
    async fn remote_listing_failure_adds_nothing() {
        let mut registry = ToolRegistry::new();
        let session = Arc::new(ListingSession {
            listing: Err(SessionError::Closed),
        });

        let err = registry.register_remote(session).await.unwrap_err();

        assert!(matches!(err, RegistryError::Session { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn remote_name_clash_adds_nothing() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(echo("search"))).unwrap();
        let session = Arc::new(ListingSession {
            listing: Ok(vec![remote_info("fetch"), remote_info("Search")]),
        });

        assert!(registry.register_remote(session).await.is_err());
        assert_eq!(registry.names(), vec!["search"]);
    }
}
