//! # Unitool MCP
//!
//! Exposes the tools of external Model Context Protocol servers through the
//! [`ToolSession`](unitool_tools::ToolSession) boundary, so they can be
//! registered next to in-process tools.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use unitool_mcp::{McpServerConfig, McpSession};
//! use unitool_tools::ToolRegistry;
//!
//! let config = McpServerConfig::new("brave-search", "npx")
//!     .arg("-y")
//!     .arg("@modelcontextprotocol/server-brave-search")
//!     .env("BRAVE_API_KEY", api_key);
//!
//! let session = Arc::new(McpSession::spawn(&config).await?);
//! let mut registry = ToolRegistry::new();
//! registry.register_remote(session).await?;
//! ```

pub mod convert;
pub mod error;
pub mod session;

pub use error::{McpError, McpResult};
pub use session::{McpServerConfig, McpSession};
