//! MCP sessions against an in-memory test server.

use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ClientInfo, Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use unitool_core::{CallableTool, FailureKind, InvocationArguments, ToolOrigin};
use unitool_mcp::McpSession;
use unitool_tools::{ToolRegistry, ToolSession};

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
struct DivideRequest {
    #[schemars(description = "Dividend")]
    a: f64,
    #[schemars(description = "Divisor")]
    b: f64,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
struct EchoRequest {
    #[schemars(description = "Message to echo back")]
    message: String,
}

#[derive(Clone)]
struct TestServer {
    tool_router: ToolRouter<Self>,
}

#[tool_router(router = tool_router)]
impl TestServer {
    fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(name = "echo", description = "Echo back the input message")]
    async fn echo(&self, request: Parameters<EchoRequest>) -> String {
        format!("Echo: {}", request.0.message)
    }

    #[tool(name = "divide", description = "Divide a by b")]
    async fn divide(&self, request: Parameters<DivideRequest>) -> Result<String, String> {
        if request.0.b == 0.0 {
            return Err("Division by zero".to_string());
        }
        Ok((request.0.a / request.0.b).to_string())
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for TestServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "unitool-test-server".to_string(),
                version: "0.1.0".to_string(),
                ..Default::default()
            },
            instructions: None,
        }
    }
}

async fn connect() -> (McpSession, tokio::task::JoinHandle<()>) {
    let (client_read, server_write) = tokio::io::duplex(4096);
    let (server_read, client_write) = tokio::io::duplex(4096);

    let server_transport = rmcp::transport::async_rw::AsyncRwTransport::new(server_read, server_write);
    let server = tokio::spawn(async move {
        if let Ok(service) = TestServer::new().serve(server_transport).await {
            let _ = service.waiting().await;
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let client_transport = rmcp::transport::async_rw::AsyncRwTransport::new(client_read, client_write);
    let client = ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: Default::default(),
        client_info: Implementation {
            name: "unitool-test-client".to_string(),
            version: "0.1.0".to_string(),
            ..Default::default()
        },
    }
    .serve(client_transport)
    .await
    .expect("client handshake");

    (McpSession::from_service("test", client), server)
}

fn args(value: serde_json::Value) -> InvocationArguments {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn lists_tools_with_their_schemas() {
    let (session, server) = connect().await;

    let tools = session.list_tools().await.unwrap();
    let echo = tools.iter().find(|t| t.name == "echo").unwrap();

    assert_eq!(tools.len(), 2);
    assert_eq!(echo.description, "Echo back the input message");
    assert!(echo.input_schema["properties"]["message"].is_object());

    server.abort();
}

#[tokio::test]
async fn text_results_come_back_as_strings() {
    let (session, server) = connect().await;

    let value = session
        .call_tool("echo", args(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(value, json!("Echo: hello"));
    server.abort();
}

#[tokio::test]
async fn registered_remote_tools_report_server_errors() {
    let (session, server) = connect().await;
    let mut registry = ToolRegistry::new();
    registry.register_remote(Arc::new(session)).await.unwrap();

    let divide = registry.resolve("DIVIDE").unwrap();
    assert_eq!(divide.origin(), ToolOrigin::Remote);

    let ok = divide.invoke(args(json!({"a": 10, "b": 4}))).await;
    assert_eq!(ok.render(), "2.5");

    let failed = divide.invoke(args(json!({"a": 1, "b": 0}))).await;
    assert_eq!(failed.failure_kind(), Some(FailureKind::Remote));
    assert!(failed.render().contains("Division by zero"));

    server.abort();
}
