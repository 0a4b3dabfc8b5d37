//! Tool-RPC Server Core
//!
//! Routes JSON-RPC requests to the two corpus tools. The endpoint is
//! stateless: each HTTP request constructs a server view over the shared
//! application state.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcRequest, JsonRpcResponse, RpcError, MCP_VERSION};
use crate::state::AppState;
use crate::tools;

/// Tool-RPC server over the shared state.
pub struct McpServer {
    state: AppState,
}

impl McpServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handle an incoming JSON-RPC request. Returns `None` for
    /// notifications, which expect no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        if request.method == "notifications/initialized" {
            return None;
        }
        let notification = request.is_notification();

        let outcome = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("Unknown method: {}", method);
                Err(RpcError::unknown_method(method))
            }
        };

        if notification {
            return None;
        }
        Some(JsonRpcResponse::reply(request.id, outcome))
    }

    fn handle_initialize(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        let request: InitializeRequest = match params {
            Some(p) => {
                serde_json::from_value(p).map_err(|e| RpcError::bad_params(e.to_string()))?
            }
            None => InitializeRequest::default(),
        };

        // Version negotiation: follow the client when it speaks an older
        // protocol revision
        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo {
                name: "engram".to_string(),
                version: engram_core::VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
            },
            instructions: Some(
                "Engram is a searchable archive of the user's past AI conversations. \
                 Use search_memory to find relevant prior discussions and fetch_chat \
                 to read a full transcript by id."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| RpcError::internal(e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, RpcError> {
        let tools = vec![
            ToolDescription {
                name: "search_memory".to_string(),
                description: Some(
                    "Search through chat history and context to find relevant past conversations"
                        .to_string(),
                ),
                input_schema: tools::search_memory::schema(),
            },
            ToolDescription {
                name: "fetch_chat".to_string(),
                description: Some("Fetch a specific chat conversation by ID".to_string()),
                input_schema: tools::fetch_chat::schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| RpcError::internal(e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        let request: CallToolRequest = match params {
            Some(p) => {
                serde_json::from_value(p).map_err(|e| RpcError::bad_params(e.to_string()))?
            }
            None => return Err(RpcError::bad_params("Missing tool call parameters")),
        };

        let text = match request.name.as_str() {
            "search_memory" => {
                tools::search_memory::execute(&self.state, request.arguments).await
            }
            "fetch_chat" => tools::fetch_chat::execute(&self.state, request.arguments).await,
            other => return Err(RpcError::bad_params(format!("Unknown tool: {other}"))),
        }
        .map_err(RpcError::internal)?;

        serde_json::to_value(CallToolResult::text(text))
            .map_err(|e| RpcError::internal(e.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
