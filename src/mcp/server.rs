//! MCP server lifecycle for the FreeCAD bridge.
//!
//! 1. **Initialisation**: `initialize`, then the `notifications/initialized`
//!    notification.
//! 2. **Operation**: `tools/*`, `prompts/*` and `ping`, one request at a time.
//! 3. **Shutdown**: stdin closes or a signal arrives; the FreeCAD session is
//!    released on the way out.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::freecad::Connector;
use crate::mcp::prompts;
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, PromptGetParams, RequestId,
    ToolCallParams, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{tool_definitions, ToolDispatcher};
use crate::mcp::transport::StdioTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Capabilities advertised in the initialize response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Present because the server has tools.
    pub tools: ListCapability,
    /// Present because the server has prompts.
    pub prompts: ListCapability,
}

/// A capability whose list never changes during a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapability {
    /// Always `false`.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server name and version for the initialize response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// The MCP server, generic over how FreeCAD sessions are made.
pub struct McpServer<C: Connector> {
    state: ServerState,
    transport: StdioTransport,
    tools: ToolDispatcher<C>,
}

impl<C: Connector> McpServer<C> {
    /// Creates a server around a tool dispatcher.
    #[must_use]
    pub fn new(tools: ToolDispatcher<C>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            tools,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the server until stdin closes or a shutdown signal arrives.
    ///
    /// Connects to FreeCAD once before reading requests and releases the
    /// session afterwards, whichever way the loop ends.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.tools.on_startup().await;
        let result = self.run_with_shutdown().await;
        self.state = ServerState::ShuttingDown;
        self.tools.on_shutdown();
        result
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down");
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles one line from stdin. Returns `true` once the server should stop.
    async fn handle_input(&mut self, line: Option<String>) -> std::io::Result<bool> {
        let Some(line) = line else {
            info!("stdin closed, shutting down");
            return Ok(true);
        };
        if line.trim().is_empty() {
            return Ok(false);
        }

        let reply = match parse_message(&line) {
            Ok(message) => self.handle_message(message).await,
            Err(error) => Some(Err(error)),
        };
        match reply {
            Some(Ok(response)) => self.transport.write_message(&response).await?,
            Some(Err(error)) => self.transport.write_message(&error).await?,
            None => {}
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a parsed message; notifications produce no reply.
    pub async fn handle_message(
        &mut self,
        message: IncomingMessage,
    ) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        match message {
            IncomingMessage::Request(req) => Some(self.handle_request(&req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    async fn handle_request(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        debug!(id = %req.id, method = %req.method, "Request");
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req).await,
            "prompts/list" => self.handle_prompts_list(req),
            "prompts/get" => self.handle_prompts_get(req),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            info!("Client initialised");
            self.state = ServerState::Running;
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req.parse_params("initialize")?;
        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested = %params.protocol_version,
                "Initialising"
            );
        }

        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities {
                tools: ListCapability::default(),
                prompts: ListCapability::default(),
            },
            "serverInfo": ServerInfo::default(),
        });
        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tool_definitions() }),
        ))
    }

    async fn handle_tools_call(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        let params: ToolCallParams = req.parse_params("tool call")?;

        info!(tool = %params.name, "Tool call");
        let result = self.tools.call(&params.name, &params.arguments).await;

        let value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;
        Ok(JsonRpcResponse::success(req.id.clone(), value))
    }

    fn handle_prompts_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "prompts": prompts::prompt_definitions() }),
        ))
    }

    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        let params: PromptGetParams = req.parse_params("prompt")?;

        prompts::get_prompt(&params.name)
            .map(|prompt| JsonRpcResponse::success(req.id.clone(), prompt))
            .ok_or_else(|| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Unknown prompt: {}", params.name),
                )
            })
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}
