// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Model Context Protocol (MCP) Server
//!
//! Line-delimited JSON-RPC 2.0 over stdio exposing the `get_cpu_utilization`
//! tool and a read-only inventory resource.

use crate::error::{NetCpuError, INTERNAL_ERROR};
use crate::telemetry::TelemetryOperation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const CPU_TOOL_NAME: &str = "get_cpu_utilization";
pub const INVENTORY_URI: &str = "netcpu://inventory";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

pub struct McpServer {
    operation: TelemetryOperation,
    server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool definition advertised by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<NetCpuError> for McpError {
    fn from(err: NetCpuError) -> Self {
        Self {
            code: err.rpc_code(),
            message: err.to_string(),
            data: Some(json!({ "kind": err.kind() })),
        }
    }
}

impl McpResponse {
    fn reply(id: Option<Value>, result: std::result::Result<Value, McpError>) -> Self {
        match result {
            Ok(value) => Self { jsonrpc: "2.0".to_string(), id, result: Some(value), error: None },
            Err(error) => Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CpuToolArgs {
    #[serde(default)]
    device: Option<String>,
}

/// Tools served by this server
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: CPU_TOOL_NAME.to_string(),
        description: "Run 'show processes cpu | include one minute' and parse output.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "device": {
                    "type": "string",
                    "description": "Inventory device name. Omit to use the first configured device."
                }
            },
            "required": []
        }),
    }]
}

impl McpServer {
    pub fn new(operation: TelemetryOperation) -> Self {
        Self {
            operation,
            server_info: ServerInfo {
                name: "netcpu-monitor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Handle one raw input line; `None` when no reply is due
    pub fn handle_line(&self, line: &str) -> Option<McpResponse> {
        match parse_request(line) {
            Ok(request) => self.handle_request(request),
            Err(response) => Some(response),
        }
    }

    /// Dispatch one request; notifications (no id) get no response
    pub fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        if request.jsonrpc != "2.0" {
            return Some(McpResponse::reply(
                request.id,
                Err(McpError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&request.params),
            "resources/list" => self.handle_resources_list(),
            "resources/read" => self.handle_resources_read(&request.params),
            method if method.starts_with("notifications/") => Ok(json!({})),
            _ => Err(McpError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        if request.id.is_none() {
            log::debug!("Notification '{}' handled", request.method);
            return None;
        }
        Some(McpResponse::reply(request.id, result))
    }

    fn handle_initialize(&self) -> std::result::Result<Value, McpError> {
        Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "serverInfo": self.server_info,
            "capabilities": { "tools": { "listChanged": false }, "resources": { "subscribe": false, "listChanged": false } }
        }))
    }

    fn handle_tools_list(&self) -> std::result::Result<Value, McpError> {
        Ok(json!({ "tools": tool_definitions() }))
    }

    fn handle_tools_call(&self, params: &Value) -> std::result::Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::new(INVALID_PARAMS, "Missing tool name"))?;
        if name != CPU_TOOL_NAME {
            return Err(McpError::new(INVALID_PARAMS, format!("Unknown tool: {}", name)));
        }

        let args = match params.get("arguments") {
            None | Some(Value::Null) => CpuToolArgs::default(),
            Some(arguments) => serde_json::from_value::<CpuToolArgs>(arguments.clone())
                .map_err(|e| McpError::new(INVALID_PARAMS, format!("Invalid arguments: {}", e)))?,
        };
        let device = args.device.as_deref().filter(|d| !d.is_empty());

        let result = self.operation.get_cpu_utilization(device).map_err(|e| {
            log::warn!("{} failed: {}", CPU_TOOL_NAME, e);
            McpError::from(e)
        })?;
        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::new(INTERNAL_ERROR, e.to_string()))?;
        Ok(json!({ "content": [{ "type": "text", "text": text }] }))
    }

    fn handle_resources_list(&self) -> std::result::Result<Value, McpError> {
        Ok(json!({
            "resources": [
                { "uri": INVENTORY_URI, "name": "Device Inventory", "mimeType": "application/json" }
            ]
        }))
    }

    fn handle_resources_read(&self, params: &Value) -> std::result::Result<Value, McpError> {
        let uri = params
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::new(INVALID_PARAMS, "Missing resource uri"))?;
        if uri != INVENTORY_URI {
            return Err(McpError::new(INVALID_PARAMS, format!("Unknown resource: {}", uri)));
        }

        let inventory = self.operation.inventory();
        let body = json!({
            "default": inventory.default_device().map(|d| d.name.clone()),
            "devices": inventory.summaries(),
        });
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| McpError::new(INTERNAL_ERROR, e.to_string()))?;
        Ok(json!({
            "contents": [{ "uri": INVENTORY_URI, "mimeType": "application/json", "text": text }]
        }))
    }

    /// Serve stdin/stdout until stdin closes.
    ///
    /// Tool calls run on the blocking pool so several devices can be queried
    /// at once; replies go out through a single writer in completion order.
    #[cfg(feature = "cli")]
    pub async fn run_stdio(self: std::sync::Arc<Self>) -> crate::error::Result<()> {
        use std::sync::Arc;
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::sync::mpsc;

        let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(response) = rx.recv().await {
                let mut frame = serde_json::to_vec(&response)?;
                frame.push(b'\n');
                stdout.write_all(&frame).await?;
                stdout.flush().await?;
            }
            Ok::<(), NetCpuError>(())
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let request = match parse_request(&line) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(response);
                    continue;
                }
            };

            if request.method == "tools/call" {
                let server = Arc::clone(&self);
                let tx = tx.clone();
                tokio::task::spawn_blocking(move || {
                    if let Some(response) = server.handle_request(request) {
                        let _ = tx.send(response);
                    }
                });
            } else if let Some(response) = self.handle_request(request) {
                let _ = tx.send(response);
            }
        }

        log::info!("stdin closed, draining in-flight requests");
        drop(tx);
        writer
            .await
            .map_err(|e| NetCpuError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        Ok(())
    }
}

/// Decode one frame, or the parse-error reply owed for it
pub fn parse_request(line: &str) -> std::result::Result<McpRequest, McpResponse> {
    serde_json::from_str::<McpRequest>(line).map_err(|e| {
        McpResponse::reply(
            None,
            Err(McpError::new(PARSE_ERROR, format!("Parse error: {}", e))),
        )
    })
}
