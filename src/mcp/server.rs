//! MCP server that reads JSON-RPC 2.0 requests from stdin and writes
//! responses to stdout.
//!
//! Requests are handled strictly one at a time: a line is read, routed, its
//! tool (and any process it launches) runs to completion, and exactly one
//! response line is written and flushed before the next line is read.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::errors::{AdbMcpError, Result};

use super::registry::ToolRegistry;
use super::tools::ToolContext;
use super::transport::{tool_result, ErrorCode, JsonRpcRequest, JsonRpcResponse};

/// MCP protocol revision advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Runtime counters, logged when the input stream closes.
struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The MCP server: an immutable tool registry plus the context its handlers run in.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
    stats: ServerStats,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self {
            registry: Arc::new(registry),
            context: Arc::new(context),
            stats: ServerStats::new(),
        }
    }

    /// Serves process stdin/stdout until stdin is closed.
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serves requests from `reader`, writing one response line per request
    /// line to `writer`, until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.registry.len(), "mcp server listening on stdio");
        let mut lines = reader.lines();

        loop {
            let response = match lines.next_line().await {
                Ok(Some(line)) => match self.handle_line(&line).await {
                    Some(response) => response,
                    None => continue,
                },
                Ok(None) => break,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    JsonRpcResponse::error(
                        Value::Null,
                        ErrorCode::ParseError,
                        format!("failed to parse JSON-RPC request: {}", e),
                    )
                }
                Err(e) => {
                    error!(error = %e, "failed to read from input stream");
                    return Err(AdbMcpError::Io(e));
                }
            };

            let json_line = match serde_json::to_string(&response) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to serialize response");
                    continue;
                }
            };
            let output = format!("{}\n", json_line);
            if let Err(e) = writer.write_all(output.as_bytes()).await {
                warn!(error = %e, "failed to write response; stopping");
                break;
            }
            if let Err(e) = writer.flush().await {
                warn!(error = %e, "failed to flush output; stopping");
                break;
            }
        }

        info!(
            uptime_secs = self.stats.started_at.elapsed().as_secs(),
            total_requests = self.stats.total_requests.load(Ordering::Relaxed),
            tool_calls = self.stats.tool_calls.load(Ordering::Relaxed),
            errors = self.stats.errors.load(Ordering::Relaxed),
            "input closed; shutting down"
        );
        Ok(())
    }

    /// Handles one raw input line. Returns `None` only for blank lines.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => JsonRpcResponse::error(
                Value::Null,
                ErrorCode::ParseError,
                format!("failed to parse JSON-RPC request: {}", e),
            ),
        };

        if response.error.is_some() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
        Some(response)
    }

    /// Routes a decoded request by method name.
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        debug!(method = %request.method, id = %request.id, "request");
        let id = request.id;

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "list-tools" | "tools/list" => self.handle_tools_list(id),
            "call-tool" | "tools/call" => self.handle_tools_call(id, request.params).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            other => JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {}", other),
            ),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "adb-mcp",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = self.registry.definitions();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Runs a tool call. The handler runs in its own task so that a panic
    /// becomes an internal-error response instead of ending the loop.
    async fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let mut params = match params {
            Some(Value::Object(map)) => map,
            Some(_) => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "tools/call params must be an object".to_string(),
                );
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing params for tools/call".to_string(),
                );
            }
        };

        let tool_name = match params.remove("name") {
            Some(Value::String(name)) => name,
            _ => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing 'name' in tools/call params".to_string(),
                );
            }
        };
        let arguments = params.remove("arguments");

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);
        info!(tool = %tool_name, "tool call");

        let registry = Arc::clone(&self.registry);
        let context = Arc::clone(&self.context);
        let name = tool_name.clone();
        let joined =
            tokio::spawn(async move { registry.dispatch(&context, &name, arguments).await }).await;

        match joined {
            Ok(Ok(value)) => JsonRpcResponse::success(id, tool_result(value)),
            Ok(Err(e)) => {
                warn!(tool = %tool_name, error = %e, "tool call failed");
                JsonRpcResponse::tool_error(id, &e)
            }
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                error!(tool = %tool_name, %message, "tool handler aborted");
                JsonRpcResponse::tool_error(id, &AdbMcpError::Handler(message))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
