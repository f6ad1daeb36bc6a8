#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use adb_mcp::config::ServerConfig;
use adb_mcp::mcp::{standard_registry, McpServer, ToolContext, ToolRegistry};
use adb_mcp::process::{BoxFuture, Executor, ProcessOutcome, ProcessSpec};
use serde_json::Value;

/// Executor that records every spec and replays canned outcomes in order.
#[derive(Default)]
pub struct StubExecutor {
    outcomes: Mutex<VecDeque<ProcessOutcome>>,
    calls: Mutex<Vec<ProcessSpec>>,
}

impl StubExecutor {
    pub fn new(outcomes: Vec<ProcessOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl Executor for StubExecutor {
    fn execute(&self, spec: ProcessSpec) -> BoxFuture<'_, ProcessOutcome> {
        self.calls.lock().unwrap().push(spec);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProcessOutcome::LaunchFailed {
                reason: "no stub outcome queued".to_string(),
            });
        Box::pin(async move { outcome })
    }
}

pub fn completed(stdout: &[u8], stderr: &[u8], exit_code: i32) -> ProcessOutcome {
    ProcessOutcome::Completed {
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
        exit_code,
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        adb_path: "adb".into(),
        ..ServerConfig::default()
    }
}

pub fn server_with(stub: Arc<StubExecutor>) -> McpServer {
    server_with_registry(standard_registry().unwrap(), stub)
}

pub fn server_with_registry(registry: ToolRegistry, stub: Arc<StubExecutor>) -> McpServer {
    McpServer::new(registry, ToolContext::new(stub, test_config()))
}

/// Feeds `input` through the server and parses every output line.
pub async fn exchange(server: &McpServer, input: &[u8]) -> Vec<Value> {
    let mut out = Vec::new();
    server.serve(input, &mut out).await.unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Sends one request line and returns the single response.
pub async fn call(server: &McpServer, request: Value) -> Value {
    let line = format!("{}\n", request);
    let mut responses = exchange(server, line.as_bytes()).await;
    assert_eq!(responses.len(), 1);
    responses.remove(0)
}

/// Text of the single content item in a successful tool result.
pub fn content_text(response: &Value) -> String {
    assert!(response.get("error").is_none(), "unexpected error: {response}");
    let content = response["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    content[0]["text"].as_str().unwrap().to_string()
}
