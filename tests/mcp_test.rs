mod common;

use adb_mcp::errors::Result;
use adb_mcp::mcp::registry::{ArgSpec, ArgType, ToolDescriptor};
use adb_mcp::mcp::{standard_registry, ToolContext, ToolRegistry};
use adb_mcp::process::{BoxFuture, ProcessOutcome};
use serde_json::{json, Value};

use common::*;

#[tokio::test]
async fn test_list_tools_advertises_registry() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(&server, json!({"id": 1, "method": "list-tools"})).await;

    assert_eq!(resp["id"], 1);
    assert_eq!(resp["jsonrpc"], "2.0");
    let tools = resp["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), standard_registry().unwrap().len());
    for tool in tools {
        assert!(!tool["name"].as_str().unwrap().is_empty());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
    assert_eq!(tools[0]["name"], "list_devices");
    assert_eq!(tools[tools.len() - 1]["name"], "gradle_assemble");
}

#[tokio::test]
async fn test_list_devices_through_stub() {
    let stub = StubExecutor::new(vec![completed(b"emulator-5554\tdevice\n", b"", 0)]);
    let server = server_with(stub.clone());
    let resp = call(
        &server,
        json!({"id": 2, "method": "call-tool", "params": {"name": "list_devices"}}),
    )
    .await;

    assert_eq!(resp["id"], 2);
    assert_eq!(content_text(&resp), "emulator-5554");

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program.to_str(), Some("adb"));
    assert_eq!(calls[0].args, vec!["devices", "-l"]);
    assert_eq!(calls[0].timeout, test_config().command_timeout());
}

#[tokio::test]
async fn test_initialize_and_ping() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(&server, json!({"jsonrpc": "2.0", "id": "init", "method": "initialize"})).await;
    assert_eq!(resp["id"], "init");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
    assert_eq!(resp["result"]["serverInfo"]["name"], "adb-mcp");

    let resp = call(&server, json!({"id": 9, "method": "ping"})).await;
    assert_eq!(resp["result"], json!({}));
}

#[tokio::test]
async fn test_blank_lines_produce_no_response() {
    let server = server_with(StubExecutor::new(vec![]));
    let input = b"\n   \n{\"id\":1,\"method\":\"ping\"}\n\n{\"id\":2,\"method\":\"list-tools\"}\n\t\n{\"id\":3,\"method\":\"initialize\"}";
    let responses = exchange(&server, input).await;
    let ids: Vec<Value> = responses.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn test_unknown_method_preserves_id() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(&server, json!({"id": "abc-123", "method": "resources/list"})).await;
    assert_eq!(resp["id"], "abc-123");
    assert_eq!(resp["error"]["code"], -32601);
    assert!(resp.get("result").is_none());
}

#[tokio::test]
async fn test_notification_still_gets_one_response() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(&server, json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).await;
    assert!(resp["id"].is_null());
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn test_malformed_line_does_not_break_stream() {
    let server = server_with(StubExecutor::new(vec![]));
    let input = b"{not json\n{\"id\":5}\n{\"id\":6,\"method\":\"ping\"}\n";
    let responses = exchange(&server, input).await;
    assert_eq!(responses.len(), 3);

    assert!(responses[0]["id"].is_null());
    assert_eq!(responses[0]["error"]["code"], -32700);
    // Missing `method`: the envelope does not decode, so the id is not recovered.
    assert!(responses[1]["id"].is_null());
    assert_eq!(responses[1]["error"]["code"], -32700);
    assert_eq!(responses[2]["id"], 6);
    assert!(responses[2]["result"].is_object());
}

#[tokio::test]
async fn test_invalid_utf8_line_is_parse_error() {
    let server = server_with(StubExecutor::new(vec![]));
    let mut input = vec![0xff, 0xfe, b'\n'];
    input.extend_from_slice(b"{\"id\":7,\"method\":\"ping\"}\n");
    let responses = exchange(&server, &input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 7);
}

#[tokio::test]
async fn test_call_tool_without_params() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(&server, json!({"id": 3, "method": "call-tool"})).await;
    assert_eq!(resp["id"], 3);
    assert_eq!(resp["error"]["code"], -32602);

    let resp = call(&server, json!({"id": 4, "method": "call-tool", "params": {"arguments": {}}})).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert!(resp["error"]["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let stub = StubExecutor::new(vec![]);
    let server = server_with(stub.clone());
    let resp = call(
        &server,
        json!({"id": 10, "method": "call-tool", "params": {"name": "reboot_device"}}),
    )
    .await;
    assert_eq!(resp["id"], 10);
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "tool not found: reboot_device");
    assert_eq!(resp["error"]["data"]["tool"], "reboot_device");
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_missing_required_argument_names_field() {
    let stub = StubExecutor::new(vec![]);
    let server = server_with(stub.clone());
    let resp = call(
        &server,
        json!({"id": 11, "method": "tools/call", "params": {"name": "install_apk", "arguments": {"deviceId": "x"}}}),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(resp["error"]["message"], "missing required argument: path");
    assert_eq!(resp["error"]["data"]["field"], "path");
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_argument_type_names_field_and_type() {
    let server = server_with(StubExecutor::new(vec![]));
    let resp = call(
        &server,
        json!({"id": 12, "method": "call-tool", "params": {
            "name": "uninstall_package",
            "arguments": {"packageName": "com.example", "keepData": "yes"}
        }}),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(resp["error"]["data"]["field"], "keepData");
    assert_eq!(resp["error"]["data"]["expected"], "boolean");
}

#[tokio::test]
async fn test_execution_failures_are_internal_errors() {
    let stub = StubExecutor::new(vec![
        completed(b"", b"error: no devices/emulators found\n", 1),
        ProcessOutcome::TimedOut,
        ProcessOutcome::LaunchFailed {
            reason: "'adb' was not found on PATH".to_string(),
        },
    ]);
    let server = server_with(stub);
    let request = |id: i64| {
        json!({"id": id, "method": "call-tool", "params": {"name": "adb_shell", "arguments": {"command": "getprop"}}})
    };

    let resp = call(&server, request(1)).await;
    assert_eq!(resp["error"]["code"], -32603);
    let message = resp["error"]["message"].as_str().unwrap();
    assert!(message.contains("exit 1"), "{message}");
    assert!(message.contains("no devices/emulators found"), "{message}");

    let resp = call(&server, request(2)).await;
    assert_eq!(resp["error"]["code"], -32603);
    assert!(resp["error"]["message"].as_str().unwrap().contains("timed out after 30s"));

    let resp = call(&server, request(3)).await;
    assert_eq!(resp["id"], 3);
    assert_eq!(resp["error"]["code"], -32603);
    assert!(resp["error"]["message"].as_str().unwrap().contains("not found on PATH"));
}

fn flaky(_ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        if args.get("explode").is_some() {
            panic!("handler exploded");
        }
        Ok(json!({"status": "fine"}))
    })
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let registry = ToolRegistry::builder()
        .register(
            ToolDescriptor {
                name: "flaky",
                description: "Sometimes panics",
                args: vec![ArgSpec::optional("explode", ArgType::Boolean, "Panic")],
            },
            flaky,
        )
        .build()
        .unwrap();
    let server = server_with_registry(registry, StubExecutor::new(vec![]));

    let input = format!(
        "{}\n{}\n",
        json!({"id": 1, "method": "call-tool", "params": {"name": "flaky", "arguments": {"explode": true}}}),
        json!({"id": 2, "method": "call-tool", "params": {"name": "flaky"}}),
    );
    let responses = exchange(&server, input.as_bytes()).await;
    assert_eq!(responses.len(), 2);

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["error"]["code"], -32603);
    assert!(responses[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("handler exploded"));

    assert_eq!(responses[1]["id"], 2);
    assert_eq!(content_text(&responses[1]), r#"{"status":"fine"}"#);
}

#[tokio::test]
async fn test_responses_follow_request_order() {
    let stub = StubExecutor::new(vec![
        completed(b"List of devices attached\nA\tdevice\n", b"", 0),
        completed(b"hello\n", b"", 0),
    ]);
    let server = server_with(stub);
    let input = format!(
        "{}\n{}\n{}\n{}\n",
        json!({"id": "a", "method": "call-tool", "params": {"name": "list_devices"}}),
        json!({"id": "b", "method": "bogus"}),
        json!({"id": "c", "method": "call-tool", "params": {"name": "adb_shell", "arguments": {"command": "echo hello"}}}),
        json!({"id": "d", "method": "list-tools"}),
    );
    let responses = exchange(&server, input.as_bytes()).await;
    let ids: Vec<&str> = responses.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(content_text(&responses[0]), "A");
    assert_eq!(content_text(&responses[2]), "hello");
}
