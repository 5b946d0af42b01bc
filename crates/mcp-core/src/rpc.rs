//! JSON-RPC 2.0 message handling for the MCP tool surface
//!
//! Transport-agnostic: callers hand in a decoded message (or raw text) and
//! write back whatever is returned. Notifications produce no response.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::dispatch::DispatchServer;

pub const PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

/// Maps JSON-RPC requests onto a `DispatchServer`.
#[derive(Clone)]
pub struct RpcHandler {
    dispatch: DispatchServer,
    info: ServerInfo,
}

impl RpcHandler {
    pub fn new(dispatch: DispatchServer, info: ServerInfo) -> Self {
        Self { dispatch, info }
    }

    pub fn dispatch(&self) -> &DispatchServer {
        &self.dispatch
    }

    /// Decode and handle one frame of text.
    pub async fn handle_text(&self, text: &str) -> Option<Value> {
        self.handle_bytes(text.as_bytes()).await
    }

    /// Decode and handle one raw frame. Bytes that are not UTF-8 JSON get a
    /// parse error response.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Option<Value> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(payload) => self.handle_payload(payload).await,
            Err(e) => Some(error_response(
                Value::Null,
                RpcError::parse_error(format!("Parse error: {e}")),
            )),
        }
    }

    /// Handle a single message or a batch. `None` when nothing needs sending.
    pub async fn handle_payload(&self, payload: Value) -> Option<Value> {
        let Value::Array(batch) = payload else {
            return self.handle_message(payload).await;
        };
        if batch.is_empty() {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            ));
        }
        let mut responses = Vec::with_capacity(batch.len());
        for message in batch {
            if let Some(response) = self.handle_message(message).await {
                responses.push(response);
            }
        }
        (!responses.is_empty()).then_some(Value::Array(responses))
    }

    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let Some(obj) = message.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        let id = obj.get("id").cloned();
        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A response to a request we never send; ignore.
            return None;
        };
        let params = obj.get("params").cloned().unwrap_or(Value::Null);

        let Some(id) = id else {
            debug!(method, "notification received");
            return None;
        };

        debug!(method, "request received");
        Some(match self.handle_request(method, params).await {
            Ok(result) => success_response(id, result),
            Err(error) => {
                warn!(method, code = error.code, error = %error.message, "request rejected");
                error_response(id, error)
            }
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": self.info,
        })
    }

    fn tools_list_payload(&self) -> Value {
        json!({ "tools": self.dispatch.list_tools() })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let result = self.dispatch.call_tool(name, arguments).await;
        serde_json::to_value(result).map_err(|e| RpcError::internal(format!("encoding result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolFailure;
    use crate::registry::ToolRegistry;
    use crate::tool::{Tool, ToolFuture};
    use std::sync::Arc;

    struct Upper;

    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase a string"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        fn execute<'a>(&'a self, arguments: &'a Map<String, Value>) -> ToolFuture<'a> {
            Box::pin(async move {
                let text = arguments
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ToolFailure::missing_parameter("text"))?;
                Ok(json!(text.to_uppercase()))
            })
        }
    }

    fn handler() -> RpcHandler {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(Upper));
        RpcHandler::new(
            DispatchServer::new(registry),
            ServerInfo {
                name: "test-server".into(),
                version: "0.1.0".into(),
            },
        )
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = handler()
            .handle_payload(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "test-server");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_returns_descriptors() {
        let response = handler()
            .handle_payload(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}))
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "upper");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "text");
    }

    #[tokio::test]
    async fn tools_call_success_and_failure_are_results() {
        let handler = handler();
        let ok = handler
            .handle_payload(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "upper", "arguments": {"text": "hi"}}
            }))
            .await
            .unwrap();
        assert_eq!(ok["result"]["content"][0]["text"], "HI");

        let missing = handler
            .handle_payload(json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "upper", "arguments": {}}
            }))
            .await
            .unwrap();
        assert!(missing.get("error").is_none());
        assert_eq!(missing["result"]["isError"], true);
        assert_eq!(missing["result"]["structuredContent"]["kind"], "missing_parameter");

        let unknown = handler
            .handle_payload(json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "does_not_exist"}
            }))
            .await
            .unwrap();
        assert_eq!(unknown["result"]["isError"], true);
    }

    #[tokio::test]
    async fn tools_call_without_name_is_invalid_params() {
        let response = handler()
            .handle_payload(json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {}}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn protocol_errors() {
        let handler = handler();
        let parse = handler.handle_text("{not json").await.unwrap();
        assert_eq!(parse["error"]["code"], -32700);
        assert_eq!(parse["id"], Value::Null);

        let version = handler
            .handle_payload(json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}))
            .await
            .unwrap();
        assert_eq!(version["error"]["code"], -32600);

        let unknown = handler
            .handle_payload(json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}))
            .await
            .unwrap();
        assert_eq!(unknown["error"]["code"], -32601);

        let empty = handler.handle_payload(json!([])).await.unwrap();
        assert_eq!(empty["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn invalid_utf8_frame_is_parse_error() {
        let response = handler().handle_bytes(b"\xff\xfe").await.unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let response = handler()
            .handle_payload(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn batch_skips_notifications() {
        let response = handler()
            .handle_payload(json!([
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "id": 2, "method": "tools/list"}
            ]))
            .await
            .unwrap();
        let responses = response.as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"], json!({}));

        let only_notes = handler()
            .handle_payload(json!([{"jsonrpc": "2.0", "method": "notifications/initialized"}]))
            .await;
        assert!(only_notes.is_none());
    }
}
