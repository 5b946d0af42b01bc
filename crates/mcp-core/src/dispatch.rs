//! Tool-call dispatch
//!
//! Each call moves through `Received -> Validating -> Executing ->
//! Completed`. Nothing is kept between calls and calls may run concurrently.
//! Every outcome, including a panic inside a tool, leaves this module as a
//! `CallResult`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::envelope::CallResult;
use crate::error::ToolFailure;
use crate::registry::ToolRegistry;
use crate::schema::validate_arguments;
use crate::tool::ToolDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Received,
    Validating,
    Executing,
    Completed,
}

impl DispatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchPhase::Received => "received",
            DispatchPhase::Validating => "validating",
            DispatchPhase::Executing => "executing",
            DispatchPhase::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// MCP `tools/call` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    fn success(descriptor: &ToolDescriptor, data: Value) -> Self {
        if descriptor.has_structured_output() && data.is_object() {
            return Self {
                content: vec![ContentBlock::Text { text: pretty(&data) }],
                structured_content: Some(data),
                is_error: false,
            };
        }
        let text = match data {
            Value::String(text) => text,
            other => pretty(&other),
        };
        Self {
            content: vec![ContentBlock::Text { text }],
            structured_content: None,
            is_error: false,
        }
    }

    fn failure(failure: &ToolFailure) -> Self {
        let envelope = failure.envelope();
        Self {
            content: vec![ContentBlock::Text {
                text: pretty(&envelope),
            }],
            structured_content: Some(envelope),
            is_error: true,
        }
    }

    pub fn text(&self) -> &str {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => text,
            None => "",
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Routes tool calls through a shared `ToolRegistry`.
#[derive(Clone)]
pub struct DispatchServer {
    registry: Arc<ToolRegistry>,
}

impl DispatchServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list()
    }

    /// Run `name` with `arguments` and return the raw outcome.
    pub async fn invoke(&self, name: &str, arguments: Value) -> CallResult {
        self.dispatch(name, arguments).await.1
    }

    /// Run `name` and shape the outcome as an MCP tool result.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.dispatch(name, arguments).await {
            (Some(descriptor), CallResult::Success(data)) => {
                CallToolResult::success(&descriptor, data)
            }
            (_, CallResult::Failure(failure)) => CallToolResult::failure(&failure),
            (None, CallResult::Success(_)) => {
                CallToolResult::failure(&ToolFailure::internal("tool produced no descriptor"))
            }
        }
    }

    #[instrument(skip_all, fields(tool = %name))]
    async fn dispatch(&self, name: &str, arguments: Value) -> (Option<ToolDescriptor>, CallResult) {
        let started = Instant::now();
        debug!(phase = DispatchPhase::Received.as_str());

        let Some((descriptor, tool)) = self.registry.lookup(name) else {
            warn!("unknown tool requested");
            let failure = ToolFailure::tool_not_found(name);
            record("unknown", failure.kind.as_str(), started);
            return (None, failure.into());
        };

        debug!(phase = DispatchPhase::Validating.as_str());
        let arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                let failure = ToolFailure::invalid_arguments("Tool arguments must be a JSON object");
                record(name, failure.kind.as_str(), started);
                return (Some(descriptor), failure.into());
            }
        };
        if let Err(failure) = validate_arguments(&descriptor.input_schema, &arguments) {
            info!(kind = failure.kind.as_str(), error = %failure.message, "tool arguments rejected");
            record(name, failure.kind.as_str(), started);
            return (Some(descriptor), failure.into());
        }

        debug!(phase = DispatchPhase::Executing.as_str());
        let outcome = AssertUnwindSafe(async { tool.execute(&arguments).await })
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(data)) => CallResult::Success(data),
            Ok(Err(failure)) => {
                warn!(kind = failure.kind.as_str(), error = %failure.message, "tool call failed");
                CallResult::Failure(failure)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "tool panicked");
                CallResult::Failure(ToolFailure::internal(format!(
                    "Tool {name} failed unexpectedly: {message}"
                )))
            }
        };

        let outcome = match &result {
            CallResult::Success(_) => "success",
            CallResult::Failure(failure) => failure.kind.as_str(),
        };
        record(name, outcome, started);
        debug!(
            phase = DispatchPhase::Completed.as_str(),
            outcome,
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        (Some(descriptor), result)
    }
}

fn record(tool: &str, outcome: &'static str, started: Instant) {
    metrics::counter!(
        "mcp_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("mcp_tool_call_duration_seconds", "tool" => tool.to_string())
        .record(started.elapsed().as_secs_f64());
}
