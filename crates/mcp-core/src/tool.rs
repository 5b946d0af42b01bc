//! The `Tool` capability and its wire descriptor

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::ToolFailure;

/// Boxed future returned by `Tool::execute`.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolFailure>> + Send + 'a>>;

/// A named, schema-described unit of work.
///
/// Uses `Pin<Box<dyn Future>>` so tools can be held as `Arc<dyn Tool>`.
/// Expected failures (bad input, upstream errors) are returned as
/// `ToolFailure`; the dispatcher additionally catches panics.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the `arguments` object
    fn input_schema(&self) -> Value;

    /// Declared result shape. `{"type": "object"}` results are also returned
    /// as structured content.
    fn output_schema(&self) -> Value {
        json!({ "type": "string" })
    }

    fn execute<'a>(&'a self, arguments: &'a Map<String, Value>) -> ToolFuture<'a>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            output_schema: self.output_schema(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl ToolDescriptor {
    pub fn has_structured_output(&self) -> bool {
        self.output_schema.get("type").and_then(Value::as_str) == Some("object")
    }
}
