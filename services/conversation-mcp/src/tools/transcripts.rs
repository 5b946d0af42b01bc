//! `conversation_state_transcripts`: transcripts for one UCID

use mcp_core::{Tool, ToolFailure, ToolFuture};
use serde_json::{Map, Value, json};

use super::upstream::{ConversationApi, field_or, render_path, required_str};

pub const NAME: &str = "conversation_state_transcripts";

pub struct TranscriptsTool {
    api: ConversationApi,
    template: String,
}

impl TranscriptsTool {
    pub fn new(api: ConversationApi, template: impl Into<String>) -> Self {
        Self {
            api,
            template: template.into(),
        }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let ucid = required_str(arguments, "ucid")?;
        let path = render_path(&self.template, ucid);

        let body = self.api.fetch(NAME, &path, Vec::new()).await?;
        Ok(json!({
            "status": field_or(&body, "status", json!("success")),
            "message": field_or(
                &body,
                "message",
                json!(format!("Transcripts fetched successfully for ucid: {ucid}"))
            ),
            "data": field_or(&body, "data", json!({})),
        }))
    }
}

impl Tool for TranscriptsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Retrieve conversation transcripts for a UCID from Conversation State Service API"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ucid": {
                    "type": "string",
                    "description": "Unique Conversation ID (UCID)"
                }
            },
            "required": ["ucid"]
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string"},
                "message": {"type": "string"},
                "data": {"type": "object"}
            }
        })
    }

    fn execute<'a>(&'a self, arguments: &'a Map<String, Value>) -> ToolFuture<'a> {
        Box::pin(self.run(arguments))
    }
}
