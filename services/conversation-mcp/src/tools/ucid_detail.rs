//! `conversation_state_ucid_detail`: one conversation by UCID

use mcp_core::{Tool, ToolFailure, ToolFuture};
use serde_json::{Map, Value, json};

use super::upstream::{ConversationApi, field_or, optional_query, render_path, required_str};

pub const NAME: &str = "conversation_state_ucid_detail";

const OPTIONAL_PARAMS: &[&str] = &["includeConversations"];

pub struct UcidDetailTool {
    api: ConversationApi,
    template: String,
}

impl UcidDetailTool {
    pub fn new(api: ConversationApi, template: impl Into<String>) -> Self {
        Self {
            api,
            template: template.into(),
        }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let ucid = required_str(arguments, "ucid")?;
        let query = optional_query(arguments, OPTIONAL_PARAMS);
        let path = render_path(&self.template, ucid);

        let body = self.api.fetch(NAME, &path, query).await?;
        Ok(json!({
            "status": field_or(&body, "status", json!("success")),
            "message": field_or(&body, "message", json!("Conversation retrieved successfully.")),
            "data": field_or(&body, "data", json!([])),
        }))
    }
}

impl Tool for UcidDetailTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fetch conversation details using the UCID from Conversation State Service API"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ucid": {
                    "type": "string",
                    "description": "Unique Conversation ID (UCID)"
                },
                "includeConversations": {
                    "type": "boolean",
                    "description": "Include conversations as well for the given UCID. Default: false"
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
                "data": {"type": "array", "items": {"type": "object"}}
            }
        })
    }

    fn execute<'a>(&'a self, arguments: &'a Map<String, Value>) -> ToolFuture<'a> {
        Box::pin(self.run(arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::upstream::tests::{api_for, args, start_mock};
    use mcp_core::ErrorKind;

    #[tokio::test]
    async fn renders_path_and_boolean_query() {
        let (base, seen, _) = start_mock(|_| (200, "{}".to_string())).await;
        let tool = UcidDetailTool::new(api_for(&base), "/conversation-state/{ucid}");

        let result = tool
            .execute(&args(json!({"ucid": "f2194d38", "includeConversations": true})))
            .await
            .unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(result["message"], "Conversation retrieved successfully.");
        assert_eq!(result["data"], json!([]));
        assert_eq!(
            seen.lock().unwrap()[0].uri,
            "/conversation-state/f2194d38?includeConversations=true"
        );
    }

    #[tokio::test]
    async fn reserved_characters_stay_in_one_segment() {
        let (base, seen, _) = start_mock(|_| (200, "{}".to_string())).await;
        let tool = UcidDetailTool::new(api_for(&base), "/conversation-state/{ucid}");
        tool.execute(&args(json!({"ucid": "../admin?x=1"}))).await.unwrap();
        assert_eq!(
            seen.lock().unwrap()[0].uri,
            "/conversation-state/..%2Fadmin%3Fx%3D1"
        );
    }

    #[tokio::test]
    async fn upstream_404_is_error_envelope() {
        let (base, _, _) = start_mock(|_| (404, r#"{"error":"not found"}"#.to_string())).await;
        let tool = UcidDetailTool::new(api_for(&base), "/conversation-state/{ucid}");
        let failure = tool.execute(&args(json!({"ucid": "u"}))).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::UpstreamError);
        assert_eq!(
            failure.envelope()["error"],
            r#"API request failed with status 404: {"error":"not found"}"#
        );
    }
}
