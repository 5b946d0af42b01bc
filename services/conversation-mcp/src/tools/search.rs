//! `conversation_state_search`: filter conversations for a contact center

use mcp_core::{Tool, ToolFuture};
use serde_json::{Map, Value, json};

use super::upstream::{ConversationApi, field_or, optional_query, required_str};

pub const NAME: &str = "conversation_state_search";

const OPTIONAL_PARAMS: &[&str] = &[
    "startDate",
    "endDate",
    "customerId",
    "jomaxId",
    "conversationId",
    "limit",
    "nextToken",
];

pub struct SearchTool {
    api: ConversationApi,
    path: String,
}

impl SearchTool {
    pub fn new(api: ConversationApi, path: impl Into<String>) -> Self {
        Self {
            api,
            path: path.into(),
        }
    }

    async fn run(&self, arguments: &Map<String, Value>) -> Result<Value, mcp_core::ToolFailure> {
        let contact_center_id = required_str(arguments, "contactCenterId")?;

        let mut query = vec![("contactCenterId".to_string(), contact_center_id.to_string())];
        query.extend(optional_query(arguments, OPTIONAL_PARAMS));

        let body = self.api.fetch(NAME, &self.path, query).await?;
        Ok(json!({
            "status": field_or(&body, "status", json!("success")),
            "message": field_or(&body, "message", json!("Conversation data retrieved successfully")),
            "data": field_or(&body, "data", json!([])),
            "pagination": field_or(&body, "pagination", json!({})),
        }))
    }
}

impl Tool for SearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search conversations in the Conversation State Service by contact center, \
         with optional date range, customer, agent and conversation filters"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contactCenterId": {
                    "type": "string",
                    "description": "Contact center ID, e.g. liveperson:30187337"
                },
                "startDate": {
                    "type": "string",
                    "description": "Start of the search window (YYYY-MM-DD HH:MM)"
                },
                "endDate": {
                    "type": "string",
                    "description": "End of the search window (YYYY-MM-DD HH:MM)"
                },
                "customerId": {"type": "string", "description": "Customer ID"},
                "jomaxId": {"type": "string", "description": "Agent Jomax ID"},
                "conversationId": {"type": "string", "description": "Conversation ID"},
                "limit": {"type": "integer", "description": "Maximum number of results"},
                "nextToken": {"type": "string", "description": "Pagination token from a previous response"}
            },
            "required": ["contactCenterId"]
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string"},
                "message": {"type": "string"},
                "data": {"type": "array", "items": {"type": "object"}},
                "pagination": {"type": "object"}
            }
        })
    }

    fn execute<'a>(&'a self, arguments: &'a Map<String, Value>) -> ToolFuture<'a> {
        Box::pin(self.run(arguments))
    }
}
