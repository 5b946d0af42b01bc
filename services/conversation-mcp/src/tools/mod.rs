//! Conversation-state tools exposed over MCP

pub mod search;
pub mod transcripts;
pub mod ucid_detail;
pub mod upstream;

use std::sync::Arc;

use mcp_core::ToolRegistry;
use tracing::info;

use crate::config::EndpointsConfig;
use search::SearchTool;
use transcripts::TranscriptsTool;
use ucid_detail::UcidDetailTool;
use upstream::ConversationApi;

/// Register the three conversation-state tools against `api`.
pub fn register_conversation_tools(
    registry: &ToolRegistry,
    api: &ConversationApi,
    endpoints: &EndpointsConfig,
) {
    registry.register(Arc::new(SearchTool::new(api.clone(), endpoints.search.clone())));
    registry.register(Arc::new(UcidDetailTool::new(
        api.clone(),
        endpoints.ucid_detail.clone(),
    )));
    registry.register(Arc::new(TranscriptsTool::new(
        api.clone(),
        endpoints.transcripts.clone(),
    )));
    info!(tools = ?registry.names(), "conversation tools registered");
}
