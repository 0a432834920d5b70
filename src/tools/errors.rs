use rmcp::ErrorData as McpError;

use crate::research::ResearchError;

pub(super) fn research_to_mcp_error(e: ResearchError) -> McpError {
    match &e {
        ResearchError::InvalidInput(_) => McpError::invalid_params(e.to_string(), None),
        ResearchError::Internal(_) => McpError::internal_error(e.to_string(), None),
    }
}
