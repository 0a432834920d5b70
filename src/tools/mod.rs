mod errors;
mod params;
mod prompt;

use params::{DeepResearchParams, ResearchPromptParams};

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolResult, Content, GetPromptRequestParam, GetPromptResult, Implementation,
        ListPromptsResult, PaginatedRequestParam, PromptMessage, PromptMessageRole,
        ServerCapabilities, ServerInfo,
    },
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::info;

use errors::research_to_mcp_error;

use crate::config::ResearchConfig;
use crate::fetch::HttpFetcher;
use crate::research::{Query, ResearchError, Researcher};
use crate::sources::{DuckDuckGoSource, SearchSource, SemanticScholarSource, SourceSelector};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Whole-invocation ceiling; on expiry the call fails without a partial document.
const RESEARCH_TOOL_TIMEOUT: Duration = Duration::from_secs(90);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

/// MCP server handler exposing the `deep_research` tool and prompt.
///
/// Backends are consulted web first, then academic; that order also fixes
/// how their results interleave in the returned document.
#[derive(Clone)]
pub struct ResearchAssistant {
    researcher: Arc<Researcher<HttpFetcher>>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

#[tool_router]
impl ResearchAssistant {
    pub fn new(config: Arc<ResearchConfig>) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(http_client()?, config))
    }

    fn with_client(http: Client, config: Arc<ResearchConfig>) -> Self {
        let sources: Vec<Arc<dyn SearchSource>> = vec![
            Arc::new(DuckDuckGoSource::new(http.clone(), Arc::clone(&config))),
            Arc::new(SemanticScholarSource::new(http.clone(), Arc::clone(&config))),
        ];
        let fetcher = HttpFetcher::new(http, Arc::clone(&config));
        Self {
            researcher: Arc::new(Researcher::new(sources, fetcher, config)),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Validate the request and run the pipeline under the invocation timeout.
    pub async fn research(
        &self,
        query: &str,
        sources: SourceSelector,
        num_results: Option<i64>,
    ) -> Result<String, ResearchError> {
        let query = Query::new(query, sources, num_results, self.researcher.config())?;
        tokio::time::timeout(RESEARCH_TOOL_TIMEOUT, self.researcher.run(&query))
            .await
            .unwrap_or_else(|_| {
                Err(ResearchError::Internal(format!(
                    "research timed out after {}s",
                    RESEARCH_TOOL_TIMEOUT.as_secs()
                )))
            })
    }

    #[tool(
        name = "deep_research",
        description = "Perform comprehensive research on a topic. Searches the web (DuckDuckGo) and/or academic literature (Semantic Scholar), follows the top results, extracts their readable text, and returns a size-bounded report with one cited section per source. Use sources=\"web\", \"academic\" or \"both\" (default); num_results is per source (default 2, max 3)."
    )]
    async fn deep_research(
        &self,
        Parameters(params): Parameters<DeepResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let sources = params.sources.unwrap_or_default();
        info!(
            query = %params.query,
            sources = sources.describe(),
            num_results = ?params.num_results,
            "tool:deep_research"
        );

        let output = self
            .research(&params.query, sources, params.num_results)
            .await
            .map_err(research_to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

#[prompt_router]
impl ResearchAssistant {
    #[prompt(
        name = "deep_research",
        description = "Create a prompt for comprehensive, multi-stage research on a topic with visualisations and APA citations"
    )]
    async fn deep_research_prompt(
        &self,
        Parameters(params): Parameters<ResearchPromptParams>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        if params.topic.trim().is_empty() {
            return Err(McpError::invalid_params("topic must not be empty", None));
        }
        info!(topic = %params.topic, "prompt:deep_research");
        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            prompt::research_methodology(params.topic.trim()),
        )])
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for ResearchAssistant {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "research-assistant".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "research-assistant gathers web and academic sources for a query, follows the top results and returns their extracted text with citations. Synthesis is left to you; the deep_research prompt describes a full research workflow."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }
}
