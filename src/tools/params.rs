use schemars::JsonSchema;
use serde::Deserialize;

use crate::sources::SourceSelector;

#[derive(Deserialize, JsonSchema)]
pub struct DeepResearchParams {
    /// The research question or topic
    pub query: String,
    /// Which sources to use: "web" for general info, "academic" for scholarly sources, "both" (default) for all sources
    pub sources: Option<SourceSelector>,
    /// Number of sources to examine per backend (default 2, max 3)
    pub num_results: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
pub struct ResearchPromptParams {
    /// The topic to research
    pub topic: String,
}
