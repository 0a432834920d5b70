//! Research orchestration: source fan-out, page extraction and report assembly.

pub(crate) mod engine;
pub(crate) mod report;

use crate::config::ResearchConfig;
use crate::sources::SourceSelector;

pub use engine::Researcher;

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A validated research request. The result count is already clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub sources: SourceSelector,
    pub max_results: usize,
}

impl Query {
    pub fn new(
        text: &str,
        sources: SourceSelector,
        num_results: Option<i64>,
        config: &ResearchConfig,
    ) -> Result<Self, ResearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ResearchError::InvalidInput("query must not be empty".into()));
        }
        Ok(Self {
            text: text.to_string(),
            sources,
            max_results: config.clamp_results(num_results),
        })
    }
}
