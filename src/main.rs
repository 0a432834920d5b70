mod config;
mod fetch;
mod research;
mod sources;
mod text;
mod tools;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;

use config::ResearchConfig;
use sources::SourceSelector;
use tools::ResearchAssistant;

#[derive(Parser, Debug)]
#[command(name = "research-assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server combining web and academic search into cited research reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,

    /// Run a single research query and print the report
    #[command(alias = "r")]
    Research {
        /// Topic or question to research
        query: String,

        /// Which backends to consult
        #[arg(long, short, value_enum, default_value_t = SourceSelector::Both)]
        sources: SourceSelector,

        /// Results per source (clamped to the configured maximum)
        #[arg(long, short)]
        num_results: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("research_assistant=info".parse()?),
        )
        .init();

    let config = Arc::new(ResearchConfig::from_env()?);
    let assistant = ResearchAssistant::new(config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("starting research-assistant MCP server");

            let service = assistant
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("failed to start server: {e}"))?;

            service.waiting().await?;
            info!("server stopped");
        }
        Commands::Research {
            query,
            sources,
            num_results,
        } => {
            let report = assistant.research(&query, sources, num_results).await?;
            println!("{report}");
        }
    }
    Ok(())
}
