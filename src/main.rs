use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eduscale_agent::agent::{AnalysisAgent, AnalysisRequest, AnalysisService};
use eduscale_agent::config::Config;
use eduscale_agent::llm::OpenAiResponsesProvider;
use eduscale_agent::session::{JsonFileStore, MemoryStore, SessionStore};
use eduscale_agent::tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "eduscale-agent", about = "Tool-calling analysis agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one analysis request through the agent loop.
    Analyze {
        /// Natural language question.
        query: String,
        /// Preferred answer language.
        #[arg(long, default_value = "en")]
        language: String,
        /// Per-request step budget override.
        #[arg(long)]
        max_steps: Option<u32>,
        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,
    },
    /// Print the full message history of one session.
    Session { id: String },
    /// List all known sessions with their histories.
    Sessions,
    /// List the registered tools and their parameter schemas.
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let store: Arc<dyn SessionStore> = match &config.session_store_path {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let tools = Arc::new(ToolRegistry::with_builtin_tools());

    match cli.command {
        Command::Analyze {
            query,
            language,
            max_steps,
            session,
        } => {
            let gateway = Arc::new(
                OpenAiResponsesProvider::new(config.llm.clone())
                    .context("failed to initialize model gateway")?,
            );
            let agent = AnalysisAgent::new(config.agent.clone(), gateway, tools, store.clone());
            let service = AnalysisService::new(agent, store);

            let request = AnalysisRequest {
                query,
                language,
                max_steps,
                session_id: session,
                files: Vec::new(),
            };
            let response = service.submit(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Session { id } => {
            let messages = store.messages(&id).await?;
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
        Command::Sessions => {
            let sessions = store.list_all().await?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&tools.schemas())?);
        }
    }

    Ok(())
}
