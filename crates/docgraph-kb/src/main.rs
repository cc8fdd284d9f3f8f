//! Command line entry point of the document knowledge graph.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use docgraph_kb::{
    adapters::{Neo4jConnector, OpenAiCompletionClient},
    init_tracing, CompletionClient, KgConfig, KnowledgeGraph,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `schema.txt`, `queries/` and `prompts/` (overrides KG_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct ExtractArgs {
    /// Chat model used for extraction
    #[arg(long, default_value = "gpt-4")]
    model: String,

    /// Prompt file prefix under `prompts/`
    #[arg(long, default_value = "generic_v4")]
    prompt_version: String,

    /// Completion token limit (defaults to KG_MAX_TOKENS)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// File with the query selecting documents; defaults to `queries/documents.txt`
    #[arg(long)]
    data_query_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create constraints and indices
    #[command(name = "init-indices")]
    InitIndices,

    /// Store a directory of JSON documents
    Ingest {
        /// Root of the document tree
        dir: PathBuf,
    },

    /// Run LLM extraction over the stored documents
    Extract(ExtractArgs),

    /// Rebuild the knowledge layer
    #[command(name = "build-layer")]
    BuildLayer,

    /// All steps in order
    Run {
        /// Root of the document tree
        dir: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = KgConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.config_dir {
        config.config_dir = dir;
    }

    let needs_llm = matches!(cli.command, Commands::Extract(_) | Commands::Run { .. });
    let completion: Option<Arc<dyn CompletionClient>> = if needs_llm {
        let api_key = config.openai.require_api_key()?;
        let client = match &config.openai.api_base {
            Some(base) => OpenAiCompletionClient::with_api_base(api_key, base),
            None => OpenAiCompletionClient::new(api_key),
        };
        Some(Arc::new(client))
    } else {
        None
    };

    let connector = Arc::new(Neo4jConnector::new(config.neo4j.clone()));
    let kg = KnowledgeGraph::new(
        connector,
        completion,
        config.config_dir.clone(),
        config.pipeline.clone(),
    )
    .context("Failed to set up the knowledge graph")?;

    match cli.command {
        Commands::InitIndices => kg.initialise_indices().await?,
        Commands::Ingest { dir } => ingest(&kg, &dir).await?,
        Commands::Extract(args) => extract(&kg, &config, &args).await?,
        Commands::BuildLayer => build_layer(&kg).await?,
        Commands::Run { dir, extract: args } => {
            kg.initialise_indices().await?;
            ingest(&kg, &dir).await?;
            extract(&kg, &config, &args).await?;
            build_layer(&kg).await?;
        }
    }
    Ok(())
}

async fn ingest(kg: &KnowledgeGraph, dir: &Path) -> Result<()> {
    let report = kg.ingest_data(dir).await?;
    if !report.has_files() {
        warn!("No documents found under {}", dir.display());
    }
    info!(?report, "Ingestion done");
    Ok(())
}

async fn extract(kg: &KnowledgeGraph, config: &KgConfig, args: &ExtractArgs) -> Result<()> {
    let query_file = args
        .data_query_file
        .clone()
        .unwrap_or_else(|| kg.config_dir().join("queries").join("documents.txt"));
    let data_query = std::fs::read_to_string(&query_file)
        .with_context(|| format!("Failed to read data query {}", query_file.display()))?;

    let max_tokens = args.max_tokens.unwrap_or(config.pipeline.max_tokens);
    let report = kg
        .extract_knowledge(&data_query, &args.model, &args.prompt_version, max_tokens)
        .await?;
    info!(?report, "Extraction done");
    Ok(())
}

async fn build_layer(kg: &KnowledgeGraph) -> Result<()> {
    let n_rels = kg.create_knowledge_layer().await?;
    if n_rels == 0 {
        warn!("The knowledge layer has no relationships; check schema.txt against the extracted labels");
    }
    Ok(())
}
