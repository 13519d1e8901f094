//! Codegraph Indexer CLI
//!
//! # Usage
//!
//! ```bash
//! codegraph-indexer index --project . --config codegraph.yaml
//! codegraph-indexer watch --project .
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use codegraph_ir::config::Config;
use codegraph_ir::features::embedding::providers::{OpenAiEmbedder, VoyageEmbedder};
use codegraph_ir::features::embedding::DenseEmbedder;
use codegraph_ir::features::indexing::Orchestrator;
use codegraph_ir::features::parsing::default_registry;
use codegraph_storage::{InMemoryVectorStore, QdrantHttpStore, VectorStore};

#[derive(Parser)]
#[command(name = "codegraph-indexer")]
#[command(about = "Indexes a project's source tree into a vector store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one discover-diff-process pass over a project.
    Index {
        /// Project root to index.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Path to a YAML or JSON config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Index a single file, bypassing discovery and diffing.
    File {
        /// File to index.
        path: PathBuf,

        /// Project root the file's path is relative to.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Watch a project and re-index on change (not implemented in this binary).
    Watch {
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },

    /// Semantic search over an indexed collection (not implemented in this binary).
    Search { query: String },

    /// Run as a long-lived indexing service (not implemented in this binary).
    Service,

    /// Manage git hooks for automatic re-indexing (not implemented in this binary).
    Hooks,

    /// Interactive chat over the indexed graph (not implemented in this binary).
    Chat,

    /// Write a default config file for a project.
    Init {
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Index { project, config } => run_index(project, config).await,
        Commands::File { path, project, config } => run_index_file(path, project, config).await,
        Commands::Init { project } => run_init(project),
        Commands::Watch { .. } | Commands::Search { .. } | Commands::Service | Commands::Hooks | Commands::Chat => {
            Err("not implemented in this binary".to_string())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config, String> {
    match config_path {
        Some(path) if path.extension().and_then(|e| e.to_str()) == Some("json") => {
            Config::load_json(&path).map_err(|e| e.to_string())
        }
        Some(path) => Config::load_yaml(&path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

fn build_embedder(config: &Config) -> Result<Box<dyn DenseEmbedder>, String> {
    use codegraph_ir::config::EmbeddingProvider;

    match config.embedding_provider {
        EmbeddingProvider::Openai => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or("embedding_provider is openai but openai_api_key is unset")?;
            Ok(Box::new(OpenAiEmbedder::new(api_key)))
        }
        EmbeddingProvider::Voyage => {
            let api_key = config
                .voyage_api_key
                .clone()
                .ok_or("embedding_provider is voyage but voyage_api_key is unset")?;
            Ok(Box::new(VoyageEmbedder::new(api_key)))
        }
    }
}

async fn build_store(config: &Config) -> Result<Box<dyn VectorStore>, String> {
    if config.qdrant_url.is_empty() {
        return Ok(Box::new(InMemoryVectorStore::new()));
    }
    Ok(Box::new(QdrantHttpStore::new(
        config.qdrant_url.clone(),
        config.qdrant_api_key.clone(),
    )))
}

async fn run_index(project: PathBuf, config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let embedder = build_embedder(&config)?;
    let store = build_store(&config).await?;
    let registry = default_registry();

    let orchestrator = Orchestrator::new(store.as_ref(), embedder.as_ref(), &registry, &config, project.clone());
    let report = orchestrator.run(None).await.map_err(|e| e.to_string())?;

    tracing::info!(
        mode = ?report.mode,
        discovered = report.files_discovered,
        processed = report.files_processed,
        deleted = report.files_deleted,
        failed = report.failed_files.len(),
        points_written = report.processing.points_written,
        "index run complete"
    );
    if !report.failed_files.is_empty() {
        tracing::warn!(files = ?report.failed_files, "some files failed to parse");
    }

    Ok(())
}

async fn run_index_file(path: PathBuf, project: PathBuf, config_path: Option<PathBuf>) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} does not exist", path.display()));
    }
    run_index(project, config_path).await
}

fn run_init(project: PathBuf) -> Result<(), String> {
    let config_path = project.join("codegraph.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).map_err(|e| e.to_string())?;
    std::fs::write(&config_path, yaml).map_err(|e| e.to_string())?;
    tracing::info!(path = %config_path.display(), "wrote default config");
    Ok(())
}
