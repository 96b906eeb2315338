//! CLI interface for the vector database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flatvec::{Config, Engine, Metadata};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flatvec")]
#[command(about = "A minimal disk-backed vector database", long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Data directory; overrides `data_path` from the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert or update a vector
    Upsert {
        /// Vector ID
        id: String,
        /// Vector data as comma-separated values (e.g., "1.0,2.0,3.0")
        #[arg(short, long)]
        vector: String,
        /// Metadata as a JSON object (e.g., '{"label": "cat"}')
        #[arg(short, long)]
        metadata: Option<String>,
    },
    /// Search for similar vectors
    Search {
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        query: String,
        /// Number of results to return; defaults to `top_k` from the config
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Delete a vector
    Delete {
        /// Vector ID to delete
        id: String,
    },
    /// List all stored vectors
    List,
    /// Delete every vector and truncate the vector file
    Clear,
    /// Start the HTTP API server
    Serve {
        /// Address to bind to; defaults to the config's server host and port
        #[arg(long)]
        addr: Option<String>,
    },
}

fn parse_vector(s: &str) -> Result<Vec<f32>> {
    s.split(',')
        .map(|x| {
            x.trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid float: {}", x))
        })
        .collect()
}

fn upsert(engine: &Engine, id: &str, vector: &str, metadata: Option<String>) -> Result<()> {
    let metadata: Metadata = match metadata {
        Some(raw) => serde_json::from_str(&raw).context("metadata must be a JSON object")?,
        None => Metadata::new(),
    };
    let vector = parse_vector(vector)?;
    if engine.upsert(id, &vector, metadata)? {
        println!("Updated vector with ID: {}", id);
    } else {
        println!("Inserted vector with ID: {}", id);
    }
    Ok(())
}

fn search(engine: &Engine, query: &str, k: usize) -> Result<()> {
    let query = parse_vector(query)?;
    let results = engine.search_knn(&query, k)?;

    if results.is_empty() {
        println!("No results found");
    } else {
        println!("Top {} results:", results.len());
        for (i, result) in results.iter().enumerate() {
            println!("{}. {} (score: {:.4})", i + 1, result.id, result.score);
        }
    }
    Ok(())
}

fn list(engine: &Engine) -> Result<()> {
    let vectors = engine.scan_all()?;
    if vectors.is_empty() {
        println!("No vectors in store");
    } else {
        println!("Vectors ({} total):", vectors.len());
        for sv in vectors {
            println!("  - {} (dim {})", sv.id, sv.vector.len());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_path = data_dir;
    }

    let engine = Engine::open(&config.data_path, config.engine_config())
        .with_context(|| format!("failed to open data dir {}", config.data_path.display()))?;

    match cli.command {
        Commands::Upsert {
            id,
            vector,
            metadata,
        } => upsert(&engine, &id, &vector, metadata)?,
        Commands::Search { query, k } => search(&engine, &query, k.unwrap_or(config.top_k))?,
        Commands::Delete { id } => {
            if engine.delete(&id)? {
                println!("Deleted vector with ID: {}", id);
            } else {
                println!("No vector with ID: {}", id);
            }
        }
        Commands::List => list(&engine)?,
        Commands::Clear => {
            let removed = engine.delete_all()?;
            println!("Removed {} vectors", removed);
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr());
            flatvec::server::start(&addr, Arc::new(engine), &config).await?;
        }
    }
    Ok(())
}
