mod http;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use docuai_core::{
    AskRequest, CharacterNgramEmbedder, Embedder, GroqProvider, HuggingFaceEmbedder,
    InMemoryStore, LopdfExtractor, RagOptions, RagService, SupabaseStore, UploadStaging,
    VectorStore, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_GROQ_BASE_URL,
    DEFAULT_HF_ENDPOINT, DEFAULT_QUERY_NAME, DEFAULT_TABLE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbeddingBackend {
    Huggingface,
    Ngram,
}

#[derive(Parser)]
#[command(name = "docuai", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend
    #[arg(long, env = "VECTOR_STORE", value_enum, default_value_t = StoreBackend::Supabase)]
    vector_store: StoreBackend,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,

    /// Table holding chunk rows
    #[arg(long, env = "SUPABASE_TABLE", default_value = DEFAULT_TABLE)]
    supabase_table: String,

    /// Stored function used for similarity search
    #[arg(long, env = "SUPABASE_QUERY_NAME", default_value = DEFAULT_QUERY_NAME)]
    supabase_query_name: String,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, value_parser = non_empty)]
    groq_api_key: String,

    /// Groq OpenAI-compatible base URL
    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_GROQ_BASE_URL)]
    groq_base_url: String,

    /// Chat completion model
    #[arg(long, env = "COMPLETION_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    completion_model: String,

    /// Embedding backend
    #[arg(long, env = "EMBEDDING_PROVIDER", value_enum, default_value_t = EmbeddingBackend::Huggingface)]
    embedding_provider: EmbeddingBackend,

    /// Embedding model identifier
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Feature-extraction endpoint base
    #[arg(long, env = "EMBEDDING_ENDPOINT", default_value = DEFAULT_HF_ENDPOINT)]
    embedding_endpoint: String,

    /// Hugging Face access token
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    hf_api_token: Option<String>,

    /// Reject embeddings of any other length
    #[arg(long, env = "EMBEDDING_DIMENSIONS")]
    embedding_dimensions: Option<usize>,

    /// Directory for transient upload copies
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: String,
        /// Largest accepted request body in bytes
        #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
        max_upload_bytes: usize,
    },
    /// Ingest every PDF under a folder.
    Ingest {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
        /// Category stored with every chunk.
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags stored with every chunk.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Ask one question and print the answer with its sources.
    Ask {
        #[arg(long)]
        question: String,
    },
}

fn non_empty(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("value must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn required(value: &Option<String>, name: &str) -> anyhow::Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("{name} environment variable is required"),
    }
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(match cli.embedding_provider {
        EmbeddingBackend::Huggingface => Arc::new(HuggingFaceEmbedder::new(
            &cli.embedding_endpoint,
            cli.embedding_model.clone(),
            cli.hf_api_token.clone().filter(|token| !token.trim().is_empty()),
            cli.embedding_dimensions,
        )?),
        EmbeddingBackend::Ngram => Arc::new(CharacterNgramEmbedder {
            dimensions: cli
                .embedding_dimensions
                .unwrap_or(docuai_core::DEFAULT_EMBEDDING_DIMENSIONS),
        }),
    })
}

fn build_store(cli: &Cli, embedder: Arc<dyn Embedder>) -> anyhow::Result<Arc<dyn VectorStore>> {
    Ok(match cli.vector_store {
        StoreBackend::Supabase => {
            let url = required(&cli.supabase_url, "SUPABASE_URL")?;
            let key = required(&cli.supabase_key, "SUPABASE_KEY")?;
            Arc::new(SupabaseStore::new(
                &url,
                key,
                cli.supabase_table.clone(),
                cli.supabase_query_name.clone(),
                embedder,
            )?)
        }
        StoreBackend::Memory => {
            warn!("using in-memory vector store; uploads are lost on exit");
            Arc::new(InMemoryStore::new(embedder))
        }
    })
}

fn build_service(cli: &Cli) -> anyhow::Result<RagService> {
    let embedder = build_embedder(cli)?;
    let store = build_store(cli, embedder.clone())?;
    let completion = GroqProvider::new(cli.groq_api_key.clone(), &cli.groq_base_url)?;

    info!(
        vector_store = ?cli.vector_store,
        embedding_model = embedder.model_name(),
        completion_model = %cli.completion_model,
        "providers configured"
    );

    Ok(RagService::new(
        Arc::new(LopdfExtractor::default()),
        store,
        Arc::new(completion),
        UploadStaging::new(&cli.upload_dir),
        RagOptions {
            model: cli.completion_model.clone(),
            ..RagOptions::default()
        },
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let service = Arc::new(build_service(&cli)?);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docuai boot"
    );

    match cli.command {
        Command::Serve {
            bind,
            max_upload_bytes,
        } => {
            let app = http::router(service, max_upload_bytes);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            info!(bind = %bind, "listening");
            axum::serve(listener, app).await?;
        }
        Command::Ingest {
            folder,
            category,
            tags,
        } => {
            let report = service.ingest_folder(&folder, category, tags).await?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder.display()
                );
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
                }
            }

            for document in &report.documents {
                println!(
                    "{} chunks from {} (category={}, tags=[{}])",
                    document.chunk_count,
                    document.filename,
                    document.category,
                    document.tags.join(", ")
                );
            }
            println!(
                "{} chunks ingested from {} documents at {}",
                report.chunk_count(),
                report.documents.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask { question } => {
            let answer = service
                .ask(AskRequest {
                    question,
                    history: Vec::new(),
                })
                .await?;

            println!("{}", answer.answer);
            for source in answer.sources {
                println!("  source: {source}");
            }
        }
    }

    Ok(())
}
