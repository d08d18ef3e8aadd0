mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use extract::{ExtractorOptions, SemanticExtractor};
use graph::{GraphStore, IngestOptions, IngestionEngine, MemoryStore, Neo4jStore};
use llm::{CachedCompletion, CompletionService, OllamaClient};
use query::{MultiHopRetriever, RetrieverOptions, Synthesizer, SynthesizerOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "semantic-graph-rag",
    version,
    about = "Typed knowledge-graph RAG over technical documentation"
)]
struct Cli {
    /// Use an in-memory graph store instead of Neo4j (state lives for one
    /// invocation; mostly useful with `demo`)
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the knowledge graph from a document corpus
    Ingest {
        /// Corpus directory (defaults to DOC_DIR)
        #[arg(long)]
        input_dir: Option<String>,

        /// Add to the existing graph instead of clearing it first
        #[arg(long)]
        keep_existing: bool,

        /// Stop after this many chunks
        #[arg(long)]
        max_chunks: Option<usize>,
    },
    /// Answer one question against the graph
    Ask { question: String },
    /// Ingest the corpus, then run the canned evaluation questions
    Demo {
        #[arg(long)]
        input_dir: Option<String>,

        #[arg(long, default_value_t = 20)]
        max_chunks: usize,
    },
    /// Print aggregate node and edge counts
    Stats,
}

/// Queries that exercised the system during development; `demo` replays
/// them after a fresh ingestion.
const DEMO_QUERIES: &[&str] = &[
    "What parameters should I check to optimize SAP HANA performance on VMware vSphere?",
    "Which components are involved in setting up SAP HANA and VMware according to best practice?",
    "What are the NUMA configuration recommendations for SAP HANA?",
    "How should I configure CPU affinity settings?",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let store = open_store(&config, cli.memory).await?;
    let service = completion_service(&config)?;

    match cli.command {
        Commands::Ingest {
            input_dir,
            keep_existing,
            max_chunks,
        } => {
            let dir = input_dir.unwrap_or_else(|| config.doc_dir.clone());
            run_ingest(&config, service, store, &dir, !keep_existing, max_chunks).await?;
        }
        Commands::Ask { question } => {
            let answer = run_question(&config, service, store, &question).await?;
            println!("{answer}");
        }
        Commands::Demo {
            input_dir,
            max_chunks,
        } => {
            let dir = input_dir.unwrap_or_else(|| config.doc_dir.clone());
            run_ingest(
                &config,
                service.clone(),
                store.clone(),
                &dir,
                true,
                Some(max_chunks),
            )
            .await?;

            for question in DEMO_QUERIES {
                println!("\n{}", "=".repeat(80));
                println!("QUERY: {question}");
                println!("{}", "=".repeat(80));

                // One failing question must not end the loop
                match run_question(&config, service.clone(), store.clone(), question).await {
                    Ok(answer) => println!("{answer}"),
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }

            print_stats(store.as_ref()).await?;
        }
        Commands::Stats => {
            print_stats(store.as_ref()).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &AppConfig, memory: bool) -> Result<Arc<dyn GraphStore>> {
    if memory {
        info!("using in-memory graph store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = Neo4jStore::connect(
        &config.neo4j_uri,
        &config.neo4j_username,
        &config.neo4j_password,
    )
    .await?;
    Ok(Arc::new(store))
}

fn completion_service(config: &AppConfig) -> Result<Arc<dyn CompletionService>> {
    let client = OllamaClient::new(config.ollama_base_url(), config.request_timeout())?;
    Ok(Arc::new(CachedCompletion::new(client, 10_000)))
}

async fn run_ingest(
    config: &AppConfig,
    service: Arc<dyn CompletionService>,
    store: Arc<dyn GraphStore>,
    input_dir: &str,
    clear_before_ingest: bool,
    max_chunks: Option<usize>,
) -> Result<()> {
    let chunks = ingest::load_corpus(Path::new(input_dir), &["txt", "md"])
        .await
        .context("Failed to load document corpus")?;

    let extractor = SemanticExtractor::new(
        service,
        ExtractorOptions {
            model: config.llm_model.clone(),
            ..Default::default()
        },
    );

    let engine = IngestionEngine::new(
        extractor,
        store,
        IngestOptions {
            clear_before_ingest,
            max_chunks,
        },
    );

    let report = engine.ingest(&chunks).await?;

    println!(
        "Usable extractions: {} of {} chunks ({} skipped, {} failed)",
        report.chunks_ingested,
        report.chunks_seen,
        report.chunks_skipped,
        report.chunks_failed.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_question(
    config: &AppConfig,
    service: Arc<dyn CompletionService>,
    store: Arc<dyn GraphStore>,
    question: &str,
) -> Result<String> {
    let retriever = MultiHopRetriever::new(store, RetrieverOptions::default());
    let fragments = retriever.retrieve(question).await?;
    info!(fragments = fragments.len(), "retrieved graph context");

    let synthesizer = Synthesizer::new(
        service,
        SynthesizerOptions {
            model: config.llm_model.clone(),
            ..Default::default()
        },
    );
    synthesizer.answer(question, &fragments).await
}

async fn print_stats(store: &dyn GraphStore) -> Result<()> {
    let stats = store.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
