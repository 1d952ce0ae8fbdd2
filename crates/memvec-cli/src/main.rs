//! memvec — query an in-memory vector store from the command line.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use memvec_core::{Query, ResultItem, RetrievalConfig};
use memvec_embed::{EmbeddingProvider, FixedEmbedder};
use memvec_retrieve::Retriever;
use ndarray::Array1;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod corpus;

use args::QueryArgs;

fn print_help() {
    println!("memvec — in-memory vector store");
    println!();
    println!("Usage: memvec <command>");
    println!();
    println!("Commands:");
    println!("  stats <corpus.jsonl>             Show record count and dimension");
    println!("  query <corpus.jsonl> [options]   Run similarity queries");
    println!("  help                             Show this help message");
    println!();
    println!("Query options:");
    println!("  --vector 1,0,...          Query with a raw vector");
    println!("  --text <query>            Query with text (repeatable; needs --embeddings)");
    println!("  --embeddings <file>       JSONL table of {{\"text\", \"embedding\"}}");
    println!("  --strategy <name>         topk | score | vector | mmr (default topk)");
    println!("  --k <n>                   Results per query");
    println!("  --fetch-k <n>             MMR candidate pool size");
    println!("  --lambda <x>              MMR relevance/diversity balance in [0, 1]");
    println!("  --filter key=value        Only match records with this metadata");
}

fn item_json(query: usize, item: &ResultItem) -> serde_json::Value {
    serde_json::json!({
        "query": query,
        "rank": item.rank,
        "id": item.record.id,
        "score": item.score,
        "content": item.record.content,
        "metadata": item.record.metadata,
    })
}

async fn run_query(args: QueryArgs) -> anyhow::Result<bool> {
    let config = RetrievalConfig::from_env()?;
    let store = Arc::new(corpus::load_corpus(&args.corpus)?);

    let provider: Arc<dyn EmbeddingProvider> = match &args.embeddings {
        Some(path) => Arc::new(corpus::load_embedding_table(path)?),
        None => Arc::new(FixedEmbedder::new(store.dimension().unwrap_or(0))),
    };
    let retriever = Retriever::new(store, provider, config)?;
    let strategy = args.to_strategy();

    let outcomes = match &args.vector {
        Some(vector) => {
            let query = Query::Vector(Array1::from(vector.clone()));
            vec![retriever.search(query, &strategy).await]
        }
        None => retriever.retrieve(args.texts.as_slice(), &strategy).await,
    };

    let mut all_ok = true;
    for (idx, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(items) => {
                for item in items {
                    println!("{}", item_json(idx, item));
                }
            }
            Err(e) => {
                all_ok = false;
                println!(
                    "{}",
                    serde_json::json!({ "query": idx, "error": e.to_string() })
                );
            }
        }
    }
    Ok(all_ok)
}

fn run_stats(path: &Path) -> anyhow::Result<()> {
    let store = corpus::load_corpus(path)?;
    println!("{}", serde_json::to_string_pretty(&store.stats())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("stats") => {
            let path = args.get(2).context("Usage: memvec stats <corpus.jsonl>")?;
            run_stats(Path::new(path))
        }
        Some("query") => {
            let query_args = QueryArgs::parse(&args[2..])?;
            info!("Querying {}", query_args.corpus.display());
            if !run_query(query_args).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some("--help") | Some("-h") | Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'memvec help' for usage.", other);
            std::process::exit(1);
        }
    }
}
