use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use search_core::index::DEFAULT_TITLE_WEIGHT;
use search_core::persist::{load_documents, load_meta, save_meta, ARTIFACT_VERSION};
use search_core::{build_artifacts, ArtifactPaths, ArtifactSet, Document, IndexConfig, IndexMeta, PageRankConfig};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index, link graph and PageRank artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageRankArgs {
    /// Probability of following a link rather than jumping
    #[arg(long, default_value_t = 0.85)]
    damping: f64,
    /// L1 change below which iteration stops
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,
    /// Iteration cap
    #[arg(long, default_value_t = 100)]
    max_iterations: usize,
}

impl From<&PageRankArgs> for PageRankConfig {
    fn from(a: &PageRankArgs) -> Self {
        PageRankConfig { damping: a.damping, tolerance: a.tolerance, max_iterations: a.max_iterations }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build every artifact from a documents file (JSON array or JSONL) or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output artifact directory
        #[arg(long)]
        output: String,
        /// How many times the title is repeated ahead of the body
        #[arg(long, default_value_t = DEFAULT_TITLE_WEIGHT)]
        title_weight: usize,
        #[command(flatten)]
        pagerank: PageRankArgs,
    },
    /// Load an artifact directory, validate it and print its statistics
    Inspect {
        #[arg(long)]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, title_weight, pagerank } => {
            build(&input, &output, title_weight, &PageRankConfig::from(&pagerank))
        }
        Commands::Inspect { index } => inspect(&index),
    }
}

fn build(input: &str, output: &str, title_weight: usize, pagerank: &PageRankConfig) -> Result<()> {
    let docs = read_documents(Path::new(input))?;
    tracing::info!(num_docs = docs.len(), input, "read documents");

    let report = build_artifacts(&docs, &IndexConfig { title_weight }, pagerank)
        .with_context(|| format!("building artifacts from {input}"))?;
    tracing::info!(
        nodes = report.graph_nodes,
        edges = report.graph_edges,
        iterations = report.pagerank_iterations,
        converged = report.pagerank_converged,
        "ranking artifacts computed"
    );

    let paths = ArtifactPaths::new(output);
    report.artifacts.save(&paths).with_context(|| format!("writing artifacts to {output}"))?;
    let meta = IndexMeta {
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
        version: ARTIFACT_VERSION,
        title_weight,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(output, total_docs = report.artifacts.corpus.total_docs, vocab_size = report.artifacts.corpus.vocab_size, "index build complete");
    Ok(())
}

fn inspect(index: &str) -> Result<()> {
    let paths = ArtifactPaths::new(index);
    let set = ArtifactSet::load(&paths).with_context(|| format!("loading artifacts from {index}"))?;
    let meta = load_meta(&paths).ok();
    let summary = serde_json::json!({
        "stats": set.corpus,
        "pagerank_entries": set.pagerank.len(),
        "meta": meta,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// A single JSON/JSONL file, or every such file under a directory in path order.
fn read_documents(input: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            docs.extend(read_jsonl(&file)?);
        } else {
            docs.extend(load_documents(&file).with_context(|| format!("reading {}", file.display()))?);
        }
    }
    Ok(docs)
}

fn read_jsonl(file: &Path) -> Result<Vec<Document>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut docs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let mut doc: Document = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document", file.display(), lineno + 1))?;
        if doc.doc_id.is_empty() {
            doc.doc_id = search_core::doc_id_for_url(&doc.url);
        }
        docs.push(doc);
    }
    Ok(docs)
}
