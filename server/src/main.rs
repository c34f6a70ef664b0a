use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::scoring::{DEFAULT_B, DEFAULT_K1};
use search_core::RankingConfig;
use server::{build_app, AppOptions};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Artifact directory written by the indexer
    #[arg(long, default_value = "./data")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 5000)]
    port: u16,
    /// BM25 term-frequency saturation
    #[arg(long, env = "SEARCH_BM25_K1", default_value_t = DEFAULT_K1)]
    k1: f64,
    /// BM25 length normalization
    #[arg(long, env = "SEARCH_BM25_B", default_value_t = DEFAULT_B)]
    b: f64,
    /// Blend weight of the normalized BM25 score
    #[arg(long, env = "SEARCH_BM25_WEIGHT", default_value_t = 0.7)]
    bm25_weight: f64,
    /// Blend weight of the PageRank score
    #[arg(long, env = "SEARCH_PAGERANK_WEIGHT", default_value_t = 0.3)]
    pagerank_weight: f64,
    /// Token required by /admin/reload
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
    /// Comma-separated allowed origins
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let options = AppOptions {
        index_dir: args.index.clone().into(),
        ranking: RankingConfig { k1: args.k1, b: args.b, bm25_weight: args.bm25_weight, pagerank_weight: args.pagerank_weight },
        admin_token: args.admin_token,
        cors_allow_origin: args.cors_allow_origin,
    };
    let app: Router = build_app(options)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
