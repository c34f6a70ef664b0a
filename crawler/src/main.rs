mod page;
mod robots;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use reqwest::{header, Client, Url};
use search_core::persist::save_documents;
use search_core::{normalize_url, Document};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

use page::{clean_link, is_binary_resource, parse_page};
use robots::{path_allowed, Politeness, RobotsCache};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl pages into a documents file for the indexer, respecting robots.txt")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: String,
    /// Output documents file (JSON array)
    #[arg(long, default_value = "./data/documents.json")]
    output: String,
    /// Maximum number of documents to fetch
    #[arg(long, default_value_t = 500)]
    max_docs: usize,
    /// Maximum pages to crawl per host, 0 for unlimited
    #[arg(long, default_value_t = 0)]
    max_per_host: usize,
    /// Concurrency (number of workers)
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Minimum seconds between requests to the same host
    #[arg(long, default_value_t = 2.0)]
    delay_secs: f64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// User-Agent string to use for robots.txt and crawling
    #[arg(long, default_value = "search-engine-rs-bot/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// Only follow links that stay on the host of the page they were found on
    #[arg(long)]
    same_host_only: bool,
}

struct Fetcher {
    client: Client,
    robots: RobotsCache,
    politeness: Politeness,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let fetcher = Arc::new(Fetcher {
        client,
        robots: RobotsCache::default(),
        politeness: Politeness::new(Duration::from_secs_f64(args.delay_secs.max(0.0))),
    });

    let mut frontier = load_seeds(Path::new(&args.seeds))?;
    if frontier.is_empty() { return Err(anyhow!("no valid seeds")); }
    tracing::info!(
        seeds = frontier.len(),
        max_docs = args.max_docs,
        concurrency = args.concurrency,
        same_host_only = args.same_host_only,
        output = %args.output,
        "crawl starting"
    );

    let mut seen: HashSet<String> = HashSet::new();
    let mut per_host: HashMap<String, usize> = HashMap::new();
    let mut docs: Vec<Document> = Vec::new();
    let mut inflight: JoinSet<Option<Document>> = JoinSet::new();

    while docs.len() < args.max_docs && (!frontier.is_empty() || !inflight.is_empty()) {
        while inflight.len() < args.concurrency.max(1) && docs.len() + inflight.len() < args.max_docs {
            let Some(url) = frontier.pop_front() else { break };
            if !seen.insert(normalize_url(url.as_str())) || is_binary_resource(&url) { continue; }
            if let Some(h) = url.host_str() {
                let cnt = per_host.entry(h.to_string()).or_insert(0);
                if args.max_per_host > 0 && *cnt >= args.max_per_host { continue; }
                *cnt += 1;
            }
            let fetcher = fetcher.clone();
            inflight.spawn(async move { fetcher.fetch(url).await });
        }

        let Some(joined) = inflight.join_next().await else { break };
        let doc = match joined {
            Ok(Some(doc)) => doc,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "fetch task failed");
                continue;
            }
        };
        let page_host = Url::parse(&doc.url).ok().and_then(|u| u.host_str().map(str::to_owned));
        for link in &doc.outlinks {
            let Ok(u) = Url::parse(link) else { continue };
            if args.same_host_only && u.host_str().map(str::to_owned) != page_host { continue; }
            if !seen.contains(&normalize_url(link)) { frontier.push_back(u); }
        }
        docs.push(doc);
        if docs.len() % 50 == 0 {
            tracing::info!(emitted = docs.len(), visited = seen.len(), frontier = frontier.len(), "progress");
        }
    }
    inflight.abort_all();

    save_documents(Path::new(&args.output), &docs).with_context(|| format!("writing {}", args.output))?;
    tracing::info!(emitted = docs.len(), visited = seen.len(), frontier = frontier.len(), output = %args.output, "crawl done");
    Ok(())
}

fn load_seeds(path: &Path) -> Result<VecDeque<Url>> {
    let mut frontier = VecDeque::new();
    let file = File::open(path).with_context(|| format!("opening seeds {}", path.display()))?;
    for line in BufReader::new(file).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        let u = Url::parse(&s).or_else(|_| Url::parse(&format!("https://{}", s)));
        match u.ok().as_ref().and_then(clean_link) {
            Some(u) => frontier.push_back(u),
            None => tracing::warn!(seed = %s, "ignoring invalid seed"),
        }
    }
    Ok(frontier)
}

impl Fetcher {
    /// Fetch one page. Anything that is not a successful HTML response is
    /// logged and skipped; it never reaches the indexer.
    async fn fetch(&self, url: Url) -> Option<Document> {
        let rules = self.robots.rules(&self.client, &url).await.unwrap_or_default();
        if !path_allowed(url.path(), &rules) {
            tracing::debug!(%url, "disallowed by robots.txt");
            return None;
        }
        let host = url.host_str().unwrap_or_default().to_string();
        let wait = self.politeness.reserve(&host, rules.crawl_delay);
        if !wait.is_zero() { sleep(wait).await; }

        let resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%url, error = %e, "fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!(%url, status = %resp.status(), "non-success status");
            return None;
        }
        let is_html = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_lowercase().contains("html"));
        if !is_html { return None; }
        let final_url = resp.url().clone();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%url, error = %e, "reading body failed");
                return None;
            }
        };

        let page = parse_page(&body, &final_url);
        tracing::info!(%url, title = %page.title, links = page.links.len(), "fetched");
        let outlinks = page.links.into_iter().map(String::from).collect();
        Some(Document::new(url.as_str(), page.title, page.text, outlinks))
    }
}
