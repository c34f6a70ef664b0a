//! Retrieval and ranking core: tokenizer, inverted index, link graph,
//! PageRank and the hybrid BM25 + authority query engine.

pub mod error;
pub mod graph;
pub mod index;
pub mod pagerank;
pub mod persist;
pub mod pipeline;
pub mod scoring;
pub mod search;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashSet;

pub use error::{CoreError, Result};
pub use graph::{normalize_url, LinkGraph};
pub use index::{build_index, CorpusStats, DocStat, DocStats, IndexArtifacts, IndexConfig, InvertedIndex};
pub use pagerank::{compute_pagerank, PageRank, PageRankConfig, PageRankOutcome};
pub use persist::{ArtifactPaths, ArtifactSet, IndexMeta};
pub use pipeline::{build_artifacts, BuildReport};
pub use search::{DocumentView, RankingConfig, ScoredResult, SearchEngine, SearchOutcome};

/// Hex SHA-1 of the document URL.
pub type DocId = String;

/// A crawled page as delivered by the acquisition stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub doc_id: DocId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub outlinks: Vec<String>,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: impl Into<String>, outlinks: Vec<String>) -> Self {
        let url = url.into();
        Self { doc_id: doc_id_for_url(&url), url, title: title.into(), text: text.into(), outlinks }
    }
}

/// Deterministic identifier for a URL; never looks at page content.
pub fn doc_id_for_url(url: &str) -> DocId {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Keeps the first document for every id, in input order.
pub fn unique_documents(docs: &[Document]) -> Vec<&Document> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(docs.len());
    let mut unique = Vec::with_capacity(docs.len());
    for doc in docs {
        if seen.insert(doc.doc_id.as_str()) {
            unique.push(doc);
        } else {
            tracing::warn!(doc_id = %doc.doc_id, url = %doc.url, "duplicate document id, keeping first occurrence");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_depends_only_on_url() {
        let a = Document::new("https://example.com/", "One", "first body", vec![]);
        let b = Document::new("https://example.com/", "Two", "other body", vec!["https://x.org/".into()]);
        assert_eq!(a.doc_id, b.doc_id);
        assert_eq!(a.doc_id.len(), 40);
        assert_ne!(a.doc_id, doc_id_for_url("https://example.com/other"));
    }

    #[test]
    fn duplicates_keep_first() {
        let docs = vec![
            Document::new("https://a.test/", "first", "", vec![]),
            Document::new("https://b.test/", "b", "", vec![]),
            Document::new("https://a.test/", "second", "", vec![]),
        ];
        let unique = unique_documents(&docs);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "first");
        assert_eq!(unique[1].title, "b");
    }
}
