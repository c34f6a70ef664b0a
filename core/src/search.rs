use crate::index::{CorpusStats, DocStats, InvertedIndex};
use crate::pagerank::PageRank;
use crate::persist::ArtifactSet;
use crate::scoring::{bm25_idf, bm25_term_score, min_max_normalize, DEFAULT_B, DEFAULT_K1};
use crate::tokenizer::tokenize;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub k1: f64,
    pub b: f64,
    /// Weight of the normalized BM25 score in the blend.
    pub bm25_weight: f64,
    /// Weight of the PageRank score in the blend.
    pub pagerank_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { k1: DEFAULT_K1, b: DEFAULT_B, bm25_weight: 0.7, pagerank_weight: 0.3 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub combined_score: f64,
    /// BM25 after min-max normalization over the candidate set.
    pub bm25_component: f64,
    pub pagerank_component: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<ScoredResult>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub length: u32,
    pub pagerank: f64,
}

/// Read-only query service over one artifact set.
///
/// Nothing is mutated after construction, so a shared reference can serve
/// any number of concurrent searches.
#[derive(Debug)]
pub struct SearchEngine {
    index: InvertedIndex,
    doc_stats: DocStats,
    corpus: CorpusStats,
    pagerank: PageRank,
    config: RankingConfig,
}

impl SearchEngine {
    pub fn new(artifacts: ArtifactSet, config: RankingConfig) -> Self {
        let ArtifactSet { index, doc_stats, corpus, pagerank } = artifacts;
        Self { index, doc_stats, corpus, pagerank, config }
    }

    pub fn corpus_stats(&self) -> &CorpusStats { &self.corpus }

    pub fn config(&self) -> &RankingConfig { &self.config }

    pub fn document(&self, doc_id: &str) -> Option<DocumentView> {
        let stat = self.doc_stats.get(doc_id)?;
        Some(DocumentView {
            doc_id: doc_id.to_owned(),
            url: stat.url.clone(),
            title: stat.title.clone(),
            length: stat.length,
            pagerank: self.pagerank.get(doc_id).copied().unwrap_or(0.0),
        })
    }

    /// Rank documents for `query`, best first, at most `top_k` of them.
    ///
    /// Queries with no indexable terms, or whose terms are all unknown,
    /// return an empty list.
    pub fn search(&self, query: &str, top_k: usize) -> SearchOutcome {
        let start = Instant::now();
        let results = self.rank(query, top_k);
        let elapsed = start.elapsed();
        tracing::debug!(query, hits = results.len(), elapsed_us = elapsed.as_micros() as u64, "search");
        SearchOutcome { results, elapsed }
    }

    fn rank(&self, query: &str, top_k: usize) -> Vec<ScoredResult> {
        let terms = tokenize(query);
        if terms.is_empty() || top_k == 0 {
            return Vec::new();
        }

        // Repeated query terms count once per occurrence.
        let mut query_tf: BTreeMap<&str, f64> = BTreeMap::new();
        for term in &terms {
            *query_tf.entry(term.as_str()).or_insert(0.0) += 1.0;
        }

        let RankingConfig { k1, b, bm25_weight, pagerank_weight } = self.config;
        let avg_len = self.corpus.avg_doc_length;
        let mut bm25: BTreeMap<&str, f64> = BTreeMap::new();
        for (term, qtf) in query_tf {
            let Some(postings) = self.index.postings(term) else { continue };
            let idf = bm25_idf(postings.len(), self.corpus.total_docs);
            for (doc_id, &tf) in postings {
                let Some(stat) = self.doc_stats.get(doc_id) else { continue };
                let s = bm25_term_score(f64::from(tf), idf, f64::from(stat.length), avg_len, k1, b);
                *bm25.entry(doc_id.as_str()).or_insert(0.0) += qtf * s;
            }
        }
        if bm25.is_empty() {
            return Vec::new();
        }

        let raw: Vec<f64> = bm25.values().copied().collect();
        let mut ranked: Vec<ScoredResult> = bm25
            .keys()
            .zip(min_max_normalize(&raw))
            .filter_map(|(&doc_id, bm25_norm)| {
                let stat = self.doc_stats.get(doc_id)?;
                let pr = self.pagerank.get(doc_id).copied().unwrap_or(0.0);
                Some(ScoredResult {
                    doc_id: doc_id.to_owned(),
                    url: stat.url.clone(),
                    title: stat.title.clone(),
                    combined_score: bm25_weight * bm25_norm + pagerank_weight * pr,
                    bm25_component: bm25_norm,
                    pagerank_component: pr,
                })
            })
            .collect();

        ranked.sort_by(|x, y| {
            y.combined_score
                .partial_cmp(&x.combined_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| x.doc_id.cmp(&y.doc_id))
        });
        ranked.truncate(top_k);
        ranked
    }
}
