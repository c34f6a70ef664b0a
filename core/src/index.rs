use crate::error::{CoreError, Result};
use crate::tokenizer::tokenize;
use crate::{unique_documents, DocId, Document};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Title repetitions in the weighted text.
pub const DEFAULT_TITLE_WEIGHT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub title_weight: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { title_weight: DEFAULT_TITLE_WEIGHT }
    }
}

/// doc_id -> term frequency, ordered by doc_id.
pub type Postings = BTreeMap<DocId, u32>;

/// term -> postings. Frequencies are always >= 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    terms: BTreeMap<String, Postings>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn postings(&self, term: &str) -> Option<&Postings> {
        self.terms.get(term)
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, |p| p.len())
    }

    pub fn term_frequency(&self, term: &str, doc_id: &str) -> u32 {
        self.terms.get(term).and_then(|p| p.get(doc_id)).copied().unwrap_or(0)
    }

    pub fn vocab_size(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Postings)> {
        self.terms.iter()
    }

    fn add(&mut self, term: String, doc_id: &str, freq: u32) {
        if freq == 0 {
            return;
        }
        self.terms.entry(term).or_default().insert(doc_id.to_owned(), freq);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocStat {
    pub url: String,
    pub title: String,
    /// Weighted token count.
    pub length: u32,
}

pub type DocStats = BTreeMap<DocId, DocStat>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_docs: usize,
    pub avg_doc_length: f64,
    pub vocab_size: usize,
}

#[derive(Debug, Clone)]
pub struct IndexArtifacts {
    pub index: InvertedIndex,
    pub doc_stats: DocStats,
    pub corpus: CorpusStats,
}

/// Title repeated `title_weight` times, then the body.
pub fn weighted_text(doc: &Document, title_weight: usize) -> String {
    let mut out = String::with_capacity((doc.title.len() + 1) * title_weight + doc.text.len());
    for _ in 0..title_weight {
        out.push_str(&doc.title);
        out.push(' ');
    }
    out.push_str(&doc.text);
    out
}

/// Build the inverted index and statistics in one pass over the corpus.
///
/// Tokenization is fanned out per document; the frequency maps are then
/// merged serially in input order so the output does not depend on thread
/// scheduling.
pub fn build_index(docs: &[Document], config: &IndexConfig) -> Result<IndexArtifacts> {
    let docs = unique_documents(docs);
    if docs.is_empty() {
        return Err(CoreError::EmptyCorpus);
    }

    let counted: Vec<(&Document, HashMap<String, u32>, u32)> = docs
        .par_iter()
        .map(|doc| {
            let tokens = tokenize(&weighted_text(doc, config.title_weight));
            let length = tokens.len() as u32;
            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in tokens {
                *tf.entry(term).or_insert(0) += 1;
            }
            (*doc, tf, length)
        })
        .collect();

    let mut index = InvertedIndex::new();
    let mut doc_stats = DocStats::new();
    let mut total_length: u64 = 0;
    for (doc, tf, length) in counted {
        total_length += u64::from(length);
        for (term, freq) in tf {
            index.add(term, &doc.doc_id, freq);
        }
        doc_stats.insert(doc.doc_id.clone(), DocStat { url: doc.url.clone(), title: doc.title.clone(), length });
    }

    let total_docs = doc_stats.len();
    let corpus = CorpusStats {
        total_docs,
        avg_doc_length: total_length as f64 / total_docs as f64,
        vocab_size: index.vocab_size(),
    };
    tracing::info!(total_docs, vocab_size = corpus.vocab_size, avg_doc_length = corpus.avg_doc_length, "inverted index built");
    Ok(IndexArtifacts { index, doc_stats, corpus })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("https://a.test/", "Rust Guide", "Ownership and borrowing in rust.", vec![]),
            Document::new("https://b.test/", "Python", "Python has a garbage collector.", vec![]),
            Document::new("https://c.test/", "", "", vec![]),
        ]
    }

    #[test]
    fn title_counts_three_times() {
        let built = build_index(&corpus(), &IndexConfig::default()).unwrap();
        let a = &corpus()[0].doc_id;
        // title "rust guide" x3 plus one body "rust"
        assert_eq!(built.index.term_frequency("rust", a), 4);
        assert_eq!(built.index.term_frequency("guide", a), 3);
        assert_eq!(built.index.term_frequency("ownership", a), 1);
        assert_eq!(built.doc_stats[a].length, 3 * 2 + 3);
    }

    #[test]
    fn lengths_match_posting_sums() {
        let docs = corpus();
        let built = build_index(&docs, &IndexConfig::default()).unwrap();
        for doc in &docs {
            let sum: u32 = built.index.iter().filter_map(|(_, p)| p.get(&doc.doc_id)).sum();
            assert_eq!(sum, built.doc_stats[&doc.doc_id].length);
        }
        assert!(built.index.iter().all(|(_, p)| p.values().all(|&f| f >= 1)));
    }

    #[test]
    fn corpus_statistics() {
        let built = build_index(&corpus(), &IndexConfig::default()).unwrap();
        assert_eq!(built.corpus.total_docs, 3);
        assert_eq!(built.corpus.vocab_size, built.index.vocab_size());
        let total: u32 = built.doc_stats.values().map(|s| s.length).sum();
        assert!((built.corpus.avg_doc_length - f64::from(total) / 3.0).abs() < 1e-12);
        assert_eq!(built.doc_stats[&corpus()[2].doc_id].length, 0);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        assert!(matches!(build_index(&[], &IndexConfig::default()), Err(CoreError::EmptyCorpus)));
    }

    #[test]
    fn configurable_title_weight() {
        let built = build_index(&corpus(), &IndexConfig { title_weight: 1 }).unwrap();
        assert_eq!(built.index.term_frequency("guide", &corpus()[0].doc_id), 1);
    }
}
