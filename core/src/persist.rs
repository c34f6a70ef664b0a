use crate::error::{CoreError, Result};
use crate::index::{CorpusStats, DocStats, InvertedIndex};
use crate::pagerank::PageRank;
use crate::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const ARTIFACT_VERSION: u32 = 1;

/// Provenance written next to the artifacts. Not needed to serve queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub created_at: String,
    pub version: u32,
    pub title_weight: usize,
}

/// File layout of an artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn documents(&self) -> PathBuf { self.root.join("documents.json") }
    pub fn index(&self) -> PathBuf { self.root.join("index.json") }
    pub fn doc_info(&self) -> PathBuf { self.root.join("doc_info.json") }
    pub fn stats(&self) -> PathBuf { self.root.join("stats.json") }
    pub fn pagerank(&self) -> PathBuf { self.root.join("pagerank.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Serialize to `<path>.tmp` and rename over `path`, so readers never see a
/// half-written file.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut w, value)?;
        w.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(name: &'static str, path: &Path) -> Result<T> {
    let f = File::open(path).map_err(|source| CoreError::MissingArtifact { name, path: path.to_path_buf(), source })?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|source| CoreError::CorruptArtifact { name, path: path.to_path_buf(), source })
}

/// Read a JSON array of documents. Missing ids are derived from the URL.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let mut docs: Vec<Document> = load_json("documents", path)?;
    for doc in docs.iter_mut().filter(|d| d.doc_id.is_empty()) {
        doc.doc_id = crate::doc_id_for_url(&doc.url);
    }
    Ok(docs)
}

pub fn save_documents(path: &Path, docs: &[Document]) -> Result<()> {
    save_json(path, docs)
}

pub fn save_meta(paths: &ArtifactPaths, meta: &IndexMeta) -> Result<()> {
    save_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &ArtifactPaths) -> Result<IndexMeta> {
    load_json("meta", &paths.meta())
}

/// Everything the query engine needs, built from one document snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub index: InvertedIndex,
    pub doc_stats: DocStats,
    pub corpus: CorpusStats,
    pub pagerank: PageRank,
}

impl ArtifactSet {
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        save_json(&paths.index(), &self.index)?;
        save_json(&paths.doc_info(), &self.doc_stats)?;
        save_json(&paths.stats(), &self.corpus)?;
        save_json(&paths.pagerank(), &self.pagerank)?;
        Ok(())
    }

    /// Load and cross-check all four artifacts. Any absent, unreadable or
    /// mutually inconsistent file is an error; there is no partial load.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let set = Self {
            index: load_json("index", &paths.index())?,
            doc_stats: load_json("doc_info", &paths.doc_info())?,
            corpus: load_json("stats", &paths.stats())?,
            pagerank: load_json("pagerank", &paths.pagerank())?,
        };
        set.validate()?;
        tracing::info!(
            root = %paths.root.display(),
            total_docs = set.corpus.total_docs,
            vocab_size = set.corpus.vocab_size,
            "artifacts loaded"
        );
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        if self.doc_stats.is_empty() {
            return Err(CoreError::EmptyCorpus);
        }
        if self.corpus.total_docs != self.doc_stats.len() {
            return Err(CoreError::InconsistentArtifacts(format!(
                "stats report {} documents but doc_info has {}",
                self.corpus.total_docs,
                self.doc_stats.len()
            )));
        }
        if self.corpus.vocab_size != self.index.vocab_size() {
            return Err(CoreError::InconsistentArtifacts(format!(
                "stats report {} terms but the index has {}",
                self.corpus.vocab_size,
                self.index.vocab_size()
            )));
        }
        for (term, postings) in self.index.iter() {
            if let Some((doc_id, _)) = postings.iter().find(|(d, f)| **f == 0 || !self.doc_stats.contains_key(d.as_str())) {
                return Err(CoreError::InconsistentArtifacts(format!(
                    "posting for term {term:?} references unknown document {doc_id} or has zero frequency"
                )));
            }
        }
        if self.pagerank.len() != self.doc_stats.len() {
            return Err(CoreError::InconsistentArtifacts(format!(
                "pagerank has {} entries but doc_info has {}",
                self.pagerank.len(),
                self.doc_stats.len()
            )));
        }
        if let Some(doc_id) = self.pagerank.keys().find(|d| !self.doc_stats.contains_key(d.as_str())) {
            return Err(CoreError::InconsistentArtifacts(format!(
                "pagerank scores unknown document {doc_id}; it was built from another snapshot"
            )));
        }
        if let Some((doc_id, score)) = self.pagerank.iter().find(|(_, s)| !(0.0..=1.0).contains(*s)) {
            return Err(CoreError::InconsistentArtifacts(format!("pagerank {score} for {doc_id} is outside [0, 1]")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocStat;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_reported_by_name() {
        let dir = tempdir().unwrap();
        let err = ArtifactSet::load(&ArtifactPaths::new(dir.path())).unwrap_err();
        assert!(matches!(err, CoreError::MissingArtifact { name: "index", .. }));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        fs::write(paths.index(), b"{not json").unwrap();
        let err = ArtifactSet::load(&paths).unwrap_err();
        assert!(matches!(err, CoreError::CorruptArtifact { name: "index", .. }));
    }

    #[test]
    fn documents_without_ids_get_derived_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");
        fs::write(&path, r#"[{"url":"https://a.test/","title":"A","text":"body","outlinks":[]}]"#).unwrap();
        let docs = load_documents(&path).unwrap();
        assert_eq!(docs[0].doc_id, crate::doc_id_for_url("https://a.test/"));
    }

    #[test]
    fn inconsistent_counts_are_rejected() {
        let mut doc_stats = DocStats::new();
        doc_stats.insert("x".into(), DocStat { url: "https://x.test/".into(), title: String::new(), length: 0 });
        let set = ArtifactSet {
            index: InvertedIndex::new(),
            doc_stats,
            corpus: CorpusStats { total_docs: 2, avg_doc_length: 0.0, vocab_size: 0 },
            pagerank: PageRank::new(),
        };
        assert!(matches!(set.validate(), Err(CoreError::InconsistentArtifacts(_))));
    }

    fn one_doc_set() -> ArtifactSet {
        let docs = vec![Document::new("https://a.test/", "A", "alpha", vec![])];
        crate::pipeline::build_artifacts(&docs, &crate::IndexConfig::default(), &crate::PageRankConfig::default())
            .unwrap()
            .artifacts
    }

    #[test]
    fn pagerank_from_another_snapshot_is_rejected() {
        let mut set = one_doc_set();
        assert!(set.validate().is_ok());

        set.pagerank = PageRank::from([("ghost".to_string(), 1.0)]);
        assert!(matches!(set.validate(), Err(CoreError::InconsistentArtifacts(_))));

        let mut set = one_doc_set();
        set.pagerank.insert("ghost".into(), 0.5);
        assert!(matches!(set.validate(), Err(CoreError::InconsistentArtifacts(_))));

        let mut set = one_doc_set();
        set.pagerank.clear();
        assert!(matches!(set.validate(), Err(CoreError::InconsistentArtifacts(_))));
    }

    #[test]
    fn stale_pagerank_file_fails_the_load() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        one_doc_set().save(&paths).unwrap();
        save_json(&paths.pagerank(), &PageRank::from([("ghost".to_string(), 1.0)])).unwrap();
        let err = ArtifactSet::load(&paths).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentArtifacts(_)));
    }
}
