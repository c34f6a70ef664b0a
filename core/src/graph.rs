use crate::error::{CoreError, Result};
use crate::{unique_documents, DocId, Document};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Canonical form used to match outlinks against document URLs: the
/// fragment is dropped. Strings that do not parse as absolute URLs are only
/// trimmed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_owned(),
    }
}

/// Simple directed graph over document ids.
///
/// Nodes live in an arena addressed by dense indices assigned in document
/// order; adjacency lists hold indices, so cycles need no special handling.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    nodes: Vec<DocId>,
    positions: HashMap<DocId, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    edge_count: usize,
}

impl LinkGraph {
    /// Build the graph from the corpus link structure. Links to URLs outside
    /// the corpus are dropped; repeated links collapse. A page linking to
    /// itself keeps that edge, so it counts toward its out-degree.
    pub fn build(docs: &[Document]) -> Result<Self> {
        let docs = unique_documents(docs);
        if docs.is_empty() {
            return Err(CoreError::EmptyCorpus);
        }

        let mut by_url: HashMap<String, usize> = HashMap::with_capacity(docs.len());
        for (idx, doc) in docs.iter().enumerate() {
            by_url.entry(normalize_url(&doc.url)).or_insert(idx);
        }

        let mut edges = Vec::new();
        for (from, doc) in docs.iter().enumerate() {
            for link in &doc.outlinks {
                if let Some(&to) = by_url.get(&normalize_url(link)) {
                    edges.push((from, to));
                }
            }
        }

        let graph = Self::from_edges(docs.iter().map(|d| d.doc_id.clone()).collect(), edges);
        tracing::info!(nodes = graph.node_count(), edges = graph.edge_count(), "link graph built");
        Ok(graph)
    }

    /// Assemble a graph from node ids and index pairs. Out-of-range pairs are
    /// skipped, duplicates collapse.
    pub fn from_edges(nodes: Vec<DocId>, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let n = nodes.len();
        let positions = nodes.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut edge_count = 0;
        for (from, to) in edges {
            if from >= n || to >= n || !seen.insert((from, to)) {
                continue;
            }
            outgoing[from].push(to);
            incoming[to].push(from);
            edge_count += 1;
        }
        for list in incoming.iter_mut() {
            list.sort_unstable();
        }
        Self { nodes, positions, outgoing, incoming, edge_count }
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn edge_count(&self) -> usize { self.edge_count }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn nodes(&self) -> &[DocId] { &self.nodes }

    pub fn doc_id(&self, node: usize) -> Option<&str> {
        self.nodes.get(node).map(String::as_str)
    }

    pub fn node_of(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }

    pub fn out_degree(&self, node: usize) -> usize {
        self.outgoing.get(node).map_or(0, Vec::len)
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, node: usize) -> &[usize] {
        self.incoming.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_of(from), self.node_of(to)) {
            (Some(f), Some(t)) => self.outgoing[f].contains(&t),
            _ => false,
        }
    }
}
