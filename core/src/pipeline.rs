use crate::error::Result;
use crate::graph::LinkGraph;
use crate::index::{build_index, IndexConfig};
use crate::pagerank::{compute_pagerank, PageRankConfig};
use crate::persist::ArtifactSet;
use crate::Document;

/// Output of one offline build plus what the PageRank loop did.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub artifacts: ArtifactSet,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub pagerank_iterations: usize,
    pub pagerank_converged: bool,
}

/// Documents -> index, stats, link graph, PageRank, all from the same snapshot.
pub fn build_artifacts(docs: &[Document], index_config: &IndexConfig, pagerank_config: &PageRankConfig) -> Result<BuildReport> {
    let built = build_index(docs, index_config)?;
    let graph = LinkGraph::build(docs)?;
    let pagerank = compute_pagerank(&graph, pagerank_config);
    Ok(BuildReport {
        artifacts: ArtifactSet {
            index: built.index,
            doc_stats: built.doc_stats,
            corpus: built.corpus,
            pagerank: pagerank.scores,
        },
        graph_nodes: graph.node_count(),
        graph_edges: graph.edge_count(),
        pagerank_iterations: pagerank.iterations,
        pagerank_converged: pagerank.converged,
    })
}
