use crate::graph::LinkGraph;
use crate::scoring::min_max_normalize;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// doc_id -> authority in [0, 1].
pub type PageRank = BTreeMap<DocId, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    /// Probability of following a link instead of jumping.
    pub damping: f64,
    /// L1 change between iterations below which the loop stops.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self { damping: 0.85, tolerance: 1e-6, max_iterations: 100 }
    }
}

#[derive(Debug, Clone)]
pub struct PageRankOutcome {
    /// Min-max normalized scores.
    pub scores: PageRank,
    /// Probability mass per node before normalization, indexed like the graph.
    pub raw: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Power iteration over the random-surfer model.
///
/// Mass sitting on dangling nodes is spread uniformly over all nodes each
/// round, so the raw vector always sums to 1. Hitting `max_iterations`
/// returns the last vector with `converged = false`.
pub fn power_iteration(graph: &LinkGraph, config: &PageRankConfig) -> (Vec<f64>, usize, bool) {
    let n = graph.node_count();
    if n == 0 {
        return (Vec::new(), 0, true);
    }
    let nf = n as f64;
    let d = config.damping;
    let dangling: Vec<usize> = (0..n).filter(|&v| graph.out_degree(v) == 0).collect();

    let mut scores = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let dangling_mass: f64 = dangling.iter().map(|&v| scores[v]).sum();
        let base = (1.0 - d) / nf + d * dangling_mass / nf;
        for (v, slot) in next.iter_mut().enumerate() {
            let inflow: f64 = graph
                .predecessors(v)
                .iter()
                .map(|&u| scores[u] / graph.out_degree(u) as f64)
                .sum();
            *slot = base + d * inflow;
        }
        let delta: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut scores, &mut next);
        if delta < config.tolerance {
            converged = true;
            break;
        }
    }
    (scores, iterations, converged)
}

/// Run the solver and rescale to [0, 1]. An empty graph gives an empty map.
pub fn compute_pagerank(graph: &LinkGraph, config: &PageRankConfig) -> PageRankOutcome {
    let (raw, iterations, converged) = power_iteration(graph, config);
    if converged {
        tracing::info!(iterations, nodes = graph.node_count(), "pagerank converged");
    } else {
        tracing::warn!(iterations, tolerance = config.tolerance, "pagerank stopped at iteration cap without converging");
    }
    let scores = graph
        .nodes()
        .iter()
        .cloned()
        .zip(min_max_normalize(&raw))
        .collect();
    PageRankOutcome { scores, raw, iterations, converged }
}
