//! PageRank by power iteration.

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

/// Scores indexed like the graph's nodes, plus the number of iterations run.
///
/// Dangling nodes spread their score uniformly over every node, so the total
/// stays at 1 after each iteration.
pub(crate) fn page_rank<N>(
    graph: &DiGraph<N, ()>,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> (Vec<f64>, usize) {
    let n = graph.node_count();
    if n == 0 {
        return (Vec::new(), 0);
    }

    let uniform = 1.0 / n as f64;
    let mut out_degree = vec![0usize; n];
    for edge in graph.edge_references() {
        out_degree[edge.source().index()] += 1;
    }

    let mut rank = vec![uniform; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        let dangling: f64 = rank
            .iter()
            .zip(&out_degree)
            .filter(|&(_, &out)| out == 0)
            .map(|(score, _)| score)
            .sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;
        next.iter_mut().for_each(|score| *score = base);

        for edge in graph.edge_references() {
            let from = edge.source().index();
            next[edge.target().index()] += damping * rank[from] / out_degree[from] as f64;
        }

        let delta: f64 = rank.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < tolerance {
            break;
        }
    }

    (rank, iterations)
}
