//! The metrics computer.

use std::collections::{HashMap, HashSet};

use graphlens_core::{analysis_graph, GraphEdge, NodeId};
use ordered_float::OrderedFloat;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::community::label_propagation;
use crate::pagerank::page_rank;
use crate::{MetricsConfig, Result};

/// Degree, PageRank and community label for every node in the input set.
///
/// Produced wholesale by [`compute`]; never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// In-degree plus out-degree.
    pub degree: HashMap<NodeId, f64>,
    /// PageRank score; sums to about 1 over all nodes.
    pub page_rank: HashMap<NodeId, f64>,
    /// Dense 0-based community label.
    pub community: HashMap<NodeId, usize>,
}

impl GraphMetrics {
    pub fn node_count(&self) -> usize {
        self.degree.len()
    }

    /// Number of distinct community labels.
    pub fn community_count(&self) -> usize {
        self.community.values().collect::<HashSet<_>>().len()
    }

    /// The `k` highest-ranked nodes, best first. Equal scores order by id.
    pub fn top_by_page_rank(&self, k: usize) -> Vec<(NodeId, f64)> {
        let mut ranked: Vec<(NodeId, f64)> = self
            .page_rank
            .iter()
            .map(|(id, &score)| (id.clone(), score))
            .collect();
        ranked.sort_by(|a, b| {
            OrderedFloat(b.1)
                .cmp(&OrderedFloat(a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}

/// Compute metrics with the default configuration.
pub fn compute(nodes: &[NodeId], edges: &[GraphEdge]) -> GraphMetrics {
    run(&MetricsConfig::default(), nodes, edges)
}

/// Compute metrics with an explicit configuration.
///
/// Fails only if `config` does not validate.
pub fn compute_with(
    config: &MetricsConfig,
    nodes: &[NodeId],
    edges: &[GraphEdge],
) -> Result<GraphMetrics> {
    config.validate()?;
    Ok(run(config, nodes, edges))
}

fn run(config: &MetricsConfig, nodes: &[NodeId], edges: &[GraphEdge]) -> GraphMetrics {
    let (graph, degree) = build(nodes, edges);

    let (scores, rank_iterations) = page_rank(
        &graph,
        config.damping,
        config.max_iterations,
        config.tolerance,
    );
    let (labels, passes) = label_propagation(&graph, config.community_iterations, config.seed);

    let mut metrics = GraphMetrics {
        degree,
        ..Default::default()
    };
    for index in graph.node_indices() {
        let id = graph[index].clone();
        metrics.page_rank.insert(id.clone(), scores[index.index()]);
        metrics.community.insert(id, labels[index.index()]);
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        rank_iterations,
        label_passes = passes,
        communities = metrics.community_count(),
        "Computed graph metrics"
    );
    metrics
}

/// Adjacency without self-loops or dangling edges, and the degree map.
///
/// Duplicate ids collapse onto their first occurrence. Self-loops count twice
/// toward degree (once in, once out).
fn build(nodes: &[NodeId], edges: &[GraphEdge]) -> (DiGraph<NodeId, ()>, HashMap<NodeId, f64>) {
    let (graph, index) = analysis_graph(nodes, edges.iter().filter(|e| !e.is_self_loop()));

    let mut degree: HashMap<NodeId, f64> = index.keys().map(|id| (id.clone(), 0.0)).collect();
    for edge in edges {
        if !(index.contains_key(&edge.source) && index.contains_key(&edge.target)) {
            continue;
        }
        for endpoint in [&edge.source, &edge.target] {
            if let Some(d) = degree.get_mut(endpoint) {
                *d += 1.0;
            }
        }
    }

    (graph, degree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|&n| NodeId::from(n)).collect()
    }

    #[test]
    fn test_empty_input() {
        let metrics = compute(&[], &[]);
        assert_eq!(metrics, GraphMetrics::default());
        assert_eq!(metrics.community_count(), 0);
    }

    #[test]
    fn test_dangling_edges_are_ignored() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![GraphEdge::new("a", "b"), GraphEdge::new("a", "ghost")];
        let metrics = compute(&nodes, &edges);
        assert_eq!(metrics.degree[&NodeId::from("a")], 1.0);
        assert_eq!(metrics.degree[&NodeId::from("b")], 1.0);
        assert!(!metrics.degree.contains_key(&NodeId::from("ghost")));
    }

    #[test]
    fn test_self_loop_counts_toward_degree_only() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![GraphEdge::new("a", "a")];
        let metrics = compute(&nodes, &edges);
        assert_eq!(metrics.degree[&NodeId::from("a")], 2.0);
        // No adjacency, so both nodes are dangling and PageRank stays uniform.
        assert!((metrics.page_rank[&NodeId::from("a")] - 0.5).abs() < 1e-9);
        assert_ne!(
            metrics.community[&NodeId::from("a")],
            metrics.community[&NodeId::from("b")]
        );
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let nodes = ids(&["a", "a", "b"]);
        let metrics = compute(&nodes, &[GraphEdge::new("a", "b")]);
        assert_eq!(metrics.node_count(), 2);
        let total: f64 = metrics.page_rank.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_by_page_rank_orders_best_first() {
        let nodes = ids(&["hub", "x", "y", "z"]);
        let edges = vec![
            GraphEdge::new("x", "hub"),
            GraphEdge::new("y", "hub"),
            GraphEdge::new("z", "hub"),
        ];
        let top = compute(&nodes, &edges).top_by_page_rank(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, NodeId::from("hub"));
        // x, y and z tie; id order decides.
        assert_eq!(top[1].0, NodeId::from("x"));
    }

    #[test]
    fn test_compute_with_rejects_bad_config() {
        let config = MetricsConfig {
            damping: 1.5,
            ..Default::default()
        };
        assert!(compute_with(&config, &[], &[]).is_err());
    }
}
