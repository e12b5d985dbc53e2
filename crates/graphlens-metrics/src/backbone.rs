//! Backbone selection: the subset of nodes worth drawing on a dense graph.

use std::cmp::Reverse;
use std::collections::HashSet;

use graphlens_core::{GraphDocument, NodeId};
use ordered_float::OrderedFloat;

use crate::GraphMetrics;

/// Below this many nodes the whole graph is the backbone.
pub const BACKBONE_MIN_NODES: usize = 50;

const MIN_TOP_DEGREE: usize = 30;
const MAX_TOP_DEGREE: usize = 200;

/// How many top-degree nodes join the backbone for a graph of `node_count` nodes.
pub fn backbone_size(node_count: usize) -> usize {
    (node_count / 5).clamp(MIN_TOP_DEGREE, MAX_TOP_DEGREE)
}

/// Type nodes plus the highest-degree nodes of `document`.
///
/// Degrees come from `metrics`, falling back to the node's own degree hint and
/// then 0. Equal degrees keep document order.
pub fn select_backbone(document: &GraphDocument, metrics: &GraphMetrics) -> HashSet<NodeId> {
    let mut seen = HashSet::with_capacity(document.nodes.len());
    let nodes: Vec<_> = document
        .nodes
        .iter()
        .filter(|node| seen.insert(&node.id))
        .collect();

    if nodes.len() < BACKBONE_MIN_NODES {
        return nodes.iter().map(|node| node.id.clone()).collect();
    }

    let mut backbone: HashSet<NodeId> = nodes
        .iter()
        .filter(|node| node.is_type())
        .map(|node| node.id.clone())
        .collect();

    let top = backbone_size(nodes.len());
    let mut ranked = nodes;
    // `sort_by_key` is stable.
    ranked.sort_by_key(|node| {
        let degree = metrics
            .degree
            .get(&node.id)
            .copied()
            .or(node.degree)
            .unwrap_or(0.0);
        Reverse(OrderedFloat(degree))
    });
    backbone.extend(ranked.into_iter().take(top).map(|node| node.id.clone()));

    backbone
}
