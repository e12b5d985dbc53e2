//! Community detection by label propagation.
//!
//! Every node starts in its own community. Each pass visits the nodes in an
//! order shuffled by a seeded [`XorShift128Plus`], and each visited node adopts
//! the label most common among its undirected neighbors (smallest label on a
//! tie). The run stops after a pass that changes nothing, or at the pass cap.
//!
//! Labels are updated in place: a node visited later in a pass already sees
//! the labels adopted earlier in that pass. This is what makes the seed
//! matter. With double-buffered updates every node would read the previous
//! pass only, and the visit order would have no effect on the result.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use rand::seq::SliceRandom;

use crate::rng::XorShift128Plus;

/// Dense 0-based community labels indexed like the graph's nodes, plus the
/// number of passes run.
pub(crate) fn label_propagation<N>(
    graph: &DiGraph<N, ()>,
    max_passes: usize,
    seed: u64,
) -> (Vec<usize>, usize) {
    let n = graph.node_count();
    let mut labels: Vec<usize> = (0..n).collect();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = XorShift128Plus::new(seed);
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut passes = 0;

    while passes < max_passes && n > 0 {
        passes += 1;
        order.shuffle(&mut rng);

        let mut changed = false;
        for &node in &order {
            counts.clear();
            for neighbor in graph.neighbors_undirected(NodeIndex::new(node)) {
                *counts.entry(labels[neighbor.index()]).or_insert(0) += 1;
            }
            let Some(best) = most_frequent(&counts) else {
                continue;
            };
            if best != labels[node] {
                labels[node] = best;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    (renormalize(&labels), passes)
}

/// Highest count wins; ascending iteration makes the smallest label win ties.
fn most_frequent(counts: &BTreeMap<usize, usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (&label, &count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Map raw labels onto `0..k` in ascending raw order.
fn renormalize(labels: &[usize]) -> Vec<usize> {
    let dense: BTreeMap<usize, usize> = labels
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(dense, raw)| (raw, dense))
        .collect();
    labels.iter().map(|raw| dense[raw]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clique(g: &mut DiGraph<(), ()>, members: &[u32]) {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                g.add_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize), ());
            }
        }
    }

    fn graph_with_nodes(n: usize) -> DiGraph<(), ()> {
        let mut g = DiGraph::new();
        for _ in 0..n {
            g.add_node(());
        }
        g
    }

    #[test]
    fn test_disjoint_cliques_form_two_communities() {
        let mut g = graph_with_nodes(8);
        clique(&mut g, &[0, 1, 2, 3]);
        clique(&mut g, &[4, 5, 6, 7]);

        let (labels, _) = label_propagation(&g, 20, 1);
        assert!(labels[..4].iter().all(|&l| l == labels[0]));
        assert!(labels[4..].iter().all(|&l| l == labels[4]));
        assert_ne!(labels[0], labels[4]);
        assert_eq!(labels.iter().copied().max(), Some(1));
    }

    #[test]
    fn test_isolated_nodes_keep_their_own_label() {
        let g = graph_with_nodes(3);
        let (labels, passes) = label_propagation(&g, 20, 9);
        assert_eq!(labels, vec![0, 1, 2]);
        assert_eq!(passes, 1);
    }

    #[test]
    fn test_most_frequent_breaks_ties_low() {
        let counts = BTreeMap::from([(7, 2), (3, 2), (9, 1)]);
        assert_eq!(most_frequent(&counts), Some(3));
        assert_eq!(most_frequent(&BTreeMap::new()), None);
    }

    #[test]
    fn test_renormalize_is_dense_and_ordered() {
        assert_eq!(renormalize(&[40, 3, 40, 17]), vec![2, 0, 2, 1]);
    }

    #[test]
    fn test_empty_graph() {
        let (labels, passes) = label_propagation(&graph_with_nodes(0), 20, 0);
        assert!(labels.is_empty());
        assert_eq!(passes, 0);
    }

    #[test]
    fn test_seed_changes_ring_partition() {
        let mut g = graph_with_nodes(30);
        for i in 0..30 {
            g.add_edge(NodeIndex::new(i), NodeIndex::new((i + 1) % 30), ());
        }

        let outcomes: std::collections::HashSet<Vec<usize>> =
            (0..32).map(|seed| label_propagation(&g, 20, seed).0).collect();
        assert!(outcomes.len() > 1, "every seed gave the same partition");

        assert_eq!(label_propagation(&g, 20, 7), label_propagation(&g, 20, 7));
    }
}
