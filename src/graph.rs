use std::collections::HashMap;
use std::fmt::Display;
use rayon::collections::hash_map::IterMut;
use rayon::prelude::*;
use tracing::trace;
use crate::config::SimilarityTable;

/// Outgoing classification edges of one node, keyed by target.
pub type Neighbors = HashMap<String, f64>;


/// Weighted association graph between words and languages.
///
/// Tokens and labels share one namespace: a label that shows up as an edge
/// target becomes a node like any other. Classification edges are directed
/// and only exist once created with [`AssociationGraph::add_edge`]. Word
/// similarities live in a separate undirected store and never affect edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssociationGraph {
    adjacency: HashMap<String, Neighbors>,
    similarities: HashMap<String, HashMap<String, f64>>,
}

impl AssociationGraph {

    pub fn new() -> AssociationGraph {
        Self::default()
    }

    pub fn add_node(&mut self, node: &str) {
        if !self.adjacency.contains_key(node) {
            self.adjacency.insert(node.to_owned(), Neighbors::new());
        }
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Set the weight of `from -> to`, creating both endpoints when missing.
    /// An existing weight is overwritten, the reverse edge is never created.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) {
        self.add_node(from);
        self.add_node(to);
        if let Some(neighbors) = self.adjacency.get_mut(from) {
            neighbors.insert(to.to_owned(), weight);
        }
    }

    pub fn edge_exists(&self, from: &str, to: &str) -> bool {
        self.adjacency
            .get(from)
            .map_or(false, |neighbors| neighbors.contains_key(to))
    }

    pub fn weight(&self, from: &str, to: &str) -> Option<f64> {
        self.adjacency.get(from)?.get(to).copied()
    }

    /// Add `delta` to an existing edge. Updates only touch what exists:
    /// an unknown node or a missing edge leaves the graph as it is.
    pub fn update_weight(&mut self, from: &str, to: &str, delta: f64) {
        match self.adjacency.get_mut(from).and_then(|neighbors| neighbors.get_mut(to)) {
            Some(weight) => *weight += delta,
            None => trace!(from, to, delta, "ignoring update of missing edge"),
        }
    }

    /// Snapshot of the outgoing edges of `node` as (target, weight) pairs.
    /// The order is unspecified. Empty for an unknown node.
    pub fn neighbors(&self, node: &str) -> Vec<(String, f64)> {
        match self.adjacency.get(node) {
            Some(neighbors) => neighbors
                .iter()
                .map(|(target, weight)| (target.to_owned(), *weight))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All nodes with their outgoing edges.
    pub fn nodes(&self) -> &HashMap<String, Neighbors> {
        &self.adjacency
    }

    // weights may be rewritten in place, the edge sets themselves must not change
    pub(crate) fn par_nodes_mut(&mut self) -> IterMut<'_, String, Neighbors> {
        self.adjacency.par_iter_mut()
    }

    /// The label with the greatest outgoing weight from `word`.
    ///
    /// When several labels share the maximum weight the lexicographically
    /// smallest one wins, so the answer never depends on hash order.
    /// NaN weights never take part. Returns `None` for a word without
    /// outgoing edges, or when every outgoing weight is NaN.
    pub fn classify(&self, word: &str) -> Option<&str> {
        let neighbors = self.adjacency.get(word)?;
        let mut best: Option<(&str, f64)> = None;
        for (label, &weight) in neighbors {
            if weight.is_nan() {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_label, best_weight)) => {
                    weight > best_weight || (weight == best_weight && label.as_str() < best_label)
                }
            };
            if better {
                best = Some((label.as_str(), weight));
            }
        }
        best.map(|(label, _)| label)
    }

    /// Store a symmetric similarity score, last write wins.
    pub fn add_word_similarity(&mut self, first: &str, second: &str, similarity: f64) {
        self.add_node(first);
        self.add_node(second);
        self.similarities
            .entry(first.to_owned())
            .or_default()
            .insert(second.to_owned(), similarity);
        self.similarities
            .entry(second.to_owned())
            .or_default()
            .insert(first.to_owned(), similarity);
    }

    /// Similarity of a pair, 0.0 when the pair was never stored.
    pub fn word_similarity(&self, first: &str, second: &str) -> f64 {
        self.similarities
            .get(first)
            .and_then(|row| row.get(second))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn add_similarities(&mut self, table: &SimilarityTable) {
        for (first, row) in table {
            for (second, similarity) in row {
                self.add_word_similarity(first, second, *similarity);
            }
        }
    }

}


impl Display for AssociationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {

        // sorted so the dump is stable between runs
        let mut nodes: Vec<&String> = self.adjacency.keys().collect();
        nodes.sort();

        for node in nodes {
            write!(f, "{}:", node)?;
            let mut neighbors: Vec<(&String, &f64)> = self.adjacency[node].iter().collect();
            neighbors.sort_by(|a, b| a.0.cmp(b.0));
            for (target, weight) in neighbors {
                write!(f, " ({}, {})", target, weight)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
