//! Conductance sweep over a rank vector.
//!
//! Vertices with positive rank are ordered by decreasing rank, the seed first,
//! and every prefix `S` of that order is scored by its conductance
//! `boundary(S) / volume(S)`, where `volume` is the sum of out-degrees and
//! `boundary` counts out-edges (with multiplicity) leaving `S`. The prefix with
//! the smallest conductance wins; on ties the shorter prefix is kept.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::algorithms::push::MassVector;
use crate::error::{LocalClusterError, Result};
use crate::types::graph_query::GraphQuery;
use crate::types::VertexId;

/// Conductance of a vertex set with the given cut and volume.
///
/// A set without out-edges has no meaningful ratio; it scores 1, the worst
/// possible value, so any prefix with volume is preferred to it.
pub fn conductance(boundary: u64, volume: u64) -> f64 {
    if volume == 0 {
        1.0
    } else {
        boundary as f64 / volume as f64
    }
}

/// Sum of out-degrees of `set`. Fails on a vertex with unknown adjacency.
pub fn volume_of<G: GraphQuery>(graph: &G, set: &FxHashSet<&str>) -> Result<u64> {
    let mut volume = 0u64;
    for vertex in set {
        match graph.degree(vertex) {
            Some(degree) => volume += degree as u64,
            None => return Err(LocalClusterError::Unresolved(vertex.to_string())),
        }
    }
    Ok(volume)
}

/// Out-edges of `set` whose target lies outside it, counted from scratch.
pub fn boundary_of<G: GraphQuery>(graph: &G, set: &FxHashSet<&str>) -> u64 {
    set.iter()
        .map(|vertex| {
            graph
                .read_neighbor(vertex)
                .iter()
                .filter(|n| !set.contains(n.as_str()))
                .count() as u64
        })
        .sum()
}

/// Orders ranked vertices by decreasing rank, ties by ascending id.
///
/// Vertices with zero rank are left out.
pub fn sorted_ranking(rank: &MassVector) -> Vec<(VertexId, f64)> {
    let mut ranking: Vec<(VertexId, f64)> = rank
        .iter()
        .filter(|(_, r)| **r > 0.0)
        .map(|(v, r)| (v.clone(), *r))
        .collect();
    ranking.sort_by(by_rank_then_id);
    ranking
}

fn by_rank_then_id(a: &(VertexId, f64), b: &(VertexId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// State of the sweep after one more vertex joined the prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepStep {
    pub size: usize,
    pub vertex: VertexId,
    pub volume: u64,
    pub boundary: u64,
    pub conductance: f64,
    /// Smallest conductance among prefixes up to and including this one.
    pub best_conductance: f64,
}

/// The selected community and how it was found.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    /// Members of the best prefix with their rank, in sweep order.
    pub members: Vec<(VertexId, f64)>,
    pub conductance: f64,
    pub volume: u64,
    pub boundary: u64,
    /// One entry per prefix, the seed-only prefix first.
    pub profile: Vec<SweepStep>,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, vertex_id: &str) -> bool {
        self.members.iter().any(|(v, _)| v == vertex_id)
    }

    pub fn member_ids(&self) -> Vec<VertexId> {
        self.members.iter().map(|(v, _)| v.clone()).collect()
    }
}

/// Sweeps a rank vector over a resolved adjacency.
pub struct ConductanceSweep<'a, G> {
    graph: &'a G,
    seed: &'a str,
}

impl<'a, G: GraphQuery> ConductanceSweep<'a, G> {
    pub fn new(graph: &'a G, seed: &'a str) -> Self {
        ConductanceSweep { graph, seed }
    }

    /// The sweep order: the seed, then every other vertex with positive rank
    /// by decreasing rank and ascending id.
    pub fn order(&self, rank: &MassVector) -> Vec<(VertexId, f64)> {
        let seed_rank = rank.get(self.seed).copied().unwrap_or(0.0);
        let mut order = vec![(self.seed.to_string(), seed_rank)];
        order.extend(
            sorted_ranking(rank)
                .into_iter()
                .filter(|(v, _)| v != self.seed),
        );
        order
    }

    /// Finds the prefix of minimum conductance.
    ///
    /// The boundary is maintained incrementally: for every vertex the sweep
    /// tracks how many edges arrive from the current prefix, so adding `v`
    /// turns those edges internal and adds the out-edges of `v` that still
    /// leave the prefix. Each step costs `O(degree(v))`.
    ///
    /// # Errors
    /// [`LocalClusterError::Unresolved`] if a vertex in the order has no
    /// adjacency in the graph.
    pub fn run(&self, rank: &MassVector) -> Result<SweepResult> {
        let order = self.order(rank);

        let mut in_prefix: FxHashSet<&str> = FxHashSet::default();
        let mut inbound: FxHashMap<&str, u64> = FxHashMap::default();
        let mut volume = 0u64;
        let mut boundary = 0u64;

        let mut profile = Vec::with_capacity(order.len());
        let mut best_len = 0usize;
        let mut best = (f64::INFINITY, 0u64, 0u64);

        for (idx, (vertex, _)) in order.iter().enumerate() {
            if !self.graph.has_vertex(vertex) {
                return Err(LocalClusterError::Unresolved(vertex.clone()));
            }
            let neighbors = self.graph.read_neighbor(vertex);

            boundary -= inbound.remove(vertex.as_str()).unwrap_or(0);
            in_prefix.insert(vertex.as_str());
            for neighbor in neighbors {
                if in_prefix.contains(neighbor.as_str()) {
                    continue;
                }
                boundary += 1;
                *inbound.entry(neighbor.as_str()).or_insert(0) += 1;
            }
            volume += neighbors.len() as u64;

            let phi = conductance(boundary, volume);
            if phi < best.0 {
                best = (phi, volume, boundary);
                best_len = idx + 1;
            }
            profile.push(SweepStep {
                size: idx + 1,
                vertex: vertex.clone(),
                volume,
                boundary,
                conductance: phi,
                best_conductance: best.0,
            });
        }

        let members = order.iter().take(best_len).cloned().collect();
        Ok(SweepResult {
            members,
            conductance: best.0,
            volume: best.1,
            boundary: best.2,
            profile,
        })
    }
}

#[cfg(test)]
mod test_sweep {
    use super::*;
    use crate::adj_io::AdjacencyCache;
    use crate::types::AdjacencyRecord;

    fn cache(records: &[(&str, &[&str])]) -> AdjacencyCache {
        let mut cache = AdjacencyCache::new();
        for (vertex, neighbors) in records {
            cache.insert(
                vertex.to_string(),
                AdjacencyRecord::new(neighbors.iter().map(|s| s.to_string()).collect()),
            );
        }
        cache
    }

    fn ranks(pairs: &[(&str, f64)]) -> MassVector {
        pairs.iter().map(|(v, r)| (v.to_string(), *r)).collect()
    }

    #[test]
    fn test_order_forces_seed_first_and_breaks_ties_by_id() {
        let graph = cache(&[]);
        let sweep = ConductanceSweep::new(&graph, "s");
        let rank = ranks(&[("s", 0.1), ("b", 0.3), ("a", 0.3), ("c", 0.2), ("z", 0.0)]);
        let order = sweep.order(&rank);
        let ids: Vec<&str> = order.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(ids, vec!["s", "a", "b", "c"]);
        assert_eq!(order[0].1, 0.1);
    }

    #[test]
    fn test_incremental_boundary_matches_recomputation() {
        let graph = cache(&[
            ("a", &["b", "c", "x"]),
            ("b", &["a", "a", "y"]),
            ("c", &["c", "a", "b", "x"]),
            ("d", &["a", "x"]),
        ]);
        let rank = ranks(&[("a", 0.4), ("b", 0.3), ("c", 0.2), ("d", 0.1)]);
        let result = ConductanceSweep::new(&graph, "a").run(&rank).unwrap();

        assert_eq!(result.profile.len(), 4);
        for step in &result.profile {
            let prefix: FxHashSet<&str> = result.profile[..step.size]
                .iter()
                .map(|s| s.vertex.as_str())
                .collect();
            assert_eq!(step.boundary, boundary_of(&graph, &prefix), "prefix size {}", step.size);
            assert_eq!(step.volume, volume_of(&graph, &prefix).unwrap());
        }
    }

    #[test]
    fn test_best_prefix_and_profile() {
        // {a, b, c} is tight; d and e hang off c and leak outward.
        let graph = cache(&[
            ("a", &["b", "c"]),
            ("b", &["a", "c"]),
            ("c", &["a", "b", "d"]),
            ("d", &["e", "o1", "o2"]),
            ("e", &["o3", "o4"]),
        ]);
        let rank = ranks(&[("a", 0.3), ("b", 0.25), ("c", 0.25), ("d", 0.1), ("e", 0.05)]);
        let result = ConductanceSweep::new(&graph, "a").run(&rank).unwrap();

        assert_eq!(result.member_ids(), vec!["a", "b", "c"]);
        assert_eq!(result.volume, 7);
        assert_eq!(result.boundary, 1);
        assert!((result.conductance - 1.0 / 7.0).abs() < 1e-12);
        assert!(result.contains("a"));
        assert!(!result.contains("d"));

        assert!(result
            .profile
            .windows(2)
            .all(|w| w[1].best_conductance <= w[0].best_conductance));
        assert_eq!(result.profile.last().unwrap().best_conductance, result.conductance);
    }

    #[test]
    fn test_ties_keep_shorter_prefix() {
        let graph = cache(&[("a", &["x"]), ("b", &["y"])]);
        let rank = ranks(&[("a", 0.6), ("b", 0.4)]);
        let result = ConductanceSweep::new(&graph, "a").run(&rank).unwrap();
        assert_eq!(result.member_ids(), vec!["a"]);
        assert_eq!(result.conductance, 1.0);
    }

    #[test]
    fn test_dangling_seed_alone() {
        let graph = cache(&[("s", &[])]);
        let result = ConductanceSweep::new(&graph, "s").run(&ranks(&[("s", 1.0)])).unwrap();
        assert_eq!(result.members, vec![("s".to_string(), 1.0)]);
        assert_eq!(result.volume, 0);
        assert_eq!(result.conductance, 1.0);
    }

    #[test]
    fn test_unresolved_vertex_is_an_error() {
        let graph = cache(&[("a", &["b"])]);
        let rank = ranks(&[("a", 0.5), ("b", 0.2)]);
        match ConductanceSweep::new(&graph, "a").run(&rank) {
            Err(LocalClusterError::Unresolved(v)) => assert_eq!(v, "b"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_conductance_helpers() {
        assert_eq!(conductance(0, 0), 1.0);
        assert_eq!(conductance(3, 12), 0.25);

        let graph = cache(&[("a", &["b"]), ("b", &["a", "c"])]);
        let set: FxHashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(boundary_of(&graph, &set), 1);
        assert_eq!(volume_of(&graph, &set).unwrap(), 3);

        let set: FxHashSet<&str> = ["a", "c"].into_iter().collect();
        assert!(volume_of(&graph, &set).is_err());

        let ranking = sorted_ranking(&ranks(&[("b", 0.2), ("a", 0.2), ("c", 0.5), ("d", 0.0)]));
        assert_eq!(
            ranking,
            vec![("c".to_string(), 0.5), ("a".to_string(), 0.2), ("b".to_string(), 0.2)]
        );
    }
}
