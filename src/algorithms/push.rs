//! Approximate personalized PageRank by local pushes.
//!
//! All probability mass starts as residual on the seed. A push on a vertex `v`
//! with residual `r` and out-degree `d` settles `alpha * r` into the rank of
//! `v`, keeps `(1 - alpha) * r / 2` as residual on `v`, and spreads the other
//! `(1 - alpha) * r / 2` evenly over the out-edges of `v`. A vertex is
//! eligible for a push when `r / d >= epsilon`; a dangling vertex has nowhere
//! to spread, so any positive residual it holds is settled in one push.
//!
//! Adjacency is only known for vertices the [`AdjacencyStore`] has resolved.
//! Mass that reaches an unresolved vertex waits there until the vertex holds
//! at least `epsilon` (a conservative stand-in for the per-degree test, since
//! the degree is not known yet); such vertices are then resolved in one batch
//! and pushing resumes. Pushes never create or destroy mass, so
//! `sum(rank) + sum(residual)` stays 1 throughout.

use std::collections::BTreeSet;
use std::iter;

use log::{debug, info, trace, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::adj_io::{AdjacencySource, AdjacencyStore};
use crate::config::PushConfig;
use crate::error::{LocalClusterError, Result};
use crate::types::VertexId;

/// Sparse mapping from vertex to mass; absent vertices hold zero.
pub type MassVector = FxHashMap<VertexId, f64>;

/// How a push run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Convergence {
    /// No cached vertex is eligible and no uncached vertex holds `epsilon`.
    Converged,
    /// The push ceiling was hit first; ranks are valid but less refined.
    PushLimitReached,
}

/// Final state of a push run, detached from the store.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub rank: MassVector,
    pub residual: MassVector,
    pub pushes: u64,
    pub passes: u64,
    pub resolve_rounds: u64,
    pub convergence: Convergence,
}

/// Push-based approximate PageRank from a single seed.
pub struct PushRankEngine<S> {
    config: PushConfig,
    seed: VertexId,
    store: AdjacencyStore<S>,
    residual: MassVector,
    rank: MassVector,
    pushes: u64,
    passes: u64,
    resolve_rounds: u64,
}

impl<S: AdjacencySource> PushRankEngine<S> {
    /// Creates an engine with all mass as residual on `seed`.
    ///
    /// Nothing is read from the store until the first resolve.
    pub fn new(
        store: AdjacencyStore<S>,
        seed: impl Into<VertexId>,
        config: PushConfig,
    ) -> Result<Self> {
        config.validate()?;
        let seed = seed.into();
        if seed.is_empty() {
            return Err(LocalClusterError::Config("seed vertex id is empty".to_string()));
        }

        let mut residual = MassVector::default();
        let mut rank = MassVector::default();
        residual.insert(seed.clone(), 1.0);
        rank.insert(seed.clone(), 0.0);

        Ok(PushRankEngine {
            config,
            seed,
            store,
            residual,
            rank,
            pushes: 0,
            passes: 0,
            resolve_rounds: 0,
        })
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    pub fn store(&self) -> &AdjacencyStore<S> {
        &self.store
    }

    pub fn rank(&self, vertex_id: &str) -> f64 {
        self.rank.get(vertex_id).copied().unwrap_or(0.0)
    }

    pub fn residual(&self, vertex_id: &str) -> f64 {
        self.residual.get(vertex_id).copied().unwrap_or(0.0)
    }

    pub fn rank_vector(&self) -> &MassVector {
        &self.rank
    }

    pub fn residual_vector(&self) -> &MassVector {
        &self.residual
    }

    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn resolve_rounds(&self) -> u64 {
        self.resolve_rounds
    }

    /// Mass already settled into rank.
    pub fn settled_mass(&self) -> f64 {
        self.rank.values().sum()
    }

    /// Mass still waiting as residual.
    pub fn residual_mass(&self) -> f64 {
        self.residual.values().sum()
    }

    /// Settled plus residual mass; 1 up to rounding at every step.
    pub fn total_mass(&self) -> f64 {
        self.settled_mass() + self.residual_mass()
    }

    /// Whether a cached vertex may be pushed right now.
    ///
    /// Uncached vertices are never eligible: their degree is unknown.
    pub fn is_eligible(&self, vertex_id: &str) -> bool {
        match self.store.degree(vertex_id) {
            None => false,
            Some(degree) => self.is_eligible_with_degree(vertex_id, degree),
        }
    }

    fn is_eligible_with_degree(&self, vertex_id: &str, degree: usize) -> bool {
        let r = self.residual(vertex_id);
        if degree == 0 {
            r > 0.0
        } else {
            r / degree as f64 >= self.config.epsilon
        }
    }

    /// Cached vertices currently eligible for a push, in ascending id order.
    pub fn active(&self) -> Vec<VertexId> {
        self.store
            .cache()
            .iter()
            .filter(|(v, record)| self.is_eligible_with_degree(v, record.degree()))
            .map(|(v, _)| v.clone())
            .collect()
    }

    /// Uncached vertices holding any residual mass.
    pub fn pending(&self) -> BTreeSet<VertexId> {
        self.residual
            .iter()
            .filter(|(v, r)| **r > 0.0 && !self.store.contains(v))
            .map(|(v, _)| v.clone())
            .collect()
    }

    /// Uncached vertices holding at least `epsilon`: the next batch to resolve.
    pub fn candidates(&self) -> BTreeSet<VertexId> {
        self.residual
            .iter()
            .filter(|(v, r)| **r >= self.config.epsilon && !self.store.contains(v))
            .map(|(v, _)| v.clone())
            .collect()
    }

    /// True when no further push or resolve would happen.
    pub fn is_converged(&self) -> bool {
        self.candidates().is_empty() && self.active().is_empty()
    }

    fn push_limit_reached(&self) -> bool {
        self.config.max_pushes.is_some_and(|max| self.pushes >= max)
    }

    /// Pushes `vertex_id` once if it is eligible.
    ///
    /// Returns whether a push happened.
    pub fn push(&mut self, vertex_id: &str) -> bool {
        if !self.is_eligible(vertex_id) {
            return false;
        }

        let alpha = self.config.alpha;
        let r = self.residual(vertex_id);
        let neighbors = match self.store.neighbors(vertex_id) {
            Some(neighbors) => neighbors,
            None => return false,
        };

        if neighbors.is_empty() {
            // Dangling: nothing to spread, settle everything.
            *self.rank.entry(vertex_id.to_string()).or_insert(0.0) += r;
            self.residual.insert(vertex_id.to_string(), 0.0);
        } else {
            *self.rank.entry(vertex_id.to_string()).or_insert(0.0) += alpha * r;
            self.residual.insert(vertex_id.to_string(), (1.0 - alpha) * r / 2.0);

            let share = (1.0 - alpha) * r / (2.0 * neighbors.len() as f64);
            for neighbor in neighbors {
                match self.residual.get_mut(neighbor.as_str()) {
                    Some(mass) => *mass += share,
                    None => {
                        self.residual.insert(neighbor.clone(), share);
                    }
                }
            }
        }

        self.pushes += 1;
        trace!("Push #{} on {:?}: residual {:.3e}", self.pushes, vertex_id, r);
        true
    }

    /// One pass over the cache, pushing every vertex eligible at its start.
    ///
    /// Returns the number of pushes performed.
    pub fn push_pass(&mut self) -> u64 {
        let active = self.active();
        let mut performed = 0;
        for vertex in &active {
            if self.push_limit_reached() {
                break;
            }
            if self.push(vertex) {
                performed += 1;
            }
        }
        self.passes += 1;
        debug!(
            "Pass #{}: {} pushes, {} cached vertices",
            self.passes,
            performed,
            self.store.cache().len()
        );
        performed
    }

    /// Resolves every uncached vertex holding at least `epsilon`, in one batch.
    ///
    /// Returns the number of vertices requested; zero means nothing was left
    /// to resolve and no scan happened.
    pub fn resolve_pending(&mut self) -> Result<usize> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Ok(0);
        }
        let requested = candidates.len();
        self.store.resolve(candidates)?;
        self.resolve_rounds += 1;
        Ok(requested)
    }

    /// Alternates push passes and resolve rounds until convergence or until
    /// the push ceiling is reached.
    pub fn run(&mut self) -> Result<Convergence> {
        if !self.store.contains(&self.seed) {
            self.store.resolve(iter::once(self.seed.clone()))?;
            self.resolve_rounds += 1;
            if self.store.degree(&self.seed) == Some(0) {
                warn!("Seed {:?} has no out-edges; the community is the seed alone", self.seed);
            }
        }

        let convergence = loop {
            while self.push_pass() > 0 {
                if self.push_limit_reached() {
                    break;
                }
            }
            if self.push_limit_reached() {
                warn!(
                    "Push ceiling of {} reached; residual mass {:.3e} left unsettled",
                    self.pushes,
                    self.residual_mass()
                );
                break Convergence::PushLimitReached;
            }
            if self.resolve_pending()? == 0 {
                break Convergence::Converged;
            }
        };

        info!(
            "Push finished ({:?}) after {} pushes, {} passes, {} resolve rounds; \
             {} vertices ranked, settled mass {:.6}",
            convergence,
            self.pushes,
            self.passes,
            self.resolve_rounds,
            self.rank.values().filter(|r| **r > 0.0).count(),
            self.settled_mass()
        );
        Ok(convergence)
    }

    /// Splits the engine into its final vectors and the store, whose cache
    /// the sweep reads.
    pub fn into_parts(self, convergence: Convergence) -> (PushOutcome, AdjacencyStore<S>) {
        let outcome = PushOutcome {
            rank: self.rank,
            residual: self.residual,
            pushes: self.pushes,
            passes: self.passes,
            resolve_rounds: self.resolve_rounds,
            convergence,
        };
        (outcome, self.store)
    }
}

#[cfg(test)]
mod test_push {
    use super::*;
    use crate::adj_io::MemorySource;

    const TOLERANCE: f64 = 1e-9;

    fn engine(
        records: Vec<(&str, Vec<&str>)>,
        seed: &str,
        alpha: f64,
        epsilon: f64,
    ) -> PushRankEngine<MemorySource> {
        let store = AdjacencyStore::new(MemorySource::from_records(records));
        PushRankEngine::new(store, seed, PushConfig::new(alpha, epsilon)).unwrap()
    }

    fn triangle() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("A", vec!["B", "C"]),
            ("B", vec!["A"]),
            ("C", vec!["A"]),
        ]
    }

    fn assert_post_convergence_bound(engine: &PushRankEngine<MemorySource>) {
        let epsilon = engine.config().epsilon;
        for (vertex, record) in engine.store().cache().iter() {
            let r = engine.residual(vertex);
            if record.is_dangling() {
                assert_eq!(r, 0.0, "dangling {} kept residual", vertex);
            } else {
                assert!(r / (record.degree() as f64) < epsilon, "{} still eligible", vertex);
            }
        }
        assert!(engine.candidates().is_empty());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let store = AdjacencyStore::new(MemorySource::from_records(triangle()));
        assert!(matches!(
            PushRankEngine::new(store, "A", PushConfig::new(1.0, 0.1)),
            Err(LocalClusterError::Config(_))
        ));
        let store = AdjacencyStore::new(MemorySource::from_records(triangle()));
        assert!(PushRankEngine::new(store, "", PushConfig::new(0.5, 0.1)).is_err());
    }

    #[test]
    fn test_initial_state() {
        let engine = engine(triangle(), "A", 0.5, 0.1);
        assert_eq!(engine.residual("A"), 1.0);
        assert_eq!(engine.rank("A"), 0.0);
        assert_eq!(engine.total_mass(), 1.0);
        assert_eq!(engine.store().cache().len(), 0);
        assert_eq!(engine.pending().into_iter().collect::<Vec<_>>(), vec!["A"]);
        assert!(engine.active().is_empty());
        assert!(!engine.is_converged());
    }

    #[test]
    fn test_single_push_arithmetic() {
        let mut engine = engine(triangle(), "A", 0.5, 0.1);
        engine.resolve_pending().unwrap();
        assert!(engine.push("A"));

        assert!((engine.rank("A") - 0.5).abs() < TOLERANCE);
        assert!((engine.residual("A") - 0.25).abs() < TOLERANCE);
        assert!((engine.residual("B") - 0.125).abs() < TOLERANCE);
        assert!((engine.residual("C") - 0.125).abs() < TOLERANCE);
        assert!((engine.total_mass() - 1.0).abs() < TOLERANCE);

        // B and C are not cached: they are pending, not active.
        assert!(!engine.push("B"));
        assert_eq!(engine.pending().len(), 2);
        assert_eq!(engine.candidates().len(), 2);
    }

    #[test]
    fn test_triangle_scenario() {
        let mut engine = engine(triangle(), "A", 0.5, 0.1);
        let convergence = engine.run().unwrap();

        assert_eq!(convergence, Convergence::Converged);
        assert!(engine.pushes() > 0 && engine.pushes() < 20);
        assert!((engine.total_mass() - 1.0).abs() < TOLERANCE);

        for v in ["A", "B", "C"] {
            assert!(engine.rank(v) > 0.0, "{} got no rank", v);
        }
        assert!(engine.rank("A") > engine.rank("B"));
        assert!((engine.rank("B") - engine.rank("C")).abs() < TOLERANCE);
        assert!(engine.settled_mass() > 0.75);
        assert_post_convergence_bound(&engine);
        assert!(engine.is_converged());
    }

    #[test]
    fn test_mass_conserved_after_every_push() {
        let records = vec![
            ("A", vec!["B", "C", "D"]),
            ("B", vec!["A", "C"]),
            ("C", vec!["C", "D"]),
            ("D", vec!["A", "E"]),
            ("E", vec![]),
        ];
        let mut engine = engine(records, "A", 0.2, 0.01);
        loop {
            while !engine.active().is_empty() {
                for vertex in engine.active() {
                    engine.push(&vertex);
                    assert!((engine.total_mass() - 1.0).abs() < TOLERANCE);
                    assert!(engine.residual_vector().values().all(|r| *r >= 0.0));
                    assert!(engine.rank_vector().values().all(|r| *r >= 0.0));
                }
            }
            if engine.resolve_pending().unwrap() == 0 {
                break;
            }
        }
        assert!(engine.is_converged());
        assert_post_convergence_bound(&engine);
    }

    #[test]
    fn test_dangling_vertex_settles() {
        let records = vec![
            ("A", vec!["B", "D"]),
            ("B", vec!["A"]),
            ("D", vec![]),
        ];
        let mut engine = engine(records, "A", 0.3, 0.05);
        assert_eq!(engine.run().unwrap(), Convergence::Converged);

        assert_eq!(engine.store().degree("D"), Some(0));
        assert!(engine.rank("D") > 0.0);
        assert_eq!(engine.residual("D"), 0.0);
        assert!(engine.rank_vector().values().all(|r| r.is_finite()));
        assert!((engine.total_mass() - 1.0).abs() < TOLERANCE);
        assert_post_convergence_bound(&engine);
    }

    #[test]
    fn test_absent_seed_is_trivial() {
        let mut engine = engine(triangle(), "Z", 0.5, 0.1);
        assert_eq!(engine.run().unwrap(), Convergence::Converged);
        assert_eq!(engine.pushes(), 1);
        assert_eq!(engine.rank("Z"), 1.0);
        assert_eq!(engine.residual("Z"), 0.0);
        assert_eq!(engine.store().cache().len(), 1);
    }

    #[test]
    fn test_push_ceiling() {
        let store = AdjacencyStore::new(MemorySource::from_records(triangle()));
        let config = PushConfig::new(0.1, 1e-6).with_max_pushes(5);
        let mut engine = PushRankEngine::new(store, "A", config).unwrap();

        assert_eq!(engine.run().unwrap(), Convergence::PushLimitReached);
        assert_eq!(engine.pushes(), 5);
        assert!((engine.total_mass() - 1.0).abs() < TOLERANCE);
        assert!(!engine.is_converged());
    }

    #[test]
    fn test_cache_only_grows_across_rounds() {
        let records = vec![
            ("v0", vec!["v1"]),
            ("v1", vec!["v2"]),
            ("v2", vec!["v3"]),
            ("v3", vec!["v0"]),
        ];
        let mut engine = engine(records, "v0", 0.1, 0.01);
        let mut sizes = vec![engine.store().cache().len()];
        loop {
            while engine.push_pass() > 0 {}
            let before: Vec<(VertexId, Vec<VertexId>)> = engine
                .store()
                .cache()
                .iter()
                .map(|(v, record)| (v.clone(), record.neighbors().to_vec()))
                .collect();
            let requested = engine.resolve_pending().unwrap();
            sizes.push(engine.store().cache().len());
            for (vertex, neighbors) in before {
                assert_eq!(engine.store().neighbors(&vertex), Some(&neighbors[..]));
            }
            if requested == 0 {
                break;
            }
        }
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*sizes.last().unwrap(), 4);
        assert!(engine.resolve_rounds() >= 4);
    }

    #[test]
    fn test_deterministic_result() {
        let records = || vec![
            ("A", vec!["B", "C", "D"]),
            ("B", vec!["C", "A"]),
            ("C", vec!["A", "D"]),
            ("D", vec!["B"]),
        ];
        let mut first = engine(records(), "A", 0.15, 1e-3);
        let mut second = engine(records(), "A", 0.15, 1e-3);
        first.run().unwrap();
        second.run().unwrap();
        for v in ["A", "B", "C", "D"] {
            assert_eq!(first.rank(v).to_bits(), second.rank(v).to_bits());
        }
        assert_eq!(first.pushes(), second.pushes());
    }
}
