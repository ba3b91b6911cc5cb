use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::adj_io::{AdjacencyCache, AdjacencySource, AdjacencyStore, FileSource};
use crate::algorithms::push::{Convergence, MassVector, PushRankEngine};
use crate::algorithms::sweep::{ConductanceSweep, SweepResult};
use crate::config::{PushConfig, RunConfig};
use crate::error::Result;
use crate::io_status::ScanStats;
use crate::types::VertexId;

/// Summary of a local clustering run, suitable for a YAML report.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub source: PathBuf,
    pub seed: VertexId,
    pub alpha: f64,
    pub epsilon: f64,
    pub convergence: Convergence,
    pub pushes: u64,
    pub passes: u64,
    pub resolve_rounds: u64,
    pub scans: u64,
    pub scan_totals: ScanStats,
    pub cached_vertices: usize,
    pub ranked_vertices: usize,
    pub residual_mass: f64,
    pub community: Vec<(VertexId, f64)>,
    pub conductance: f64,
    pub volume: u64,
    pub boundary: u64,
}

/// Everything a run produced.
pub struct ClusterRun {
    pub report: ClusterReport,
    pub rank: MassVector,
    pub sweep: SweepResult,
    /// The adjacency resolved during the run; covers every ranked vertex.
    pub cache: AdjacencyCache,
}

/// Push, then sweep, over a single adjacency source.
pub struct LocalClustering<S> {
    store: AdjacencyStore<S>,
    seed: VertexId,
    config: PushConfig,
}

impl LocalClustering<FileSource> {
    /// Builds a run over the file named by `config`, after validating it.
    pub fn from_run_config(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let store = AdjacencyStore::new(FileSource::new(&config.source))
            .with_progress(config.show_progress);
        Ok(LocalClustering {
            store,
            seed: config.seed.clone(),
            config: config.push,
        })
    }
}

impl<S: AdjacencySource> LocalClustering<S> {
    pub fn new(source: S, seed: impl Into<VertexId>, config: PushConfig) -> Self {
        LocalClustering {
            store: AdjacencyStore::new(source),
            seed: seed.into(),
            config,
        }
    }

    pub fn run(self) -> Result<ClusterRun> {
        let source_path = self.store.source().path().to_path_buf();
        let mut engine = PushRankEngine::new(self.store, self.seed.clone(), self.config)?;
        let convergence = engine.run()?;
        let (outcome, mut store) = engine.into_parts(convergence);

        // Every pushed vertex is cached already; this only matters for a
        // seed that was never pushed.
        let unresolved: Vec<VertexId> = outcome
            .rank
            .keys()
            .filter(|v| !store.contains(v))
            .cloned()
            .collect();
        store.resolve(unresolved)?;

        let sweep = ConductanceSweep::new(store.cache(), &self.seed).run(&outcome.rank)?;
        let ranked_vertices = outcome.rank.values().filter(|r| **r > 0.0).count();
        info!(
            "Community of {:?}: {} of {} ranked vertices, conductance {:.6}",
            self.seed,
            sweep.len(),
            ranked_vertices,
            sweep.conductance
        );

        let report = ClusterReport {
            source: source_path,
            seed: self.seed,
            alpha: self.config.alpha,
            epsilon: self.config.epsilon,
            convergence,
            pushes: outcome.pushes,
            passes: outcome.passes,
            resolve_rounds: outcome.resolve_rounds,
            scans: store.scan_count(),
            scan_totals: store.scan_totals(),
            cached_vertices: store.cache().len(),
            ranked_vertices,
            residual_mass: outcome.residual.values().sum(),
            community: sweep.members.clone(),
            conductance: sweep.conductance,
            volume: sweep.volume,
            boundary: sweep.boundary,
        };

        Ok(ClusterRun {
            report,
            rank: outcome.rank,
            sweep,
            cache: store.into_cache(),
        })
    }
}

#[cfg(test)]
mod test_cluster {
    use super::*;
    use crate::adj_io::MemorySource;
    use crate::error::LocalClusterError;

    #[test]
    fn test_triangle_run() {
        let source = MemorySource::new("A\tB\tC\nB\tA\nC\tA\n");
        let run = LocalClustering::new(source, "A", PushConfig::new(0.5, 0.1)).run().unwrap();

        assert_eq!(run.report.convergence, Convergence::Converged);
        assert_eq!(run.sweep.members[0].0, "A");
        assert!(run.sweep.contains("A"));
        assert_eq!(run.report.community, run.sweep.members);
        assert_eq!(run.report.cached_vertices, 3);
        assert_eq!(run.report.ranked_vertices, 3);
        // Closed triangle: the whole of it has no boundary.
        assert_eq!(run.sweep.len(), 3);
        assert_eq!(run.report.conductance, 0.0);
        assert!((run.rank.values().sum::<f64>() + run.report.residual_mass - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_absent_seed_run() {
        let source = MemorySource::new("A\tB\nB\tA\n");
        let run = LocalClustering::new(source, "nowhere", PushConfig::new(0.2, 0.01))
            .run()
            .unwrap();

        assert_eq!(run.sweep.members, vec![("nowhere".to_string(), 1.0)]);
        assert_eq!(run.report.scans, 1);
        assert_eq!(run.report.volume, 0);
    }

    #[test]
    fn test_invalid_config_fails_before_reading() {
        let config = RunConfig::new("/definitely/not/here.adj", "A", PushConfig::new(0.5, -0.1));
        assert!(matches!(
            LocalClustering::from_run_config(&config),
            Err(LocalClusterError::Config(_))
        ));

        let config = RunConfig::new("/definitely/not/here.adj", "A", PushConfig::new(0.5, 0.1));
        let clustering = LocalClustering::from_run_config(&config).unwrap();
        assert!(matches!(clustering.run(), Err(LocalClusterError::Io { .. })));
    }
}
