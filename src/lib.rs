pub mod adj_io;
pub mod algorithms;
pub mod config;
pub mod error;
pub mod export;
pub mod io_status;
pub mod types;

pub use adj_io::{AdjacencyCache, AdjacencySource, AdjacencyStore, FileSource, MemorySource};
pub use algorithms::cluster::{ClusterReport, ClusterRun, LocalClustering};
pub use algorithms::push::{Convergence, MassVector, PushOutcome, PushRankEngine};
pub use algorithms::sweep::{ConductanceSweep, SweepResult};
pub use config::{PushConfig, RunConfig};
pub use error::{LocalClusterError, Result};
