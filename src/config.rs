use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LocalClusterError, Result};

/// Capacity of the buffered reader used for every scan of an adjacency file.
pub const READ_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Teleport probability used when none is given.
pub const DEFAULT_ALPHA: f64 = 0.15;

/// Activity threshold used when none is given.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Parameters of the push iteration.
///
/// # Fields
/// * `alpha` - Teleport probability, strictly between 0 and 1
/// * `epsilon` - Activity threshold on `residual / degree`, strictly positive
/// * `max_pushes` - Optional ceiling on the number of pushes of a run, at least 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    pub alpha: f64,
    pub epsilon: f64,
    #[serde(default)]
    pub max_pushes: Option<u64>,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            alpha: DEFAULT_ALPHA,
            epsilon: DEFAULT_EPSILON,
            max_pushes: None,
        }
    }
}

impl PushConfig {
    pub fn new(alpha: f64, epsilon: f64) -> Self {
        PushConfig {
            alpha,
            epsilon,
            max_pushes: None,
        }
    }

    pub fn with_max_pushes(mut self, max_pushes: u64) -> Self {
        self.max_pushes = Some(max_pushes);
        self
    }

    /// Checks the parameter ranges the push iteration relies on.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(LocalClusterError::Config(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(LocalClusterError::Config(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        if self.max_pushes == Some(0) {
            return Err(LocalClusterError::Config(
                "max_pushes must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a single run needs: where the graph lives, where to start, and
/// how to push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path of the tab-separated adjacency file.
    pub source: PathBuf,

    /// Seed vertex id.
    pub seed: String,

    #[serde(default)]
    pub push: PushConfig,

    /// Draw a progress bar during each scan of the source.
    #[serde(default)]
    pub show_progress: bool,
}

impl RunConfig {
    pub fn new(source: impl Into<PathBuf>, seed: impl Into<String>, push: PushConfig) -> Self {
        RunConfig {
            source: source.into(),
            seed: seed.into(),
            push,
            show_progress: false,
        }
    }

    /// Loads a run configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LocalClusterError::io(e, path))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed.is_empty() {
            return Err(LocalClusterError::Config("seed vertex id is empty".to_string()));
        }
        if self.seed.contains('\t') {
            return Err(LocalClusterError::Config(
                "seed vertex id must not contain a tab".to_string(),
            ));
        }
        if self.source.as_os_str().is_empty() {
            return Err(LocalClusterError::Config("source path is empty".to_string()));
        }
        self.push.validate()
    }
}
