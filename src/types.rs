//! Core types for dendrocut
//!
//! Object handles and the configuration of each extraction policy.

use crate::errors::{ExtractionError, Result};
use serde::{Deserialize, Serialize};

/// Dense handle of an object in a pointer hierarchy (`0..N`).
pub type ObjectId = usize;

// ============================================================================
// Cut modes
// ============================================================================

/// Where to cut a dendrogram for the baseline extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Cut so that at least `min_clusters` clusters remain. Tied merge heights
    /// are never split, so the result may contain more clusters.
    ByMinClusters { min_clusters: usize },
    /// Cut below every merge at height `>= threshold`.
    ByThreshold { threshold: f64 },
    /// No cut: assemble the complete hierarchy.
    NoThreshold,
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::ByMinClusters { min_clusters: 1 }
    }
}

/// Shape of the extracted result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Strict partition: every cluster is top-level
    #[default]
    Flat,
    /// Truncated hierarchy: merges above the cut become parent clusters
    Hierarchical,
}

impl OutputMode {
    pub fn is_hierarchical(self) -> bool {
        matches!(self, OutputMode::Hierarchical)
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "hierarchical" | "hierarchy" | "partial_hierarchy" | "tree" => OutputMode::Hierarchical,
            _ => OutputMode::Flat,
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(OutputMode::parse(value))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for cutting a dendrogram by height or cluster count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutConfig {
    /// Where to cut
    #[serde(default)]
    pub threshold: ThresholdMode,
    /// Flat partition or truncated hierarchy
    #[serde(default)]
    pub output: OutputMode,
    /// Give every unmerged object above the cut its own singleton cluster
    /// (hierarchical output only). Produces a more complex hierarchy.
    #[serde(default)]
    pub singletons: bool,
}

impl CutConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut below every merge at or above `threshold`
    pub fn by_threshold(threshold: f64) -> Self {
        Self::default().with_threshold_mode(ThresholdMode::ByThreshold { threshold })
    }

    /// Cut to obtain at least `min_clusters` clusters
    pub fn by_min_clusters(min_clusters: usize) -> Self {
        Self::default().with_threshold_mode(ThresholdMode::ByMinClusters { min_clusters })
    }

    /// Keep the complete hierarchy
    pub fn full_hierarchy() -> Self {
        Self::default()
            .with_threshold_mode(ThresholdMode::NoThreshold)
            .with_output(OutputMode::Hierarchical)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.threshold {
            ThresholdMode::ByMinClusters { min_clusters } if min_clusters == 0 => Err(
                ExtractionError::invalid_config("min_clusters must be >= 1"),
            ),
            ThresholdMode::ByThreshold { threshold } if threshold.is_nan() => Err(
                ExtractionError::invalid_config("threshold must not be NaN"),
            ),
            _ => Ok(()),
        }
    }

    /// Builder method: set threshold mode
    pub fn with_threshold_mode(mut self, mode: ThresholdMode) -> Self {
        self.threshold = mode;
        self
    }

    /// Builder method: set output mode
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Builder method: toggle singleton clusters
    pub fn with_singletons(mut self, singletons: bool) -> Self {
        self.singletons = singletons;
        self
    }
}

/// Configuration for extracting a target number of clusters plus noise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Number of clusters of at least `min_cluster_size` objects to obtain
    pub num_clusters: usize,
    /// Smaller groups are reported as noise
    pub min_cluster_size: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            num_clusters: 1,
            min_cluster_size: 1,
        }
    }
}

impl NoiseConfig {
    pub fn new(num_clusters: usize, min_cluster_size: usize) -> Self {
        Self {
            num_clusters,
            min_cluster_size,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(ExtractionError::invalid_config("num_clusters must be >= 1"));
        }
        if self.min_cluster_size == 0 {
            return Err(ExtractionError::invalid_config(
                "min_cluster_size must be >= 1",
            ));
        }
        Ok(())
    }

    /// Builder method: set the target cluster count
    pub fn with_num_clusters(mut self, num_clusters: usize) -> Self {
        self.num_clusters = num_clusters;
        self
    }

    /// Builder method: set the minimum cluster size
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }
}

/// Configuration shared by the density-based extractions (HDBSCAN and the
/// simplified single-pass variant)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Minimum number of objects for a cluster to be reported
    pub min_cluster_size: usize,
    /// Nest clusters under their parents (and under the noise cluster)
    #[serde(default = "default_hierarchical")]
    pub hierarchical: bool,
}

fn default_hierarchical() -> bool {
    true
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 1,
            hierarchical: default_hierarchical(),
        }
    }
}

impl DensityConfig {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size == 0 {
            return Err(ExtractionError::invalid_config(
                "min_cluster_size must be >= 1",
            ));
        }
        Ok(())
    }

    /// Builder method: set the minimum cluster size
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Builder method: toggle hierarchical output
    pub fn with_hierarchical(mut self, hierarchical: bool) -> Self {
        self.hierarchical = hierarchical;
        self
    }
}
