//! Extraction specification types.
//!
//! An [`ExtractionSpec`] selects one extraction policy and the options that
//! shape its output. It is the input to the
//! [`super::validation::ValidationEngine`] and to
//! [`super::runner::Runner::from_spec`].
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "v": 1,
//!   "policy": { "type": "cut_by_height", "threshold": 1.5 },
//!   "output": "hierarchical",
//!   "singletons": false,
//!   "strict": false
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error_code::ErrorCode;
use super::errors::SpecError;
use crate::types::{CutConfig, DensityConfig, NoiseConfig, OutputMode};

/// The only spec version understood by this crate.
pub const SUPPORTED_VERSION: u32 = 1;

/// Top-level extraction specification (v1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSpec {
    /// Spec version (currently `1`).
    pub v: u32,

    /// Selected extraction policy. Required; a missing policy is reported by
    /// validation rather than by the parser.
    #[serde(default)]
    pub policy: Option<PolicySpec>,

    /// Flat partition or truncated hierarchy (cut policies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputMode>,

    /// Singleton clusters for unmerged objects (cut policies).
    #[serde(default)]
    pub singletons: bool,

    /// Nest clusters under their parents (density policies, default `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchical: Option<bool>,

    /// If `true`, unrecognized fields are errors; if `false`, warnings.
    #[serde(default)]
    pub strict: bool,

    /// Captures any fields not recognized by the schema.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// One of the supported extraction policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicySpec {
    CutByHeight {
        threshold: f64,
    },
    CutByCount {
        min_clusters: usize,
    },
    FullHierarchy,
    ClustersWithNoise {
        num_clusters: usize,
        #[serde(default = "default_min_cluster_size")]
        min_cluster_size: usize,
    },
    Hdbscan {
        #[serde(default = "default_min_cluster_size")]
        min_cluster_size: usize,
    },
    Simplified {
        #[serde(default = "default_min_cluster_size")]
        min_cluster_size: usize,
    },
}

fn default_min_cluster_size() -> usize {
    1
}

impl PolicySpec {
    /// Wire name of the policy type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CutByHeight { .. } => "cut_by_height",
            Self::CutByCount { .. } => "cut_by_count",
            Self::FullHierarchy => "full_hierarchy",
            Self::ClustersWithNoise { .. } => "clusters_with_noise",
            Self::Hdbscan { .. } => "hdbscan",
            Self::Simplified { .. } => "simplified",
        }
    }

    /// Policies executed by the baseline dendrogram cut.
    pub fn is_cut(&self) -> bool {
        matches!(
            self,
            Self::CutByHeight { .. } | Self::CutByCount { .. } | Self::FullHierarchy
        )
    }

    /// Policies driven by a minimum cluster size with density semantics.
    pub fn is_density(&self) -> bool {
        matches!(self, Self::Hdbscan { .. } | Self::Simplified { .. })
    }
}

impl ExtractionSpec {
    /// A v1 spec selecting `policy` with every option at its default.
    pub fn new(policy: PolicySpec) -> Self {
        Self {
            v: SUPPORTED_VERSION,
            policy: Some(policy),
            output: None,
            singletons: false,
            hierarchical: None,
            strict: false,
            unknown_fields: HashMap::new(),
        }
    }

    /// Parse a spec from JSON.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        serde_json::from_str(json).map_err(|e| {
            SpecError::new(ErrorCode::MalformedSpec, "", e.to_string())
                .with_hint("Expected an object with \"v\" and a \"policy\" carrying a \"type\"")
        })
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_singletons(mut self, singletons: bool) -> Self {
        self.singletons = singletons;
        self
    }

    pub fn with_hierarchical(mut self, hierarchical: bool) -> Self {
        self.hierarchical = Some(hierarchical);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Configuration for the baseline cut, if a cut policy is selected.
    pub fn cut_config(&self) -> Option<CutConfig> {
        let config = match self.policy.as_ref()? {
            PolicySpec::CutByHeight { threshold } => CutConfig::by_threshold(*threshold),
            PolicySpec::CutByCount { min_clusters } => CutConfig::by_min_clusters(*min_clusters),
            PolicySpec::FullHierarchy => CutConfig::full_hierarchy(),
            _ => return None,
        };
        let config = match self.output {
            Some(output) => config.with_output(output),
            None => config,
        };
        Some(config.with_singletons(self.singletons))
    }

    /// Configuration for the count + noise extraction, if selected.
    pub fn noise_config(&self) -> Option<NoiseConfig> {
        match self.policy.as_ref()? {
            PolicySpec::ClustersWithNoise {
                num_clusters,
                min_cluster_size,
            } => Some(NoiseConfig::new(*num_clusters, *min_cluster_size)),
            _ => None,
        }
    }

    /// Configuration for the density extractions, if one is selected.
    pub fn density_config(&self) -> Option<DensityConfig> {
        match self.policy.as_ref()? {
            PolicySpec::Hdbscan { min_cluster_size }
            | PolicySpec::Simplified { min_cluster_size } => {
                let config = DensityConfig::new(*min_cluster_size);
                Some(match self.hierarchical {
                    Some(hierarchical) => config.with_hierarchical(hierarchical),
                    None => config,
                })
            }
            _ => None,
        }
    }
}
