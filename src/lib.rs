//! # dendrocut
//!
//! Extract clusterings from a dendrogram given in pointer representation.
//!
//! A pointer hierarchy assigns every object a successor and the distance at
//! which it merges into it, plus a topological order that replays the merges
//! bottom-up. From that, this crate extracts:
//!
//! - **Cuts** by height, by minimum cluster count, or the complete hierarchy
//! - **Clusters with noise**: a target number of large-enough clusters
//! - **HDBSCAN**: clusters selected by excess of mass
//! - **Simplified**: a single-pass density hierarchy without pruning
//!
//! ## Quick start
//!
//! ```rust
//! use dendrocut::{CutDendrogram, Extractor, PointerRepresentation};
//!
//! let h = PointerRepresentation::new(
//!     vec![0, 0, 0, 2],
//!     vec![f64::INFINITY, 1.0, 2.0, 1.0],
//! )
//! .unwrap();
//! let result = CutDendrogram::by_threshold(1.5).extract(&h).unwrap();
//! assert_eq!(result.toplevel_partition(), vec![vec![0, 1], vec![2, 3]]);
//! ```

pub mod clustering;
pub mod errors;
pub mod extraction;
pub mod hierarchy;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use clustering::{Cluster, ClusterId, Clustering, DendrogramModel, ExtractionWarning};
pub use errors::{ExtractionError, Result};
pub use hierarchy::{PointerHierarchy, PointerRepresentation, WithPrototypes};
pub use types::{CutConfig, DensityConfig, NoiseConfig, ObjectId, OutputMode, ThresholdMode};

// Re-export main functionality
pub use extraction::{
    find_split, ClustersWithNoise, CutDendrogram, Extractor, HdbscanExtraction,
    SimplifiedExtraction, SplitPolicy,
};
pub use pipeline::error_code::ErrorCode;
pub use pipeline::errors::{RunError, SpecError};
pub use pipeline::observer::{CountingObserver, ExtractionObserver, NoopObserver};
pub use pipeline::runner::Runner;
pub use pipeline::spec::{ExtractionSpec, PolicySpec};
pub use pipeline::validation::{ValidationEngine, ValidationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
