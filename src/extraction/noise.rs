//! A target number of clusters, with small groups reported as noise.
//!
//! Pass 1 replays the merges on cluster sizes only and remembers the prefix
//! of the merge order whose count of large-enough clusters is closest to the
//! target. Pass 2 replays that prefix with real member sets, and every object
//! from the prefix onwards is classified as the lead of a cluster or as noise.

use tracing::{debug, warn};

use crate::clustering::{Cluster, Clustering, ExtractionWarning};
use crate::errors::Result;
use crate::extraction::accumulator::{MemberSets, SizeTracker};
use crate::extraction::{checked_order, make_cluster, successor, Extractor, Progress};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::observer::ExtractionObserver;
use crate::types::{NoiseConfig, ObjectId};

/// Extract `num_clusters` clusters of at least `min_cluster_size` objects.
#[derive(Debug, Clone, Default)]
pub struct ClustersWithNoise {
    config: NoiseConfig,
}

impl ClustersWithNoise {
    pub fn new(config: NoiseConfig) -> Self {
        Self { config }
    }

    pub fn with_target(num_clusters: usize, min_cluster_size: usize) -> Self {
        Self::new(NoiseConfig::new(num_clusters, min_cluster_size))
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }
}

/// Best prefix length of the merge order and the cluster count it achieves.
///
/// An exact match always replaces the current best, so the last prefix
/// reaching the target wins.
pub fn best_prefix<H: PointerHierarchy + ?Sized>(
    hierarchy: &H,
    order: &[ObjectId],
    num_clusters: usize,
    min_cluster_size: usize,
) -> Result<(usize, usize)> {
    let n = hierarchy.len();
    let mut sizes = SizeTracker::new(n, min_cluster_size);
    let mut best = (0, sizes.large_clusters());

    for (i, &x) in order.iter().enumerate() {
        let succ = successor(hierarchy, x, n)?;
        if succ == x {
            continue;
        }
        sizes.union(x, succ);
        let count = sizes.large_clusters();
        if count == num_clusters || count.abs_diff(num_clusters) < best.1.abs_diff(num_clusters) {
            best = (i + 1, count);
        }
    }
    Ok(best)
}

impl Extractor for ClustersWithNoise {
    fn name(&self) -> &'static str {
        "clusters_with_noise"
    }

    fn extract_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized,
    {
        self.config.validate()?;
        let n = hierarchy.len();
        let order = checked_order(hierarchy)?;
        let requested = self.config.num_clusters;
        let min_size = self.config.min_cluster_size;

        let (prefix, achieved) = best_prefix(hierarchy, order, requested, min_size)?;
        debug!(prefix, achieved, requested, "size simulation finished");

        let mut clustering = Clustering::new("Flattened Hierarchical Clustering");
        if achieved != requested {
            warn!(requested, achieved, "could not obtain the requested number of clusters");
            clustering.push_warning(ExtractionWarning::TargetNotReached {
                requested,
                achieved,
            });
        }

        let mut progress = Progress::start(observer, self.name(), n);
        let mut sets = MemberSets::new(n);
        let mut heights = vec![f64::NAN; n];
        let mut noise = Vec::new();

        for (i, &x) in order.iter().enumerate() {
            if i < prefix {
                let succ = successor(hierarchy, x, n)?;
                if succ != x {
                    sets.union_into(x, succ);
                    // f64::max ignores NaN, so unmerged sides contribute nothing
                    heights[succ] = heights[succ].max(heights[x]).max(hierarchy.merge_distance(x));
                }
            } else {
                let members = sets.take(x).unwrap_or_else(|| vec![x]);
                if members.len() < min_size {
                    noise.extend(members);
                } else {
                    clustering.push_toplevel(make_cluster(hierarchy, x, heights[x], members));
                }
            }
            progress.tick();
        }

        if !noise.is_empty() {
            debug!(noise = noise.len(), "noise objects");
            clustering.push_toplevel(Cluster::noise(noise));
        }
        progress.finish(&clustering);
        Ok(clustering)
    }
}
