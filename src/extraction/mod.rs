//! Clustering extraction from pointer hierarchies.
//!
//! ## Submodules
//!
//! - [`split`]: where the topological order is cut
//! - [`accumulator`]: union primitives shared by the engines
//! - [`cut`]: baseline extraction by height or cluster count
//! - [`noise`]: a target number of clusters plus noise
//! - [`hdbscan`]: excess-of-mass stability selection
//! - [`simplified`]: single-pass density hierarchy without pruning

pub mod accumulator;
pub mod cut;
pub mod hdbscan;
pub mod noise;
pub mod simplified;
pub mod split;

pub use cut::CutDendrogram;
pub use hdbscan::HdbscanExtraction;
pub use noise::ClustersWithNoise;
pub use simplified::SimplifiedExtraction;
pub use split::{find_split, SplitPolicy};

use crate::clustering::{cluster_name, Cluster, Clustering, DendrogramModel};
use crate::errors::{ExtractionError, Result};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::observer::{ExtractionObserver, NoopObserver};
use crate::types::ObjectId;

/// A policy that turns a pointer hierarchy into a [`Clustering`].
pub trait Extractor {
    /// Stable identifier used in logs and observer callbacks.
    fn name(&self) -> &'static str;

    /// Run the extraction, reporting progress to `observer`.
    fn extract_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized;

    /// Run the extraction without observation.
    fn extract<H: PointerHierarchy + ?Sized>(&self, hierarchy: &H) -> Result<Clustering> {
        self.extract_observed(hierarchy, &mut NoopObserver)
    }
}

/// Running object count forwarded to an observer.
pub(crate) struct Progress<'a, O: ExtractionObserver + ?Sized> {
    observer: &'a mut O,
    processed: usize,
}

impl<'a, O: ExtractionObserver + ?Sized> Progress<'a, O> {
    pub(crate) fn start(observer: &'a mut O, extractor: &str, num_objects: usize) -> Self {
        observer.on_start(extractor, num_objects);
        Self {
            observer,
            processed: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        self.processed += 1;
        self.observer.on_progress(self.processed);
    }

    pub(crate) fn finish(self, clustering: &Clustering) {
        self.observer.on_complete(clustering);
    }
}

/// The topological order, checked for length and object range.
pub(crate) fn checked_order<H: PointerHierarchy + ?Sized>(hierarchy: &H) -> Result<&[ObjectId]> {
    let order = hierarchy.order();
    let n = hierarchy.len();
    if order.len() != n {
        return Err(ExtractionError::structural(format!(
            "topological order lists {} objects, expected {n}",
            order.len()
        )));
    }
    if let Some(&bad) = order.iter().find(|&&x| x >= n) {
        return Err(ExtractionError::structural(format!(
            "topological order lists object {bad}, outside of 0..{n}"
        )));
    }
    Ok(order)
}

/// Successor of `x`, checked against the object range.
pub(crate) fn successor<H>(hierarchy: &H, x: ObjectId, n: usize) -> Result<ObjectId>
where
    H: PointerHierarchy + ?Sized,
{
    let succ = hierarchy.parent(x);
    if succ >= n {
        return Err(ExtractionError::structural(format!(
            "object {x} points to {succ}, outside of 0..{n}"
        )));
    }
    Ok(succ)
}

/// Output cluster led by `lead`, named and modelled after its members.
pub(crate) fn make_cluster<H: PointerHierarchy + ?Sized>(
    hierarchy: &H,
    lead: ObjectId,
    height: f64,
    members: Vec<ObjectId>,
) -> Cluster {
    let model = DendrogramModel::for_members(hierarchy, height, &members);
    Cluster::new(cluster_name(lead, height, &members), members, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CutConfig, DensityConfig, NoiseConfig};

    /// Parents are valid but the order names an object that does not exist.
    struct StrayOrder;

    impl PointerHierarchy for StrayOrder {
        fn len(&self) -> usize {
            2
        }
        fn order(&self) -> &[ObjectId] {
            &[5, 0]
        }
        fn parent(&self, _x: ObjectId) -> ObjectId {
            0
        }
        fn merge_distance(&self, x: ObjectId) -> f64 {
            if x == 0 {
                f64::INFINITY
            } else {
                1.0
            }
        }
    }

    #[test]
    fn test_checked_order_rejects_out_of_range_ids() {
        let err = checked_order(&StrayOrder).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("object 5"));
    }

    #[test]
    fn test_extractors_report_out_of_range_order() {
        let density = DensityConfig::new(1);
        let errors = [
            HdbscanExtraction::new(density.clone()).extract(&StrayOrder).unwrap_err(),
            SimplifiedExtraction::new(density).extract(&StrayOrder).unwrap_err(),
            ClustersWithNoise::new(NoiseConfig::new(1, 1)).extract(&StrayOrder).unwrap_err(),
            CutDendrogram::new(CutConfig::full_hierarchy()).extract(&StrayOrder).unwrap_err(),
        ];
        for err in errors {
            assert!(err.is_structural(), "{err}");
        }
    }
}
