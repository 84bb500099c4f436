//! Baseline extraction: cut the dendrogram by height or by cluster count.
//!
//! Merges before the split are absorbed into leaf clusters (Phase A). The
//! objects from the split onwards are then assembled either into a flat
//! partition, where unmerged objects become singletons, or into a truncated
//! hierarchy whose inner nodes are the merges above the cut (Phase B).

use tracing::debug;

use crate::clustering::{ClusterId, Clustering};
use crate::errors::{ExtractionError, Result};
use crate::extraction::accumulator::LeafClusters;
use crate::extraction::split::find_split;
use crate::extraction::{checked_order, make_cluster, successor, Extractor, Progress};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::observer::ExtractionObserver;
use crate::types::{CutConfig, ObjectId, OutputMode, ThresholdMode};

/// Cut a dendrogram at a height threshold or a minimum number of clusters.
#[derive(Debug, Clone, Default)]
pub struct CutDendrogram {
    config: CutConfig,
}

impl CutDendrogram {
    pub fn new(config: CutConfig) -> Self {
        Self { config }
    }

    /// Flat partition below `threshold`
    pub fn by_threshold(threshold: f64) -> Self {
        Self::new(CutConfig::by_threshold(threshold))
    }

    /// Flat partition with at least `min_clusters` clusters
    pub fn by_min_clusters(min_clusters: usize) -> Self {
        Self::new(CutConfig::by_min_clusters(min_clusters))
    }

    /// The complete hierarchy, one cluster per merge
    pub fn full_hierarchy() -> Self {
        Self::new(CutConfig::full_hierarchy())
    }

    pub fn config(&self) -> &CutConfig {
        &self.config
    }

    /// Without a threshold there is nothing to flatten, so the full
    /// hierarchy is always produced.
    fn output(&self) -> OutputMode {
        match self.config.threshold {
            ThresholdMode::NoThreshold => OutputMode::Hierarchical,
            _ => self.config.output,
        }
    }
}

impl Extractor for CutDendrogram {
    fn name(&self) -> &'static str {
        "cut_dendrogram"
    }

    fn extract_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized,
    {
        self.config.validate()?;
        let n = hierarchy.len();
        let order = checked_order(hierarchy)?;

        // The root always stays above the cut.
        let split = find_split(hierarchy, self.config.threshold.into()).min(n.saturating_sub(1));
        debug!(split, num_objects = n, "cut dendrogram");

        let mut progress = Progress::start(observer, self.name(), n);

        // Phase A: absorb everything below the split into leaf clusters
        let mut leaves = LeafClusters::new(n);
        for &x in order[..split].iter().rev() {
            let succ = successor(hierarchy, x, n)?;
            if succ != x {
                leaves.absorb(x, succ, hierarchy.merge_distance(x));
            }
            progress.tick();
        }
        debug!(leaf_clusters = leaves.len(), "leaf clusters formed");

        let clustering = match self.output() {
            OutputMode::Flat => assemble_flat(hierarchy, &order[split..], leaves, &mut progress),
            OutputMode::Hierarchical => assemble_hierarchy(
                hierarchy,
                &order[split..],
                leaves,
                self.config.singletons,
                &mut progress,
            )?,
        };
        progress.finish(&clustering);
        Ok(clustering)
    }
}

// ─── Flat output ────────────────────────────────────────────────────────────

fn assemble_flat<H, O>(
    hierarchy: &H,
    above: &[ObjectId],
    mut leaves: LeafClusters,
    progress: &mut Progress<'_, O>,
) -> Clustering
where
    H: PointerHierarchy + ?Sized,
    O: ExtractionObserver + ?Sized,
{
    let mut clustering = Clustering::new("Flattened Hierarchical Clustering");
    let unmerged: Vec<ObjectId> = above
        .iter()
        .copied()
        .filter(|&x| leaves.cluster_of(x).is_none())
        .collect();

    for leaf in leaves.take_clusters() {
        clustering.push_toplevel(make_cluster(hierarchy, leaf.lead, leaf.height, leaf.members));
    }
    for _ in 0..above.len() {
        progress.tick();
    }
    // Objects never merged below the cut have no height of their own.
    for x in unmerged {
        clustering.push_toplevel(make_cluster(hierarchy, x, f64::NAN, vec![x]));
    }
    clustering
}

// ─── Hierarchical output ────────────────────────────────────────────────────

fn assemble_hierarchy<H, O>(
    hierarchy: &H,
    above: &[ObjectId],
    mut leaves: LeafClusters,
    singletons: bool,
    progress: &mut Progress<'_, O>,
) -> Result<Clustering>
where
    H: PointerHierarchy + ?Sized,
    O: ExtractionObserver + ?Sized,
{
    let n = hierarchy.len();
    let mut clustering = Clustering::new("Hierarchical Clustering");

    // Slot table: index as handed out by `leaves`, value is the output cluster
    // currently representing that slot.
    let mut slots: Vec<ClusterId> = leaves
        .take_clusters()
        .into_iter()
        .map(|leaf| {
            clustering.add_cluster(make_cluster(hierarchy, leaf.lead, leaf.height, leaf.members))
        })
        .collect();

    let mut root: Option<ClusterId> = None;
    for &x in above {
        let own_slot = leaves.cluster_of(x);
        let own = match own_slot {
            Some(slot) => Some(slots[slot]),
            None if singletons || n == 1 => {
                Some(clustering.add_cluster(make_cluster(hierarchy, x, f64::NAN, vec![x])))
            }
            None => None,
        };

        let succ = successor(hierarchy, x, n)?;
        if succ == x {
            if root.is_some() {
                return Err(ExtractionError::structural(format!(
                    "object {x} is a second root"
                )));
            }
            let id = own.ok_or_else(|| {
                ExtractionError::structural(format!("root {x} never received a cluster"))
            })?;
            root = Some(id);
            progress.tick();
            continue;
        }

        let depth = hierarchy.merge_distance(x);
        // A cluster already at this height absorbs the merge instead of
        // gaining a parent at the same height.
        let own_at_depth = own.filter(|&c| clustering.cluster(c).height() == depth);
        match leaves.cluster_of(succ) {
            Some(slot) => {
                let parent = slots[slot];
                if clustering.cluster(parent).height() == depth {
                    match own {
                        Some(child) => clustering.add_child(parent, child),
                        None => clustering.add_member(parent, x),
                    }
                } else if let Some(target) = own_at_depth {
                    clustering.add_child(target, parent);
                    slots[slot] = target;
                } else {
                    let members = if own.is_none() { vec![x] } else { Vec::new() };
                    let merged = clustering.add_cluster(make_cluster(hierarchy, succ, depth, members));
                    if let Some(child) = own {
                        clustering.add_child(merged, child);
                    }
                    clustering.add_child(merged, parent);
                    slots[slot] = merged;
                }
            }
            None => {
                if let (Some(target), Some(slot)) = (own_at_depth, own_slot) {
                    if singletons {
                        clustering.push_child(target, make_cluster(hierarchy, succ, f64::NAN, vec![succ]));
                    } else {
                        clustering.add_member(target, succ);
                    }
                    leaves.assign(succ, slot);
                    progress.tick();
                    continue;
                }
                let merged = if singletons {
                    let merged =
                        clustering.add_cluster(make_cluster(hierarchy, succ, depth, Vec::new()));
                    clustering.push_child(merged, make_cluster(hierarchy, succ, f64::NAN, vec![succ]));
                    merged
                } else {
                    let mut members = vec![succ];
                    if own.is_none() {
                        members.push(x);
                    }
                    clustering.add_cluster(make_cluster(hierarchy, succ, depth, members))
                };
                if let Some(child) = own {
                    clustering.add_child(merged, child);
                }
                slots.push(merged);
                leaves.assign(succ, slots.len() - 1);
            }
        }
        progress.tick();
    }

    match root {
        Some(id) => clustering.add_toplevel(id),
        None if n == 0 => {}
        None => return Err(ExtractionError::structural("no root found above the cut")),
    }
    Ok(clustering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::PointerRepresentation;
    use crate::pipeline::observer::CountingObserver;

    /// a=0, b=1, c=2, d=3: (a,b)@1, (c,d)@1, (ab,cd)@2
    fn four() -> PointerRepresentation {
        PointerRepresentation::new(vec![0, 0, 0, 2], vec![f64::INFINITY, 1.0, 2.0, 1.0]).unwrap()
    }

    fn sorted_members(c: &Clustering) -> Vec<ObjectId> {
        let mut all = c.all_members();
        all.sort_unstable();
        all
    }

    #[test]
    fn test_cut_between_merge_levels() {
        let result = CutDendrogram::by_threshold(1.5).extract(&four()).unwrap();
        assert_eq!(result.toplevel().len(), 2);
        assert_eq!(result.toplevel_partition(), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(result.name(), "Flattened Hierarchical Clustering");
    }

    #[test]
    fn test_cut_above_everything() {
        let result = CutDendrogram::by_threshold(2.5).extract(&four()).unwrap();
        assert_eq!(result.toplevel_partition(), vec![vec![0, 1, 2, 3]]);
        assert_eq!(result.cluster(result.toplevel()[0]).height(), 2.0);
    }

    #[test]
    fn test_cut_below_everything_gives_singletons() {
        let result = CutDendrogram::by_threshold(0.5).extract(&four()).unwrap();
        assert_eq!(result.toplevel().len(), 4);
        for cluster in result.toplevel_clusters() {
            assert_eq!(cluster.len(), 1);
            assert!(cluster.height().is_nan());
            assert!(cluster.name.starts_with("obj_"));
        }
    }

    #[test]
    fn test_cut_by_count() {
        let result = CutDendrogram::by_min_clusters(2).extract(&four()).unwrap();
        assert_eq!(result.toplevel_partition(), vec![vec![0, 1], vec![2, 3]]);

        // Three clusters would split a tie, so all four objects stay apart.
        let result = CutDendrogram::by_min_clusters(3).extract(&four()).unwrap();
        assert_eq!(result.toplevel().len(), 4);
    }

    #[test]
    fn test_hierarchical_cut_keeps_merges_above() {
        let config = CutConfig::by_threshold(1.5).with_output(OutputMode::Hierarchical);
        let result = CutDendrogram::new(config).extract(&four()).unwrap();

        assert_eq!(result.toplevel().len(), 1);
        let root = result.toplevel()[0];
        let top = result.cluster(root);
        assert_eq!(top.name, "mrg_0_2");
        assert!(top.is_empty());
        assert_eq!(result.children(root).len(), 2);
        assert_eq!(sorted_members(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_full_hierarchy_matches_hierarchical_cut() {
        let result = CutDendrogram::full_hierarchy().extract(&four()).unwrap();
        assert_eq!(result.name(), "Hierarchical Clustering");
        let root = result.toplevel()[0];
        let mut child_names: Vec<&str> = result
            .children(root)
            .iter()
            .map(|&c| result.cluster(c).name.as_str())
            .collect();
        child_names.sort_unstable();
        assert_eq!(child_names, vec!["clu_0_1", "clu_2_1"]);
        assert_eq!(sorted_members(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_same_height_merges_share_a_cluster() {
        // star: 1 and 2 both join 0 at height 1
        let h = PointerRepresentation::new(vec![0, 0, 0], vec![f64::INFINITY, 1.0, 1.0]).unwrap();
        let result = CutDendrogram::full_hierarchy().extract(&h).unwrap();
        assert_eq!(result.len(), 1);
        let mut members = result.cluster(result.toplevel()[0]).members.clone();
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_at_one_height_folds_into_one_cluster() {
        // 2 joins 1, then 1 joins 0, both at height 1
        let h = PointerRepresentation::new(vec![0, 0, 1], vec![f64::INFINITY, 1.0, 1.0]).unwrap();
        let result = CutDendrogram::full_hierarchy().extract(&h).unwrap();
        assert_eq!(result.len(), 1);
        let top = result.cluster(result.toplevel()[0]);
        assert_eq!(top.height(), 1.0);
        let mut members = top.members.clone();
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_at_one_height_with_singletons() {
        let h = PointerRepresentation::new(vec![0, 0, 1], vec![f64::INFINITY, 1.0, 1.0]).unwrap();
        let config = CutConfig::full_hierarchy().with_singletons(true);
        let result = CutDendrogram::new(config).extract(&h).unwrap();
        // one merge cluster over three singletons
        assert_eq!(result.len(), 4);
        let root = result.toplevel()[0];
        assert_eq!(result.cluster(root).height(), 1.0);
        assert!(result.cluster(root).is_empty());
        assert_eq!(result.children(root).len(), 3);
        assert_eq!(sorted_members(&result), vec![0, 1, 2]);
    }

    #[test]
    fn test_singletons_build_one_cluster_per_object() {
        let config = CutConfig::full_hierarchy().with_singletons(true);
        let result = CutDendrogram::new(config).extract(&four()).unwrap();

        let singles = result.clusters().iter().filter(|c| c.name.starts_with("obj_")).count();
        assert_eq!(singles, 4);
        assert_eq!(result.len(), 7);
        assert_eq!(result.reachable().len(), 7);
        assert_eq!(sorted_members(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_object_hierarchy() {
        let h = PointerRepresentation::new(vec![0], vec![f64::INFINITY]).unwrap();
        let flat = CutDendrogram::by_min_clusters(1).extract(&h).unwrap();
        assert_eq!(flat.all_members(), vec![0]);

        let full = CutDendrogram::full_hierarchy().extract(&h).unwrap();
        assert_eq!(full.all_members(), vec![0]);
        assert_eq!(full.cluster(full.toplevel()[0]).name, "obj_0");
    }

    #[test]
    fn test_empty_hierarchy() {
        let h = PointerRepresentation::new(vec![], vec![]).unwrap();
        assert!(CutDendrogram::by_threshold(1.0).extract(&h).unwrap().is_empty());
        assert!(CutDendrogram::full_hierarchy().extract(&h).unwrap().is_empty());
    }

    #[test]
    fn test_finite_root_height_does_not_lose_the_root() {
        let h = PointerRepresentation::new(vec![0, 0], vec![5.0, 1.0]).unwrap();
        let result = CutDendrogram::by_threshold(10.0).extract(&h).unwrap();
        assert_eq!(result.toplevel_partition(), vec![vec![0, 1]]);
    }

    struct TwoRoots;

    impl PointerHierarchy for TwoRoots {
        fn len(&self) -> usize {
            2
        }
        fn order(&self) -> &[ObjectId] {
            &[0, 1]
        }
        fn parent(&self, x: ObjectId) -> ObjectId {
            x
        }
        fn merge_distance(&self, _x: ObjectId) -> f64 {
            f64::INFINITY
        }
    }

    #[test]
    fn test_two_roots_is_structural_error() {
        let config = CutConfig::full_hierarchy().with_singletons(true);
        let err = CutDendrogram::new(config).extract(&TwoRoots).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = CutDendrogram::by_min_clusters(0).extract(&four()).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidConfig { .. }));
    }

    #[test]
    fn test_observer_sees_every_object() {
        let mut obs = CountingObserver::new();
        let result = CutDendrogram::by_threshold(1.5)
            .extract_observed(&four(), &mut obs)
            .unwrap();
        assert_eq!(obs.extractor.as_deref(), Some("cut_dendrogram"));
        assert_eq!(obs.processed, 4);
        assert_eq!(obs.clusters, Some(result.len()));
    }
}
