//! Extracted clusterings
//!
//! A [`Clustering`] owns an arena of immutable [`Cluster`]s, the ordered list
//! of top-level clusters and the parent→children edges between them. At most
//! one cluster is flagged as noise. Extractors assemble a clustering through
//! the `add_*` methods and hand it out once complete.

use crate::hierarchy::PointerHierarchy;
use crate::types::ObjectId;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Index of a cluster within its [`Clustering`]
pub type ClusterId = usize;

/// Model attached to every extracted cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DendrogramModel {
    /// Merge height only. `NaN` marks an object left unmerged at the cut.
    Plain { height: f64 },
    /// Merge height plus a representative object of the members.
    WithPrototype { height: f64, prototype: ObjectId },
}

impl DendrogramModel {
    /// Choose the model variant for a member set: the prototype variant is
    /// used whenever the hierarchy offers a representative for it.
    pub fn for_members<H: PointerHierarchy + ?Sized>(
        hierarchy: &H,
        height: f64,
        members: &[ObjectId],
    ) -> Self {
        if members.is_empty() {
            return DendrogramModel::Plain { height };
        }
        match hierarchy.prototype(members) {
            Some(prototype) => DendrogramModel::WithPrototype { height, prototype },
            None => DendrogramModel::Plain { height },
        }
    }

    pub fn height(&self) -> f64 {
        match *self {
            DendrogramModel::Plain { height } | DendrogramModel::WithPrototype { height, .. } => {
                height
            }
        }
    }

    pub fn prototype(&self) -> Option<ObjectId> {
        match *self {
            DendrogramModel::Plain { .. } => None,
            DendrogramModel::WithPrototype { prototype, .. } => Some(prototype),
        }
    }
}

/// One output cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    /// Display label
    pub name: String,
    /// Objects directly in this cluster (not in any child cluster).
    /// Empty for purely structural merge nodes.
    pub members: Vec<ObjectId>,
    pub model: DendrogramModel,
    /// Set only on the synthetic noise cluster
    pub noise: bool,
}

impl Cluster {
    pub fn new(name: impl Into<String>, members: Vec<ObjectId>, model: DendrogramModel) -> Self {
        Self {
            name: name.into(),
            members,
            model,
            noise: false,
        }
    }

    /// The synthetic noise cluster, at infinite height.
    pub fn noise(members: Vec<ObjectId>) -> Self {
        Self {
            name: "Noise".to_string(),
            members,
            model: DendrogramModel::Plain {
                height: f64::INFINITY,
            },
            noise: true,
        }
    }

    pub fn height(&self) -> f64 {
        self.model.height()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Label for a cluster led by `lead` in the cut-based extractions.
pub fn cluster_name(lead: ObjectId, height: f64, members: &[ObjectId]) -> String {
    if members.len() == 1 && members[0] == lead {
        format!("obj_{lead}")
    } else if members.is_empty() {
        format!("mrg_{lead}_{height}")
    } else if height < f64::INFINITY {
        format!("clu_{lead}_{height}")
    } else {
        format!("top_{lead}")
    }
}

/// Non-fatal findings reported alongside a clustering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// No prefix of the merge order produced exactly the requested number of
    /// clusters; the closest achievable count was used.
    TargetNotReached { requested: usize, achieved: usize },
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionWarning::TargetNotReached {
                requested,
                achieved,
            } => write!(
                f,
                "could not obtain exactly {requested} clusters, using {achieved} instead"
            ),
        }
    }
}

// ============================================================================
// Clustering
// ============================================================================

/// An extracted clustering: top-level clusters plus a cluster hierarchy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Clustering {
    name: String,
    clusters: Vec<Cluster>,
    toplevel: Vec<ClusterId>,
    children: Vec<Vec<ClusterId>>,
    warnings: Vec<ExtractionWarning>,
    /// GLOSH outlier score per object, when the extractor computes one
    #[serde(skip_serializing_if = "Option::is_none")]
    outlier_scores: Option<Vec<f64>>,
}

impl Clustering {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a cluster to the arena without attaching it anywhere yet.
    pub fn add_cluster(&mut self, cluster: Cluster) -> ClusterId {
        self.clusters.push(cluster);
        self.children.push(Vec::new());
        self.clusters.len() - 1
    }

    /// Mark an arena cluster as top-level.
    pub fn add_toplevel(&mut self, id: ClusterId) {
        self.toplevel.push(id);
    }

    /// Add a new cluster directly at the top level.
    pub fn push_toplevel(&mut self, cluster: Cluster) -> ClusterId {
        let id = self.add_cluster(cluster);
        self.add_toplevel(id);
        id
    }

    /// Record `child` as a child of `parent`.
    pub fn add_child(&mut self, parent: ClusterId, child: ClusterId) {
        self.children[parent].push(child);
    }

    /// Add a new cluster as a child of `parent`.
    pub fn push_child(&mut self, parent: ClusterId, cluster: Cluster) -> ClusterId {
        let id = self.add_cluster(cluster);
        self.add_child(parent, id);
        id
    }

    /// Append an object to a cluster that is still being assembled.
    pub(crate) fn add_member(&mut self, id: ClusterId, object: ObjectId) {
        self.clusters[id].members.push(object);
    }

    pub(crate) fn push_warning(&mut self, warning: ExtractionWarning) {
        self.warnings.push(warning);
    }

    pub(crate) fn set_outlier_scores(&mut self, scores: Vec<f64>) {
        self.outlier_scores = Some(scores);
    }

    /// Outlier score of each object, indexed by object id. Only density
    /// extractions that track them produce scores.
    pub fn outlier_scores(&self) -> Option<&[f64]> {
        self.outlier_scores.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id]
    }

    /// All clusters in creation order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn toplevel(&self) -> &[ClusterId] {
        &self.toplevel
    }

    pub fn children(&self, id: ClusterId) -> &[ClusterId] {
        &self.children[id]
    }

    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    /// Number of clusters in the arena (noise included)
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// The noise cluster, if one was emitted
    pub fn noise(&self) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.noise)
    }

    /// Top-level clusters that are not noise
    pub fn toplevel_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.toplevel
            .iter()
            .map(move |&id| &self.clusters[id])
            .filter(|c| !c.noise)
    }

    /// Clusters reachable from the top level, each visited once, parents
    /// before children.
    pub fn reachable(&self) -> Vec<ClusterId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::with_capacity(self.clusters.len());
        let mut stack: Vec<ClusterId> = self.toplevel.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children[id].iter().rev().copied());
        }
        out
    }

    /// Every object of every reachable cluster, in traversal order.
    /// Each object of the input appears exactly once for a well-formed result.
    pub fn all_members(&self) -> Vec<ObjectId> {
        self.reachable()
            .into_iter()
            .flat_map(|id| self.clusters[id].members.iter().copied())
            .collect()
    }

    /// For every object, the cluster whose own member list holds it.
    /// Noise objects and objects not in any cluster map to `None`.
    pub fn assignments(&self, num_objects: usize) -> Vec<Option<ClusterId>> {
        let mut out = vec![None; num_objects];
        for id in self.reachable() {
            let cluster = &self.clusters[id];
            if cluster.noise {
                continue;
            }
            for &m in &cluster.members {
                if m < num_objects {
                    out[m] = Some(id);
                }
            }
        }
        out
    }

    /// Sorted member sets of the non-noise top-level clusters, including the
    /// members of their descendants. Handy for comparing partitions.
    pub fn toplevel_partition(&self) -> Vec<Vec<ObjectId>> {
        let mut parts: Vec<Vec<ObjectId>> = self
            .toplevel
            .iter()
            .filter(|&&id| !self.clusters[id].noise)
            .map(|&id| {
                let mut members = self.subtree_members(id);
                members.sort_unstable();
                members
            })
            .collect();
        parts.sort();
        parts
    }

    /// Members of a cluster and all of its descendants.
    pub fn subtree_members(&self, id: ClusterId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        let mut seen = FxHashSet::default();
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            out.extend_from_slice(&self.clusters[c].members);
            stack.extend_from_slice(&self.children[c]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{PointerRepresentation, WithPrototypes};

    #[test]
    fn test_cluster_names() {
        assert_eq!(cluster_name(3, f64::NAN, &[3]), "obj_3");
        assert_eq!(cluster_name(3, 2.5, &[]), "mrg_3_2.5");
        assert_eq!(cluster_name(3, 2.5, &[3, 4]), "clu_3_2.5");
        assert_eq!(cluster_name(3, f64::INFINITY, &[3, 4]), "top_3");
    }

    #[test]
    fn test_model_selection() {
        let h = PointerRepresentation::new(vec![0, 0], vec![f64::INFINITY, 1.0]).unwrap();
        let plain = DendrogramModel::for_members(&h, 1.0, &[0, 1]);
        assert_eq!(plain, DendrogramModel::Plain { height: 1.0 });
        assert_eq!(plain.prototype(), None);

        let with = WithPrototypes::new(h, |m: &[ObjectId]| m.last().copied());
        let model = DendrogramModel::for_members(&with, 1.0, &[0, 1]);
        assert_eq!(model.prototype(), Some(1));
        assert_eq!(model.height(), 1.0);

        // structural nodes never carry a prototype
        let empty = DendrogramModel::for_members(&with, 1.0, &[]);
        assert_eq!(empty.prototype(), None);
    }

    #[test]
    fn test_hierarchy_traversal() {
        let mut c = Clustering::new("test");
        let root = c.push_toplevel(Cluster::new("root", vec![0], DendrogramModel::Plain { height: 2.0 }));
        let a = c.push_child(root, Cluster::new("a", vec![1, 2], DendrogramModel::Plain { height: 1.0 }));
        c.push_child(a, Cluster::new("b", vec![3], DendrogramModel::Plain { height: 0.5 }));
        let noise = c.push_toplevel(Cluster::noise(vec![4]));

        assert_eq!(c.len(), 4);
        assert_eq!(c.reachable(), vec![root, a, 2, noise]);
        let mut all = c.all_members();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert_eq!(c.toplevel_partition(), vec![vec![0, 1, 2, 3]]);
        assert_eq!(c.toplevel_clusters().count(), 1);
        assert_eq!(c.noise().map(|n| n.members.clone()), Some(vec![4]));

        let labels = c.assignments(5);
        assert_eq!(labels, vec![Some(root), Some(a), Some(a), Some(2), None]);
    }

    #[test]
    fn test_warning_display() {
        let w = ExtractionWarning::TargetNotReached {
            requested: 3,
            achieved: 2,
        };
        assert!(w.to_string().contains("exactly 3 clusters"));
    }
}
