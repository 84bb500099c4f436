//! HDBSCAN cluster extraction by excess of mass.
//!
//! Merges are replayed once in increasing distance order. Each active object
//! leads at most one candidate cluster; spurious candidates (too small, or a
//! non-core singleton) are grown into their neighbours instead of forming a
//! new level. After the pass, every candidate that reached the root is
//! emitted, and below it the excess-of-mass selection decides which children
//! survive as clusters and which are absorbed into their parent.

use tracing::{debug, trace};

use crate::clustering::{Cluster, ClusterId, Clustering, DendrogramModel};
use crate::errors::Result;
use crate::extraction::{checked_order, successor, Extractor, Progress};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::observer::ExtractionObserver;
use crate::types::{DensityConfig, ObjectId};

/// Index of a candidate in the [`StabilityForest`] arena
pub type CandidateId = usize;

// ============================================================================
// Candidate clusters
// ============================================================================

/// A candidate cluster together with its density aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityCluster {
    /// Objects held directly (not through a child)
    pub members: Vec<ObjectId>,
    /// Distance of the most recent merge
    pub height: f64,
    /// Sum of `objects / distance` over every join
    pub aggregate: f64,
    /// Objects held by the children at the time they were joined
    pub children_total: usize,
    pub children: Vec<CandidateId>,
}

impl StabilityCluster {
    fn single(height: f64, a: ObjectId) -> Self {
        Self {
            members: vec![a],
            height,
            aggregate: 1.0 / height,
            children_total: 0,
            children: Vec::new(),
        }
    }

    fn pair(height: f64, a: ObjectId, b: ObjectId) -> Self {
        Self {
            members: vec![a, b],
            height,
            aggregate: 2.0 / height,
            children_total: 0,
            children: Vec::new(),
        }
    }

    /// Objects in this candidate, including those of its children
    pub fn total(&self) -> usize {
        self.children_total + self.members.len()
    }

    /// `aggregate - total / height`
    pub fn excess_of_mass(&self) -> f64 {
        self.aggregate - self.total() as f64 / self.height
    }

    /// Too small to stand on its own
    pub fn is_spurious(&self, min_cluster_size: usize) -> bool {
        self.children.is_empty() && self.members.len() < min_cluster_size
    }

    fn reset_aggregate(&mut self) {
        self.aggregate = self.total() as f64 / self.height;
    }
}

/// Stability of a candidate: the better of its own excess of mass and the
/// summed stability of its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stability {
    /// Best achievable stability for the subtree (never negative)
    pub score: f64,
    /// The children together beat this candidate, so it should be dissolved
    /// into its parent and its children examined instead.
    pub flatten: bool,
}

impl Stability {
    pub fn evaluate(excess_of_mass: f64, children: f64) -> Self {
        if excess_of_mass > children {
            Stability {
                score: excess_of_mass,
                flatten: false,
            }
        } else {
            Stability {
                score: children,
                flatten: children > 0.0,
            }
        }
    }
}

/// Arena of candidates. Children are always created before their parent, so
/// a parent's index is larger than any of its children's.
#[derive(Debug, Clone, Default)]
pub struct StabilityForest {
    nodes: Vec<StabilityCluster>,
}

impl StabilityForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CandidateId) -> &StabilityCluster {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: StabilityCluster) -> CandidateId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn single(&mut self, height: f64, a: ObjectId) -> CandidateId {
        self.push(StabilityCluster::single(height, a))
    }

    pub fn pair(&mut self, height: f64, a: ObjectId, b: ObjectId) -> CandidateId {
        self.push(StabilityCluster::pair(height, a, b))
    }

    /// New level joining two candidates.
    pub fn parent(&mut self, height: f64, a: CandidateId, b: CandidateId) -> CandidateId {
        let total = self.nodes[a].total() + self.nodes[b].total();
        self.push(StabilityCluster {
            members: Vec::new(),
            height,
            aggregate: total as f64 / height,
            children_total: total,
            children: vec![a, b],
        })
    }

    /// Grow `target` at `height`, either by the single object `id` or by
    /// taking over every member of the childless candidate `other`.
    pub fn grow(
        &mut self,
        target: CandidateId,
        height: f64,
        other: Option<CandidateId>,
        id: ObjectId,
    ) -> CandidateId {
        let moved = match other {
            Some(o) => std::mem::take(&mut self.nodes[o].members),
            None => vec![id],
        };
        let node = &mut self.nodes[target];
        node.height = height;
        node.aggregate += moved.len() as f64 / height;
        node.members.extend(moved);
        target
    }

    /// Forget the density history of `id`, as if it had formed at its
    /// current height.
    pub fn reset_aggregate(&mut self, id: CandidateId) -> CandidateId {
        self.nodes[id].reset_aggregate();
        id
    }

    /// Stability of every candidate, indexed like the arena.
    pub fn stabilities(&self) -> Vec<Stability> {
        let mut out: Vec<Stability> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let children: f64 = node.children.iter().map(|&c| out[c].score).sum();
            out.push(Stability::evaluate(node.excess_of_mass(), children));
        }
        out
    }
}

// ============================================================================
// GLOSH outlier scores
// ============================================================================

/// GLOSH outlier scores, tracked during the merge pass.
///
/// Every candidate lead remembers `epsilon_max`, the distance at which its
/// cluster first became dense. An object that joins an existing cluster at
/// distance `d` scores `1 - epsilon_max / d`. Objects that only ever form
/// clusters with their peers keep a score of 0.
#[derive(Debug, Clone, Default)]
pub struct GloshScores {
    epsilon_max: Vec<Option<f64>>,
    scores: Vec<f64>,
}

impl GloshScores {
    pub fn new(num_objects: usize) -> Self {
        Self {
            epsilon_max: vec![None; num_objects],
            scores: vec![0.0; num_objects],
        }
    }

    /// `clead` and `olead` formed a new pair at `dist`, led by `olead`.
    pub fn pair(&mut self, clead: ObjectId, olead: ObjectId, dist: f64) {
        self.scores[clead] = 0.0;
        self.scores[olead] = 0.0;
        self.epsilon_max[olead] = Some(dist);
    }

    /// The candidates of `clead` and `olead` became children of a new level
    /// led by `olead`, which keeps the smaller of the two.
    pub fn level(&mut self, clead: ObjectId, olead: ObjectId) {
        self.epsilon_max[olead] = match (self.epsilon_max[clead], self.epsilon_max[olead]) {
            (Some(c), Some(o)) => Some(c.min(o)),
            (c, o) => c.or(o),
        };
    }

    /// The candidate led by `from` is now led by `to`.
    pub fn inherit(&mut self, to: ObjectId, from: ObjectId) {
        if self.epsilon_max[to].is_none() {
            self.epsilon_max[to] = self.epsilon_max[from];
        }
    }

    /// The single object `x` joined the cluster led by `lead` at `dist`.
    pub fn joined(&mut self, lead: ObjectId, x: ObjectId, dist: f64) {
        self.scores[x] = match self.epsilon_max[lead] {
            Some(eps) if dist > 0.0 => 1.0 - eps / dist,
            _ => 0.0,
        };
    }

    pub fn score(&self, x: ObjectId) -> f64 {
        self.scores[x]
    }

    pub fn into_scores(self) -> Vec<f64> {
        self.scores
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// HDBSCAN flat or hierarchical cluster extraction.
#[derive(Debug, Clone, Default)]
pub struct HdbscanExtraction {
    config: DensityConfig,
}

impl HdbscanExtraction {
    pub fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    pub fn with_min_cluster_size(min_cluster_size: usize) -> Self {
        Self::new(DensityConfig::new(min_cluster_size))
    }

    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    /// Spurious test for a candidate, or for an object that has none yet.
    fn is_spurious(
        &self,
        forest: &StabilityForest,
        clus: Option<CandidateId>,
        is_core: bool,
    ) -> bool {
        match clus {
            Some(id) => forest.get(id).is_spurious(self.config.min_cluster_size),
            None => self.config.min_cluster_size > 1 || !is_core,
        }
    }
}

impl Extractor for HdbscanExtraction {
    fn name(&self) -> &'static str {
        "hdbscan"
    }

    fn extract_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized,
    {
        self.config.validate()?;
        let n = hierarchy.len();
        let order = checked_order(hierarchy)?;
        let mut progress = Progress::start(observer, self.name(), n);

        let mut forest = StabilityForest::new();
        let mut cluster_of: Vec<Option<CandidateId>> = vec![None; n];
        let mut noise: Vec<ObjectId> = Vec::new();
        let mut toplevel: Vec<CandidateId> = Vec::new();
        let mut glosh = GloshScores::new(n);

        for &clead in order {
            let dist = hierarchy.merge_distance(clead);
            let cdist = hierarchy.core_distance(clead).unwrap_or(dist);
            let cclus = cluster_of[clead].take();
            let c_spurious = self.is_spurious(&forest, cclus, cdist <= dist);

            let olead = successor(hierarchy, clead, n)?;
            if olead == clead {
                match cclus {
                    Some(id) if forest.get(id).is_spurious(self.config.min_cluster_size) => {
                        noise.extend_from_slice(&forest.get(id).members);
                    }
                    Some(id) => toplevel.push(id),
                    None if c_spurious => noise.push(clead),
                    None => toplevel.push(forest.single(dist, clead)),
                }
                progress.tick();
                continue;
            }

            let oclus = cluster_of[olead];
            let odist = hierarchy.core_distance(olead).unwrap_or(dist);
            let o_spurious = self.is_spurious(&forest, oclus, odist <= dist);

            let merged = if !o_spurious && !c_spurious {
                trace!(clead, olead, dist, "new level");
                let c = cclus.unwrap_or_else(|| forest.single(cdist, clead));
                let o = oclus.unwrap_or_else(|| forest.single(odist, olead));
                glosh.level(clead, olead);
                forest.parent(dist, o, c)
            } else {
                // Prefer growing a candidate that may already have children.
                match (oclus, cclus) {
                    (Some(o), _) if !o_spurious => {
                        if cclus.is_none() {
                            glosh.joined(olead, clead, dist);
                        }
                        forest.grow(o, dist, cclus, clead)
                    }
                    (_, Some(c)) if !c_spurious => {
                        glosh.inherit(olead, clead);
                        if oclus.is_none() {
                            glosh.joined(olead, olead, dist);
                        }
                        forest.grow(c, dist, oclus, olead)
                    }
                    (Some(o), _) => {
                        if cclus.is_none() {
                            glosh.joined(olead, clead, dist);
                        }
                        let o = forest.grow(o, dist, cclus, clead);
                        forest.reset_aggregate(o)
                    }
                    (None, Some(c)) => {
                        glosh.inherit(olead, clead);
                        glosh.joined(olead, olead, dist);
                        let c = forest.grow(c, dist, oclus, olead);
                        forest.reset_aggregate(c)
                    }
                    (None, None) => {
                        glosh.pair(clead, olead, dist);
                        forest.pair(dist, clead, olead)
                    }
                }
            };
            trace!(clead, olead, dist, c_spurious, o_spurious, "merged");
            cluster_of[olead] = Some(merged);
            progress.tick();
        }
        debug!(
            candidates = forest.len(),
            toplevel = toplevel.len(),
            noise = noise.len(),
            "density pass finished"
        );

        let mut clustering =
            finalize(hierarchy, &forest, &toplevel, noise, self.config.hierarchical);
        clustering.set_outlier_scores(glosh.into_scores());
        progress.finish(&clustering);
        Ok(clustering)
    }
}

/// Turn the surviving candidates into output clusters.
///
/// Each top-level candidate is emitted. Beneath it, a child flagged for
/// flattening is dissolved into the cluster being emitted and its own
/// children are examined in turn; any other child becomes a cluster of its
/// own that absorbs everything below it.
fn finalize<H: PointerHierarchy + ?Sized>(
    hierarchy: &H,
    forest: &StabilityForest,
    toplevel: &[CandidateId],
    noise: Vec<ObjectId>,
    hierarchical: bool,
) -> Clustering {
    let stability = forest.stabilities();
    let mut clustering = Clustering::new("Hierarchical Clustering");
    let noise_cluster = if noise.is_empty() {
        None
    } else {
        Some(clustering.push_toplevel(Cluster::noise(noise)))
    };

    // (candidate, parent cluster, dissolve every descendant)
    let mut work: Vec<(CandidateId, Option<ClusterId>, bool)> = toplevel
        .iter()
        .rev()
        .map(|&id| (id, noise_cluster, false))
        .collect();

    while let Some((id, parent, flatten)) = work.pop() {
        let node = forest.get(id);
        let mut members = node.members.clone();
        let mut kept = Vec::new();
        let mut pending: Vec<CandidateId> = node.children.iter().rev().copied().collect();
        while let Some(child) = pending.pop() {
            if flatten || stability[child].flatten {
                let child_node = forest.get(child);
                members.extend_from_slice(&child_node.members);
                pending.extend(child_node.children.iter().rev());
            } else {
                kept.push(child);
            }
        }

        let model = DendrogramModel::for_members(hierarchy, node.height, &members);
        let cluster = Cluster::new(format!("C_{:.6}", node.height), members, model);
        let emitted = match parent {
            Some(p) if hierarchical => clustering.push_child(p, cluster),
            _ => clustering.push_toplevel(cluster),
        };
        work.extend(kept.into_iter().rev().map(|child| (child, Some(emitted), true)));
    }
    clustering
}
