//! Simplified density hierarchy extraction.
//!
//! One pass over the merges, like the HDBSCAN extraction, but without any
//! stability scoring: whenever both sides of a merge are large enough on
//! their own, both are turned into output clusters on the spot and become
//! children of the merged candidate. Nothing is pruned afterwards.

use tracing::debug;

use crate::clustering::{cluster_name, Cluster, ClusterId, Clustering, DendrogramModel};
use crate::errors::Result;
use crate::extraction::{checked_order, make_cluster, successor, Extractor, Progress};
use crate::hierarchy::PointerHierarchy;
use crate::pipeline::observer::ExtractionObserver;
use crate::types::{DensityConfig, ObjectId};

/// Candidate cluster: loose members plus output clusters already finalized
/// beneath it.
#[derive(Debug, Clone, Default)]
struct Candidate {
    members: Vec<ObjectId>,
    height: f64,
    children: Vec<ClusterId>,
}

impl Candidate {
    fn new(height: f64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    fn is_not_spurious(&self, min_cluster_size: usize) -> bool {
        !self.children.is_empty() || self.members.len() >= min_cluster_size
    }
}

/// Output side of the extraction: creates clusters and wires their children.
struct Emitter<'h, H: ?Sized> {
    hierarchy: &'h H,
    clustering: Clustering,
    hierarchical: bool,
}

impl<H: PointerHierarchy + ?Sized> Emitter<'_, H> {
    fn attach(&mut self, parent: ClusterId, child: ClusterId) {
        if self.hierarchical {
            self.clustering.add_child(parent, child);
        } else {
            self.clustering.add_toplevel(child);
        }
    }

    /// Finalize `cand` into an output cluster, leaving it empty.
    fn finalize(&mut self, cand: &mut Candidate, lead: ObjectId) -> ClusterId {
        let members = std::mem::take(&mut cand.members);
        let children = std::mem::take(&mut cand.children);
        let name = if children.len() > 1 {
            format!("mrg_{lead}_{}", cand.height)
        } else {
            cluster_name(lead, cand.height, &members)
        };
        let model = DendrogramModel::for_members(self.hierarchy, cand.height, &members);
        let id = self.clustering.add_cluster(Cluster::new(name, members, model));
        for child in children {
            self.attach(id, child);
        }
        id
    }

    fn singleton(&mut self, x: ObjectId, height: f64) -> ClusterId {
        self.clustering.add_cluster(make_cluster(self.hierarchy, x, height, vec![x]))
    }

    /// Add `x` to `cand`, as a singleton child cluster if it stands on its own.
    fn add_singleton(&mut self, cand: &mut Candidate, x: ObjectId, height: f64, as_cluster: bool) {
        if as_cluster {
            let id = self.singleton(x, height);
            cand.children.push(id);
        } else {
            cand.members.push(x);
        }
        cand.height = height;
    }
}

/// Single-pass hierarchy extraction with a minimum cluster size.
#[derive(Debug, Clone, Default)]
pub struct SimplifiedExtraction {
    config: DensityConfig,
}

impl SimplifiedExtraction {
    pub fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    pub fn with_min_cluster_size(min_cluster_size: usize) -> Self {
        Self::new(DensityConfig::new(min_cluster_size))
    }

    pub fn config(&self) -> &DensityConfig {
        &self.config
    }
}

impl Extractor for SimplifiedExtraction {
    fn name(&self) -> &'static str {
        "simplified"
    }

    fn extract_observed<H, O>(&self, hierarchy: &H, observer: &mut O) -> Result<Clustering>
    where
        H: PointerHierarchy + ?Sized,
        O: ExtractionObserver + ?Sized,
    {
        self.config.validate()?;
        let min_size = self.config.min_cluster_size;
        let n = hierarchy.len();
        let order = checked_order(hierarchy)?;
        let mut progress = Progress::start(observer, self.name(), n);

        let mut emitter = Emitter {
            hierarchy,
            clustering: Clustering::new("Hierarchical Clustering"),
            hierarchical: self.config.hierarchical,
        };
        let mut cands: Vec<Candidate> = Vec::new();
        let mut cluster_of: Vec<Option<usize>> = vec![None; n];
        let mut toplevel: Vec<ClusterId> = Vec::new();
        let mut noise: Vec<ObjectId> = Vec::new();

        // A lone object counts as a cluster only if it is a core point here.
        let is_core =
            |x: ObjectId, dist: f64| hierarchy.core_distance(x).map_or(true, |c| c <= dist);

        for &x in order {
            let dist = hierarchy.merge_distance(x);
            let cclus = cluster_of[x].take();
            let c_ok = match cclus {
                Some(c) => cands[c].is_not_spurious(min_size),
                None => min_size <= 1 && is_core(x, dist),
            };

            let succ = successor(hierarchy, x, n)?;
            if succ == x {
                match cclus {
                    Some(c) if c_ok => toplevel.push(emitter.finalize(&mut cands[c], x)),
                    Some(c) => noise.append(&mut cands[c].members),
                    None if c_ok => toplevel.push(emitter.singleton(x, dist)),
                    None => noise.push(x),
                }
                progress.tick();
                continue;
            }

            let oclus = cluster_of[succ];
            let o_ok = match oclus {
                Some(o) => cands[o].is_not_spurious(min_size),
                None => min_size <= 1 && is_core(succ, dist),
            };

            match (oclus, cclus) {
                (Some(o), Some(c)) => {
                    if o_ok && c_ok {
                        let left = emitter.finalize(&mut cands[o], succ);
                        let right = emitter.finalize(&mut cands[c], x);
                        cands[o].children.extend([left, right]);
                        cands[o].height = dist;
                    } else if c_ok {
                        let moved = std::mem::take(&mut cands[o].members);
                        cands[c].members.extend(moved);
                        cands[c].height = dist;
                        cluster_of[succ] = Some(c);
                    } else {
                        let moved = std::mem::take(&mut cands[c].members);
                        cands[o].members.extend(moved);
                        cands[o].height = dist;
                    }
                }
                (None, Some(c)) => {
                    if c_ok && o_ok {
                        let done = emitter.finalize(&mut cands[c], x);
                        cands[c].children.push(done);
                    }
                    emitter.add_singleton(&mut cands[c], succ, dist, o_ok);
                    cluster_of[succ] = Some(c);
                }
                (Some(o), None) => {
                    if c_ok && o_ok {
                        let done = emitter.finalize(&mut cands[o], succ);
                        cands[o].children.push(done);
                    }
                    emitter.add_singleton(&mut cands[o], x, dist, c_ok);
                }
                (None, None) => {
                    let mut cand = Candidate::new(dist);
                    emitter.add_singleton(&mut cand, x, dist, c_ok);
                    emitter.add_singleton(&mut cand, succ, dist, o_ok);
                    cands.push(cand);
                    cluster_of[succ] = Some(cands.len() - 1);
                }
            }
            progress.tick();
        }
        debug!(
            candidates = cands.len(),
            toplevel = toplevel.len(),
            noise = noise.len(),
            "simplified pass finished"
        );

        let mut clustering = emitter.clustering;
        if noise.is_empty() {
            for id in toplevel {
                clustering.add_toplevel(id);
            }
        } else {
            let noise_id = clustering.push_toplevel(Cluster::noise(noise));
            for id in toplevel {
                if self.config.hierarchical {
                    clustering.add_child(noise_id, id);
                } else {
                    clustering.add_toplevel(id);
                }
            }
        }
        progress.finish(&clustering);
        Ok(clustering)
    }
}
