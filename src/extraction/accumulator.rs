//! Union primitives for bottom-up merge replay
//!
//! Every structure here is an arena indexed by [`ObjectId`]. A slot is owned
//! by the object currently leading a cluster-in-progress; `None` marks a slot
//! that was never used or whose contents have been consumed by a merge.

use crate::types::ObjectId;

// ============================================================================
// Leaf clusters (merges below the cut)
// ============================================================================

/// A cluster grown below the cut, led by the object that founded it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCluster {
    pub lead: ObjectId,
    pub members: Vec<ObjectId>,
    /// Largest merge distance absorbed so far
    pub height: f64,
}

/// Object → leaf cluster table for the below-the-cut absorption phase.
#[derive(Debug, Clone)]
pub struct LeafClusters {
    cluster_of: Vec<Option<usize>>,
    clusters: Vec<LeafCluster>,
}

impl LeafClusters {
    pub fn new(num_objects: usize) -> Self {
        Self {
            cluster_of: vec![None; num_objects],
            clusters: Vec::new(),
        }
    }

    /// Absorb `x` into the cluster of its successor `succ`, founding a new
    /// two-member cluster `{succ, x}` if the successor has none yet.
    pub fn absorb(&mut self, x: ObjectId, succ: ObjectId, dist: f64) {
        match self.cluster_of[succ] {
            Some(cid) => {
                let cluster = &mut self.clusters[cid];
                cluster.members.push(x);
                if cluster.height < dist {
                    cluster.height = dist;
                }
                self.cluster_of[x] = Some(cid);
            }
            None => {
                let cid = self.clusters.len();
                self.clusters.push(LeafCluster {
                    lead: succ,
                    members: vec![succ, x],
                    height: dist,
                });
                self.cluster_of[succ] = Some(cid);
                self.cluster_of[x] = Some(cid);
            }
        }
    }

    /// Leaf cluster index of `x`, if it was absorbed or leads a cluster.
    pub fn cluster_of(&self, x: ObjectId) -> Option<usize> {
        self.cluster_of[x]
    }

    /// Remember `x` as belonging to cluster slot `cid` (used when merge
    /// clusters above the cut take over a successor's slot).
    pub fn assign(&mut self, x: ObjectId, cid: usize) {
        self.cluster_of[x] = Some(cid);
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Hand out the finished leaf clusters in founding order.
    pub fn take_clusters(&mut self) -> Vec<LeafCluster> {
        std::mem::take(&mut self.clusters)
    }
}

// ============================================================================
// Size simulation
// ============================================================================

/// Integer-only replay of merges: tracks cluster sizes and how many clusters
/// reach a minimum size, without materializing memberships.
#[derive(Debug, Clone)]
pub struct SizeTracker {
    sizes: Vec<usize>,
    min_size: usize,
    large: usize,
}

impl SizeTracker {
    pub fn new(num_objects: usize, min_size: usize) -> Self {
        Self {
            sizes: vec![1; num_objects],
            min_size,
            large: if min_size <= 1 { num_objects } else { 0 },
        }
    }

    /// Merge the cluster led by `x` into the one led by `succ`.
    /// Returns the change in the number of large-enough clusters.
    pub fn union(&mut self, x: ObjectId, succ: ObjectId) -> isize {
        let a = self.sizes[x];
        let b = self.sizes[succ];
        self.sizes[succ] = a + b;
        self.sizes[x] = 0;
        let delta = self.is_large(a + b) - self.is_large(a) - self.is_large(b);
        self.large = (self.large as isize + delta) as usize;
        delta
    }

    fn is_large(&self, size: usize) -> isize {
        isize::from(size >= self.min_size)
    }

    /// Current number of clusters with at least `min_size` objects
    pub fn large_clusters(&self) -> usize {
        self.large
    }

    pub fn size(&self, x: ObjectId) -> usize {
        self.sizes[x]
    }
}

// ============================================================================
// Member sets (rehousing union)
// ============================================================================

/// Member lists keyed by leading object. Merging moves every member of the
/// absorbed side into the surviving side and clears the absorbed slot; there
/// is no path compression, so the survivor is always the successor.
#[derive(Debug, Clone)]
pub struct MemberSets {
    sets: Vec<Option<Vec<ObjectId>>>,
}

impl MemberSets {
    pub fn new(num_objects: usize) -> Self {
        Self {
            sets: vec![None; num_objects],
        }
    }

    /// Move the members led by `x` (or `x` alone) into the set led by `succ`.
    pub fn union_into(&mut self, x: ObjectId, succ: ObjectId) {
        let moved = self.sets[x].take().unwrap_or_else(|| vec![x]);
        let target = self.sets[succ].get_or_insert_with(|| vec![succ]);
        target.extend(moved);
    }

    /// Members led by `x`; `None` if `x` never led a merged set or was absorbed.
    pub fn get(&self, x: ObjectId) -> Option<&[ObjectId]> {
        self.sets[x].as_deref()
    }

    /// Take the members led by `x`, leaving the slot empty.
    pub fn take(&mut self, x: ObjectId) -> Option<Vec<ObjectId>> {
        self.sets[x].take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_absorb_creates_then_grows() {
        let mut leaves = LeafClusters::new(4);
        leaves.absorb(1, 0, 1.0);
        leaves.absorb(2, 0, 0.5);
        leaves.absorb(3, 2, 3.0);

        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves.cluster_of(3), Some(0));
        let clusters = leaves.take_clusters();
        assert_eq!(clusters[0].lead, 0);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3]);
        // height tracks the maximum
        assert_eq!(clusters[0].height, 3.0);
    }

    #[test]
    fn test_size_tracker_counts_large_clusters() {
        let mut sizes = SizeTracker::new(4, 3);
        assert_eq!(sizes.large_clusters(), 0);
        assert_eq!(sizes.union(1, 0), 0);
        assert_eq!(sizes.union(3, 2), 0);
        assert_eq!(sizes.union(2, 0), 1);
        assert_eq!(sizes.size(0), 4);
        assert_eq!(sizes.large_clusters(), 1);
    }

    #[test]
    fn test_size_tracker_min_size_one() {
        let mut sizes = SizeTracker::new(3, 1);
        assert_eq!(sizes.large_clusters(), 3);
        assert_eq!(sizes.union(1, 0), -1);
        assert_eq!(sizes.large_clusters(), 2);
    }

    #[test]
    fn test_member_sets_rehouse_into_successor() {
        let mut sets = MemberSets::new(4);
        sets.union_into(1, 0);
        sets.union_into(3, 2);
        sets.union_into(2, 0);
        assert_eq!(sets.get(2), None);
        assert_eq!(sets.get(0), Some(&[0, 1, 2, 3][..]));
        assert_eq!(sets.take(0).map(|m| m.len()), Some(4));
        assert_eq!(sets.get(0), None);
    }
}
