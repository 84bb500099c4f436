//! Split finder
//!
//! Computes the position in the topological order that separates merges
//! absorbed unconditionally into leaf clusters (before the split) from merges
//! evaluated individually when the top level is assembled (at or after it).

use crate::hierarchy::PointerHierarchy;
use crate::types::ThresholdMode;

/// Policy for placing the split
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitPolicy {
    /// Exclude every merge at height `>= threshold` from absorption
    ByThreshold(f64),
    /// Keep at least this many clusters; tied heights are never separated
    ByMinClusters(usize),
    /// No static split
    None,
}

impl From<ThresholdMode> for SplitPolicy {
    fn from(mode: ThresholdMode) -> Self {
        match mode {
            ThresholdMode::ByThreshold { threshold } => SplitPolicy::ByThreshold(threshold),
            ThresholdMode::ByMinClusters { min_clusters } => {
                SplitPolicy::ByMinClusters(min_clusters)
            }
            ThresholdMode::NoThreshold => SplitPolicy::None,
        }
    }
}

/// Find the split index in `hierarchy.order()`.
///
/// Returns `N` for empty and one-object hierarchies.
pub fn find_split<H: PointerHierarchy + ?Sized>(hierarchy: &H, policy: SplitPolicy) -> usize {
    let order = hierarchy.order();
    let n = order.len();
    if n <= 1 {
        return n;
    }
    // The root closes the hierarchy whatever height it records.
    let dist = |i: usize| {
        let x = order[i];
        if hierarchy.parent(x) == x {
            f64::INFINITY
        } else {
            hierarchy.merge_distance(x)
        }
    };

    match policy {
        SplitPolicy::ByThreshold(threshold) => {
            let mut split = n;
            while split > 0 && dist(split - 1) >= threshold {
                split -= 1;
            }
            split
        }
        SplitPolicy::ByMinClusters(min_clusters) => {
            let mut split = n.saturating_sub(min_clusters);
            let stop = dist(split);
            // Never cut inside a group of tied merge heights
            while split > 0 && stop <= dist(split - 1) {
                split -= 1;
            }
            split
        }
        SplitPolicy::None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::PointerRepresentation;

    /// order: 1@1.0, 3@1.0, 2@2.0, 0@inf
    fn four() -> PointerRepresentation {
        PointerRepresentation::new(vec![0, 0, 0, 2], vec![f64::INFINITY, 1.0, 2.0, 1.0]).unwrap()
    }

    #[test]
    fn test_split_by_threshold() {
        let h = four();
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(1.5)), 2);
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(2.0)), 2);
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(2.5)), 3);
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(0.5)), 0);
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(f64::INFINITY)), 3);
    }

    #[test]
    fn test_split_by_min_clusters() {
        let h = four();
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(1)), 3);
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(2)), 2);
        // position 1 ties with position 0, so the split moves down to 0
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(3)), 0);
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(4)), 0);
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(100)), 0);
    }

    #[test]
    fn test_split_none() {
        assert_eq!(find_split(&four(), SplitPolicy::None), 0);
    }

    #[test]
    fn test_degenerate_hierarchies() {
        let empty = PointerRepresentation::new(vec![], vec![]).unwrap();
        assert_eq!(find_split(&empty, SplitPolicy::ByMinClusters(3)), 0);
        let one = PointerRepresentation::new(vec![0], vec![f64::INFINITY]).unwrap();
        assert_eq!(find_split(&one, SplitPolicy::ByThreshold(1.0)), 1);
        assert_eq!(find_split(&one, SplitPolicy::None), 1);
    }

    #[test]
    fn test_finite_root_height_counts_as_top() {
        let h = PointerRepresentation::new(vec![0, 0, 0, 2], vec![0.0, 1.0, 2.0, 1.0]).unwrap();
        assert_eq!(find_split(&h, SplitPolicy::ByThreshold(1.5)), 2);
        assert_eq!(find_split(&h, SplitPolicy::ByMinClusters(1)), 3);
    }

    #[test]
    fn test_from_threshold_mode() {
        assert_eq!(
            SplitPolicy::from(ThresholdMode::ByMinClusters { min_clusters: 3 }),
            SplitPolicy::ByMinClusters(3)
        );
        assert_eq!(SplitPolicy::from(ThresholdMode::NoThreshold), SplitPolicy::None);
    }
}
