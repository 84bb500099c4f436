//! Property-based tests using proptest

use dendrocut::extraction::hdbscan::Stability;
use dendrocut::*;
use proptest::prelude::*;
use proptest::sample::Index;

/// Random pointer hierarchy rooted at 0. Every object points to a smaller
/// index and never merges above its parent, so the merges form a valid
/// dendrogram. Integer heights make ties common.
fn hierarchy() -> impl Strategy<Value = PointerRepresentation> {
    (1usize..40)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(any::<Index>(), n),
                proptest::collection::vec(1u32..=20, n),
            )
        })
        .prop_map(|(picks, heights)| {
            let n = picks.len();
            let mut parent = vec![0; n];
            let mut distance = vec![f64::INFINITY; n];
            for i in 1..n {
                let p = picks[i].index(i);
                let cap = if p == 0 { f64::INFINITY } else { distance[p] };
                parent[i] = p;
                distance[i] = f64::from(heights[i]).min(cap);
            }
            PointerRepresentation::new(parent, distance).unwrap()
        })
}

fn assert_conserves(result: &Clustering, n: usize) -> std::result::Result<(), TestCaseError> {
    let mut all = result.all_members();
    all.sort_unstable();
    prop_assert_eq!(all, (0..n).collect::<Vec<_>>(), "{}", result.name());
    Ok(())
}

fn assert_siblings_disjoint(result: &Clustering) -> std::result::Result<(), TestCaseError> {
    for id in result.reachable() {
        let mut seen = std::collections::HashSet::new();
        for &child in result.children(id) {
            for m in result.subtree_members(child) {
                prop_assert!(seen.insert(m), "object {} under two siblings", m);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn test_cut_conserves_objects(h in hierarchy(), t in 0.0f64..25.0, k in 1usize..50) {
        let n = h.len();
        let configs = [
            CutConfig::by_threshold(t),
            CutConfig::by_threshold(t).with_output(OutputMode::Hierarchical),
            CutConfig::by_threshold(t)
                .with_output(OutputMode::Hierarchical)
                .with_singletons(true),
            CutConfig::by_min_clusters(k),
            CutConfig::by_min_clusters(k).with_output(OutputMode::Hierarchical),
            CutConfig::full_hierarchy(),
            CutConfig::full_hierarchy().with_singletons(true),
        ];
        for config in configs {
            let result = CutDendrogram::new(config).extract(&h).unwrap();
            assert_conserves(&result, n)?;
            assert_siblings_disjoint(&result)?;
        }
    }

    #[test]
    fn test_noise_conserves_objects(h in hierarchy(), k in 1usize..10, min in 1usize..6) {
        let result = ClustersWithNoise::with_target(k, min).extract(&h).unwrap();
        assert_conserves(&result, h.len())?;
        for cluster in result.toplevel_clusters() {
            prop_assert!(cluster.len() >= min);
        }
    }

    #[test]
    fn test_density_conserves_objects(h in hierarchy(), min in 1usize..8, hierarchical in any::<bool>()) {
        let config = DensityConfig::new(min).with_hierarchical(hierarchical);
        let a = HdbscanExtraction::new(config.clone()).extract(&h).unwrap();
        assert_conserves(&a, h.len())?;
        assert_siblings_disjoint(&a)?;

        let b = SimplifiedExtraction::new(config).extract(&h).unwrap();
        assert_conserves(&b, h.len())?;
        assert_siblings_disjoint(&b)?;
    }

    #[test]
    fn test_higher_threshold_never_adds_clusters(h in hierarchy(), a in 0.0f64..25.0, b in 0.0f64..25.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let low = CutDendrogram::by_threshold(lo).extract(&h).unwrap();
        let high = CutDendrogram::by_threshold(hi).extract(&h).unwrap();
        prop_assert!(low.toplevel().len() >= high.toplevel().len());
    }

    #[test]
    fn test_count_cut_lower_bound(h in hierarchy(), k in 1usize..50) {
        let result = CutDendrogram::by_min_clusters(k).extract(&h).unwrap();
        prop_assert!(result.toplevel().len() >= k.min(h.len()));
    }

    #[test]
    fn test_min_size_one_has_no_noise(h in hierarchy(), k in 1usize..10) {
        let result = ClustersWithNoise::with_target(k, 1).extract(&h).unwrap();
        prop_assert!(result.noise().is_none());
    }

    #[test]
    fn test_extraction_is_deterministic(h in hierarchy(), min in 1usize..6, t in 0.0f64..25.0) {
        let cut = CutDendrogram::new(CutConfig::by_threshold(t).with_output(OutputMode::Hierarchical));
        let first = serde_json::to_string(&cut.extract(&h).unwrap()).unwrap();
        let second = serde_json::to_string(&cut.extract(&h).unwrap()).unwrap();
        prop_assert_eq!(first, second);

        let hdbscan = HdbscanExtraction::with_min_cluster_size(min);
        let first = serde_json::to_string(&hdbscan.extract(&h).unwrap()).unwrap();
        let second = serde_json::to_string(&hdbscan.extract(&h).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_stability_flattens_only_when_children_win(eom in -1.0f64..10.0, kids in 0.0f64..10.0) {
        let s = Stability::evaluate(eom, kids);
        prop_assert_eq!(s.score, eom.max(kids));
        prop_assert_eq!(s.flatten, kids >= eom && kids > 0.0);
    }
}
