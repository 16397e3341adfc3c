// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests for the Jensen-Shannon scorer.

use divergence_engine::{
    jensen_shannon, JensenShannon, SimilarityScore, SparseVector, VectorEvent,
    VectorEventListener,
};
use proptest::prelude::*;

const EPS: f32 = 1e-5;

fn weights(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(prop_oneof![3 => Just(0.0_f32), 7 => 0.01_f32..100.0], dim)
}

/// Pairs of equal-length nonnegative vectors, each with positive mass.
fn weight_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (1usize..48)
        .prop_flat_map(|dim| (weights(dim), weights(dim)))
        .prop_filter("positive mass", |(a, b)| {
            a.iter().any(|&w| w > 0.0) && b.iter().any(|&w| w > 0.0)
        })
}

fn scorer(a: &[f32], b: &[f32]) -> JensenShannon {
    let js = JensenShannon::new();
    js.on_attached("p").unwrap();
    for (id, v) in [(1, a), (2, b)] {
        js.on_event(&VectorEvent::Added {
            space: "p".into(),
            id,
            vector: v.to_vec().into(),
        })
        .unwrap();
    }
    js
}

proptest! {
    #[test]
    fn prop_symmetric((a, b) in weight_pair()) {
        let js = scorer(&a, &b);
        let ab = js.score_dense("p", 1, &a, "p", 2, &b).unwrap();
        let ba = js.score_dense("p", 2, &b, "p", 1, &a).unwrap();
        prop_assert!((ab - ba).abs() < EPS, "{} != {}", ab, ba);
    }

    #[test]
    fn prop_self_distance_zero((a, _b) in weight_pair()) {
        let js = scorer(&a, &a);
        let d = js.score_dense("p", 1, &a, "p", 2, &a).unwrap();
        prop_assert!(d.abs() < EPS, "self distance {}", d);
    }

    #[test]
    fn prop_bounded((a, b) in weight_pair()) {
        let d = jensen_shannon(&a, &b).unwrap();
        prop_assert!(d > -EPS && d < 1.0 + EPS, "out of range: {}", d);
    }

    #[test]
    fn prop_sparse_matches_dense((a, b) in weight_pair()) {
        let js = scorer(&a, &b);
        let dense = js.score_dense("p", 1, &a, "p", 2, &b).unwrap();
        let sparse = js
            .score_sparse(
                "p",
                1,
                &SparseVector::from_dense(&a).unwrap(),
                "p",
                2,
                &SparseVector::from_dense(&b).unwrap(),
            )
            .unwrap();
        prop_assert!((dense - sparse).abs() < EPS, "{} != {}", dense, sparse);
    }

    #[test]
    fn prop_update_reflects_last_write((a, b) in weight_pair()) {
        let js = JensenShannon::new();
        js.on_attached("p").unwrap();
        for v in [&a, &b] {
            js.on_event(&VectorEvent::Replaced {
                space: "p".into(),
                id: 1,
                vector: v.clone().into(),
            })
            .unwrap();
        }
        let entry = js.cache().get("p", 1).unwrap();
        let expected = divergence_engine::CacheEntry::compute(&b).unwrap();
        prop_assert_eq!(entry, expected);
    }
}
