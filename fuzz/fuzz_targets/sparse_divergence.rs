// SPDX-License-Identifier: MIT OR Apache-2.0
#![no_main]
use arbitrary::Arbitrary;
use divergence_engine::{
    JensenShannon, SimilarityScore, SparseVector, VectorEvent, VectorEventListener,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct SparseInput {
    source: Vec<i32>,
    source_len: u16,
    target: Vec<i32>,
    target_len: u16,
}

fuzz_target!(|input: SparseInput| {
    if input.source.len() > 4096 || input.target.len() > 4096 {
        return;
    }

    let decode = |raw: &[i32], len: u16| {
        let len = (len as usize).min(raw.len());
        SparseVector::from_interleaved(raw, len)
    };
    let (Ok(a), Ok(b)) = (
        decode(&input.source, input.source_len),
        decode(&input.target, input.target_len),
    ) else {
        return;
    };

    // Decoded vectors are strictly ascending with nonnegative weights
    for v in [&a, &b] {
        assert!(v.positions().windows(2).all(|w| w[0] < w[1]));
        assert!(v.values().iter().all(|&w| w >= 0.0));
    }

    let js = JensenShannon::new();
    js.on_attached("fuzz").unwrap();
    for (id, v) in [(1, &a), (2, &b)] {
        // Zero-mass vectors are rejected; scoring must then fail cleanly
        let _ = js.on_event(&VectorEvent::Added {
            space: "fuzz".into(),
            id,
            vector: v.clone().into(),
        });
    }

    match js.score_sparse("fuzz", 1, &a, "fuzz", 2, &b) {
        Ok(score) => {
            assert!(score.is_finite());
            let reverse = js.score_sparse("fuzz", 2, &b, "fuzz", 1, &a).unwrap();
            assert!((score - reverse).abs() <= 1e-3 * score.abs().max(1.0));
        },
        Err(_) => {
            assert!(!js.cache().contains("fuzz", 1) || !js.cache().contains("fuzz", 2));
        },
    }
});
