//! Deterministic ordering helpers.
//!
//! This engine never breaks a tie by iteration order, hash-map order, or
//! wall-clock arrival: every sort over candidates, evidence entries, or
//! ledger replay groups goes through a `StableOrd` key built from content,
//! never from incidental position.

use core::cmp::Ordering;

/// A type with a well-defined, total, content-derived ordering key.
///
/// Implementors should never rely on `PartialOrd`/`Ord` derived from field
/// declaration order alone when that order doesn't match the spec's stated
/// tie-break sequence — implement `stable_cmp` explicitly instead and keep
/// any derived `Ord` in sync with it, or omit the derive entirely.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

/// Sort `items` in place by `StableOrd::stable_cmp`. A thin wrapper so call
/// sites read as "this sort is the deterministic one", not an incidental
/// `sort_by`.
pub fn stable_sort<T: StableOrd>(items: &mut [T]) {
    items.sort_by(StableOrd::stable_cmp);
}

/// Portfolio candidate tie-break order (§4.8 step 7): score descending,
/// then `node_id` ascending, then `knob_name` ascending. Exposed as a
/// free function — rather than only via the `StableOrd` trait — because
/// the optimizer's candidate type lives in `gov_optimizer`, a crate that
/// depends on this one, not the other way around.
pub fn cmp_candidates_by_order(
    score_a: f64,
    node_a: &str,
    knob_a: &str,
    score_b: f64,
    node_b: &str,
    knob_b: &str,
) -> Ordering {
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| node_a.cmp(node_b))
        .then_with(|| knob_a.cmp(knob_b))
}
