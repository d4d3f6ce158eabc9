//! Weighted random selection.

use rand::Rng;

/// Picks one element with probability proportional to `weight`.
///
/// Entries with a non-positive or non-finite weight are never chosen.
/// Returns `None` when no entry has a usable weight.
pub fn pick_weighted<'a, T>(
    items: &'a [T],
    weight: impl Fn(&T) -> f64,
    rng: &mut impl Rng,
) -> Option<&'a T> {
    let usable = |w: f64| w.is_finite() && w > 0.0;
    let total: f64 = items.iter().map(&weight).filter(|w| usable(*w)).sum();
    if total <= 0.0 {
        return None;
    }

    let mut roll = rng.gen::<f64>() * total;
    let mut last = None;
    for item in items {
        let w = weight(item);
        if !usable(w) {
            continue;
        }
        if roll < w {
            return Some(item);
        }
        roll -= w;
        last = Some(item);
    }
    // Float drift can leave a sliver past the final bucket.
    last
}
