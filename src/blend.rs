// Circular-arc blend kernels used by fillets.
//
// Each kernel works on the signed distances `d_i` of the planar face pieces
// meeting at a feature. `blend_intersection` rounds a convex feature
// (the solid is the intersection of the half-spaces), `blend_union` fills a
// concave one. The n-ary forms generalise the arc to a sphere at a corner
// where three faces meet.

/// Sharp intersection: `max(d_i)`.
pub fn sharp_intersection(ds: &[f64]) -> f64 {
    ds.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Sharp union: `min(d_i)`.
pub fn sharp_union(ds: &[f64]) -> f64 {
    ds.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Rounded intersection of two half-spaces.
///
/// Arc centered at `(-r, -r)` in `(d1, d2)` space with radius `r`.
pub fn blend_intersection(d1: f64, d2: f64, r: f64) -> f64 {
    blend_intersection_n(&[d1, d2], r)
}

/// Rounded union of two half-spaces.
/// Derived from intersection by negating both inputs and the result.
pub fn blend_union(d1: f64, d2: f64, r: f64) -> f64 {
    -blend_intersection(-d1, -d2, r)
}

/// Rounded intersection of any number of half-spaces.
pub fn blend_intersection_n(ds: &[f64], r: f64) -> f64 {
    let sharp = sharp_intersection(ds);
    let mut sum = 0.0;
    let mut active = false;
    for d in ds {
        let u = d + r;
        if u > 0.0 {
            sum += u * u;
            active = true;
        }
    }
    // Deeper than the arc center on every face: the faces are nearest.
    if !active {
        return sharp;
    }
    sharp.max(sum.sqrt() - r)
}

/// Rounded union of any number of half-spaces.
pub fn blend_union_n(ds: &[f64], r: f64) -> f64 {
    let negated: Vec<f64> = ds.iter().map(|d| -d).collect();
    -blend_intersection_n(&negated, r)
}
