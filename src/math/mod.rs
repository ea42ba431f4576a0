//! Geometric tolerances and small vector helpers.

use nalgebra::Vector3;

/// Distance within which a point counts as lying on a face when detecting
/// fillet features.
pub const FEATURE_TOL: f64 = 1e-7;

/// Angular tolerance for treating two face normals as the same plane
/// (compared against `1 - dot`).
pub const NORMAL_TOL: f64 = 1e-6;

/// Squared length below which an axis or normal is considered degenerate.
pub const DEGENERATE_SQ: f64 = 1e-24;

/// Normalize `v`, falling back to `fallback` when `v` is degenerate.
#[inline]
pub fn normalize_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let n2 = v.norm_squared();
    if n2 > DEGENERATE_SQ && n2.is_finite() {
        v / n2.sqrt()
    } else {
        fallback
    }
}
