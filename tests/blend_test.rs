use approx::assert_relative_eq;
use oaktree::blend::{blend_intersection, blend_intersection_n, blend_union, blend_union_n};

// ---------------------------------------------------------------------------
// Two faces
// ---------------------------------------------------------------------------

/// At the tangent point on face 1, (d1, d2) = (-r, 0), the arc meets the
/// face and the blended distance is exactly 0.
#[test]
fn tangent_point_d1() {
    let r = 1.0;
    assert_relative_eq!(blend_intersection(-r, 0.0, r), 0.0, epsilon = 1e-12);
}

#[test]
fn tangent_point_d2() {
    let r = 1.0;
    assert_relative_eq!(blend_intersection(0.0, -r, r), 0.0, epsilon = 1e-12);
}

/// The arc midpoint lies at (-r + r/sqrt(2), -r + r/sqrt(2)).
#[test]
fn surface_midpoint() {
    let r = 0.4;
    let m = -r + r / std::f64::consts::SQRT_2;
    assert_relative_eq!(blend_intersection(m, m, r), 0.0, epsilon = 1e-12);
}

#[test]
fn far_outside_one_face_is_sharp() {
    let r = 1.0;
    assert_relative_eq!(blend_intersection(5.0 * r, -5.0 * r, r), 5.0 * r, epsilon = 1e-12);
}

/// Deeper than the arc center on both faces the faces themselves are
/// nearest, so the sharp value comes back.
#[test]
fn deep_inside_is_sharp() {
    let r = 1.0;
    assert_relative_eq!(blend_intersection(-5.0 * r, -5.0 * r, r), -5.0 * r, epsilon = 1e-12);
}

#[test]
fn rounding_only_removes_material() {
    let r = 0.5;
    for &(d1, d2) in &[(-0.1, -0.1), (-0.3, 0.0), (0.2, -0.4), (-0.49, -0.01)] {
        assert!(blend_intersection(d1, d2, r) >= d1.max(d2));
        assert!(blend_union(d1, d2, r) <= d1.min(d2));
    }
}

#[test]
fn union_is_mirror_of_intersection() {
    let r = 1.0;
    assert_relative_eq!(blend_union(r, 0.0, r), 0.0, epsilon = 1e-12);
    assert_relative_eq!(blend_union(0.3, 0.2, r), -blend_intersection(-0.3, -0.2, r), epsilon = 1e-12);
}

// ---------------------------------------------------------------------------
// Three faces
// ---------------------------------------------------------------------------

/// At the sharp corner the rounded surface sits `r (sqrt(3) - 1)` away.
#[test]
fn corner_offset() {
    let r = 0.1;
    assert_relative_eq!(blend_intersection_n(&[0.0; 3], r), r * (3f64.sqrt() - 1.0), epsilon = 1e-12);
    assert_relative_eq!(blend_union_n(&[0.0; 3], r), -r * (3f64.sqrt() - 1.0), epsilon = 1e-12);
}

/// The point of the corner sphere along the diagonal is on the surface.
#[test]
fn corner_sphere_diagonal_point() {
    let r = 0.1;
    let m = -r + r / 3f64.sqrt();
    assert_relative_eq!(blend_intersection_n(&[m; 3], r), 0.0, epsilon = 1e-12);
}
