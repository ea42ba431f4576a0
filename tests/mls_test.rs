use approx::assert_relative_eq;
use nalgebra::Vector3;
use oaktree::mls::MlsSurface;
use oaktree::{Error, Shape};

/// The eight unit-cube corners, each with its outward diagonal normal.
fn cube_corner_samples() -> Vec<(Vector3<f64>, Vector3<f64>)> {
    let mut samples = Vec::new();
    for i in 0..8 {
        let p = Vector3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64);
        let n = (p - Vector3::from_element(0.5)).normalize();
        samples.push((p, n));
    }
    samples
}

#[test]
fn points_near_the_samples_are_inside() {
    let m = MlsSurface::new(&cube_corner_samples(), 1.0).unwrap();
    let s = m.evaluate(Vector3::from_element(0.25)).unwrap();
    assert!(s.distance < 0.0);
    assert_eq!(s.support, 4);

    let s = m.evaluate(Vector3::new(0.5, 0.5, 0.25)).unwrap();
    assert_relative_eq!(s.distance, -0.25, epsilon = 1e-9);
}

/// All eight normals cancel at the center; the per-sample plane offsets
/// still place it inside.
#[test]
fn center_falls_back_to_plane_offsets() {
    let m = MlsSurface::new(&cube_corner_samples(), 1.0).unwrap();
    let s = m.evaluate(Vector3::from_element(0.5)).unwrap();
    assert_eq!(s.support, 8);
    assert_relative_eq!(s.distance, -(0.75f64).sqrt(), epsilon = 1e-9);
}

#[test]
fn point_beyond_a_corner_is_outside() {
    let m = MlsSurface::new(&cube_corner_samples(), 1.0).unwrap();
    let s = m.evaluate(Vector3::from_element(-0.3)).unwrap();
    assert_eq!(s.support, 1);
    assert!(s.distance > 0.0);
    assert_relative_eq!(s.normal, -Vector3::from_element(1.0).normalize(), epsilon = 1e-9);
}

#[test]
fn far_point_reports_missing_support() {
    let m = MlsSurface::new(&cube_corner_samples(), 1.0).unwrap();
    assert!(matches!(
        m.evaluate(Vector3::from_element(5.0)),
        Err(Error::InsufficientSupport { .. })
    ));

    let shape = Shape::mls(&cube_corner_samples(), 1.0, 3).unwrap();
    let err = shape.contains(Vector3::from_element(5.0)).unwrap_err();
    assert!(err.is_recoverable());
}

#[test]
fn bounding_box_is_padded_by_support() {
    let m = MlsSurface::new(&cube_corner_samples(), 0.5).unwrap();
    let b = m.bounding_box();
    assert_relative_eq!(b.min, Vector3::from_element(-0.5));
    assert_relative_eq!(b.max, Vector3::from_element(1.5));
}

#[test]
fn invalid_input_is_rejected() {
    assert!(matches!(MlsSurface::new(&[], 1.0), Err(Error::InvalidGeometry { .. })));
    assert!(matches!(
        MlsSurface::new(&cube_corner_samples(), 0.0),
        Err(Error::InvalidGeometry { .. })
    ));
    let bad = [(Vector3::zeros(), Vector3::zeros())];
    assert!(matches!(MlsSurface::new(&bad, 1.0), Err(Error::InvalidGeometry { .. })));
}

#[test]
fn mls_shape_carries_material_and_moves() {
    let shape = Shape::mls(&cube_corner_samples(), 1.0, 3).unwrap();
    shape.translate(Vector3::new(10.0, 0.0, 0.0)).unwrap();
    let s = shape.evaluate(Vector3::new(10.25, 0.25, 0.25)).unwrap();
    assert!(s.inside);
    assert_eq!(s.material, 3);
    assert_eq!(s.boundary, 0);
}
