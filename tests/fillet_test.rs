use nalgebra::Vector3;
use oaktree::{Error, Shape};

/// Unit cube with its upper octant removed: a convex corner at the origin
/// and a concave corner at (0.5, 0.5, 0.5).
fn notched_cube() -> Shape {
    let a = Shape::cube(Vector3::zeros(), Vector3::from_element(1.0), 5, &[1, 2, 3, 4, 5, 6]).unwrap();
    let b = Shape::cube(Vector3::from_element(0.5), Vector3::from_element(1.0), 5, &[1, 2, 3, 4, 5, 6]).unwrap();
    a.difference(&b)
}

#[test]
fn convex_corner_fillet_removes_material() {
    let c = notched_cube();
    let p = Vector3::from_element(0.01);
    assert!(c.contains(p).unwrap());

    c.fillet(Vector3::zeros(), 0.1, 0.1, 1).unwrap();
    let s = c.evaluate(p).unwrap();
    assert!(!s.inside);
    assert_eq!(s.material, 1);
    assert_eq!(c.solid().root().fillets().len(), 1);
}

#[test]
fn concave_corner_fillet_adds_material() {
    let c = notched_cube();
    let p = Vector3::from_element(0.51);
    assert!(!c.contains(p).unwrap());

    c.fillet(Vector3::from_element(0.5), 0.1, 0.1, 1).unwrap();
    let s = c.evaluate(p).unwrap();
    assert!(s.inside);
    assert_eq!(s.material, 1);
}

#[test]
fn fillet_leaves_points_outside_its_width_alone() {
    let c = notched_cube();
    let probes = [
        Vector3::new(0.25, 0.25, 0.9),
        Vector3::new(0.3, 0.0, 0.0),
        Vector3::new(0.75, 0.75, 0.45),
    ];
    let before: Vec<_> = probes.iter().map(|p| c.evaluate(*p).unwrap()).collect();
    c.fillet(Vector3::zeros(), 0.1, 0.1, 1).unwrap();
    c.fillet(Vector3::from_element(0.5), 0.1, 0.1, 1).unwrap();
    for (p, b) in probes.iter().zip(before) {
        assert_eq!(c.evaluate(*p).unwrap(), b, "at {p:?}");
    }
}

/// A feature point that is not on the boundary blends nothing.
#[test]
fn fillet_off_the_boundary_has_no_effect() {
    let c = notched_cube();
    let probes = [Vector3::from_element(0.3), Vector3::from_element(0.31), Vector3::from_element(0.01)];
    let before: Vec<_> = probes.iter().map(|p| c.evaluate(*p).unwrap()).collect();
    c.fillet(Vector3::from_element(0.3), 0.1, 0.1, 1).unwrap();
    assert!(c.solid().root().fillets().is_empty());
    for (p, b) in probes.iter().zip(before) {
        assert_eq!(c.evaluate(*p).unwrap(), b);
    }
}

/// A point on a single smooth face is not a feature.
#[test]
fn fillet_on_smooth_face_has_no_effect() {
    let c = notched_cube();
    c.fillet(Vector3::new(0.25, 0.25, 0.0), 0.1, 0.1, 1).unwrap();
    assert!(c.solid().root().fillets().is_empty());

    let ball = Shape::sphere(Vector3::zeros(), 1.0, 2, &[7]).unwrap();
    ball.fillet(Vector3::new(0.0, 0.0, 1.0), 0.1, 0.1, 1).unwrap();
    assert!(ball.solid().root().fillets().is_empty());
}

#[test]
fn fillet_follows_the_node_it_was_attached_to() {
    let c = notched_cube();
    c.fillet(Vector3::zeros(), 0.1, 0.1, 1).unwrap();
    c.translate(Vector3::new(2.0, 0.0, 0.0)).unwrap();
    assert!(!c.contains(Vector3::new(2.01, 0.01, 0.01)).unwrap());
    assert!(c.contains(Vector3::new(2.2, 0.2, 0.2)).unwrap());
}

#[test]
fn non_positive_radius_is_rejected() {
    let c = notched_cube();
    assert!(matches!(
        c.fillet(Vector3::zeros(), 0.0, 0.1, 1),
        Err(Error::InvalidGeometry { shape: "fillet", .. })
    ));
    assert!(matches!(
        c.fillet(Vector3::zeros(), 0.1, -1.0, 1),
        Err(Error::InvalidGeometry { .. })
    ));
    assert!(c.solid().root().fillets().is_empty());
}

/// Two fillets at neighboring corners of the same edge are applied in turn;
/// the overlap region is not reconciled, but evaluation stays well defined.
#[test]
fn overlapping_corner_fillets_evaluate() {
    let c = notched_cube();
    c.fillet(Vector3::zeros(), 0.1, 0.3, 1).unwrap();
    c.fillet(Vector3::new(0.0, 0.0, 0.2), 0.1, 0.3, 1).unwrap();
    let s = c.evaluate(Vector3::new(0.02, 0.02, 0.1)).unwrap();
    assert!(s.distance.is_finite());
    assert!(s.normal.norm() > 0.99);
}
