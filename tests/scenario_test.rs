//! End-to-end setups: a cube with an inclined bore, a cube ringed by
//! cylinders, and a ring assembled from four adjacent sectors. The last two
//! guard against buried internal faces leaking into Boundary tags.

use approx::assert_relative_eq;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use once_cell::sync::Lazy;
use oaktree::{build_domain, BBox3, DomainDescriptor, DomainRole, OctreeDomain, Shape};

// ---------------------------------------------------------------------------
// Cube with an inclined bore
// ---------------------------------------------------------------------------

fn bore_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(Vector3::from_element(1.0)), 15f64.to_radians())
}

/// Map a point of the unrotated pipe into the world.
fn bore_world(p: Vector3<f64>) -> Vector3<f64> {
    let pivot = Vector3::from_element(5.0);
    pivot + bore_rotation() * (p - pivot)
}

fn bored_cube() -> Shape {
    let cube = Shape::cube(Vector3::zeros(), Vector3::from_element(10.0), 1, &[1, 2, 3, 4, 5, 6]).unwrap();
    let pipe = Shape::cylinder(Vector3::new(5.0, 5.0, -10.0), 30.0, 0.15, 2, &[7, 8, 9]).unwrap();
    pipe.rotate(Vector3::from_element(5.0), Vector3::from_element(1.0), 15.0).unwrap();
    cube.difference(&pipe)
}

#[test]
fn bore_axis_is_empty_and_tagged_with_the_pipe_wall() {
    let well = bored_cube();
    let s = well.evaluate(Vector3::from_element(5.0)).unwrap();
    assert!(!s.inside);
    assert_eq!(s.boundary, 7);
}

#[test]
fn bore_wall_normal_points_into_the_bore() {
    let well = bored_cube();
    let outside_wall = bore_world(Vector3::new(5.2, 5.0, 5.0));
    let s = well.evaluate(outside_wall).unwrap();
    assert!(s.inside);
    assert_eq!(s.boundary, 7);
    assert_eq!(s.material, 2);
    assert_relative_eq!(s.distance, -0.05, epsilon = 1e-9);
    assert_relative_eq!(s.normal, -(bore_rotation() * Vector3::x()), epsilon = 1e-9);

    let in_bore = bore_world(Vector3::new(5.1, 5.0, 5.0));
    assert!(!well.contains(in_bore).unwrap());
}

#[test]
fn cube_faces_keep_their_ids() {
    let well = bored_cube();
    let probes = [
        (Vector3::new(0.01, 3.0, 3.0), 1),
        (Vector3::new(9.99, 2.0, 7.0), 2),
        (Vector3::new(3.0, 0.01, 8.0), 3),
        (Vector3::new(2.0, 9.99, 2.0), 4),
        (Vector3::new(8.0, 8.0, 0.01), 5),
        (Vector3::new(2.0, 2.0, 9.99), 6),
    ];
    for (p, id) in probes {
        let s = well.evaluate(p).unwrap();
        assert!(s.inside);
        assert_eq!(s.material, 1);
        assert_eq!(s.boundary, id, "at {p:?}");
    }
}

#[test]
fn bore_region_domain_sees_only_the_pipe_wall() {
    let desc = DomainDescriptor::new("well", 1.0, 1.0 / 16.0, 1e-3)
        .with_fine_resolution(1.0 / 32.0)
        .with_bounds(BBox3::new(Vector3::from_element(4.5), Vector3::from_element(5.5)));
    let domain = build_domain(&bored_cube(), &desc, DomainRole::solid("well")).unwrap();

    assert!(!domain.boundary_cells().is_empty());
    assert_eq!(domain.boundaries(), &[7]);
    for cell in domain.leaves() {
        if let Some(oaktree::Classification::Full { material }) = cell.classification() {
            assert_eq!(*material, 1);
        }
    }
}

#[test]
fn cube_corner_domain_sees_only_cube_faces() {
    let desc = DomainDescriptor::new("well", 1.0, 1.0 / 16.0, 1e-3)
        .with_bounds(BBox3::new(Vector3::from_element(-0.3), Vector3::from_element(0.7)));
    let domain = build_domain(&bored_cube(), &desc, DomainRole::solid("well")).unwrap();

    assert_eq!(domain.boundaries(), &[1, 3, 5]);
    assert_eq!(domain.materials(), &[1]);
}

// ---------------------------------------------------------------------------
// Cube ringed by cylinders
// ---------------------------------------------------------------------------

/// A 1 x 2 x 3 block with a unit cylinder along x on each of its four long
/// edges' midlines. The cylinders cover both z faces of the block entirely.
fn ringed_block() -> Shape {
    let block = Shape::cube(Vector3::new(1.0, -1.0, 0.0), Vector3::new(1.0, 2.0, 3.0), 1, &[1, 2, 3, 4, 5, 6]).unwrap();
    let rod = Shape::cylinder(Vector3::new(1.0, 0.0, 0.0), 1.0, 1.0, 1, &[7, 8, 9]).unwrap();
    rod.rotate(Vector3::new(1.0, 0.0, 0.0), Vector3::y(), 90.0).unwrap();

    let mut c = block.union(&rod);
    for offset in [Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 1.0, 1.5), Vector3::new(0.0, -1.0, 1.5)] {
        let copy = rod.deep_clone();
        copy.translate(offset).unwrap();
        c = copy.union(&c);
    }
    c
}

/// Built once and shared by every test that inspects it.
static RINGED_DOMAIN: Lazy<OctreeDomain> = Lazy::new(|| {
    let desc = DomainDescriptor::new("rods", 1.0, 6.0 / 32.0, 1e-3)
        .with_bounds(BBox3::new(Vector3::new(0.45, -2.55, -1.55), Vector3::new(2.55, 2.55, 4.55)));
    build_domain(&ringed_block(), &desc, DomainRole::solid("rods")).unwrap()
});

#[test]
fn covered_block_faces_are_never_tagged() {
    let domain = &*RINGED_DOMAIN;
    assert!(domain.boundaries().contains(&7));
    assert!(!domain.boundaries().contains(&5), "{:?}", domain.boundaries());
    assert!(!domain.boundaries().contains(&6), "{:?}", domain.boundaries());
}

#[test]
fn block_interior_has_no_boundary_cells() {
    let domain = &*RINGED_DOMAIN;
    let interior = BBox3::new(Vector3::new(1.0, -1.0, 0.0), Vector3::new(2.0, 1.0, 3.0));
    for cell in domain.boundary_cells() {
        let b = cell.bbox;
        let strictly_inside = (0..3).all(|i| b.min[i] > interior.min[i] && b.max[i] < interior.max[i]);
        assert!(!strictly_inside, "boundary cell inside the block: {b:?}");
    }
}

// ---------------------------------------------------------------------------
// Ring of four sectors
// ---------------------------------------------------------------------------

fn annulus() -> Shape {
    let outer = Shape::cylinder(Vector3::zeros(), 1.0, 1.0, 1, &[10, 11, 12]).unwrap();
    let inner = Shape::cylinder(Vector3::new(0.0, 0.0, -0.5), 2.0, 0.5, 1, &[20, 21, 22]).unwrap();
    outer.difference(&inner)
}

/// Four quarter sectors, each cut by a quadrant box with its own face ids,
/// so any leak of an internal cut plane shows up as a box id.
fn sector_ring() -> Shape {
    let ring = annulus();
    let corners = [(0.0, 0.0), (-2.0, 0.0), (-2.0, -2.0), (0.0, -2.0)];
    let mut sectors = corners.iter().enumerate().map(|(k, (x, y))| {
        let id = 30 + 10 * k as u32;
        let faces: Vec<u32> = (1..=6).map(|f| id + f).collect();
        let quadrant = Shape::cube(Vector3::new(*x, *y, -1.0), Vector3::new(2.0, 2.0, 3.0), 1, &faces).unwrap();
        ring.intersection(&quadrant)
    });
    let first = sectors.next().unwrap();
    sectors.fold(first, |acc, s| acc.union(&s))
}

static RING_DOMAIN: Lazy<OctreeDomain> = Lazy::new(|| {
    let desc = DomainDescriptor::new("ring", 1.0, 2.6 / 32.0, 1e-3)
        .with_bounds(BBox3::new(Vector3::new(-1.3, -1.3, -0.3), Vector3::new(1.3, 1.3, 1.3)));
    build_domain(&sector_ring(), &desc, DomainRole::solid("ring")).unwrap()
});

#[test]
fn sector_cuts_never_reach_the_tags() {
    let domain = &*RING_DOMAIN;
    let ids = domain.boundaries();
    assert!(ids.contains(&10));
    assert!(ids.contains(&20));
    for id in ids {
        assert!([10, 11, 12, 20].contains(id), "internal face {id} leaked: {ids:?}");
    }
}

#[test]
fn sector_cuts_do_not_refine_the_ring() {
    let domain = &*RING_DOMAIN;
    for cell in domain.boundary_cells() {
        let c = cell.bbox.center();
        let hd = cell.bbox.half_diagonal();
        let rho = (c.x * c.x + c.y * c.y).sqrt();
        let deep = rho - hd > 0.5 && rho + hd < 1.0 && c.z - hd > 0.0 && c.z + hd < 1.0;
        assert!(!deep, "boundary cell inside the ring wall: {:?}", cell.bbox);
    }
}

#[test]
fn ring_occupancy_matches_annulus() {
    let ring = sector_ring();
    let reference = annulus();
    // Points on a cut plane are strictly inside neither sector, so stay off them.
    for p in [
        Vector3::new(0.75, 0.05, 0.5),
        Vector3::new(0.05, -0.75, 0.5),
        Vector3::new(-0.53, 0.53, 0.5),
        Vector3::new(0.2, 0.2, 0.5),
        Vector3::new(0.9, 0.9, 0.5),
    ] {
        assert_eq!(ring.contains(p).unwrap(), reference.contains(p).unwrap(), "at {p:?}");
    }
}
