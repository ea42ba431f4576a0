//! Primitive implicit functions.
//!
//! Every primitive is evaluated in its own local frame (the owning node's
//! transform maps world points there first). Besides the signed distance each
//! evaluation reports which face owns the nearest surface, so the caller can
//! look up a boundary-condition id, and the outward unit normal of that
//! surface.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::math::normalize_or;
use crate::types::BBox3;

/// Signed distance to a sphere.
/// Negative inside, zero on surface, positive outside.
pub fn sdf_sphere(point: Vector3<f64>, center: Vector3<f64>, radius: f64) -> f64 {
    (point - center).norm() - radius
}

/// Signed distance to an axis-aligned box.
/// `half_extents` is the half-size in each dimension.
pub fn sdf_box(point: Vector3<f64>, center: Vector3<f64>, half_extents: Vector3<f64>) -> f64 {
    let d = (point - center).abs() - half_extents;
    let outside = Vector3::new(d.x.max(0.0), d.y.max(0.0), d.z.max(0.0)).norm();
    let inside = d.x.max(d.y).max(d.z).min(0.0);
    outside + inside
}

/// Signed distance to a capped cylinder standing on `base` along local +z.
pub fn sdf_cylinder(point: Vector3<f64>, base: Vector3<f64>, radius: f64, height: f64) -> f64 {
    let p = point - base;
    let d_radial = (p.x * p.x + p.y * p.y).sqrt() - radius;
    let d_axial = (p.z - height / 2.0).abs() - height / 2.0;
    if d_radial > 0.0 && d_axial > 0.0 {
        (d_radial * d_radial + d_axial * d_axial).sqrt()
    } else {
        d_radial.max(d_axial)
    }
}

/// Superellipsoid implicit value
/// `(|x/a|^r + |y/b|^r)^(t/r) + |z/c|^t - 1` and its gradient.
fn superellipsoid_field(
    p: Vector3<f64>,
    radii: Vector3<f64>,
    r: f64,
    t: f64,
) -> (f64, Vector3<f64>) {
    let (ax, ay, az) = ((p.x / radii.x).abs(), (p.y / radii.y).abs(), (p.z / radii.z).abs());
    let u = ax.powf(r) + ay.powf(r);
    let f = u.powf(t / r) + az.powf(t) - 1.0;

    let mut grad = Vector3::zeros();
    if u > 1e-300 {
        let k = t * u.powf(t / r - 1.0);
        if ax > 0.0 {
            grad.x = k * ax.powf(r - 1.0) * p.x.signum() / radii.x;
        }
        if ay > 0.0 {
            grad.y = k * ay.powf(r - 1.0) * p.y.signum() / radii.y;
        }
    }
    if az > 0.0 {
        grad.z = t * az.powf(t - 1.0) * p.z.signum() / radii.z;
    }
    (f, grad)
}

// ---------------------------------------------------------------------------
// Primitive
// ---------------------------------------------------------------------------

/// A closed primitive solid, parameterised in its local frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Box spanning `origin .. origin + extents`.
    /// Faces: `[-x, +x, -y, +y, -z, +z]`.
    Cube { origin: Vector3<f64>, extents: Vector3<f64> },

    /// Sphere. Faces: `[surface]`.
    Sphere { center: Vector3<f64>, radius: f64 },

    /// Cylinder whose bottom cap is centered on `base`, extending `height`
    /// along local +z. Faces: `[side, bottom, top]`.
    Cylinder { base: Vector3<f64>, height: f64, radius: f64 },

    /// Superellipsoid centered at `center` with semi-axes `radii`, in-plane
    /// exponent `r` and vertical exponent `t`. Faces: `[surface]`.
    Superellipsoid { center: Vector3<f64>, radii: Vector3<f64>, r: f64, t: f64 },
}

/// Output of a primitive evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrimitiveSample {
    pub distance: f64,
    /// Index into the primitive's face list.
    pub face: usize,
    /// Outward unit normal in the local frame.
    pub normal: Vector3<f64>,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Cube { .. } => "cube",
            Primitive::Sphere { .. } => "sphere",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Superellipsoid { .. } => "superellipsoid",
        }
    }

    /// Number of boundary-condition slots this primitive expects.
    pub fn face_count(&self) -> usize {
        match self {
            Primitive::Cube { .. } => 6,
            Primitive::Cylinder { .. } => 3,
            Primitive::Sphere { .. } | Primitive::Superellipsoid { .. } => 1,
        }
    }

    /// Reject degenerate or non-finite parameters.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        let positive = |label: &str, v: f64| -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::geometry(name, format!("{label} must be positive and finite, got {v}")))
            }
        };
        let finite = |label: &str, v: &Vector3<f64>| -> Result<()> {
            if v.iter().all(|c| c.is_finite()) {
                Ok(())
            } else {
                Err(Error::geometry(name, format!("{label} must be finite")))
            }
        };
        match self {
            Primitive::Cube { origin, extents } => {
                finite("origin", origin)?;
                positive("x extent", extents.x)?;
                positive("y extent", extents.y)?;
                positive("z extent", extents.z)
            }
            Primitive::Sphere { center, radius } => {
                finite("center", center)?;
                positive("radius", *radius)
            }
            Primitive::Cylinder { base, height, radius } => {
                finite("base", base)?;
                positive("height", *height)?;
                positive("radius", *radius)
            }
            Primitive::Superellipsoid { center, radii, r, t } => {
                finite("center", center)?;
                positive("x radius", radii.x)?;
                positive("y radius", radii.y)?;
                positive("z radius", radii.z)?;
                positive("exponent r", *r)?;
                positive("exponent t", *t)
            }
        }
    }

    /// Local-frame bounding box.
    pub fn bounding_box(&self) -> BBox3 {
        match self {
            Primitive::Cube { origin, extents } => BBox3::new(*origin, origin + extents),
            Primitive::Sphere { center, radius } => {
                let r = Vector3::from_element(*radius);
                BBox3::new(center - r, center + r)
            }
            Primitive::Cylinder { base, height, radius } => BBox3::new(
                base - Vector3::new(*radius, *radius, 0.0),
                base + Vector3::new(*radius, *radius, *height),
            ),
            Primitive::Superellipsoid { center, radii, .. } => {
                BBox3::new(center - radii, center + radii)
            }
        }
    }

    /// Evaluate at a local-frame point.
    pub fn evaluate(&self, p: Vector3<f64>) -> PrimitiveSample {
        match self {
            Primitive::Cube { origin, extents } => {
                let half = extents * 0.5;
                let q = p - (origin + half);
                let d = q.abs() - half;
                let distance = sdf_box(p, origin + half, half);
                let axis = d.imax();
                let positive_side = q[axis] >= 0.0;
                let face = 2 * axis + usize::from(positive_side);

                let mut axis_normal = Vector3::zeros();
                axis_normal[axis] = if positive_side { 1.0 } else { -1.0 };
                let normal = if distance > 0.0 {
                    let g = Vector3::new(
                        d.x.max(0.0) * q.x.signum(),
                        d.y.max(0.0) * q.y.signum(),
                        d.z.max(0.0) * q.z.signum(),
                    );
                    normalize_or(g, axis_normal)
                } else {
                    axis_normal
                };
                PrimitiveSample { distance, face, normal }
            }
            Primitive::Sphere { center, radius } => PrimitiveSample {
                distance: sdf_sphere(p, *center, *radius),
                face: 0,
                normal: normalize_or(p - center, Vector3::z()),
            },
            Primitive::Cylinder { base, height, radius } => {
                let q = p - base;
                let rho = (q.x * q.x + q.y * q.y).sqrt();
                let d_radial = rho - radius;
                let d_axial = (q.z - height / 2.0).abs() - height / 2.0;
                let radial_dir = normalize_or(Vector3::new(q.x, q.y, 0.0), Vector3::x());
                let cap_dir = if q.z < height / 2.0 { -Vector3::z() } else { Vector3::z() };
                let face = if d_radial >= d_axial {
                    0
                } else if q.z < height / 2.0 {
                    1
                } else {
                    2
                };
                let normal = if d_radial > 0.0 && d_axial > 0.0 {
                    normalize_or(radial_dir * d_radial + cap_dir * d_axial, cap_dir)
                } else if face == 0 {
                    radial_dir
                } else {
                    cap_dir
                };
                PrimitiveSample {
                    distance: sdf_cylinder(p, *base, *radius, *height),
                    face,
                    normal,
                }
            }
            Primitive::Superellipsoid { center, radii, r, t } => {
                let q = p - center;
                let (f, grad) = superellipsoid_field(q, *radii, *r, *t);
                let g = grad.norm();
                let distance = if g > 1e-12 {
                    f / g
                } else {
                    f * radii.min()
                };
                PrimitiveSample {
                    distance,
                    face: 0,
                    normal: normalize_or(grad, Vector3::z()),
                }
            }
        }
    }

    /// Outward normals of every face patch passing within `tol` of `p`
    /// (local frame). Empty when `p` is not on the surface.
    pub fn faces_through(&self, p: Vector3<f64>, tol: f64) -> Vec<Vector3<f64>> {
        match self {
            Primitive::Cube { origin, extents } => {
                let max = origin + extents;
                let within = |axis: usize| {
                    (0..3)
                        .filter(|&a| a != axis)
                        .all(|a| p[a] >= origin[a] - tol && p[a] <= max[a] + tol)
                };
                let mut normals = Vec::new();
                for axis in 0..3 {
                    if !within(axis) {
                        continue;
                    }
                    if (p[axis] - origin[axis]).abs() <= tol {
                        let mut n = Vector3::zeros();
                        n[axis] = -1.0;
                        normals.push(n);
                    }
                    if (p[axis] - max[axis]).abs() <= tol {
                        let mut n = Vector3::zeros();
                        n[axis] = 1.0;
                        normals.push(n);
                    }
                }
                normals
            }
            Primitive::Cylinder { base, height, radius } => {
                let q = p - base;
                let rho = (q.x * q.x + q.y * q.y).sqrt();
                let mut normals = Vec::new();
                if (rho - radius).abs() <= tol && q.z >= -tol && q.z <= height + tol {
                    normals.push(normalize_or(Vector3::new(q.x, q.y, 0.0), Vector3::x()));
                }
                if rho <= radius + tol {
                    if q.z.abs() <= tol {
                        normals.push(-Vector3::z());
                    }
                    if (q.z - height).abs() <= tol {
                        normals.push(Vector3::z());
                    }
                }
                normals
            }
            Primitive::Sphere { .. } | Primitive::Superellipsoid { .. } => {
                let s = self.evaluate(p);
                if s.distance.abs() <= tol {
                    vec![s.normal]
                } else {
                    Vec::new()
                }
            }
        }
    }
}
