//! Fillets: local rounding of a solid near one feature point.
//!
//! A [`FilletSpec`] is what the user attaches to a node. It is only turned
//! into an actual [`FeatureBlend`] when the tree is frozen, against the
//! geometry the node has at that moment: the faces passing through the
//! feature point are collected, the feature is classified convex or concave,
//! and within the blend width the raw distance is corrected by the difference
//! between the rounded and the sharp combination of those faces.
//!
//! Fillets are best effort. A feature point that is not on the boundary, or
//! that lies on a single smooth face, resolves to no blend at all. Corners
//! where two separately attached fillets overlap are not reconciled.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::blend::{blend_intersection_n, blend_union_n, sharp_intersection, sharp_union};
use crate::dag::SolidNode;
use crate::error::{Error, Result};
use crate::math::{FEATURE_TOL, NORMAL_TOL};
use crate::types::Sample;

/// A fillet request: round the feature at `point` with the given radius,
/// affecting points within `width` of it, and give the added or exposed
/// blend surface `material`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilletSpec {
    /// Feature point in the owning node's local frame.
    pub point: Vector3<f64>,
    pub radius: f64,
    pub width: f64,
    pub material: u32,
}

impl FilletSpec {
    pub fn new(point: Vector3<f64>, radius: f64, width: f64, material: u32) -> Result<Self> {
        if point.iter().any(|c| !c.is_finite()) {
            return Err(Error::geometry("fillet", "feature point must be finite"));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::geometry("fillet", format!("radius must be positive, got {radius}")));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(Error::geometry("fillet", format!("blend width must be positive, got {width}")));
        }
        Ok(Self { point, radius, width, material })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Material lies in the intersection of the face half-spaces (outer edge
    /// or corner); rounding removes material.
    Convex,
    /// Material lies in the union of the face half-spaces (inner edge or
    /// corner); rounding adds material.
    Concave,
}

/// A fillet resolved against concrete geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBlend {
    pub point: Vector3<f64>,
    /// Outward unit normals of the faces meeting at the feature.
    pub normals: Vec<Vector3<f64>>,
    pub radius: f64,
    pub width: f64,
    pub material: u32,
    pub kind: FeatureKind,
}

impl FeatureBlend {
    /// Resolve `spec` against `node`'s unfilleted geometry (local frame).
    /// Returns `None` when the spec has nothing to blend.
    pub fn detect(spec: &FilletSpec, node: &SolidNode) -> Option<FeatureBlend> {
        let f = spec.point;
        let raw = match node.evaluate_kind(f) {
            Ok(s) => s,
            Err(err) => {
                debug!(?f, %err, "Fillet point could not be evaluated; no blend");
                return None;
            }
        };
        if raw.distance.abs() > FEATURE_TOL {
            debug!(?f, distance = raw.distance, "Fillet point is not on the boundary; no blend");
            return None;
        }

        let eps = 1e-2 * spec.radius.min(spec.width);
        let mut normals: Vec<Vector3<f64>> = Vec::new();
        for n in node.kind_faces_through(f, FEATURE_TOL) {
            if normals.iter().any(|m| 1.0 - m.dot(&n) < NORMAL_TOL) {
                continue;
            }
            // A face whose outer side is solid material is buried, not a feature face.
            let buried = matches!(node.evaluate_kind(f + n * eps), Ok(s) if s.distance < -0.5 * eps);
            if !buried {
                normals.push(n);
            }
        }
        if normals.len() < 2 {
            debug!(?f, faces = normals.len(), "Fillet point lies on a smooth face; no blend");
            return None;
        }

        let mut dir = normals[0];
        for n in &normals[1..] {
            dir -= n;
        }
        let probe_inside = matches!(node.evaluate_kind(f + dir * eps), Ok(s) if s.inside);
        let kind = if probe_inside { FeatureKind::Concave } else { FeatureKind::Convex };

        debug!(?f, faces = normals.len(), ?kind, radius = spec.radius, "Fillet feature detected");
        Some(FeatureBlend {
            point: f,
            normals,
            radius: spec.radius,
            width: spec.width,
            material: spec.material,
            kind,
        })
    }

    /// Blend `raw` at local point `q`. Returns `None` outside the blend
    /// region or where the rounded and sharp surfaces agree.
    pub fn apply(&self, q: Vector3<f64>, raw: &Sample) -> Option<Sample> {
        let rel = q - self.point;
        if rel.norm() > self.width {
            return None;
        }
        let ds: Vec<f64> = self.normals.iter().map(|n| rel.dot(n)).collect();
        let (sharp, rounded) = match self.kind {
            FeatureKind::Convex => (sharp_intersection(&ds), blend_intersection_n(&ds, self.radius)),
            FeatureKind::Concave => (sharp_union(&ds), blend_union_n(&ds, self.radius)),
        };
        let delta = rounded - sharp;
        if delta == 0.0 {
            return None;
        }

        // Arc normal: weighted by how far each face plane is from the arc
        // center along its own normal.
        let mut grad = Vector3::zeros();
        for (d, n) in ds.iter().zip(&self.normals) {
            let u = match self.kind {
                FeatureKind::Convex => (d + self.radius).max(0.0),
                FeatureKind::Concave => (self.radius - d).max(0.0),
            };
            grad += n * u;
        }
        let normal = match self.kind {
            FeatureKind::Convex => grad,
            FeatureKind::Concave => -grad,
        };
        let normal = crate::math::normalize_or(normal, raw.normal);

        let distance = raw.distance + delta;
        Some(Sample {
            inside: distance < 0.0,
            distance,
            material: self.material,
            boundary: raw.boundary,
            normal,
        })
    }
}
