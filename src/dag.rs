//! Frozen CSG DAG used for evaluation and domain building.
//!
//! A [`Solid`] is an immutable snapshot of a [`Shape`](crate::shape::Shape)
//! tree. Children are held behind `Arc<SolidNode>` so sub-trees shared in the
//! source tree stay shared here, and the whole snapshot is `Send + Sync`: the
//! octree builder queries it from many threads without locking.
//!
//! Every node carries its own rigid frame. Evaluation maps the query point
//! into the node's local frame, evaluates the node kind there, applies the
//! node's fillet blends, then rotates the resulting normal back out.

use std::sync::Arc;
use nalgebra::Vector3;
use crate::csg;
use crate::error::Result;
use crate::fillet::FeatureBlend;
use crate::mls::MlsSurface;
use crate::primitives::Primitive;
use crate::transform::RigidTransform;
use crate::types::{BBox3, Sample};

// ---------------------------------------------------------------------------
// SolidNode
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SolidKind {
    Primitive { primitive: Primitive, material: u32, faces: Vec<u32> },
    Mls { surface: Arc<MlsSurface>, material: u32, boundary: u32 },
    Union(Arc<SolidNode>, Arc<SolidNode>),
    Difference(Arc<SolidNode>, Arc<SolidNode>),
    Intersection(Arc<SolidNode>, Arc<SolidNode>),
}

#[derive(Debug)]
pub struct SolidNode {
    pub(crate) frame: RigidTransform,
    pub(crate) fillets: Vec<FeatureBlend>,
    pub(crate) kind: SolidKind,
}

/// A sample together with its exposure information.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved {
    /// Plain composite sample, identical to [`SolidNode::evaluate`].
    pub sample: Sample,
    /// Nearest surface that is a real boundary of the combined solid, if any.
    /// Surfaces buried inside a union sibling are skipped.
    pub surface: Option<Sample>,
    /// The point lies on a buried union surface with material on both sides.
    pub covered: bool,
}

impl Resolved {
    fn leaf(sample: Sample) -> Self {
        Self { sample, surface: Some(sample), covered: false }
    }
}

impl SolidNode {
    pub fn new(frame: RigidTransform, kind: SolidKind) -> Self {
        Self { frame, fillets: Vec::new(), kind }
    }

    pub fn kind(&self) -> &SolidKind {
        &self.kind
    }

    pub fn frame(&self) -> &RigidTransform {
        &self.frame
    }

    /// Fillet blends that resolved to an actual feature.
    pub fn fillets(&self) -> &[FeatureBlend] {
        &self.fillets
    }

    /// Evaluate at `p`, given in the parent's frame. The returned normal is
    /// in the parent's frame too.
    pub fn evaluate(&self, p: Vector3<f64>) -> Result<Sample> {
        let q = self.frame.to_local(p);
        let mut s = self.evaluate_kind(q)?;
        for blend in &self.fillets {
            if let Some(b) = blend.apply(q, &s) {
                s = b;
            }
        }
        s.normal = self.frame.normal_to_world(s.normal);
        Ok(s)
    }

    /// Evaluate the node kind at a local point, ignoring this node's fillets.
    pub(crate) fn evaluate_kind(&self, q: Vector3<f64>) -> Result<Sample> {
        match &self.kind {
            SolidKind::Primitive { primitive, material, faces } => {
                let ps = primitive.evaluate(q);
                let boundary = faces.get(ps.face).copied().unwrap_or_default();
                Ok(Sample::from_distance(ps.distance, *material, boundary, ps.normal))
            }
            SolidKind::Mls { surface, material, boundary } => {
                let ms = surface.evaluate(q)?;
                Ok(Sample::from_distance(ms.distance, *material, *boundary, ms.normal))
            }
            SolidKind::Union(a, b) => Ok(csg::union(a.evaluate(q)?, b.evaluate(q)?)),
            SolidKind::Difference(a, b) => Ok(csg::difference(a.evaluate(q)?, b.evaluate(q)?)),
            SolidKind::Intersection(a, b) => Ok(csg::intersection(a.evaluate(q)?, b.evaluate(q)?)),
        }
    }

    /// Evaluate at `p` and work out which surface is really exposed there.
    ///
    /// At a union, a child's nearest surface is buried when the point just
    /// outside it (projected onto that surface and pushed out by `tol`) is
    /// strictly inside the sibling. Buried surfaces never provide tags.
    pub fn resolve(&self, p: Vector3<f64>, tol: f64) -> Result<Resolved> {
        let q = self.frame.to_local(p);
        let mut r = self.resolve_kind(q, tol)?;
        for blend in &self.fillets {
            if let Some(b) = blend.apply(q, &r.sample) {
                r = Resolved::leaf(b);
            }
        }
        let to_world = |mut s: Sample| {
            s.normal = self.frame.normal_to_world(s.normal);
            s
        };
        Ok(Resolved {
            sample: to_world(r.sample),
            surface: r.surface.map(to_world),
            covered: r.covered,
        })
    }

    fn resolve_kind(&self, q: Vector3<f64>, tol: f64) -> Result<Resolved> {
        match &self.kind {
            SolidKind::Primitive { .. } | SolidKind::Mls { .. } => {
                Ok(Resolved::leaf(self.evaluate_kind(q)?))
            }
            SolidKind::Union(a, b) => {
                let ra = a.resolve(q, tol)?;
                let rb = b.resolve(q, tol)?;
                let (sa, buried_a) = exposed_against(q, ra.surface, b, tol);
                let (sb, buried_b) = exposed_against(q, rb.surface, a, tol);
                let surface = match (sa, sb) {
                    (Some(x), Some(y)) => Some(if y.distance <= x.distance { y } else { x }),
                    (x, y) => y.or(x),
                };
                Ok(Resolved {
                    sample: csg::union(ra.sample, rb.sample),
                    surface,
                    covered: ra.covered || rb.covered || buried_a || buried_b,
                })
            }
            SolidKind::Difference(a, b) => {
                let ra = a.resolve(q, tol)?;
                let rb = b.resolve(q, tol)?;
                let surface = match (ra.surface, rb.surface.map(Sample::complement)) {
                    (Some(x), Some(y)) => Some(if y.distance >= x.distance { y } else { x }),
                    (x, y) => y.or(x),
                };
                let b_solid = rb.sample.inside || rb.covered;
                Ok(Resolved {
                    sample: csg::difference(ra.sample, rb.sample),
                    surface,
                    covered: ra.covered && !b_solid,
                })
            }
            SolidKind::Intersection(a, b) => {
                let ra = a.resolve(q, tol)?;
                let rb = b.resolve(q, tol)?;
                let surface = match (ra.surface, rb.surface) {
                    (Some(x), Some(y)) => Some(if y.distance >= x.distance { y } else { x }),
                    (x, y) => y.or(x),
                };
                let a_solid = ra.sample.inside || ra.covered;
                let b_solid = rb.sample.inside || rb.covered;
                let sample = csg::intersection(ra.sample, rb.sample);
                Ok(Resolved {
                    sample,
                    surface,
                    covered: a_solid && b_solid && !sample.inside,
                })
            }
        }
    }

    /// Material of the solid occupying `p`, or `None` when `p` is outside.
    ///
    /// Where operands overlap the most recently combined one wins, so a
    /// subtracted operand's material never fills the remaining volume.
    pub fn material_at(&self, p: Vector3<f64>) -> Result<Option<u32>> {
        let q = self.frame.to_local(p);
        let raw = self.evaluate_kind(q)?;
        let mut filleted = None;
        for blend in &self.fillets {
            if let Some(b) = blend.apply(q, &raw) {
                filleted = Some(b);
            }
        }
        if let Some(s) = filleted {
            return Ok(s.inside.then_some(s.material));
        }
        match &self.kind {
            SolidKind::Primitive { material, .. } | SolidKind::Mls { material, .. } => {
                Ok(raw.inside.then_some(*material))
            }
            SolidKind::Union(a, b) => Ok(b.material_at(q)?.or(a.material_at(q)?)),
            SolidKind::Difference(a, b) => {
                if b.evaluate(q)?.inside {
                    Ok(None)
                } else {
                    a.material_at(q)
                }
            }
            SolidKind::Intersection(a, b) => {
                let ma = a.material_at(q)?;
                let mb = b.material_at(q)?;
                Ok(if ma.is_some() { mb } else { None })
            }
        }
    }

    /// Inside, or on a buried internal surface within `tol`.
    pub fn occupied(&self, p: Vector3<f64>, tol: f64) -> Result<bool> {
        let r = self.resolve(p, tol)?;
        Ok(r.sample.inside || r.covered)
    }

    /// Outward normals, in the parent's frame, of the primitive faces
    /// passing within `tol` of `p`. Faces of subtracted operands are flipped.
    pub(crate) fn faces_through(&self, p: Vector3<f64>, tol: f64) -> Vec<Vector3<f64>> {
        let q = self.frame.to_local(p);
        self.kind_faces_through(q, tol)
            .into_iter()
            .map(|n| self.frame.normal_to_world(n))
            .collect()
    }

    /// Like [`SolidNode::faces_through`] but for a local point, with normals
    /// left in the local frame.
    pub(crate) fn kind_faces_through(&self, q: Vector3<f64>, tol: f64) -> Vec<Vector3<f64>> {
        match &self.kind {
            SolidKind::Primitive { primitive, .. } => primitive.faces_through(q, tol),
            SolidKind::Mls { surface, .. } => match surface.evaluate(q) {
                Ok(s) if s.distance.abs() <= tol => vec![s.normal],
                _ => Vec::new(),
            },
            SolidKind::Union(a, b) | SolidKind::Intersection(a, b) => {
                let mut out = a.faces_through(q, tol);
                out.extend(b.faces_through(q, tol));
                out
            }
            SolidKind::Difference(a, b) => {
                let mut out = a.faces_through(q, tol);
                out.extend(b.faces_through(q, tol).into_iter().map(|n| -n));
                out
            }
        }
    }

    /// Bounding box in the parent's frame.
    pub fn bounding_box(&self) -> BBox3 {
        let local = match &self.kind {
            SolidKind::Primitive { primitive, .. } => primitive.bounding_box(),
            SolidKind::Mls { surface, .. } => surface.bounding_box(),
            SolidKind::Union(a, b) => a.bounding_box().union(&b.bounding_box()),
            SolidKind::Difference(a, _) => a.bounding_box(),
            SolidKind::Intersection(a, b) => a.bounding_box().intersection(&b.bounding_box()),
        };
        if local.is_empty() {
            return local;
        }
        self.frame.transform_bbox(&local)
    }

    /// Number of distinct nodes reachable from here (shared nodes count once).
    pub fn node_count(self: &Arc<Self>) -> usize {
        let mut seen = std::collections::HashSet::new();
        count_nodes(self, &mut seen);
        seen.len()
    }

    /// True when `|distance|` never overestimates the distance to the
    /// surface. Superellipsoid and MLS fields are first-order estimates.
    pub fn has_exact_distance(&self) -> bool {
        match &self.kind {
            SolidKind::Primitive { primitive, .. } => !matches!(primitive, Primitive::Superellipsoid { .. }),
            SolidKind::Mls { .. } => false,
            SolidKind::Union(a, b) | SolidKind::Difference(a, b) | SolidKind::Intersection(a, b) => {
                a.has_exact_distance() && b.has_exact_distance()
            }
        }
    }
}

/// Keep `surface` only if it is not buried inside `sibling`. Returns the
/// kept surface and whether `q` itself sits on a buried surface.
fn exposed_against(
    q: Vector3<f64>,
    surface: Option<Sample>,
    sibling: &SolidNode,
    tol: f64,
) -> (Option<Sample>, bool) {
    let Some(s) = surface else {
        return (None, false);
    };
    let foot = q - s.normal * s.distance;
    let probe = foot + s.normal * tol;
    let buried = matches!(sibling.evaluate(probe), Ok(o) if o.inside);
    if buried {
        (None, s.distance.abs() <= tol)
    } else {
        (Some(s), false)
    }
}

fn count_nodes(node: &Arc<SolidNode>, seen: &mut std::collections::HashSet<*const SolidNode>) {
    if !seen.insert(Arc::as_ptr(node)) {
        return;
    }
    match &node.kind {
        SolidKind::Union(a, b) | SolidKind::Difference(a, b) | SolidKind::Intersection(a, b) => {
            count_nodes(a, seen);
            count_nodes(b, seen);
        }
        SolidKind::Primitive { .. } | SolidKind::Mls { .. } => {}
    }
}

// ---------------------------------------------------------------------------
// Solid
// ---------------------------------------------------------------------------

/// Immutable, thread-safe snapshot of a CSG tree.
#[derive(Clone, Debug)]
pub struct Solid {
    root: Arc<SolidNode>,
}

impl Solid {
    pub fn new(root: Arc<SolidNode>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Arc<SolidNode> {
        &self.root
    }

    pub fn evaluate(&self, p: Vector3<f64>) -> Result<Sample> {
        self.root.evaluate(p)
    }

    pub fn resolve(&self, p: Vector3<f64>, tol: f64) -> Result<Resolved> {
        self.root.resolve(p, tol)
    }

    pub fn occupied(&self, p: Vector3<f64>, tol: f64) -> Result<bool> {
        self.root.occupied(p, tol)
    }

    pub fn material_at(&self, p: Vector3<f64>) -> Result<Option<u32>> {
        self.root.material_at(p)
    }

    pub fn bounding_box(&self) -> BBox3 {
        self.root.bounding_box()
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn has_exact_distance(&self) -> bool {
        self.root.has_exact_distance()
    }
}
