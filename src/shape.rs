//! User-facing CSG node handles.
//!
//! A [`Shape`] is a handle onto a shared node record. Cloning the handle
//! (`Clone::clone`) yields another alias of the same record, and combining
//! shapes never copies operands: a boolean node refers to its operands'
//! records directly. Mutating a record through any alias (`rotate`,
//! `translate`, `fillet`) is therefore visible through every composite that
//! uses it. [`Shape::deep_clone`] is the only way to obtain an independent
//! copy.
//!
//! Reusing one node under several combinators and then mutating it is legal
//! and silent; the mutation shows up everywhere the node is used.
//!
//! # Example
//!
//! ```rust,no_run
//! use nalgebra::Vector3;
//! use oaktree::shape::Shape;
//!
//! let a = Shape::cube(Vector3::zeros(), Vector3::from_element(1.0), 1, &[1, 2, 3, 4, 5, 6])?;
//! let b = a.deep_clone();
//! b.translate(Vector3::from_element(0.5))?;
//! b.rotate(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0), 10.0)?;
//! let c = a.difference(&b);
//! assert!(c.contains(Vector3::from_element(0.1))?);
//! # Ok::<(), oaktree::Error>(())
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use nalgebra::Vector3;
use crate::dag::{Solid, SolidKind, SolidNode};
use crate::error::{Error, Result};
use crate::fillet::{FeatureBlend, FilletSpec};
use crate::mls::MlsSurface;
use crate::primitives::Primitive;
use crate::transform::RigidTransform;
use crate::types::{BBox3, Sample};

/// Boundary id given to MLS surfaces, which carry a single unnamed face.
pub const MLS_BOUNDARY: u32 = 0;

#[derive(Clone)]
enum ShapeKind {
    Primitive { primitive: Primitive, material: u32, faces: Vec<u32> },
    Mls { surface: Arc<MlsSurface>, material: u32 },
    Union(Shape, Shape),
    Difference(Shape, Shape),
    Intersection(Shape, Shape),
}

struct ShapeRecord {
    kind: ShapeKind,
    frame: RigidTransform,
    fillets: Vec<FilletSpec>,
}

/// Handle onto a shared, mutable CSG node.
#[derive(Clone)]
pub struct Shape {
    record: Arc<RwLock<ShapeRecord>>,
}

type RecordKey = *const RwLock<ShapeRecord>;

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.read();
        let kind = match &r.kind {
            ShapeKind::Primitive { primitive, .. } => primitive.name(),
            ShapeKind::Mls { .. } => "mls",
            ShapeKind::Union(..) => "union",
            ShapeKind::Difference(..) => "difference",
            ShapeKind::Intersection(..) => "intersection",
        };
        f.debug_struct("Shape")
            .field("kind", &kind)
            .field("record", &Arc::as_ptr(&self.record))
            .field("fillets", &r.fillets.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

impl Shape {
    fn from_kind(kind: ShapeKind) -> Self {
        Self {
            record: Arc::new(RwLock::new(ShapeRecord {
                kind,
                frame: RigidTransform::identity(),
                fillets: Vec::new(),
            })),
        }
    }

    /// Validate a primitive and its boundary-id array, then wrap it.
    pub fn primitive(primitive: Primitive, material: u32, faces: &[u32]) -> Result<Self> {
        primitive.validate()?;
        if faces.len() != primitive.face_count() {
            return Err(Error::config(format!(
                "{} expects {} boundary ids, got {}",
                primitive.name(),
                primitive.face_count(),
                faces.len()
            )));
        }
        Ok(Self::from_kind(ShapeKind::Primitive {
            primitive,
            material,
            faces: faces.to_vec(),
        }))
    }

    /// Box with minimum corner `origin` and edge lengths `extents`.
    /// Boundary ids are ordered `[-x, +x, -y, +y, -z, +z]`.
    pub fn cube(origin: Vector3<f64>, extents: Vector3<f64>, material: u32, faces: &[u32]) -> Result<Self> {
        Self::primitive(Primitive::Cube { origin, extents }, material, faces)
    }

    /// Sphere with one boundary id.
    pub fn sphere(center: Vector3<f64>, radius: f64, material: u32, faces: &[u32]) -> Result<Self> {
        Self::primitive(Primitive::Sphere { center, radius }, material, faces)
    }

    /// Cylinder with bottom cap centered on `base`, axis +z.
    /// Boundary ids are ordered `[side, bottom, top]`.
    pub fn cylinder(
        base: Vector3<f64>,
        height: f64,
        radius: f64,
        material: u32,
        faces: &[u32],
    ) -> Result<Self> {
        Self::primitive(Primitive::Cylinder { base, height, radius }, material, faces)
    }

    /// Superellipsoid with semi-axes `radii` and exponents `r` (in the xy
    /// plane) and `t` (along z). One boundary id.
    pub fn superellipsoid(
        center: Vector3<f64>,
        radii: Vector3<f64>,
        r: f64,
        t: f64,
        material: u32,
        faces: &[u32],
    ) -> Result<Self> {
        Self::primitive(Primitive::Superellipsoid { center, radii, r, t }, material, faces)
    }

    /// MLS surface through `(position, outward normal)` samples.
    /// Its single face carries [`MLS_BOUNDARY`].
    pub fn mls(samples: &[(Vector3<f64>, Vector3<f64>)], support_radius: f64, material: u32) -> Result<Self> {
        let surface = MlsSurface::new(samples, support_radius)?;
        Ok(Self::from_kind(ShapeKind::Mls { surface: Arc::new(surface), material }))
    }
}

// ---------------------------------------------------------------------------
// CSG operations: operands are referenced, never copied
// ---------------------------------------------------------------------------

impl Shape {
    /// Boolean union: the volume of either shape.
    pub fn union(&self, other: &Shape) -> Shape {
        Self::from_kind(ShapeKind::Union(self.clone(), other.clone()))
    }

    /// Boolean subtraction: self minus other.
    pub fn difference(&self, other: &Shape) -> Shape {
        Self::from_kind(ShapeKind::Difference(self.clone(), other.clone()))
    }

    /// Boolean intersection: the volume shared by both shapes.
    pub fn intersection(&self, other: &Shape) -> Shape {
        Self::from_kind(ShapeKind::Intersection(self.clone(), other.clone()))
    }
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

impl Shape {
    fn read(&self) -> RwLockReadGuard<'_, ShapeRecord> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShapeRecord> {
        self.record.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rotate by `degrees` about the axis through `pivot`. Visible through
    /// every alias of this node.
    pub fn rotate(&self, pivot: Vector3<f64>, axis: Vector3<f64>, degrees: f64) -> Result<()> {
        self.write().frame.rotate(pivot, axis, degrees)
    }

    /// Move by `delta`. Visible through every alias of this node.
    pub fn translate(&self, delta: Vector3<f64>) -> Result<()> {
        self.write().frame.translate(delta)
    }

    /// Round the feature at world point `point`. The feature is pinned to
    /// the node, so it follows later rotations and moves of this node.
    pub fn fillet(&self, point: Vector3<f64>, radius: f64, width: f64, material: u32) -> Result<()> {
        let mut record = self.write();
        let local = record.frame.to_local(point);
        let spec = FilletSpec::new(local, radius, width, material)?;
        record.fillets.push(spec);
        Ok(())
    }

    /// Independent deep copy of the whole sub-tree. Sharing inside the
    /// sub-tree is preserved among the copies.
    pub fn deep_clone(&self) -> Shape {
        let mut memo = HashMap::new();
        self.deep_clone_with(&mut memo)
    }

    fn deep_clone_with(&self, memo: &mut HashMap<RecordKey, Shape>) -> Shape {
        let key = Arc::as_ptr(&self.record);
        if let Some(copy) = memo.get(&key) {
            return copy.clone();
        }
        let (kind, frame, fillets) = {
            let r = self.read();
            (r.kind.clone(), r.frame, r.fillets.clone())
        };
        let kind = match kind {
            ShapeKind::Union(a, b) => ShapeKind::Union(a.deep_clone_with(memo), b.deep_clone_with(memo)),
            ShapeKind::Difference(a, b) => {
                ShapeKind::Difference(a.deep_clone_with(memo), b.deep_clone_with(memo))
            }
            ShapeKind::Intersection(a, b) => {
                ShapeKind::Intersection(a.deep_clone_with(memo), b.deep_clone_with(memo))
            }
            leaf => leaf,
        };
        let copy = Shape {
            record: Arc::new(RwLock::new(ShapeRecord { kind, frame, fillets })),
        };
        memo.insert(key, copy.clone());
        copy
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Shape {
    /// True if both handles refer to the same node record.
    pub fn ptr_eq(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }

    /// Freeze the current state of the tree into an immutable [`Solid`].
    /// Fillets are resolved against the geometry as it is now.
    pub fn solid(&self) -> Solid {
        let mut memo = HashMap::new();
        Solid::new(self.freeze(&mut memo))
    }

    fn freeze(&self, memo: &mut HashMap<RecordKey, Arc<SolidNode>>) -> Arc<SolidNode> {
        let key = Arc::as_ptr(&self.record);
        if let Some(node) = memo.get(&key) {
            return Arc::clone(node);
        }
        let (kind, frame, fillets) = {
            let r = self.read();
            (r.kind.clone(), r.frame, r.fillets.clone())
        };
        let kind = match kind {
            ShapeKind::Primitive { primitive, material, faces } => {
                SolidKind::Primitive { primitive, material, faces }
            }
            ShapeKind::Mls { surface, material } => {
                SolidKind::Mls { surface, material, boundary: MLS_BOUNDARY }
            }
            ShapeKind::Union(a, b) => SolidKind::Union(a.freeze(memo), b.freeze(memo)),
            ShapeKind::Difference(a, b) => SolidKind::Difference(a.freeze(memo), b.freeze(memo)),
            ShapeKind::Intersection(a, b) => SolidKind::Intersection(a.freeze(memo), b.freeze(memo)),
        };
        let mut node = SolidNode::new(frame, kind);
        let blends: Vec<FeatureBlend> = fillets
            .iter()
            .filter_map(|spec| FeatureBlend::detect(spec, &node))
            .collect();
        node.fillets = blends;
        let node = Arc::new(node);
        memo.insert(key, Arc::clone(&node));
        node
    }

    /// Evaluate the tree as it is now at world point `p`.
    pub fn evaluate(&self, p: Vector3<f64>) -> Result<Sample> {
        self.solid().evaluate(p)
    }

    /// Inside test at world point `p`.
    pub fn contains(&self, p: Vector3<f64>) -> Result<bool> {
        Ok(self.evaluate(p)?.inside)
    }

    /// World-space bounding box of the current geometry.
    pub fn bounding_box(&self) -> BBox3 {
        self.solid().bounding_box()
    }
}
