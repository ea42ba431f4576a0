use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Result of evaluating a solid at a point.
///
/// `inside` is combined logically through boolean nodes, so it follows the
/// exact set algebra even on coincident surfaces, while `distance` is the
/// min/max signed-distance bound (negative inside).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub inside: bool,
    /// Signed distance estimate to the surface that produced the tags.
    pub distance: f64,
    /// Material id of the primitive (or fillet) that owns the nearest surface.
    pub material: u32,
    /// Boundary-condition id of the nearest face.
    pub boundary: u32,
    /// Outward unit normal of the nearest surface.
    pub normal: Vector3<f64>,
}

impl Sample {
    /// Sample with `inside` derived from the sign of `distance`.
    pub fn from_distance(distance: f64, material: u32, boundary: u32, normal: Vector3<f64>) -> Self {
        Self {
            inside: distance < 0.0,
            distance,
            material,
            boundary,
            normal,
        }
    }

    /// The complement: inside flips, distance and normal are negated, tags kept.
    pub fn complement(self) -> Self {
        Self {
            inside: !self.inside,
            distance: -self.distance,
            normal: -self.normal,
            ..self
        }
    }
}

/// A boundary tag attached to a Boundary cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceTag {
    pub material: u32,
    pub boundary: u32,
    /// Unit face normal, oriented according to the domain role.
    pub normal: Vector3<f64>,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox3 {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl BBox3 {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self { Self { min, max } }
    pub fn center(&self) -> Vector3<f64> { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vector3<f64> { self.max - self.min }
    pub fn contains(&self, p: Vector3<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Box with no volume-bearing extent: some `max < min`.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Length of the longest edge.
    pub fn longest_edge(&self) -> f64 {
        self.size().max()
    }

    /// Half the length of the main diagonal.
    pub fn half_diagonal(&self) -> f64 {
        self.size().norm() * 0.5
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox3) -> BBox3 {
        BBox3::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Overlap of both boxes (possibly empty).
    pub fn intersection(&self, other: &BBox3) -> BBox3 {
        BBox3::new(self.min.sup(&other.min), self.max.inf(&other.max))
    }

    /// Grow by `pad` on every side.
    pub fn padded(&self, pad: Vector3<f64>) -> BBox3 {
        BBox3::new(self.min - pad, self.max + pad)
    }

    /// Smallest box containing all `points`.
    pub fn from_points<I: IntoIterator<Item = Vector3<f64>>>(points: I) -> BBox3 {
        let mut min = Vector3::from_element(f64::INFINITY);
        let mut max = Vector3::from_element(f64::NEG_INFINITY);
        for p in points {
            min = min.inf(&p);
            max = max.sup(&p);
        }
        BBox3::new(min, max)
    }

    /// The 8 corners. Bit 0 of the index selects max x, bit 1 max y,
    /// bit 2 max z.
    pub fn corners(&self) -> [Vector3<f64>; 8] {
        std::array::from_fn(|i| {
            Vector3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Split into 8 octants, indexed like [`BBox3::corners`].
    pub fn octants(&self) -> [BBox3; 8] {
        let c = self.center();
        let mn = self.min;
        let mx = self.max;
        [
            BBox3::new(Vector3::new(mn.x, mn.y, mn.z), Vector3::new(c.x, c.y, c.z)),
            BBox3::new(Vector3::new(c.x, mn.y, mn.z), Vector3::new(mx.x, c.y, c.z)),
            BBox3::new(Vector3::new(mn.x, c.y, mn.z), Vector3::new(c.x, mx.y, c.z)),
            BBox3::new(Vector3::new(c.x, c.y, mn.z), Vector3::new(mx.x, mx.y, c.z)),
            BBox3::new(Vector3::new(mn.x, mn.y, c.z), Vector3::new(c.x, c.y, mx.z)),
            BBox3::new(Vector3::new(c.x, mn.y, c.z), Vector3::new(mx.x, c.y, mx.z)),
            BBox3::new(Vector3::new(mn.x, c.y, c.z), Vector3::new(c.x, mx.y, mx.z)),
            BBox3::new(Vector3::new(c.x, c.y, c.z), Vector3::new(mx.x, mx.y, mx.z)),
        ]
    }
}
