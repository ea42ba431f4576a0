//! Moving-least-squares implicit surface through oriented point samples.
//!
//! For a query point the samples within the support radius are gathered from
//! a k-d tree and weighted with a compactly supported Wendland kernel. The
//! signed distance is the offset of the query from the weighted centroid,
//! measured along the weighted average normal. Where the averaged normal
//! cancels out (samples surrounding the query from all sides) the distance
//! falls back to the weighted mean of the per-sample plane offsets.

use nalgebra::Vector3;
use tracing::debug;
use crate::error::{Error, Result};
use crate::math::normalize_or;
use crate::types::BBox3;

/// Relative magnitude below which the averaged normal is treated as cancelled.
const NORMAL_CANCEL: f64 = 1e-6;

/// Wendland C2 kernel `(1 - r/h)^4 (4 r/h + 1)` for `r < h`, zero beyond.
pub fn wendland(r: f64, h: f64) -> f64 {
    let s = r / h;
    if s >= 1.0 {
        return 0.0;
    }
    let t = 1.0 - s;
    t * t * t * t * (4.0 * s + 1.0)
}

/// Local MLS evaluation result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MlsSample {
    pub distance: f64,
    pub normal: Vector3<f64>,
    /// Number of samples that contributed.
    pub support: usize,
}

pub struct MlsSurface {
    positions: Vec<Vector3<f64>>,
    normals: Vec<Vector3<f64>>,
    support_radius: f64,
    kdtree: kiddo::KdTree<f64, 3>,
}

impl std::fmt::Debug for MlsSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlsSurface")
            .field("samples", &self.positions.len())
            .field("support_radius", &self.support_radius)
            .finish()
    }
}

impl MlsSurface {
    /// Build from `(position, outward normal)` pairs.
    pub fn new(samples: &[(Vector3<f64>, Vector3<f64>)], support_radius: f64) -> Result<Self> {
        if !(support_radius.is_finite() && support_radius > 0.0) {
            return Err(Error::geometry(
                "mls",
                format!("support radius must be positive and finite, got {support_radius}"),
            ));
        }
        if samples.is_empty() {
            return Err(Error::geometry("mls", "at least one sample is required"));
        }

        let mut positions = Vec::with_capacity(samples.len());
        let mut normals = Vec::with_capacity(samples.len());
        let mut kdtree = kiddo::KdTree::new();
        for (i, (p, n)) in samples.iter().enumerate() {
            if p.iter().any(|c| !c.is_finite()) {
                return Err(Error::geometry("mls", format!("sample {i} has a non-finite position")));
            }
            if !(n.norm_squared() > 0.0 && n.iter().all(|c| c.is_finite())) {
                return Err(Error::geometry("mls", format!("sample {i} has no usable normal")));
            }
            kdtree.add(&[p.x, p.y, p.z], i as u64);
            positions.push(*p);
            normals.push(n.normalize());
        }

        debug!(samples = positions.len(), support_radius, "Built MLS surface");
        Ok(Self { positions, normals, support_radius, kdtree })
    }

    pub fn support_radius(&self) -> f64 {
        self.support_radius
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Sample positions padded by the support radius. Queries outside this
    /// box always lack support.
    pub fn bounding_box(&self) -> BBox3 {
        BBox3::from_points(self.positions.iter().copied())
            .padded(Vector3::from_element(self.support_radius))
    }

    /// Signed distance at `x` (negative inside).
    pub fn evaluate(&self, x: Vector3<f64>) -> Result<MlsSample> {
        let h = self.support_radius;
        let neighbors = self.kdtree.within::<kiddo::SquaredEuclidean>(&[x.x, x.y, x.z], h * h);

        let mut w_sum = 0.0;
        let mut centroid = Vector3::zeros();
        let mut normal_sum = Vector3::zeros();
        let mut offset_sum = 0.0;
        let mut support = 0;
        for nb in &neighbors {
            let i = nb.item as usize;
            let w = wendland(nb.distance.sqrt(), h);
            if w <= 0.0 {
                continue;
            }
            let p = self.positions[i];
            let n = self.normals[i];
            w_sum += w;
            centroid += p * w;
            normal_sum += n * w;
            offset_sum += w * (x - p).dot(&n);
            support += 1;
        }

        if support == 0 {
            return Err(Error::InsufficientSupport { point: x, radius: h });
        }

        centroid /= w_sum;
        let n_len = normal_sum.norm();
        if n_len >= NORMAL_CANCEL * w_sum {
            let normal = normal_sum / n_len;
            Ok(MlsSample { distance: (x - centroid).dot(&normal), normal, support })
        } else {
            let fallback = self.normals[neighbors[0].item as usize];
            Ok(MlsSample {
                distance: offset_sum / w_sum,
                normal: normalize_or(x - centroid, fallback),
                support,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wendland_is_one_at_center_and_zero_at_support() {
        assert_eq!(wendland(0.0, 2.0), 1.0);
        assert_eq!(wendland(2.0, 2.0), 0.0);
        assert!(wendland(1.0, 2.0) > 0.0);
    }
}
