//! Accumulated rigid transforms.
//!
//! A node keeps a single world-from-local isometry. Rotations and
//! translations compose onto it in call order; geometry is never transformed
//! eagerly, query points are mapped into the local frame instead.

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::math::DEGENERATE_SQ;
use crate::types::BBox3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    world_from_local: Isometry3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self { world_from_local: Isometry3::identity() }
    }

    pub fn is_identity(&self) -> bool {
        self.world_from_local == Isometry3::identity()
    }

    /// Rotate by `degrees` about the line through `pivot` along `axis`,
    /// applied after everything accumulated so far.
    pub fn rotate(&mut self, pivot: Vector3<f64>, axis: Vector3<f64>, degrees: f64) -> Result<()> {
        let n2 = axis.norm_squared();
        if !(n2.is_finite() && n2 > DEGENERATE_SQ) {
            return Err(Error::transform(format!(
                "rotation axis ({}, {}, {}) has no direction",
                axis.x, axis.y, axis.z
            )));
        }
        if !degrees.is_finite() || pivot.iter().any(|c| !c.is_finite()) {
            return Err(Error::transform("rotation pivot and angle must be finite"));
        }
        let rotation = UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), degrees.to_radians());
        let about_pivot = Isometry3::rotation_wrt_point(rotation, Point3::from(pivot));
        self.world_from_local = about_pivot * self.world_from_local;
        Ok(())
    }

    /// Translate by `delta`, applied after everything accumulated so far.
    pub fn translate(&mut self, delta: Vector3<f64>) -> Result<()> {
        if delta.iter().any(|c| !c.is_finite()) {
            return Err(Error::transform("translation must be finite"));
        }
        let shift = Isometry3::from_parts(Translation3::from(delta), UnitQuaternion::identity());
        self.world_from_local = shift * self.world_from_local;
        Ok(())
    }

    /// Map a world point into the local frame.
    pub fn to_local(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.world_from_local.inverse_transform_point(&Point3::from(p)).coords
    }

    /// Map a local point into the world frame.
    pub fn to_world(&self, p: Vector3<f64>) -> Vector3<f64> {
        self.world_from_local.transform_point(&Point3::from(p)).coords
    }

    /// Rotate a local normal into the world frame.
    pub fn normal_to_world(&self, n: Vector3<f64>) -> Vector3<f64> {
        self.world_from_local.rotation * n
    }

    /// Rotate a world direction into the local frame.
    pub fn vector_to_local(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.world_from_local.rotation.inverse_transform_vector(&v)
    }

    /// World-space box enclosing the local box `b`.
    pub fn transform_bbox(&self, b: &BBox3) -> BBox3 {
        if self.is_identity() {
            return *b;
        }
        BBox3::from_points(b.corners().iter().map(|c| self.to_world(*c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_about_offset_pivot_fixes_the_pivot() {
        let mut t = RigidTransform::identity();
        let pivot = Vector3::new(1.0, 2.0, 3.0);
        t.rotate(pivot, Vector3::new(0.3, -1.0, 0.5), 37.0).unwrap();
        assert!((t.to_world(pivot) - pivot).norm() < 1e-12);
        assert!((t.to_local(pivot) - pivot).norm() < 1e-12);
    }

    #[test]
    fn translate_then_rotate_composes_in_call_order() {
        let mut t = RigidTransform::identity();
        t.translate(Vector3::new(1.0, 0.0, 0.0)).unwrap();
        t.rotate(Vector3::zeros(), Vector3::z(), 90.0).unwrap();
        let w = t.to_world(Vector3::zeros());
        assert!((w - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }
}
