//! Domain configuration: the descriptor handed to every build, the role a
//! solid plays, builder settings, and the simulation registry that groups
//! several solids sharing one bounding region.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::error::{Error, Result};
use crate::octree::{build_solid_domain, OctreeDomain};
use crate::shape::Shape;
use crate::types::BBox3;

/// Fraction of the solid's extent added on every side of an inferred box.
pub const INFERRED_PADDING: f64 = 0.05;

/// Per-domain configuration passed explicitly to the builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainDescriptor {
    pub name: String,
    /// Global length scale, carried to the solver. Geometry is not rescaled.
    pub scale: f64,
    /// Base resolution: cells away from the boundary stop refining at this size.
    pub dx: f64,
    /// Finer resolution for Boundary cells.
    pub fine_dx: Option<f64>,
    /// Solver time step, carried through unchanged.
    pub step: f64,
    /// Explicit bounding box. Inferred from the solids when absent.
    pub bounds: Option<BBox3>,
}

impl DomainDescriptor {
    pub fn new(name: impl Into<String>, scale: f64, dx: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            scale,
            dx,
            fine_dx: None,
            step,
            bounds: None,
        }
    }

    pub fn with_fine_resolution(mut self, fine_dx: f64) -> Self {
        self.fine_dx = Some(fine_dx);
        self
    }

    pub fn with_bounds(mut self, bounds: BBox3) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Resolution Boundary cells are refined to.
    pub fn boundary_dx(&self) -> f64 {
        self.fine_dx.unwrap_or(self.dx)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |label: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::config(format!("domain '{}': {label} must be positive, got {v}", self.name)))
            }
        };
        positive("scale", self.scale)?;
        positive("dx", self.dx)?;
        positive("time step", self.step)?;
        if let Some(fine) = self.fine_dx {
            positive("fine dx", fine)?;
            if fine > self.dx {
                return Err(Error::config(format!(
                    "domain '{}': fine dx {fine} is coarser than dx {}",
                    self.name, self.dx
                )));
            }
        }
        if let Some(b) = &self.bounds {
            let size = b.size();
            if !(size.iter().all(|s| s.is_finite() && *s > 0.0)) {
                return Err(Error::config(format!("domain '{}': bounds are degenerate", self.name)));
            }
        }
        Ok(())
    }
}

/// What a solid represents in the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainRole {
    /// A body. Face normals point out of the material.
    Solid { label: Option<String> },
    /// The simulated region itself. Face normals point into it.
    Domain,
}

impl DomainRole {
    pub fn solid(label: impl Into<String>) -> Self {
        DomainRole::Solid { label: Some(label.into()) }
    }

    pub fn label(&self) -> &str {
        match self {
            DomainRole::Solid { label } => label.as_deref().unwrap_or("solid"),
            DomainRole::Domain => "domain",
        }
    }

    /// Whether recorded face normals point into the material.
    pub fn inward_normals(&self) -> bool {
        matches!(self, DomainRole::Domain)
    }
}

/// Settings for the octree builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Hard cap on refinement depth.
    pub max_depth: u32,
    /// Cells shallower than this are always subdivided.
    pub min_depth: u32,
    /// Probe points per axis used to resolve Boundary cell tags.
    pub probe_samples: usize,
    /// Surface tolerance, as a fraction of the boundary resolution.
    pub surface_tolerance: f64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self { max_depth: 12, min_depth: 2, probe_samples: 3, surface_tolerance: 1e-3 }
    }
}

impl BuildSettings {
    pub fn validate(&self) -> Result<()> {
        if self.min_depth > self.max_depth {
            return Err(Error::config(format!(
                "min depth {} exceeds max depth {}",
                self.min_depth, self.max_depth
            )));
        }
        if self.probe_samples == 0 {
            return Err(Error::config("at least one probe sample per axis is required"));
        }
        if !(self.surface_tolerance.is_finite() && self.surface_tolerance > 0.0) {
            return Err(Error::config("surface tolerance must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A solid registered in a simulation.
#[derive(Clone, Debug)]
pub struct SimulationEntry {
    pub shape: Shape,
    pub role: DomainRole,
}

/// Several solids sharing one descriptor and one bounding region.
///
/// Entries keep their handles, so mutations made after registration are
/// picked up by [`Simulation::build`].
#[derive(Clone, Debug)]
pub struct Simulation {
    descriptor: DomainDescriptor,
    entries: Vec<SimulationEntry>,
}

impl Simulation {
    pub fn new(descriptor: DomainDescriptor) -> Result<Self> {
        descriptor.validate()?;
        Ok(Self { descriptor, entries: Vec::new() })
    }

    pub fn descriptor(&self) -> &DomainDescriptor {
        &self.descriptor
    }

    pub fn entries(&self) -> &[SimulationEntry] {
        &self.entries
    }

    pub fn add_solid(&mut self, shape: &Shape, label: Option<&str>) {
        self.entries.push(SimulationEntry {
            shape: shape.clone(),
            role: DomainRole::Solid { label: label.map(str::to_owned) },
        });
    }

    pub fn add_domain(&mut self, shape: &Shape) {
        self.entries.push(SimulationEntry { shape: shape.clone(), role: DomainRole::Domain });
    }

    /// The explicit bounds, or the padded union of every entry's box.
    pub fn bounds(&self) -> Result<BBox3> {
        if let Some(b) = self.descriptor.bounds {
            return Ok(b);
        }
        let mut boxes = self
            .entries
            .iter()
            .map(|e| e.shape.bounding_box())
            .filter(|b| !b.is_empty());
        let first = boxes.next().ok_or_else(|| {
            Error::config(format!(
                "simulation '{}' has no bounds and no non-empty solids",
                self.descriptor.name
            ))
        })?;
        Ok(pad_inferred(&boxes.fold(first, |acc, b| acc.union(&b))))
    }

    /// Build one domain per entry, all over the shared bounds.
    pub fn build(&self, settings: &BuildSettings) -> Result<Vec<OctreeDomain>> {
        let descriptor = self.descriptor.clone().with_bounds(self.bounds()?);
        info!(
            simulation = %descriptor.name,
            entries = self.entries.len(),
            "Building simulation domains"
        );
        self.entries
            .iter()
            .map(|e| build_solid_domain(&e.shape.solid(), &descriptor, e.role.clone(), settings))
            .collect()
    }
}

/// Pad an inferred box so the surface never coincides with the root cell faces.
pub(crate) fn pad_inferred(b: &BBox3) -> BBox3 {
    b.padded(Vector3::from_element(b.longest_edge() * INFERRED_PADDING))
}
