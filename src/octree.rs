//! Adaptive octree domain construction.
//!
//! The root cell is a cube anchored at the minimum corner of the domain
//! bounds, with edge equal to their longest side. Each cell samples the
//! solid's occupancy at its 8 corners:
//!
//! 1. Corners agree: the cell is terminal (Full or Empty) once it is at the
//!    base resolution `dx`, or earlier if the center sample proves no
//!    surface is within the cell. Otherwise it is subdivided.
//! 2. Corners disagree: the cell is subdivided until the boundary depth
//!    (fine resolution if given, else `dx`), where it becomes a Boundary
//!    cell whose tags are resolved by probing a small lattice of points.
//!
//! Refinement is level-synchronous: all cells of one depth are decided in
//! parallel with rayon, then their children are appended to the cell arena
//! in order at the end of the level. A final pass re-tests every Boundary
//! tag just outside its surface point and drops tags whose surface turned
//! out to be buried inside the combined solid.

use std::collections::BTreeSet;
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::dag::Solid;
use crate::domain::{pad_inferred, BuildSettings, DomainDescriptor, DomainRole};
use crate::error::{BuildWarning, Error, Result};
use crate::math::normalize_or;
use crate::shape::Shape;
use crate::types::{BBox3, FaceTag, Sample};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Classification of a leaf cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    Empty,
    /// Entirely inside material `material`.
    Full { material: u32 },
    /// Crossed by the surface. Tags are unique per `(material, boundary)`.
    Boundary { tags: Vec<FaceTag> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Leaf(Classification),
    /// Index of the first of eight consecutive children in the cell arena,
    /// ordered like [`BBox3::octants`].
    Children(usize),
}

/// A single cell in the adaptive octree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctreeCell {
    pub bbox: BBox3,
    /// Depth of this cell in the tree (root = 0).
    pub depth: u32,
    pub content: CellContent,
}

impl OctreeCell {
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, CellContent::Leaf(_))
    }

    pub fn classification(&self) -> Option<&Classification> {
        match &self.content {
            CellContent::Leaf(c) => Some(c),
            CellContent::Children(_) => None,
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self.classification(), Some(Classification::Boundary { .. }))
    }

    pub fn is_full(&self) -> bool {
        matches!(self.classification(), Some(Classification::Full { .. }))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.classification(), Some(Classification::Empty))
    }

    /// Boundary tags; empty for any other cell.
    pub fn tags(&self) -> &[FaceTag] {
        match self.classification() {
            Some(Classification::Boundary { tags }) => tags,
            _ => &[],
        }
    }
}

/// Counters collected while building.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStats {
    pub empty: usize,
    pub full: usize,
    pub boundary: usize,
    /// Boundary cells whose tags could not be resolved.
    pub untagged_boundary: usize,
    /// Tags dropped because their surface was buried.
    pub suppressed_tags: usize,
    /// Samples that failed for lack of MLS support.
    pub unsupported_samples: usize,
    /// Depth at which cells reach the base resolution.
    pub target_depth: u32,
    /// Depth Boundary cells are refined to.
    pub boundary_depth: u32,
}

// ---------------------------------------------------------------------------
// OctreeDomain
// ---------------------------------------------------------------------------

/// The tagged octree handed to the persistence layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctreeDomain {
    descriptor: DomainDescriptor,
    role: DomainRole,
    cells: Vec<OctreeCell>,
    materials: Vec<u32>,
    boundaries: Vec<u32>,
    warnings: Vec<BuildWarning>,
    stats: DomainStats,
}

impl OctreeDomain {
    /// Descriptor the domain was built with; `bounds` holds the bounds used.
    pub fn descriptor(&self) -> &DomainDescriptor {
        &self.descriptor
    }

    pub fn role(&self) -> &DomainRole {
        &self.role
    }

    pub fn name(&self) -> &str {
        self.role.label()
    }

    pub fn root(&self) -> &OctreeCell {
        &self.cells[0]
    }

    /// All cells, parents before children.
    pub fn cells(&self) -> &[OctreeCell] {
        &self.cells
    }

    pub fn children(&self, cell: &OctreeCell) -> Option<&[OctreeCell]> {
        match cell.content {
            CellContent::Children(first) => Some(&self.cells[first..first + 8]),
            CellContent::Leaf(_) => None,
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &OctreeCell> {
        self.cells.iter().filter(|c| c.is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn boundary_cells(&self) -> Vec<&OctreeCell> {
        self.cells.iter().filter(|c| c.is_boundary()).collect()
    }

    pub fn max_depth(&self) -> u32 {
        self.cells.iter().map(|c| c.depth).max().unwrap_or(0)
    }

    /// Leaf whose box contains `p`, or `None` outside the root.
    pub fn find_leaf_containing(&self, p: Vector3<f64>) -> Option<&OctreeCell> {
        let mut cell = self.root();
        if !cell.bbox.contains(p) {
            return None;
        }
        while let CellContent::Children(first) = cell.content {
            let c = cell.bbox.center();
            let octant = usize::from(p.x >= c.x)
                | usize::from(p.y >= c.y) << 1
                | usize::from(p.z >= c.z) << 2;
            cell = &self.cells[first + octant];
        }
        Some(cell)
    }

    /// Sorted material ids used by Full cells and Boundary tags.
    pub fn materials(&self) -> &[u32] {
        &self.materials
    }

    /// Sorted boundary-condition ids used by Boundary tags.
    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> &DomainStats {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Build a domain for `shape` with default [`BuildSettings`].
pub fn build_domain(shape: &Shape, descriptor: &DomainDescriptor, role: DomainRole) -> Result<OctreeDomain> {
    build_domain_with(shape, descriptor, role, &BuildSettings::default())
}

/// Build a domain for `shape`. The tree is frozen first; later mutations of
/// the shape do not affect the result.
pub fn build_domain_with(
    shape: &Shape,
    descriptor: &DomainDescriptor,
    role: DomainRole,
    settings: &BuildSettings,
) -> Result<OctreeDomain> {
    build_solid_domain(&shape.solid(), descriptor, role, settings)
}

/// Build a domain for an already frozen solid.
pub fn build_solid_domain(
    solid: &Solid,
    descriptor: &DomainDescriptor,
    role: DomainRole,
    settings: &BuildSettings,
) -> Result<OctreeDomain> {
    descriptor.validate()?;
    settings.validate()?;

    let bounds = match descriptor.bounds {
        Some(b) => b,
        None => {
            let b = solid.bounding_box();
            if b.is_empty() || !b.size().iter().all(|s| s.is_finite()) {
                return Err(Error::config(format!(
                    "domain '{}': solid has an empty bounding box; give explicit bounds",
                    descriptor.name
                )));
            }
            pad_inferred(&b)
        }
    };
    let edge = bounds.longest_edge();
    let root_box = BBox3::new(bounds.min, bounds.min + Vector3::from_element(edge));

    let mut warnings = Vec::new();
    let requested = depth_for(edge, descriptor.boundary_dx());
    let boundary_depth = if requested > settings.max_depth {
        warn!(
            domain = %descriptor.name,
            requested,
            max = settings.max_depth,
            "Refinement budget exceeded; boundary cells stay coarser"
        );
        warnings.push(BuildWarning::RefinementBudgetExceeded { requested, max: settings.max_depth });
        settings.max_depth
    } else {
        requested
    };
    let target_depth = depth_for(edge, descriptor.dx).min(boundary_depth);

    let ctx = BuildContext {
        solid,
        tol: settings.surface_tolerance * descriptor.boundary_dx(),
        min_depth: settings.min_depth.min(target_depth),
        target_depth,
        boundary_depth,
        probes: settings.probe_samples,
        exact_distance: solid.has_exact_distance(),
    };

    info!(
        domain = %descriptor.name,
        role = role.label(),
        edge,
        target_depth,
        boundary_depth,
        "Building octree domain"
    );

    // Level-synchronous refinement.
    let mut cells: Vec<OctreeCell> = Vec::new();
    let mut pending: Vec<PendingBoundary> = Vec::new();
    let mut frontier: Vec<(BBox3, u32)> = vec![(root_box, 0)];
    let mut unsupported = 0usize;
    while !frontier.is_empty() {
        let depth = frontier[0].1;
        let outcomes: Vec<CellOutcome> = frontier
            .par_iter()
            .map(|(bbox, d)| ctx.decide(bbox, *d))
            .collect();

        let base = cells.len() + frontier.len();
        let mut next = Vec::new();
        for ((bbox, d), outcome) in frontier.into_iter().zip(outcomes) {
            unsupported += outcome.unsupported;
            let content = match outcome.decision {
                Decision::Split => {
                    let first = base + next.len();
                    next.extend(bbox.octants().into_iter().map(|o| (o, d + 1)));
                    CellContent::Children(first)
                }
                Decision::Leaf(c) => CellContent::Leaf(c),
                Decision::Boundary(candidates) => {
                    pending.push(PendingBoundary {
                        cell: cells.len(),
                        edge: bbox.longest_edge(),
                        candidates,
                    });
                    CellContent::Leaf(Classification::Boundary { tags: Vec::new() })
                }
            };
            cells.push(OctreeCell { bbox, depth: d, content });
        }
        debug!(depth, cells = cells.len(), next = next.len(), "Octree level decided");
        frontier = next;
    }

    // Buried-surface suppression and tag finalization.
    let inward = role.inward_normals();
    let finalized: Vec<(usize, Vec<FaceTag>, usize)> = pending
        .par_iter()
        .map(|pb| {
            let (tags, dropped) = ctx.finalize_tags(pb, inward);
            (pb.cell, tags, dropped)
        })
        .collect();

    let mut stats = DomainStats { target_depth, boundary_depth, ..DomainStats::default() };
    for (idx, tags, dropped) in finalized {
        stats.suppressed_tags += dropped;
        cells[idx].content = CellContent::Leaf(Classification::Boundary { tags });
    }

    let mut materials = BTreeSet::new();
    let mut boundaries = BTreeSet::new();
    for cell in &cells {
        match cell.classification() {
            Some(Classification::Empty) => stats.empty += 1,
            Some(Classification::Full { material }) => {
                stats.full += 1;
                materials.insert(*material);
            }
            Some(Classification::Boundary { tags }) => {
                stats.boundary += 1;
                if tags.is_empty() {
                    stats.untagged_boundary += 1;
                }
                for t in tags {
                    materials.insert(t.material);
                    boundaries.insert(t.boundary);
                }
            }
            None => {}
        }
    }

    stats.unsupported_samples = unsupported;
    if unsupported > 0 {
        warn!(
            domain = %descriptor.name,
            samples = unsupported,
            "Samples without MLS support were treated as outside"
        );
        warnings.push(BuildWarning::InsufficientSupport { samples: unsupported });
    }

    info!(
        domain = %descriptor.name,
        cells = cells.len(),
        full = stats.full,
        empty = stats.empty,
        boundary = stats.boundary,
        suppressed = stats.suppressed_tags,
        "Octree domain complete"
    );

    let mut descriptor = descriptor.clone();
    descriptor.bounds = Some(bounds);
    Ok(OctreeDomain {
        descriptor,
        role,
        cells,
        materials: materials.into_iter().collect(),
        boundaries: boundaries.into_iter().collect(),
        warnings,
        stats,
    })
}

/// Smallest depth at which a cell of the root edge is no larger than `dx`.
fn depth_for(edge: f64, dx: f64) -> u32 {
    let ratio = edge / dx;
    if ratio <= 1.0 {
        0
    } else {
        (ratio.log2() - 1e-9).ceil() as u32
    }
}

// ---------------------------------------------------------------------------
// Per-cell decisions
// ---------------------------------------------------------------------------

struct BuildContext<'a> {
    solid: &'a Solid,
    tol: f64,
    min_depth: u32,
    target_depth: u32,
    boundary_depth: u32,
    probes: usize,
    exact_distance: bool,
}

enum Decision {
    Leaf(Classification),
    Boundary(Vec<TagCandidate>),
    Split,
}

struct CellOutcome {
    decision: Decision,
    unsupported: usize,
}

/// Tag seen while probing, with every surface point it was seen at.
struct TagCandidate {
    material: u32,
    boundary: u32,
    normal_sum: Vector3<f64>,
    points: Vec<(Vector3<f64>, Vector3<f64>)>,
}

struct PendingBoundary {
    cell: usize,
    edge: f64,
    candidates: Vec<TagCandidate>,
}

impl BuildContext<'_> {
    fn decide(&self, bbox: &BBox3, depth: u32) -> CellOutcome {
        let mut unsupported = 0;
        let occupied = bbox.corners().map(|c| match self.solid.occupied(c, self.tol) {
            Ok(o) => o,
            Err(_) => {
                unsupported += 1;
                false
            }
        });
        let all_in = occupied.iter().all(|&o| o);
        let all_out = occupied.iter().all(|&o| !o);

        let decision = if all_in || all_out {
            let terminal = depth >= self.target_depth
                || depth >= self.boundary_depth
                || (depth >= self.min_depth && self.center_is_clear(bbox, all_in, &mut unsupported));
            if !terminal {
                Decision::Split
            } else if all_in {
                Decision::Leaf(Classification::Full { material: self.full_material(bbox) })
            } else {
                Decision::Leaf(Classification::Empty)
            }
        } else if depth >= self.boundary_depth {
            Decision::Boundary(self.probe_tags(bbox, &mut unsupported))
        } else {
            Decision::Split
        };
        CellOutcome { decision, unsupported }
    }

    /// The center agrees with the corners and no surface is within reach of
    /// any point of the cell. Only sound when every distance in the tree is
    /// exact, so solids with estimated fields always refine to `target_depth`.
    fn center_is_clear(&self, bbox: &BBox3, inside: bool, unsupported: &mut usize) -> bool {
        if !self.exact_distance {
            return false;
        }
        match self.solid.resolve(bbox.center(), self.tol) {
            Ok(r) => {
                (r.sample.inside || r.covered) == inside
                    && r.sample.distance.abs() >= bbox.half_diagonal()
            }
            Err(_) => {
                *unsupported += 1;
                false
            }
        }
    }

    fn full_material(&self, bbox: &BBox3) -> u32 {
        std::iter::once(bbox.center())
            .chain(bbox.corners())
            .find_map(|p| self.solid.material_at(p).ok().flatten())
            .or_else(|| self.solid.evaluate(bbox.center()).ok().map(|s| s.material))
            .unwrap_or_default()
    }

    /// Probe an `n x n x n` lattice and collect the exposed surfaces within
    /// reach of the cell.
    fn probe_tags(&self, bbox: &BBox3, unsupported: &mut usize) -> Vec<TagCandidate> {
        let n = self.probes;
        let size = bbox.size();
        let reach = bbox.half_diagonal() + self.tol;
        let mut candidates: Vec<TagCandidate> = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let t = |idx: usize| (idx as f64 + 0.5) / n as f64;
                    let p = bbox.min + Vector3::new(t(i) * size.x, t(j) * size.y, t(k) * size.z);
                    let surface = match self.solid.resolve(p, self.tol) {
                        Ok(r) => r.surface,
                        Err(_) => {
                            *unsupported += 1;
                            continue;
                        }
                    };
                    let Some(s) = surface else { continue };
                    if s.distance.abs() > reach {
                        continue;
                    }
                    let foot = self.project(p, &s);
                    match candidates
                        .iter_mut()
                        .find(|c| c.material == s.material && c.boundary == s.boundary)
                    {
                        Some(c) => {
                            c.normal_sum += s.normal;
                            c.points.push((foot, s.normal));
                        }
                        None => candidates.push(TagCandidate {
                            material: s.material,
                            boundary: s.boundary,
                            normal_sum: s.normal,
                            points: vec![(foot, s.normal)],
                        }),
                    }
                }
            }
        }
        candidates
    }

    /// Foot point of `s` seen from `p`, refined with a couple of projection
    /// steps for surfaces whose distance is only an estimate.
    fn project(&self, p: Vector3<f64>, s: &Sample) -> Vector3<f64> {
        let mut x = p - s.normal * s.distance;
        for _ in 0..2 {
            let Ok(r) = self.solid.resolve(x, self.tol) else { break };
            match r.surface {
                Some(t) if t.material == s.material && t.boundary == s.boundary && t.distance.abs() > 0.1 * self.tol => {
                    x -= t.normal * t.distance;
                }
                _ => break,
            }
        }
        x
    }

    /// Drop tags whose every surface point is buried, then average normals.
    fn finalize_tags(&self, pb: &PendingBoundary, inward: bool) -> (Vec<FaceTag>, usize) {
        let delta = self.tol.max(1e-3 * pb.edge);
        let mut dropped = 0;
        let mut tags = Vec::new();
        for c in &pb.candidates {
            let exposed = c.points.iter().any(|(x, n)| {
                !matches!(self.solid.occupied(x + n * delta, self.tol), Ok(true))
            });
            if !exposed {
                dropped += 1;
                continue;
            }
            let normal = normalize_or(c.normal_sum, c.points[0].1);
            tags.push(FaceTag {
                material: c.material,
                boundary: c.boundary,
                normal: if inward { -normal } else { normal },
            });
        }
        (tags, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_for_rounds_up_and_respects_powers_of_two() {
        assert_eq!(depth_for(1.0, 0.125), 3);
        assert_eq!(depth_for(1.0, 0.1), 4);
        assert_eq!(depth_for(1.0, 2.0), 0);
    }
}
