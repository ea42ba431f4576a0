//! Constructive solid geometry evaluation and adaptive octree domain
//! building for simulation setup.
//!
//! Solids are composed from primitives ([`Shape::cube`], [`Shape::sphere`],
//! [`Shape::cylinder`], [`Shape::superellipsoid`], [`Shape::mls`]) with
//! boolean operations, rigid transforms and fillets. A finished tree is
//! discretized by [`build_domain`] into an [`OctreeDomain`]: Empty, Full and
//! Boundary cells, with Boundary cells carrying the material and
//! boundary-condition ids of the surfaces that cross them.

pub mod math;
pub mod types;
pub mod error;
pub mod primitives;
pub mod transform;
pub mod csg;
pub mod blend;
pub mod fillet;
pub mod mls;
pub mod dag;
pub mod shape;
pub mod domain;
pub mod octree;

pub use dag::Solid;
pub use domain::{BuildSettings, DomainDescriptor, DomainRole, Simulation};
pub use error::{BuildWarning, Error, Result};
pub use octree::{build_domain, build_domain_with, Classification, OctreeCell, OctreeDomain};
pub use shape::Shape;
pub use types::{BBox3, FaceTag, Sample};
