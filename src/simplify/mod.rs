//! Mesh simplification.
//!
//! This module provides an iterative edge-collapse simplifier driven by the
//! quadric error metric of Garland & Heckbert (1997), in the fast
//! threshold-sweep formulation popularised by Forstmann's "Fast Quadric Mesh
//! Simplification": instead of a global priority queue, every pass sweeps
//! all triangles and collapses the edges whose cached error falls under a
//! per-pass threshold that opens polynomially with the pass index.
//!
//! Two modes are supported:
//!
//! - **Target mode** ([`MeshSimplifier::decimate_to_triangles`]) reduces the
//!   mesh towards a requested triangle count, trading shape fidelity for
//!   reduction as the threshold opens.
//! - **Lossless mode** ([`MeshSimplifier::decimate_lossless`]) removes only
//!   edges whose quadric error is effectively zero, repeating until a pass
//!   deletes nothing.
//!
//! # Example
//!
//! ```
//! use whittle::mesh::Mesh;
//! use whittle::simplify::{simplify_mesh, SimplifyOptions};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let mesh = Mesh::new(positions, vec![0, 1, 2, 1, 3, 2]);
//!
//! let simplified = simplify_mesh(&mesh, 1, &SimplifyOptions::default()).unwrap();
//! assert_eq!(simplified.triangle_count(), 1);
//! ```
//!
//! # References
//!
//! - Garland, M. & Heckbert, P. (1997). "Surface Simplification Using
//!   Quadric Error Metrics." SIGGRAPH '97.
//! - Forstmann, S. "Fast Quadric Mesh Simplification."

mod engine;
mod progress;
mod quadric;

pub use engine::MeshSimplifier;
pub use progress::Progress;

use crate::error::{Result, SimplifyError};
use crate::mesh::Mesh;

/// Options for mesh simplification.
#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// Exponent of the per-pass threshold schedule.
    ///
    /// Higher values admit fewer edges in the early passes, yielding higher
    /// quality at the cost of more passes. Good values lie between 5 and 8.
    pub aggressiveness: f64,

    /// Never collapse an edge with a border endpoint.
    pub preserve_borders: bool,

    /// Merge coincident border vertices during initial analysis, closing
    /// cracks between components that share geometry but not topology.
    pub enable_smart_link: bool,

    /// Squared distance under which two border vertices count as coincident.
    pub vertex_link_distance_sqr: f64,

    /// Stop once the remaining vertex count drops below this bound.
    /// 0 means unlimited.
    pub max_vertex_count: usize,

    /// Legacy linked-vertex mode: tag coincident vertices and refuse to
    /// collapse them instead of merging them. Has no effect while
    /// `enable_smart_link` is set; kept for backward compatibility only.
    pub keep_linked_vertices: bool,

    /// Emit per-pass log lines at debug level.
    pub verbose: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            aggressiveness: 7.0,
            preserve_borders: false,
            enable_smart_link: true,
            vertex_link_distance_sqr: f64::EPSILON,
            max_vertex_count: 0,
            keep_linked_vertices: false,
            verbose: false,
        }
    }
}

impl SimplifyOptions {
    /// Set the threshold-schedule exponent.
    pub fn with_aggressiveness(mut self, aggressiveness: f64) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    /// Set whether border edges are preserved.
    pub fn with_preserve_borders(mut self, preserve: bool) -> Self {
        self.preserve_borders = preserve;
        self
    }

    /// Set whether coincident border vertices are merged during analysis.
    pub fn with_smart_link(mut self, enable: bool) -> Self {
        self.enable_smart_link = enable;
        self
    }

    /// Set the squared smart-link distance.
    pub fn with_vertex_link_distance_sqr(mut self, distance_sqr: f64) -> Self {
        self.vertex_link_distance_sqr = distance_sqr;
        self
    }

    /// Set the vertex-count bound (0 = unlimited).
    pub fn with_max_vertex_count(mut self, max_vertex_count: usize) -> Self {
        self.max_vertex_count = max_vertex_count;
        self
    }

    /// Enable the legacy linked-vertex mode.
    pub fn with_keep_linked_vertices(mut self, keep: bool) -> Self {
        self.keep_linked_vertices = keep;
        self
    }

    /// Set whether per-pass progress is logged.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Selector for the simplification algorithm.
///
/// Only one algorithm is currently implemented; the selector exists so
/// callers that configure the engine from strings (CLIs, asset pipelines)
/// get a proper error for unknown names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Threshold-sweep quadric edge collapse.
    FastQuadric,
}

impl Algorithm {
    /// Resolve an algorithm by name.
    ///
    /// Recognised names: `fast-quadric` (also `fast_quadric` and `default`).
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::UnsupportedAlgorithm`] for any other name.
    pub fn from_name(name: &str) -> Result<Algorithm> {
        match name {
            "fast-quadric" | "fast_quadric" | "default" => Ok(Algorithm::FastQuadric),
            _ => Err(SimplifyError::UnsupportedAlgorithm {
                name: name.to_string(),
            }),
        }
    }

    /// Create a simplifier running this algorithm.
    pub fn create(self, options: SimplifyOptions) -> MeshSimplifier {
        match self {
            Algorithm::FastQuadric => MeshSimplifier::with_options(options),
        }
    }
}

/// Simplify `mesh` towards `target_triangles` in one call.
///
/// # Errors
///
/// Propagates validation errors from [`MeshSimplifier::initialize`].
pub fn simplify_mesh(
    mesh: &Mesh,
    target_triangles: usize,
    options: &SimplifyOptions,
) -> Result<Mesh> {
    let mut simplifier = MeshSimplifier::with_options(options.clone());
    simplifier.initialize(mesh)?;
    simplifier.decimate_to_triangles(target_triangles)?;
    Ok(simplifier.to_mesh())
}

/// Losslessly simplify `mesh` in one call.
///
/// # Errors
///
/// Propagates validation errors from [`MeshSimplifier::initialize`].
pub fn simplify_mesh_lossless(mesh: &Mesh, options: &SimplifyOptions) -> Result<Mesh> {
    let mut simplifier = MeshSimplifier::with_options(options.clone());
    simplifier.initialize(mesh)?;
    simplifier.decimate_lossless()?;
    Ok(simplifier.to_mesh())
}
