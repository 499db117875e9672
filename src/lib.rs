//! # Whittle
//!
//! Quadric error metric mesh simplification.
//!
//! Whittle reduces the triangle count of a 3D polygonal mesh while
//! preserving its shape and per-vertex attributes. It implements an
//! iterative edge-collapse simplifier driven by the quadric error metric of
//! Garland & Heckbert, in the fast threshold-sweep formulation popularised
//! by Forstmann's "Fast Quadric Mesh Simplification".
//!
//! ## Features
//!
//! - **Target and lossless decimation**: reduce towards a triangle count, or
//!   remove only zero-error edges until nothing is left to remove
//! - **Attribute aware**: normals, tangents, colors, up to four UV channels,
//!   and skinning bone weights are merged through collapses and stay
//!   parallel to the vertex array
//! - **Sub-mesh preservation**: every triangle keeps its sub-mesh (material)
//!   tag through the whole run
//! - **Smart linking**: coincident border vertices can be merged at
//!   initialisation, closing cracks between topologically split components
//! - **Deterministic**: triangles are visited in storage order, so equal
//!   inputs produce equal outputs
//!
//! ## Quick Start
//!
//! ```
//! use whittle::prelude::*;
//! use nalgebra::Point3;
//!
//! // Two coplanar triangles forming a quad.
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
//! assert_eq!(simplified.vertex_count(), 3);
//! ```
//!
//! ## Driving the engine directly
//!
//! The [`simplify::MeshSimplifier`] object exposes the full contract:
//! initialize once, decimate, then emit a compacted mesh. A progress
//! callback receives one status tuple before each pass.
//!
//! ```
//! use whittle::prelude::*;
//! use nalgebra::Point3;
//!
//! # let positions = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.0, 1.0, 0.0),
//! #     Point3::new(1.0, 1.0, 0.0),
//! # ];
//! # let mesh = Mesh::new(positions, vec![0, 1, 2, 1, 3, 2]);
//! let options = SimplifyOptions::default().with_preserve_borders(true);
//!
//! let mut simplifier = MeshSimplifier::with_options(options);
//! simplifier.set_progress(Progress::new(|iteration, original, current, target| {
//!     eprintln!("pass {}: {}/{} (target {})", iteration, current, original, target);
//! }));
//! simplifier.initialize(&mesh).unwrap();
//! simplifier.decimate_lossless().unwrap();
//!
//! let result = simplifier.to_mesh();
//! assert!(result.triangle_count() <= 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod io;
pub mod mesh;
pub mod simplify;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use whittle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Result, SimplifyError};
    pub use crate::mesh::{BoneWeight, Mesh, UvChannel, MAX_UV_CHANNELS};
    pub use crate::simplify::{
        simplify_mesh, simplify_mesh_lossless, Algorithm, MeshSimplifier, Progress,
        SimplifyOptions,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
