//! Mesh container types.
//!
//! This module provides the [`Mesh`] value consumed and produced by the
//! simplification engine: double-precision vertex positions, one flat
//! triangle-index stream per sub-mesh, and optional per-vertex attribute
//! arrays (normals, tangents, colors, up to four UV channels, and skinning
//! bone weights).
//!
//! # Construction
//!
//! ```
//! use whittle::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = Mesh::new(positions, vec![0, 1, 2]);
//!
//! assert_eq!(mesh.vertex_count(), 3);
//! assert_eq!(mesh.triangle_count(), 1);
//! assert_eq!(mesh.sub_mesh_count(), 1);
//! ```
//!
//! Attribute arrays are attached through checked setters that reject arrays
//! whose length differs from the vertex count:
//!
//! ```
//! use whittle::mesh::Mesh;
//! use nalgebra::{Point3, Vector3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mut mesh = Mesh::new(positions, vec![0, 1, 2]);
//!
//! let normals = vec![Vector3::new(0.0, 0.0, 1.0); 3];
//! mesh.set_normals(normals).unwrap();
//!
//! assert!(mesh.set_normals(vec![Vector3::zeros(); 2]).is_err());
//! ```

mod attributes;

pub use attributes::{BoneWeight, UvChannel, MAX_UV_CHANNELS};

use nalgebra::{Point3, Vector3, Vector4};

use crate::error::{Result, SimplifyError};

/// A triangle mesh with optional per-vertex attributes and sub-mesh grouping.
///
/// Triangle indices are grouped into sub-meshes, one flat index list per
/// sub-mesh; every inner list has a length divisible by 3. Attribute arrays,
/// when present, run parallel to `positions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// One flat triangle-index stream per sub-mesh.
    pub sub_meshes: Vec<Vec<usize>>,
    /// Per-vertex normals.
    pub normals: Option<Vec<Vector3<f64>>>,
    /// Per-vertex tangents (xyz direction, w handedness).
    pub tangents: Option<Vec<Vector4<f64>>>,
    /// Per-vertex RGBA colors.
    pub colors: Option<Vec<Vector4<f64>>>,
    /// Per-vertex bone influences.
    pub bone_weights: Option<Vec<BoneWeight>>,
    /// Up to four UV channels of 2-, 3-, or 4-component coordinates.
    pub uv_channels: [Option<UvChannel>; MAX_UV_CHANNELS],
}

impl Mesh {
    /// Create a mesh with a single sub-mesh.
    pub fn new(positions: Vec<Point3<f64>>, indices: Vec<usize>) -> Self {
        Self::with_sub_meshes(positions, vec![indices])
    }

    /// Create a mesh from one index stream per sub-mesh.
    pub fn with_sub_meshes(positions: Vec<Point3<f64>>, sub_meshes: Vec<Vec<usize>>) -> Self {
        Self {
            positions,
            sub_meshes,
            ..Self::default()
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Total number of triangles across all sub-meshes.
    pub fn triangle_count(&self) -> usize {
        self.sub_meshes.iter().map(|indices| indices.len() / 3).sum()
    }

    /// Number of sub-meshes.
    pub fn sub_mesh_count(&self) -> usize {
        self.sub_meshes.len()
    }

    /// The index stream of sub-mesh `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::IndexOutOfRange`] if `index` does not name a
    /// sub-mesh.
    pub fn sub_mesh(&self, index: usize) -> Result<&[usize]> {
        self.sub_meshes
            .get(index)
            .map(Vec::as_slice)
            .ok_or(SimplifyError::IndexOutOfRange {
                index,
                limit: self.sub_meshes.len(),
            })
    }

    /// Attach per-vertex normals.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::AttributeLengthMismatch`] if the array length
    /// differs from the vertex count.
    pub fn set_normals(&mut self, normals: Vec<Vector3<f64>>) -> Result<()> {
        self.check_attribute_len("normals", normals.len())?;
        self.normals = Some(normals);
        Ok(())
    }

    /// Attach per-vertex tangents.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::AttributeLengthMismatch`] if the array length
    /// differs from the vertex count.
    pub fn set_tangents(&mut self, tangents: Vec<Vector4<f64>>) -> Result<()> {
        self.check_attribute_len("tangents", tangents.len())?;
        self.tangents = Some(tangents);
        Ok(())
    }

    /// Attach per-vertex colors.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::AttributeLengthMismatch`] if the array length
    /// differs from the vertex count.
    pub fn set_colors(&mut self, colors: Vec<Vector4<f64>>) -> Result<()> {
        self.check_attribute_len("colors", colors.len())?;
        self.colors = Some(colors);
        Ok(())
    }

    /// Attach per-vertex bone weights.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::AttributeLengthMismatch`] if the array length
    /// differs from the vertex count.
    pub fn set_bone_weights(&mut self, bone_weights: Vec<BoneWeight>) -> Result<()> {
        self.check_attribute_len("bone weights", bone_weights.len())?;
        self.bone_weights = Some(bone_weights);
        Ok(())
    }

    /// Attach a UV channel.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::IndexOutOfRange`] if `channel` is not below
    /// [`MAX_UV_CHANNELS`], or [`SimplifyError::AttributeLengthMismatch`] if
    /// the channel length differs from the vertex count.
    pub fn set_uv_channel(&mut self, channel: usize, uvs: UvChannel) -> Result<()> {
        if channel >= MAX_UV_CHANNELS {
            return Err(SimplifyError::IndexOutOfRange {
                index: channel,
                limit: MAX_UV_CHANNELS,
            });
        }
        self.check_attribute_len("UV", uvs.len())?;
        self.uv_channels[channel] = Some(uvs);
        Ok(())
    }

    /// Check the structural validity of the index streams.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::InvalidArgument`] if any sub-mesh index count
    /// is not a multiple of 3, or [`SimplifyError::IndexOutOfRange`] if any
    /// index references a non-existent vertex.
    pub fn validate(&self) -> Result<()> {
        for (sub, indices) in self.sub_meshes.iter().enumerate() {
            if indices.len() % 3 != 0 {
                return Err(SimplifyError::invalid_argument(format!(
                    "sub-mesh {} has {} indices, which is not a multiple of 3",
                    sub,
                    indices.len()
                )));
            }
            for &index in indices {
                if index >= self.positions.len() {
                    return Err(SimplifyError::IndexOutOfRange {
                        index,
                        limit: self.positions.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_attribute_len(&self, attribute: &'static str, actual: usize) -> Result<()> {
        if actual != self.positions.len() {
            return Err(SimplifyError::AttributeLengthMismatch {
                attribute,
                actual,
                expected: self.positions.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_counts() {
        let mesh = Mesh::with_sub_meshes(
            triangle_positions(),
            vec![vec![0, 1, 2], vec![2, 1, 0, 0, 1, 2]],
        );

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.sub_mesh_count(), 2);
    }

    #[test]
    fn test_sub_mesh_out_of_range() {
        let mesh = Mesh::new(triangle_positions(), vec![0, 1, 2]);

        assert_eq!(mesh.sub_mesh(0).unwrap(), &[0, 1, 2]);
        assert!(matches!(
            mesh.sub_mesh(1),
            Err(SimplifyError::IndexOutOfRange { index: 1, limit: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_partial_triangle() {
        let mesh = Mesh::new(triangle_positions(), vec![0, 1]);

        assert!(matches!(
            mesh.validate(),
            Err(SimplifyError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mesh = Mesh::new(triangle_positions(), vec![0, 1, 3]);

        assert!(matches!(
            mesh.validate(),
            Err(SimplifyError::IndexOutOfRange { index: 3, limit: 3 })
        ));
    }

    #[test]
    fn test_attribute_length_checks() {
        let mut mesh = Mesh::new(triangle_positions(), vec![0, 1, 2]);

        assert!(mesh.set_normals(vec![Vector3::z(); 3]).is_ok());
        assert!(matches!(
            mesh.set_normals(vec![Vector3::z(); 4]),
            Err(SimplifyError::AttributeLengthMismatch {
                attribute: "normals",
                actual: 4,
                expected: 3,
            })
        ));

        assert!(mesh
            .set_uv_channel(0, UvChannel::Uv2(vec![nalgebra::Vector2::zeros(); 3]))
            .is_ok());
        assert!(mesh
            .set_uv_channel(4, UvChannel::Uv2(vec![nalgebra::Vector2::zeros(); 3]))
            .is_err());
    }
}
