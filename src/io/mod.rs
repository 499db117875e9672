//! Mesh file I/O.
//!
//! The simplifier is fed by triangle-soup files; Wavefront OBJ is the
//! supported interchange format. Format-specific code lives in submodules;
//! [`load`] and [`save`] dispatch on the file extension.
//!
//! ```no_run
//! use whittle::io;
//!
//! let mesh = io::load("model.obj").unwrap();
//! io::save(&mesh, "output.obj").unwrap();
//! ```

pub mod obj;

use std::path::Path;

use crate::error::{Result, SimplifyError};
use crate::mesh::Mesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
}

impl Format {
    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            _ => None,
        }
    }

    /// Detect format from a file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect<P: AsRef<Path>>(path: P) -> Result<Format> {
    let path = path.as_ref();
    Format::from_path(path).ok_or_else(|| SimplifyError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    match detect(&path)? {
        Format::Obj => Ok(obj::load(path)?.mesh),
    }
}

/// Save a mesh to a file with automatic format detection.
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    match detect(&path)? {
        Format::Obj => obj::save(
            &obj::ObjModel {
                mesh: mesh.clone(),
                ..Default::default()
            },
            path,
        ),
    }
}
