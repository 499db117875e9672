//! Wavefront OBJ format support.
//!
//! The loader understands the `v`, `vt`, `vn`, `f`, `g`, `o`, `usemtl`, and
//! `mtllib` directives. Polygonal faces are fanned into triangles, every
//! distinct `(position, texcoord, normal)` tuple is interned into its own
//! attribute vertex, and faces are grouped into sub-meshes keyed by the
//! active material. The writer emits the inverse.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{Result, SimplifyError};
use crate::mesh::{Mesh, UvChannel};

/// A mesh plus the material bookkeeping an OBJ file carries.
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    /// The triangle mesh, one sub-mesh per material.
    pub mesh: Mesh,
    /// Material name per sub-mesh; `None` for faces seen before any `usemtl`.
    pub materials: Vec<Option<String>>,
    /// Referenced material library, if any.
    pub mtllib: Option<String>,
    /// Object name from `o` (the last one wins).
    pub name: Option<String>,
}

/// Load an OBJ file.
///
/// # Example
///
/// ```no_run
/// use whittle::io::obj;
///
/// let model = obj::load("model.obj").unwrap();
/// println!("{} triangles", model.mesh.triangle_count());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<ObjModel> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse(BufReader::new(file)).map_err(|e| match e {
        SimplifyError::LoadError { message, .. } => SimplifyError::LoadError {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Save a model as an OBJ file.
///
/// # Example
///
/// ```no_run
/// use whittle::io::obj::{self, ObjModel};
///
/// let model = ObjModel::default();
/// obj::save(&model, "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(model: &ObjModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer, model).map_err(|e| match e {
        SimplifyError::Io(io) => SimplifyError::SaveError {
            path: path.to_path_buf(),
            message: io.to_string(),
        },
        other => other,
    })
}

/// One corner of an OBJ face: indices into the position, texcoord, and
/// normal pools.
type CornerKey = (usize, Option<usize>, Option<usize>);

/// Parse OBJ text into a model.
pub fn parse<R: BufRead>(reader: R) -> Result<ObjModel> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut texcoords: Vec<Vector2<f64>> = Vec::new();
    let mut normals: Vec<Vector3<f64>> = Vec::new();

    // Interned attribute vertices.
    let mut corner_slots: HashMap<CornerKey, usize> = HashMap::new();
    let mut out_positions: Vec<Point3<f64>> = Vec::new();
    let mut out_texcoords: Vec<Vector2<f64>> = Vec::new();
    let mut out_normals: Vec<Vector3<f64>> = Vec::new();
    let mut any_texcoord = false;
    let mut any_normal = false;

    // Sub-meshes keyed by the active material.
    let mut materials: Vec<Option<String>> = Vec::new();
    let mut sub_meshes: Vec<Vec<usize>> = Vec::new();
    let mut current_sub: Option<usize> = None;

    let mut mtllib: Option<String> = None;
    let mut name: Option<String> = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = match line.find('#') {
            Some(hash) => &line[..hash],
            None => line.as_str(),
        };
        let mut fields = line.split_whitespace();
        let directive = match fields.next() {
            Some(directive) => directive,
            None => continue,
        };

        let bad_line = |message: &str| SimplifyError::LoadError {
            path: Default::default(),
            message: format!("line {}: {}", line_number + 1, message),
        };

        match directive {
            "v" => {
                let p = parse_floats::<3>(&mut fields)
                    .ok_or_else(|| bad_line("malformed vertex position"))?;
                positions.push(Point3::new(p[0], p[1], p[2]));
            }
            "vt" => {
                let uv = parse_floats::<2>(&mut fields)
                    .ok_or_else(|| bad_line("malformed texture coordinate"))?;
                texcoords.push(Vector2::new(uv[0], uv[1]));
            }
            "vn" => {
                let n = parse_floats::<3>(&mut fields)
                    .ok_or_else(|| bad_line("malformed normal"))?;
                normals.push(Vector3::new(n[0], n[1], n[2]));
            }
            "f" => {
                let mut corners: Vec<usize> = Vec::new();
                for field in fields {
                    let key = parse_corner(
                        field,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                    )
                    .ok_or_else(|| bad_line("malformed face corner"))?;

                    let slot = *corner_slots.entry(key).or_insert_with(|| {
                        let slot = out_positions.len();
                        out_positions.push(positions[key.0]);
                        out_texcoords
                            .push(key.1.map(|t| texcoords[t]).unwrap_or_else(Vector2::zeros));
                        out_normals
                            .push(key.2.map(|n| normals[n]).unwrap_or_else(Vector3::zeros));
                        slot
                    });
                    any_texcoord |= key.1.is_some();
                    any_normal |= key.2.is_some();
                    corners.push(slot);
                }
                if corners.len() < 3 {
                    return Err(bad_line("face with fewer than 3 corners"));
                }

                let sub = *current_sub.get_or_insert_with(|| {
                    materials.push(None);
                    sub_meshes.push(Vec::new());
                    sub_meshes.len() - 1
                });
                // Fan triangulation around the first corner.
                for window in 1..corners.len() - 1 {
                    sub_meshes[sub].extend_from_slice(&[
                        corners[0],
                        corners[window],
                        corners[window + 1],
                    ]);
                }
            }
            "usemtl" => {
                let material = fields.next().map(str::to_string);
                // Reuse an existing sub-mesh for a re-selected material.
                current_sub = match materials.iter().position(|m| *m == material) {
                    Some(sub) => Some(sub),
                    None => {
                        materials.push(material);
                        sub_meshes.push(Vec::new());
                        Some(sub_meshes.len() - 1)
                    }
                };
            }
            "mtllib" => {
                mtllib = fields.next().map(str::to_string);
            }
            "o" | "g" => {
                if let Some(group) = fields.next() {
                    name = Some(group.to_string());
                }
            }
            _ => {}
        }
    }

    let mut mesh = Mesh::with_sub_meshes(out_positions, sub_meshes);
    if any_normal {
        mesh.set_normals(out_normals)?;
    }
    if any_texcoord {
        mesh.set_uv_channel(0, UvChannel::Uv2(out_texcoords))?;
    }

    Ok(ObjModel {
        mesh,
        materials,
        mtllib,
        name,
    })
}

/// Write a model as OBJ text.
pub fn write<W: Write>(writer: &mut W, model: &ObjModel) -> Result<()> {
    let mesh = &model.mesh;
    mesh.validate()?;

    if let Some(mtllib) = &model.mtllib {
        writeln!(writer, "mtllib {}", mtllib)?;
    }
    if let Some(name) = &model.name {
        writeln!(writer, "o {}", name)?;
    }

    for p in &mesh.positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }

    let texcoords = mesh.uv_channels[0].as_ref();
    match texcoords {
        Some(UvChannel::Uv2(uvs)) => {
            for uv in uvs {
                writeln!(writer, "vt {} {}", uv.x, uv.y)?;
            }
        }
        Some(UvChannel::Uv3(uvs)) => {
            for uv in uvs {
                writeln!(writer, "vt {} {} {}", uv.x, uv.y, uv.z)?;
            }
        }
        // OBJ texture coordinates carry at most three components.
        Some(UvChannel::Uv4(uvs)) => {
            for uv in uvs {
                writeln!(writer, "vt {} {} {}", uv.x, uv.y, uv.z)?;
            }
        }
        None => {}
    }
    let has_texcoords = texcoords.is_some();

    if let Some(normals) = &mesh.normals {
        for n in normals {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }
    let has_normals = mesh.normals.is_some();

    for (sub, indices) in mesh.sub_meshes.iter().enumerate() {
        match model.materials.get(sub).and_then(Option::as_ref) {
            Some(material) => writeln!(writer, "usemtl {}", material)?,
            None if mesh.sub_meshes.len() > 1 => writeln!(writer, "g sub_mesh_{}", sub)?,
            None => {}
        }
        for t in indices.chunks_exact(3) {
            write!(writer, "f")?;
            for &corner in t {
                let index = corner + 1;
                match (has_texcoords, has_normals) {
                    (true, true) => write!(writer, " {0}/{0}/{0}", index)?,
                    (true, false) => write!(writer, " {0}/{0}", index)?,
                    (false, true) => write!(writer, " {0}//{0}", index)?,
                    (false, false) => write!(writer, " {}", index)?,
                }
            }
            writeln!(writer)?;
        }
    }

    Ok(())
}

fn parse_floats<const N: usize>(fields: &mut std::str::SplitWhitespace<'_>) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for value in &mut out {
        *value = fields.next()?.parse().ok()?;
    }
    Some(out)
}

/// Parse one `v`, `v/vt`, `v//vn`, or `v/vt/vn` face corner. OBJ indices are
/// 1-based; negative indices count back from the end of the pool.
fn parse_corner(
    field: &str,
    positions: usize,
    texcoords: usize,
    normals: usize,
) -> Option<CornerKey> {
    let mut parts = field.split('/');
    let v = resolve_index(parts.next()?, positions)?;
    let vt = match parts.next() {
        Some("") | None => None,
        Some(part) => Some(resolve_index(part, texcoords)?),
    };
    let vn = match parts.next() {
        Some("") | None => None,
        Some(part) => Some(resolve_index(part, normals)?),
    };
    if parts.next().is_some() {
        return None;
    }
    Some((v, vt, vn))
}

fn resolve_index(field: &str, pool_len: usize) -> Option<usize> {
    let raw: i64 = field.parse().ok()?;
    let resolved = if raw > 0 {
        raw as usize - 1
    } else if raw < 0 {
        pool_len.checked_sub(raw.unsigned_abs() as usize)?
    } else {
        return None;
    };
    (resolved < pool_len).then_some(resolved)
}
