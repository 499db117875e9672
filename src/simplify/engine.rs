//! The edge-collapse simplification engine.
//!
//! [`MeshSimplifier`] owns a working copy of the mesh as flat arrays of
//! value-type records: vertices, triangles, and a global `refs` buffer that
//! is re-partitioned into per-vertex adjacency windows on every analysis
//! pass. Triangles are tombstoned rather than removed during a pass;
//! compaction runs on its own cadence and once more at the end of a run.
//!
//! The engine is strictly single-threaded and synchronous. Triangles are
//! visited in storage order and the three edges of a triangle are tried in
//! order; the first qualifying, non-flipping collapse wins. This order is
//! deterministic and part of the contract, because the output is sensitive
//! to visit order.

use nalgebra::{Point3, Vector3, Vector4};

use crate::error::{Result, SimplifyError};
use crate::mesh::{BoneWeight, Mesh, UvChannel, MAX_UV_CHANNELS};

use super::progress::Progress;
use super::quadric::SymmetricMatrix;
use super::SimplifyOptions;

/// Hard cap on target-mode passes.
const MAX_ITERATIONS: usize = 100;

/// Hard cap on lossless passes.
const MAX_LOSSLESS_ITERATIONS: usize = 9999;

/// Fixed error threshold for lossless passes.
const LOSSLESS_THRESHOLD: f64 = 1e-3;

/// Base factor of the target-mode threshold schedule.
const THRESHOLD_BASE: f64 = 1e-9;

/// Cadence of adjacency rebuilds in target mode.
const UPDATE_MESH_INTERVAL: usize = 5;

/// A relocated triangle whose corner directions are this parallel is a sliver.
const FLIP_COLLINEAR_LIMIT: f64 = 0.999;

/// Minimum dot between the old and new normal for a relocation to stand.
const FLIP_NORMAL_LIMIT: f64 = 0.2;

/// One working vertex.
#[derive(Debug, Clone, Copy)]
struct Vertex {
    /// Position; moved to the collapse point when an edge collapses into it.
    p: Point3<f64>,
    /// Start of this vertex's window in the global refs buffer.
    tstart: usize,
    /// Length of the window.
    tcount: usize,
    /// Accumulated plane quadric.
    q: SymmetricMatrix,
    /// Incident to an edge that belongs to exactly one triangle.
    border: bool,
    /// Shares its position with another vertex (legacy linked-vertex mode).
    linked: bool,
}

/// One working triangle; the unit of deletion.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    /// Position-vertex indices.
    v: [usize; 3],
    /// Attribute-vertex indices; equal to `v` at ingest, may diverge after
    /// collapses to preserve attribute seams.
    va: [usize; 3],
    /// Sub-mesh tag; preserved through the whole run.
    sub_mesh: usize,
    /// Cached edge errors for (v0,v1), (v1,v2), (v2,v0), and their minimum.
    err: [f64; 4],
    /// Unit normal, recomputed during analysis.
    n: Vector3<f64>,
    /// Tombstone; never cleared once set.
    deleted: bool,
    /// Touched this pass; skipped for the remainder of the pass.
    dirty: bool,
}

/// A (triangle, corner) pair in the global adjacency buffer.
#[derive(Debug, Clone, Copy, Default)]
struct Ref {
    tid: usize,
    tvertex: usize,
}

/// Where the optimal collapse point of an edge came from.
///
/// Decides how the attribute records of the two collapsed corners combine:
/// the surviving endpoint's record wins outright when the point coincides
/// with it, otherwise the records are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollapsePoint {
    /// The first endpoint of the edge.
    Endpoint0,
    /// The second endpoint of the edge.
    Endpoint1,
    /// The solved optimum or the edge midpoint.
    Midpoint,
}

/// Per-vertex attribute arrays, parallel to the vertex array and indexed by
/// attribute-vertex index.
#[derive(Debug, Clone, Default)]
struct AttributeArrays {
    normals: Option<Vec<Vector3<f64>>>,
    tangents: Option<Vec<Vector4<f64>>>,
    colors: Option<Vec<Vector4<f64>>>,
    bone_weights: Option<Vec<BoneWeight>>,
    uv_channels: [Option<UvChannel>; MAX_UV_CHANNELS],
}

impl AttributeArrays {
    /// Take a working copy of the attribute arrays of `mesh`.
    ///
    /// Arrays whose length does not match the vertex count are dropped with
    /// a warning instead of aborting the run, so meshes with partial
    /// auxiliary data still simplify.
    fn ingest(mesh: &Mesh) -> Self {
        let expected = mesh.vertex_count();
        let mut uv_channels: [Option<UvChannel>; MAX_UV_CHANNELS] = Default::default();
        for (channel, uvs) in mesh.uv_channels.iter().enumerate() {
            uv_channels[channel] = match uvs {
                Some(uvs) if uvs.len() == expected => Some(uvs.clone()),
                Some(uvs) => {
                    log::warn!(
                        "dropping UV channel {}: {} entries for {} vertices",
                        channel,
                        uvs.len(),
                        expected
                    );
                    None
                }
                None => None,
            };
        }

        AttributeArrays {
            normals: Self::take_checked("normals", mesh.normals.as_ref(), expected),
            tangents: Self::take_checked("tangents", mesh.tangents.as_ref(), expected),
            colors: Self::take_checked("colors", mesh.colors.as_ref(), expected),
            bone_weights: Self::take_checked("bone weights", mesh.bone_weights.as_ref(), expected),
            uv_channels,
        }
    }

    fn take_checked<T: Clone>(
        name: &'static str,
        array: Option<&Vec<T>>,
        expected: usize,
    ) -> Option<Vec<T>> {
        match array {
            Some(array) if array.len() == expected => Some(array.clone()),
            Some(array) => {
                log::warn!(
                    "dropping {} array: {} entries for {} vertices",
                    name,
                    array.len(),
                    expected
                );
                None
            }
            None => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.normals.is_none()
            && self.tangents.is_none()
            && self.colors.is_none()
            && self.bone_weights.is_none()
            && self.uv_channels.iter().all(Option::is_none)
    }

    /// Replace the record at `dst` with the mean of the records at `dst` and
    /// `src`. Normals are renormalised after averaging; bone weights combine
    /// their four strongest influences.
    fn merge_record(&mut self, dst: usize, src: usize) {
        if let Some(normals) = &mut self.normals {
            let mean = (normals[dst] + normals[src]) * 0.5;
            normals[dst] = mean.try_normalize(0.0).unwrap_or(mean);
        }
        if let Some(tangents) = &mut self.tangents {
            tangents[dst] = (tangents[dst] + tangents[src]) * 0.5;
        }
        if let Some(colors) = &mut self.colors {
            colors[dst] = (colors[dst] + colors[src]) * 0.5;
        }
        for channel in self.uv_channels.iter_mut().flatten() {
            channel.merge(dst, src);
        }
        if let Some(bone_weights) = &mut self.bone_weights {
            bone_weights[dst] = BoneWeight::merge(&bone_weights[dst], &bone_weights[src]);
        }
    }

    /// Copy the record at `src` over the record at `dst`.
    fn copy_record(&mut self, dst: usize, src: usize) {
        if let Some(normals) = &mut self.normals {
            normals[dst] = normals[src];
        }
        if let Some(tangents) = &mut self.tangents {
            tangents[dst] = tangents[src];
        }
        if let Some(colors) = &mut self.colors {
            colors[dst] = colors[src];
        }
        for channel in self.uv_channels.iter_mut().flatten() {
            channel.copy(dst, src);
        }
        if let Some(bone_weights) = &mut self.bone_weights {
            bone_weights[dst] = bone_weights[src];
        }
    }

    /// Build compacted arrays holding the records at `order`, in order.
    fn gather(&self, order: &[usize]) -> Self {
        fn pick<T: Copy>(array: &Option<Vec<T>>, order: &[usize]) -> Option<Vec<T>> {
            array
                .as_ref()
                .map(|data| order.iter().map(|&i| data[i]).collect())
        }

        let mut uv_channels: [Option<UvChannel>; MAX_UV_CHANNELS] = Default::default();
        for (channel, uvs) in self.uv_channels.iter().enumerate() {
            uv_channels[channel] = uvs.as_ref().map(|uvs| uvs.gather(order));
        }

        AttributeArrays {
            normals: pick(&self.normals, order),
            tangents: pick(&self.tangents, order),
            colors: pick(&self.colors, order),
            bone_weights: pick(&self.bone_weights, order),
            uv_channels,
        }
    }
}

/// Iterative edge-collapse mesh simplifier driven by quadric error metrics.
///
/// The engine supports two decimation modes: reduction towards a target
/// triangle count with a polynomially opening error threshold, and lossless
/// reduction that only removes edges whose quadric error is effectively
/// zero.
///
/// Calls must follow the order `initialize` → `decimate_*` → `to_mesh` on
/// one logical thread.
///
/// # Example
///
/// ```
/// use whittle::mesh::Mesh;
/// use whittle::simplify::{MeshSimplifier, SimplifyOptions};
/// use nalgebra::Point3;
///
/// // Two coplanar triangles forming a quad.
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
/// ];
/// let mesh = Mesh::new(positions, vec![0, 1, 2, 1, 3, 2]);
///
/// let mut simplifier = MeshSimplifier::with_options(SimplifyOptions::default());
/// simplifier.initialize(&mesh).unwrap();
/// simplifier.decimate_to_triangles(1).unwrap();
///
/// let simplified = simplifier.to_mesh();
/// assert_eq!(simplified.triangle_count(), 1);
/// assert_eq!(simplified.vertex_count(), 3);
/// ```
#[derive(Debug)]
pub struct MeshSimplifier {
    options: SimplifyOptions,
    progress: Progress,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    refs: Vec<Ref>,
    attributes: AttributeArrays,
    sub_mesh_count: usize,
    initialized: bool,
}

impl Default for MeshSimplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshSimplifier {
    /// Create a simplifier with default options.
    pub fn new() -> Self {
        Self::with_options(SimplifyOptions::default())
    }

    /// Create a simplifier with the given options.
    pub fn with_options(options: SimplifyOptions) -> Self {
        Self {
            options,
            progress: Progress::none(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            refs: Vec::new(),
            attributes: AttributeArrays::default(),
            sub_mesh_count: 0,
            initialized: false,
        }
    }

    /// The options this simplifier runs with.
    pub fn options(&self) -> &SimplifyOptions {
        &self.options
    }

    /// Install a progress callback, replacing any previous one.
    ///
    /// The engine reports one `(iteration, original, current, target)` tuple
    /// before each pass; pass [`Progress::none`] to clear. To fan a report
    /// out to several consumers, multiplex inside a single callback.
    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = progress;
    }

    /// Load a mesh into the working state.
    ///
    /// Attribute arrays whose length does not match the vertex count are
    /// dropped with a warning; the run proceeds without them.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::InvalidArgument`] if a sub-mesh index count
    /// is not a multiple of 3, or [`SimplifyError::IndexOutOfRange`] if an
    /// index references a non-existent vertex. The engine state is left
    /// untouched on error.
    pub fn initialize(&mut self, mesh: &Mesh) -> Result<()> {
        mesh.validate()?;

        self.vertices = mesh
            .positions
            .iter()
            .map(|&p| Vertex {
                p,
                tstart: 0,
                tcount: 0,
                q: SymmetricMatrix::zero(),
                border: false,
                linked: false,
            })
            .collect();

        self.triangles.clear();
        for (sub_mesh, indices) in mesh.sub_meshes.iter().enumerate() {
            for corners in indices.chunks_exact(3) {
                let v = [corners[0], corners[1], corners[2]];
                self.triangles.push(Triangle {
                    v,
                    va: v,
                    sub_mesh,
                    err: [0.0; 4],
                    n: Vector3::zeros(),
                    deleted: false,
                    dirty: false,
                });
            }
        }

        self.sub_mesh_count = mesh.sub_meshes.len();
        self.refs.clear();
        self.attributes = AttributeArrays::ingest(mesh);
        self.initialized = true;
        Ok(())
    }

    /// Decimate towards a target triangle count.
    ///
    /// Runs collapse passes until the live triangle count drops to
    /// `target_triangles` (clamped to the current count) or the pass budget
    /// is exhausted. The count may stay above the target when flip
    /// avoidance, border rules, or the vertex-count constraint block further
    /// progress.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::InvalidArgument`] if no mesh has been
    /// initialized.
    pub fn decimate_to_triangles(&mut self, target_triangles: usize) -> Result<()> {
        self.ensure_initialized()?;

        let original = self.live_triangle_count();
        let target = target_triangles.min(original);
        let max_vertex_count = if self.options.max_vertex_count == 0 {
            usize::MAX
        } else {
            self.options.max_vertex_count
        };
        let mut remaining_vertices = self.vertices.len();
        let mut deleted_triangles = 0usize;

        for iteration in 0..MAX_ITERATIONS {
            let current = original - deleted_triangles;
            self.progress.report(iteration, original, current, target as i64);
            if current <= target && remaining_vertices < max_vertex_count {
                break;
            }

            if iteration % UPDATE_MESH_INTERVAL == 0 {
                deleted_triangles += self.update_mesh(iteration);
            }

            for triangle in &mut self.triangles {
                triangle.dirty = false;
            }

            // The first passes accept only near-zero errors; each later pass
            // widens the window polynomially.
            let threshold =
                THRESHOLD_BASE * (iteration as f64 + 3.0).powf(self.options.aggressiveness);

            if self.options.verbose && iteration % UPDATE_MESH_INTERVAL == 0 {
                log::debug!(
                    "pass {}: {} triangles, threshold {:.3e}",
                    iteration,
                    current,
                    threshold
                );
            }

            self.remove_vertex_pass(
                original,
                target,
                threshold,
                &mut deleted_triangles,
                &mut remaining_vertices,
                max_vertex_count,
            );
        }

        self.compact_mesh();
        Ok(())
    }

    /// Decimate losslessly: remove only edges whose quadric error is
    /// effectively zero, until a pass deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SimplifyError::InvalidArgument`] if no mesh has been
    /// initialized.
    pub fn decimate_lossless(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        let original = self.live_triangle_count();
        let mut remaining_vertices = self.vertices.len();
        let mut deleted_triangles = 0usize;

        for iteration in 0..MAX_LOSSLESS_ITERATIONS {
            let current = original - deleted_triangles;
            self.progress.report(iteration, original, current, -1);

            // Lossless passes rebuild adjacency every time.
            deleted_triangles += self.update_mesh(iteration);

            for triangle in &mut self.triangles {
                triangle.dirty = false;
            }

            if self.options.verbose {
                log::debug!("lossless pass {}: {} triangles", iteration, current);
            }

            let deleted_before = deleted_triangles;
            self.remove_vertex_pass(
                original,
                0,
                LOSSLESS_THRESHOLD,
                &mut deleted_triangles,
                &mut remaining_vertices,
                usize::MAX,
            );

            if deleted_triangles == deleted_before {
                break;
            }
        }

        self.compact_mesh();
        Ok(())
    }

    /// Emit the current state as a new mesh.
    ///
    /// After a decimation call the arrays are compacted: no tombstones, all
    /// attribute arrays equal in length to the vertex count. Sub-mesh index
    /// streams are rebuilt by scanning triangles in storage order and
    /// grouping by tag, so sub-mesh grouping is stable but triangle order
    /// within a sub-mesh is only preserved as encountered.
    pub fn to_mesh(&self) -> Mesh {
        let positions = self.vertices.iter().map(|v| v.p).collect();
        let mut sub_meshes = vec![Vec::new(); self.sub_mesh_count];
        for triangle in &self.triangles {
            if triangle.deleted {
                continue;
            }
            sub_meshes[triangle.sub_mesh].extend_from_slice(&triangle.v);
        }

        Mesh {
            positions,
            sub_meshes,
            normals: self.attributes.normals.clone(),
            tangents: self.attributes.tangents.clone(),
            colors: self.attributes.colors.clone(),
            bone_weights: self.attributes.bone_weights.clone(),
            uv_channels: self.attributes.uv_channels.clone(),
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(SimplifyError::invalid_argument(
                "no mesh has been initialized",
            ));
        }
        Ok(())
    }

    fn live_triangle_count(&self) -> usize {
        self.triangles.iter().filter(|t| !t.deleted).count()
    }

    /// One sweep over all triangles, collapsing every qualifying edge whose
    /// cached error falls under `threshold`.
    fn remove_vertex_pass(
        &mut self,
        original: usize,
        target: usize,
        threshold: f64,
        deleted_triangles: &mut usize,
        remaining_vertices: &mut usize,
        max_vertex_count: usize,
    ) {
        let keep_linked =
            self.options.keep_linked_vertices && !self.options.enable_smart_link;
        let mut deleted0: Vec<bool> = Vec::new();
        let mut deleted1: Vec<bool> = Vec::new();

        for tid in 0..self.triangles.len() {
            {
                let t = &self.triangles[tid];
                if t.deleted || t.dirty || t.err[3] > threshold {
                    continue;
                }
            }

            for edge in 0..3 {
                if self.triangles[tid].err[edge] > threshold {
                    continue;
                }

                let i0 = self.triangles[tid].v[edge];
                let i1 = self.triangles[tid].v[(edge + 1) % 3];
                if i0 == i1 {
                    continue;
                }

                // Collapsing across a border/interior boundary would pull the
                // border inwards.
                if self.vertices[i0].border != self.vertices[i1].border {
                    continue;
                }
                if self.options.preserve_borders && self.vertices[i0].border {
                    continue;
                }
                if keep_linked && (self.vertices[i0].linked || self.vertices[i1].linked) {
                    continue;
                }

                let (_, p, source) = self.calculate_error(i0, i1);

                deleted0.clear();
                deleted0.resize(self.vertices[i0].tcount, false);
                deleted1.clear();
                deleted1.resize(self.vertices[i1].tcount, false);

                if self.flipped(&p, i0, i1, &mut deleted0) {
                    continue;
                }
                if self.flipped(&p, i1, i0, &mut deleted1) {
                    continue;
                }

                self.merge_collapsed_attributes(tid, edge, source);

                // Commit: i1 folds into i0.
                self.vertices[i0].p = p;
                let q1 = self.vertices[i1].q;
                self.vertices[i0].q += q1;

                let ia0 = self.triangles[tid].va[edge];
                let tail = self.refs.len();
                self.update_triangles(i0, None, i0, &deleted0, deleted_triangles);
                self.update_triangles(i0, Some(ia0), i1, &deleted1, deleted_triangles);
                let tcount = self.refs.len() - tail;

                if tcount <= self.vertices[i0].tcount {
                    // Reuse the existing window; the appended tail is garbage
                    // until the next reference rebuild.
                    if tcount > 0 {
                        let dst = self.vertices[i0].tstart;
                        self.refs.copy_within(tail..tail + tcount, dst);
                    }
                } else {
                    self.vertices[i0].tstart = tail;
                }
                self.vertices[i0].tcount = tcount;
                *remaining_vertices -= 1;
                break;
            }

            if original - *deleted_triangles <= target && *remaining_vertices < max_vertex_count {
                break;
            }
        }
    }

    /// Combined error of collapsing the edge `(i0, i1)` and the point that
    /// attains it.
    ///
    /// When the combined quadric is invertible and neither endpoint lies on
    /// a border, the solved optimum is used. Otherwise the two endpoints and
    /// the midpoint are evaluated and the cheapest wins, ties preferring the
    /// midpoint.
    fn calculate_error(&self, i0: usize, i1: usize) -> (f64, Point3<f64>, CollapsePoint) {
        let q = self.vertices[i0].q + self.vertices[i1].q;
        let border = self.vertices[i0].border || self.vertices[i1].border;

        if !border {
            if let Some(p) = q.optimal_point() {
                return (q.evaluate(&p), p, CollapsePoint::Midpoint);
            }
        }

        let p0 = self.vertices[i0].p;
        let p1 = self.vertices[i1].p;
        let mid = Point3::from((p0.coords + p1.coords) * 0.5);
        let e0 = q.evaluate(&p0);
        let e1 = q.evaluate(&p1);
        let em = q.evaluate(&mid);

        if em <= e0 && em <= e1 {
            (em, mid, CollapsePoint::Midpoint)
        } else if e0 <= e1 {
            (e0, p0, CollapsePoint::Endpoint0)
        } else {
            (e1, p1, CollapsePoint::Endpoint1)
        }
    }

    /// Would moving `i0` to `p` flip any triangle incident to `i0` that
    /// survives the collapse of `(i0, i1)`?
    ///
    /// Triangles that also contain `i1` die with the collapse; they are
    /// marked in `deleted` instead of being tested. A degenerate relocation
    /// (collinear corners or a zero-length normal) counts as a flip.
    fn flipped(&self, p: &Point3<f64>, i0: usize, i1: usize, deleted: &mut [bool]) -> bool {
        let v0 = self.vertices[i0];
        for k in 0..v0.tcount {
            let r = self.refs[v0.tstart + k];
            let t = &self.triangles[r.tid];
            if t.deleted {
                continue;
            }

            let s = r.tvertex;
            let id1 = t.v[(s + 1) % 3];
            let id2 = t.v[(s + 2) % 3];
            if id1 == i1 || id2 == i1 {
                deleted[k] = true;
                continue;
            }

            let d1 = (self.vertices[id1].p - p)
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            let d2 = (self.vertices[id2].p - p)
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            if d1.dot(&d2).abs() > FLIP_COLLINEAR_LIMIT {
                return true;
            }

            let n = d1
                .cross(&d2)
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            deleted[k] = false;
            if n.dot(&t.n) < FLIP_NORMAL_LIMIT {
                return true;
            }
        }
        false
    }

    /// Combine the attribute records of the two collapsed corners of
    /// triangle `tid` into the kept corner's record.
    fn merge_collapsed_attributes(&mut self, tid: usize, edge: usize, source: CollapsePoint) {
        if self.attributes.is_empty() {
            return;
        }
        let ia0 = self.triangles[tid].va[edge];
        let ia1 = self.triangles[tid].va[(edge + 1) % 3];
        if ia0 == ia1 {
            return;
        }
        match source {
            // The collapse point coincides with i1, so its attributes win.
            CollapsePoint::Endpoint1 => self.attributes.copy_record(ia0, ia1),
            CollapsePoint::Endpoint0 | CollapsePoint::Midpoint => {
                self.attributes.merge_record(ia0, ia1)
            }
        }
    }

    /// Walk the ref window of `v_index`, deleting the triangles flagged in
    /// `deleted`, relocating the rest onto `i0`, and appending their refs at
    /// the tail of the global buffer.
    ///
    /// `ia0` is the merged attribute record; relocated corners adopt it.
    /// Corners that already sit at `i0` keep their own records so attribute
    /// seams meeting at the kept position survive.
    fn update_triangles(
        &mut self,
        i0: usize,
        ia0: Option<usize>,
        v_index: usize,
        deleted: &[bool],
        deleted_triangles: &mut usize,
    ) {
        let tstart = self.vertices[v_index].tstart;
        let tcount = self.vertices[v_index].tcount;

        for k in 0..tcount {
            let r = self.refs[tstart + k];
            if self.triangles[r.tid].deleted {
                continue;
            }

            if deleted[k] {
                self.triangles[r.tid].deleted = true;
                *deleted_triangles += 1;
                continue;
            }

            {
                let t = &mut self.triangles[r.tid];
                t.v[r.tvertex] = i0;
                if let Some(ia0) = ia0 {
                    t.va[r.tvertex] = ia0;
                }
                t.dirty = true;
            }

            let v = self.triangles[r.tid].v;
            let e0 = self.calculate_error(v[0], v[1]).0;
            let e1 = self.calculate_error(v[1], v[2]).0;
            let e2 = self.calculate_error(v[2], v[0]).0;
            self.triangles[r.tid].err = [e0, e1, e2, e0.min(e1).min(e2)];

            self.refs.push(r);
        }
    }

    /// Compact deleted triangles, rebuild adjacency, and on the first pass
    /// classify borders, optionally smart-link coincident border vertices,
    /// and initialise quadrics and edge errors.
    ///
    /// Returns the number of triangles tombstoned as a side effect (smart
    /// linking can degenerate a triangle whose corners coincide).
    fn update_mesh(&mut self, iteration: usize) -> usize {
        if iteration > 0 {
            self.triangles.retain(|t| !t.deleted);
        }

        self.update_references();

        let mut tombstoned = 0;
        if iteration == 0 {
            self.classify_borders();

            if self.options.enable_smart_link {
                let (links, dropped) = self.link_border_vertices();
                tombstoned = dropped;
                if links > 0 {
                    if self.options.verbose {
                        log::debug!("smart link merged {} coincident border vertices", links);
                    }
                    self.update_references();
                }
            } else if self.options.keep_linked_vertices {
                self.tag_linked_vertices();
            }

            self.init_quadrics();
            self.init_edge_errors();
        }
        tombstoned
    }

    /// Re-partition the global refs buffer into per-vertex windows.
    fn update_references(&mut self) {
        for vertex in &mut self.vertices {
            vertex.tstart = 0;
            vertex.tcount = 0;
        }

        for triangle in &self.triangles {
            if triangle.deleted {
                continue;
            }
            for &vi in &triangle.v {
                self.vertices[vi].tcount += 1;
            }
        }

        let mut tstart = 0;
        for vertex in &mut self.vertices {
            vertex.tstart = tstart;
            tstart += vertex.tcount;
            vertex.tcount = 0;
        }

        self.refs.clear();
        self.refs.resize(tstart, Ref::default());
        for tid in 0..self.triangles.len() {
            let triangle = self.triangles[tid];
            if triangle.deleted {
                continue;
            }
            for (tvertex, &vi) in triangle.v.iter().enumerate() {
                let slot = self.vertices[vi].tstart + self.vertices[vi].tcount;
                self.refs[slot] = Ref { tid, tvertex };
                self.vertices[vi].tcount += 1;
            }
        }
    }

    /// Mark every vertex incident to an edge that belongs to exactly one
    /// triangle.
    fn classify_borders(&mut self) {
        for vertex in &mut self.vertices {
            vertex.border = false;
            vertex.linked = false;
        }

        let mut neighbour_ids: Vec<usize> = Vec::new();
        let mut neighbour_counts: Vec<usize> = Vec::new();

        for vi in 0..self.vertices.len() {
            neighbour_ids.clear();
            neighbour_counts.clear();

            let tstart = self.vertices[vi].tstart;
            let tcount = self.vertices[vi].tcount;
            for k in 0..tcount {
                let triangle = self.triangles[self.refs[tstart + k].tid];
                if triangle.deleted {
                    continue;
                }
                for &other in &triangle.v {
                    if other == vi {
                        continue;
                    }
                    match neighbour_ids.iter().position(|&id| id == other) {
                        Some(slot) => neighbour_counts[slot] += 1,
                        None => {
                            neighbour_ids.push(other);
                            neighbour_counts.push(1);
                        }
                    }
                }
            }

            if neighbour_counts.iter().any(|&count| count == 1) {
                self.vertices[vi].border = true;
            }
        }
    }

    /// Merge border vertices whose positions are within the configured link
    /// distance, closing cracks between components that share geometry but
    /// not topology.
    ///
    /// Returns `(links, tombstoned)`: the number of consumed vertices and
    /// the number of triangles that degenerated because two of their corners
    /// coincided.
    fn link_border_vertices(&mut self) -> (usize, usize) {
        let border: Vec<usize> = (0..self.vertices.len())
            .filter(|&vi| self.vertices[vi].border)
            .collect();

        let mut consumed = vec![false; self.vertices.len()];
        let mut links = 0;
        let mut tombstoned = 0;

        for (slot, &keep) in border.iter().enumerate() {
            if consumed[keep] {
                continue;
            }
            for &other in &border[slot + 1..] {
                if consumed[other] {
                    continue;
                }
                let distance_sqr = (self.vertices[keep].p - self.vertices[other].p).norm_squared();
                if distance_sqr > self.options.vertex_link_distance_sqr {
                    continue;
                }

                // Redirect every corner of `other` onto `keep`. The attribute
                // index stays put, so attributes across the closed crack
                // remain distinct.
                let tstart = self.vertices[other].tstart;
                let tcount = self.vertices[other].tcount;
                for k in 0..tcount {
                    let r = self.refs[tstart + k];
                    let triangle = &mut self.triangles[r.tid];
                    if triangle.deleted {
                        continue;
                    }
                    triangle.v[r.tvertex] = keep;
                    if triangle.v[0] == triangle.v[1]
                        || triangle.v[1] == triangle.v[2]
                        || triangle.v[2] == triangle.v[0]
                    {
                        triangle.deleted = true;
                        tombstoned += 1;
                    }
                }

                self.vertices[keep].border = false;
                self.vertices[other].border = false;
                self.vertices[other].tcount = 0;
                consumed[other] = true;
                links += 1;
            }
        }

        (links, tombstoned)
    }

    /// Legacy linked-vertex mode: tag coincident border vertices instead of
    /// merging them, so collapses leave them alone.
    fn tag_linked_vertices(&mut self) {
        let border: Vec<usize> = (0..self.vertices.len())
            .filter(|&vi| self.vertices[vi].border)
            .collect();

        for (slot, &a) in border.iter().enumerate() {
            for &b in &border[slot + 1..] {
                let distance_sqr = (self.vertices[a].p - self.vertices[b].p).norm_squared();
                if distance_sqr <= self.options.vertex_link_distance_sqr {
                    self.vertices[a].linked = true;
                    self.vertices[b].linked = true;
                }
            }
        }
    }

    /// Accumulate each vertex's quadric from the planes of its incident
    /// triangles, caching the triangle normals along the way.
    fn init_quadrics(&mut self) {
        for vertex in &mut self.vertices {
            vertex.q = SymmetricMatrix::zero();
        }

        for tid in 0..self.triangles.len() {
            if self.triangles[tid].deleted {
                continue;
            }
            let [i0, i1, i2] = self.triangles[tid].v;
            let p0 = self.vertices[i0].p;
            let p1 = self.vertices[i1].p;
            let p2 = self.vertices[i2].p;

            let n = (p1 - p0)
                .cross(&(p2 - p0))
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            self.triangles[tid].n = n;

            let d = -n.dot(&p0.coords);
            let q = SymmetricMatrix::from_plane(n.x, n.y, n.z, d);
            for &vi in &self.triangles[tid].v {
                self.vertices[vi].q += q;
            }
        }
    }

    /// Precompute each triangle's three edge errors and their minimum.
    fn init_edge_errors(&mut self) {
        for tid in 0..self.triangles.len() {
            if self.triangles[tid].deleted {
                continue;
            }
            let v = self.triangles[tid].v;
            let e0 = self.calculate_error(v[0], v[1]).0;
            let e1 = self.calculate_error(v[1], v[2]).0;
            let e2 = self.calculate_error(v[2], v[0]).0;
            self.triangles[tid].err = [e0, e1, e2, e0.min(e1).min(e2)];
        }
    }

    /// Drop tombstoned triangles, adopt merged attribute indices as the
    /// canonical position indices, and pack the vertex and attribute arrays
    /// to their live size.
    fn compact_mesh(&mut self) {
        self.triangles.retain(|t| !t.deleted);

        // tcount doubles as the "used" marker from here on.
        for vertex in &mut self.vertices {
            vertex.tcount = 0;
        }

        for tid in 0..self.triangles.len() {
            let triangle = self.triangles[tid];
            for corner in 0..3 {
                // Promote the attribute index: the slot inherits the (possibly
                // relocated) position of the corner it replaces.
                if triangle.va[corner] != triangle.v[corner] {
                    let p = self.vertices[triangle.v[corner]].p;
                    self.vertices[triangle.va[corner]].p = p;
                }
            }
            let triangle = &mut self.triangles[tid];
            triangle.v = triangle.va;
            for corner in 0..3 {
                self.vertices[triangle.v[corner]].tcount = 1;
            }
        }

        let mut remap = vec![0usize; self.vertices.len()];
        let mut order: Vec<usize> = Vec::new();
        let mut dense = 0usize;
        for vi in 0..self.vertices.len() {
            if self.vertices[vi].tcount > 0 {
                remap[vi] = dense;
                order.push(vi);
                self.vertices[dense] = self.vertices[vi];
                dense += 1;
            }
        }
        self.vertices.truncate(dense);

        for triangle in &mut self.triangles {
            for corner in 0..3 {
                triangle.v[corner] = remap[triangle.v[corner]];
                triangle.va[corner] = triangle.v[corner];
            }
        }

        self.attributes = self.attributes.gather(&order);
        self.refs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn single_triangle() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2])
    }

    fn quad() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2, 1, 3, 2])
    }

    fn tetrahedron() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        Mesh::new(positions, vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3])
    }

    /// A disk triangulated as a fan of `n` coplanar triangles around a
    /// centre vertex.
    fn coplanar_fan(n: usize) -> Mesh {
        let mut positions = vec![Point3::new(0.0, 0.0, 0.0)];
        for k in 0..n {
            let angle = 2.0 * std::f64::consts::PI * (k as f64) / (n as f64);
            positions.push(Point3::new(angle.cos(), angle.sin(), 0.0));
        }
        let mut indices = Vec::new();
        for k in 0..n {
            indices.extend_from_slice(&[0, 1 + k, 1 + (k + 1) % n]);
        }
        Mesh::new(positions, indices)
    }

    fn grid(n: usize) -> Mesh {
        let mut positions = Vec::with_capacity((n + 1) * (n + 1));
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let mut indices = Vec::with_capacity(n * n * 6);
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;
                indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
            }
        }
        Mesh::new(positions, indices)
    }

    /// Two quads over the same unit square that share geometry but not
    /// indices: the classic coincident-vertex crack.
    fn split_quads() -> Mesh {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut positions = corners.to_vec();
        positions.extend_from_slice(&corners);
        Mesh::new(positions, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7])
    }

    fn initialized(mesh: &Mesh, options: SimplifyOptions) -> MeshSimplifier {
        let mut simplifier = MeshSimplifier::with_options(options);
        simplifier.initialize(mesh).unwrap();
        simplifier
    }

    /// Every corner of every live triangle appears exactly once in the ref
    /// window of its position vertex.
    fn assert_adjacency_consistent(simplifier: &MeshSimplifier) {
        for (tid, triangle) in simplifier.triangles.iter().enumerate() {
            if triangle.deleted {
                continue;
            }
            for (tvertex, &vi) in triangle.v.iter().enumerate() {
                let vertex = &simplifier.vertices[vi];
                let window = &simplifier.refs[vertex.tstart..vertex.tstart + vertex.tcount];
                let matches = window
                    .iter()
                    .filter(|r| r.tid == tid && r.tvertex == tvertex)
                    .count();
                assert_eq!(
                    matches, 1,
                    "corner {} of triangle {} appears {} times in the window of vertex {}",
                    tvertex, tid, matches, vi
                );
            }
        }
    }

    #[test]
    fn test_single_triangle_already_at_target() {
        let mesh = single_triangle();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(1).unwrap();

        let result = simplifier.to_mesh();
        assert_eq!(result.triangle_count(), 1);
        assert_eq!(result.vertex_count(), 3);
        for (a, b) in mesh.positions.iter().zip(result.positions.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_quad_collapses_to_single_triangle() {
        let mesh = quad();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(1).unwrap();

        let result = simplifier.to_mesh();
        assert_eq!(result.triangle_count(), 1);
        assert_eq!(result.vertex_count(), 3);
        // The surviving triangle stays in the z = 0 plane.
        for p in &result.positions {
            assert!(p.z.abs() < 1e-12);
        }
    }

    #[test]
    fn test_target_clamped_to_current_count() {
        let mesh = quad();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(1000).unwrap();

        assert_eq!(simplifier.to_mesh().triangle_count(), 2);
    }

    #[test]
    fn test_tetrahedron_lossless_unchanged() {
        let mesh = tetrahedron();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_lossless().unwrap();

        let result = simplifier.to_mesh();
        assert_eq!(result.triangle_count(), 4);
        assert_eq!(result.vertex_count(), 4);
    }

    #[test]
    fn test_coplanar_fan_lossless_reduces() {
        let mesh = coplanar_fan(8);
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_lossless().unwrap();

        let result = simplifier.to_mesh();
        assert!(result.triangle_count() < 8);
        for p in &result.positions {
            assert!(p.z.abs() < 1e-9);
        }
    }

    #[test]
    fn test_lossless_is_idempotent() {
        let mesh = coplanar_fan(8);
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_lossless().unwrap();
        let first = simplifier.to_mesh().triangle_count();

        simplifier.decimate_lossless().unwrap();
        assert_eq!(simplifier.to_mesh().triangle_count(), first);
    }

    #[test]
    fn test_smart_link_closes_crack() {
        let mesh = split_quads();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());

        // After initial analysis the interface is interior: every edge of the
        // stacked quads is shared by two triangles.
        let tombstoned = simplifier.update_mesh(0);
        assert_eq!(tombstoned, 0);
        assert!(simplifier.vertices.iter().all(|v| !v.border));

        simplifier.decimate_to_triangles(2).unwrap();
        assert_eq!(simplifier.to_mesh().triangle_count(), 2);
    }

    #[test]
    fn test_smart_link_disabled_keeps_crack() {
        let mesh = split_quads();
        let options = SimplifyOptions::default().with_smart_link(false);
        let mut simplifier = initialized(&mesh, options);

        simplifier.update_mesh(0);
        assert!(simplifier.vertices.iter().all(|v| v.border));
    }

    /// A gently curved height field, so edge errors are non-zero and the
    /// threshold schedule actually gates the collapses.
    fn curved_grid(n: usize) -> Mesh {
        let mut mesh = grid(n);
        for p in &mut mesh.positions {
            p.z = 0.05 * (p.x * p.x + p.y * p.y);
        }
        mesh
    }

    #[test]
    fn test_aggressiveness_monotonicity() {
        let mesh = curved_grid(6);
        let target = 12;

        let mut eager = initialized(
            &mesh,
            SimplifyOptions::default().with_aggressiveness(7.0),
        );
        eager.decimate_to_triangles(target).unwrap();

        let mut careful = initialized(
            &mesh,
            SimplifyOptions::default().with_aggressiveness(3.0),
        );
        careful.decimate_to_triangles(target).unwrap();

        assert!(eager.to_mesh().triangle_count() <= careful.to_mesh().triangle_count());
    }

    #[test]
    fn test_preserve_borders_keeps_border_edges() {
        let mesh = grid(3);

        // Edges incident to exactly one triangle, keyed by position bits so
        // they survive re-indexing.
        fn border_edges(mesh: &Mesh) -> Vec<(u64, u64, u64, u64, u64, u64)> {
            let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
            for indices in &mesh.sub_meshes {
                for t in indices.chunks_exact(3) {
                    for e in 0..3 {
                        let a = t[e].min(t[(e + 1) % 3]);
                        let b = t[e].max(t[(e + 1) % 3]);
                        *counts.entry((a, b)).or_insert(0) += 1;
                    }
                }
            }
            let mut edges: Vec<_> = counts
                .into_iter()
                .filter(|&(_, count)| count == 1)
                .map(|((a, b), _)| {
                    let pa = mesh.positions[a];
                    let pb = mesh.positions[b];
                    let mut key = [
                        (pa.x.to_bits(), pa.y.to_bits(), pa.z.to_bits()),
                        (pb.x.to_bits(), pb.y.to_bits(), pb.z.to_bits()),
                    ];
                    key.sort_unstable();
                    (key[0].0, key[0].1, key[0].2, key[1].0, key[1].1, key[1].2)
                })
                .collect();
            edges.sort_unstable();
            edges
        }

        let before = border_edges(&mesh);

        let options = SimplifyOptions::default().with_preserve_borders(true);
        let mut simplifier = initialized(&mesh, options);
        simplifier.decimate_to_triangles(2).unwrap();
        let result = simplifier.to_mesh();

        let after = border_edges(&result);
        for edge in &before {
            assert!(after.contains(edge), "border edge lost: {:?}", edge);
        }
    }

    #[test]
    fn test_sub_mesh_tags_preserved() {
        // Two sub-meshes over one shared plane.
        let mut positions = Vec::new();
        for j in 0..=2 {
            for i in 0..=4 {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let cell = |i: usize, j: usize| -> [usize; 4] {
            let v00 = j * 5 + i;
            [v00, v00 + 1, v00 + 5, v00 + 6]
        };
        let mut left = Vec::new();
        let mut right = Vec::new();
        for j in 0..2 {
            for i in 0..4 {
                let [v00, v10, v01, v11] = cell(i, j);
                let stream = if i < 2 { &mut left } else { &mut right };
                stream.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
            }
        }
        let mesh = Mesh::with_sub_meshes(positions, vec![left, right]);
        let before_per_sub = [mesh.sub_meshes[0].len() / 3, mesh.sub_meshes[1].len() / 3];

        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(4).unwrap();
        let result = simplifier.to_mesh();

        assert_eq!(result.sub_mesh_count(), 2);
        assert!(result.sub_meshes[0].len() / 3 <= before_per_sub[0]);
        assert!(result.sub_meshes[1].len() / 3 <= before_per_sub[1]);
        assert!(result.triangle_count() <= mesh.triangle_count());
        for indices in &result.sub_meshes {
            assert_eq!(indices.len() % 3, 0);
        }
    }

    #[test]
    fn test_attribute_arrays_stay_coherent() {
        let mut mesh = grid(3);
        let n = mesh.vertex_count();
        mesh.set_normals(vec![Vector3::z(); n]).unwrap();
        mesh.set_colors(vec![Vector4::new(1.0, 0.5, 0.25, 1.0); n])
            .unwrap();
        mesh.set_bone_weights(vec![BoneWeight::new([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]); n])
            .unwrap();
        mesh.set_uv_channel(
            0,
            UvChannel::Uv2(
                mesh.positions
                    .iter()
                    .map(|p| nalgebra::Vector2::new(p.x / 3.0, p.y / 3.0))
                    .collect(),
            ),
        )
        .unwrap();

        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(6).unwrap();
        let result = simplifier.to_mesh();

        let out = result.vertex_count();
        assert!(result.triangle_count() <= 6 || result.triangle_count() < mesh.triangle_count());
        assert_eq!(result.normals.as_ref().unwrap().len(), out);
        assert_eq!(result.colors.as_ref().unwrap().len(), out);
        assert_eq!(result.bone_weights.as_ref().unwrap().len(), out);
        assert_eq!(result.uv_channels[0].as_ref().unwrap().len(), out);
        for n in result.normals.as_ref().unwrap() {
            assert!((n.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mismatched_attribute_dropped_with_warning() {
        let mut mesh = quad();
        // Bypass the checked setter to simulate a stale array.
        mesh.normals = Some(vec![Vector3::z(); 2]);

        let mut simplifier = MeshSimplifier::new();
        simplifier.initialize(&mesh).unwrap();
        simplifier.decimate_to_triangles(1).unwrap();

        assert!(simplifier.to_mesh().normals.is_none());
    }

    #[test]
    fn test_max_vertex_count_drives_past_target() {
        let mesh = grid(4);
        let options = SimplifyOptions::default().with_max_vertex_count(16);
        let mut simplifier = initialized(&mesh, options);

        // The triangle target is met immediately; only the vertex constraint
        // keeps the passes running.
        simplifier
            .decimate_to_triangles(mesh.triangle_count())
            .unwrap();

        assert!(simplifier.to_mesh().vertex_count() < 16);
    }

    #[test]
    fn test_quadrics_vanish_at_their_own_vertices() {
        let mesh = tetrahedron();
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.update_mesh(0);

        for vertex in &simplifier.vertices {
            assert!(vertex.q.evaluate(&vertex.p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_adjacency_survives_a_pass() {
        let mesh = grid(4);
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.update_mesh(0);
        assert_adjacency_consistent(&simplifier);

        for triangle in &mut simplifier.triangles {
            triangle.dirty = false;
        }
        let mut deleted = 0;
        let mut remaining = simplifier.vertices.len();
        simplifier.remove_vertex_pass(32, 0, 1e-3, &mut deleted, &mut remaining, usize::MAX);

        assert!(deleted > 0);
        assert_adjacency_consistent(&simplifier);

        // Tombstones only grow.
        assert_eq!(
            simplifier.triangles.iter().filter(|t| t.deleted).count(),
            deleted
        );
    }

    #[test]
    fn test_no_degenerate_triangles_survive() {
        let mesh = grid(5);
        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.decimate_to_triangles(8).unwrap();
        let result = simplifier.to_mesh();

        for indices in &result.sub_meshes {
            for t in indices.chunks_exact(3) {
                assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
            }
        }
    }

    #[test]
    fn test_deterministic_output() {
        let mesh = grid(5);

        let run = || {
            let mut simplifier = initialized(&mesh, SimplifyOptions::default());
            simplifier.decimate_to_triangles(10).unwrap();
            simplifier.to_mesh()
        };

        let a = run();
        let b = run();
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.sub_meshes, b.sub_meshes);
    }

    #[test]
    fn test_progress_events() {
        use std::sync::{Arc, Mutex};

        let mesh = grid(3);
        let events: Arc<Mutex<Vec<(usize, usize, usize, i64)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.set_progress(Progress::new(move |iteration, original, current, target| {
            sink.lock().unwrap().push((iteration, original, current, target));
        }));
        simplifier.decimate_to_triangles(4).unwrap();

        let events = events.lock().unwrap();
        assert!(!events.is_empty());
        for (slot, &(iteration, original, current, target)) in events.iter().enumerate() {
            assert_eq!(iteration, slot);
            assert_eq!(original, 18);
            assert_eq!(target, 4);
            assert!(current <= original);
        }
        // Live count is monotonically non-increasing across reports.
        for pair in events.windows(2) {
            assert!(pair[1].2 <= pair[0].2);
        }
    }

    #[test]
    fn test_lossless_progress_reports_negative_target() {
        use std::sync::{Arc, Mutex};

        let mesh = coplanar_fan(6);
        let targets: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&targets);

        let mut simplifier = initialized(&mesh, SimplifyOptions::default());
        simplifier.set_progress(Progress::new(move |_, _, _, target| {
            sink.lock().unwrap().push(target);
        }));
        simplifier.decimate_lossless().unwrap();

        let targets = targets.lock().unwrap();
        assert!(!targets.is_empty());
        assert!(targets.iter().all(|&t| t == -1));
    }

    #[test]
    fn test_decimate_before_initialize_fails() {
        let mut simplifier = MeshSimplifier::new();
        assert!(matches!(
            simplifier.decimate_to_triangles(0),
            Err(SimplifyError::InvalidArgument { .. })
        ));
        assert!(matches!(
            simplifier.decimate_lossless(),
            Err(SimplifyError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_initialize_rejects_bad_streams() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];

        let mut simplifier = MeshSimplifier::new();
        let partial = Mesh::new(positions.clone(), vec![0, 1]);
        assert!(matches!(
            simplifier.initialize(&partial),
            Err(SimplifyError::InvalidArgument { .. })
        ));

        let out_of_range = Mesh::new(positions, vec![0, 1, 7]);
        assert!(matches!(
            simplifier.initialize(&out_of_range),
            Err(SimplifyError::IndexOutOfRange { index: 7, limit: 3 })
        ));
    }

    #[test]
    fn test_uv_seam_survives_smart_linked_crack() {
        // Two triangle strips meeting along x = 1 with coincident positions
        // but different UVs across the seam.
        let positions = vec![
            // Left strip.
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            // Right strip duplicates the x = 1 column.
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 3, 0, 3, 2, 4, 5, 7, 4, 7, 6];
        let mut mesh = Mesh::new(positions, indices);
        let uvs: Vec<nalgebra::Vector2<f64>> = (0..8)
            .map(|i| {
                if i < 4 {
                    nalgebra::Vector2::new(0.25, 0.0)
                } else {
                    nalgebra::Vector2::new(0.75, 0.0)
                }
            })
            .collect();
        mesh.set_uv_channel(0, UvChannel::Uv2(uvs)).unwrap();

        // Freeze the outer boundary so the only collapsible edge is the
        // smart-linked seam column itself.
        let options = SimplifyOptions::default().with_preserve_borders(true);
        let mut simplifier = initialized(&mesh, options);
        simplifier.decimate_lossless().unwrap();
        let result = simplifier.to_mesh();

        assert_eq!(result.triangle_count(), 2);

        // Both sides of the seam keep their own UV values.
        let out_uvs = match result.uv_channels[0].as_ref().unwrap() {
            UvChannel::Uv2(data) => data,
            _ => unreachable!(),
        };
        assert!(out_uvs.iter().any(|uv| (uv.x - 0.25).abs() < 1e-9));
        assert!(out_uvs.iter().any(|uv| (uv.x - 0.75).abs() < 1e-9));
    }
}
